//! Length-prefixed packing of a [`FieldSet`] into one plaintext buffer.
//!
//! ```text
//! packed := version:u8 field*
//! field  := name_len:u32be name:utf8 value_len:u32be value
//! ```
//!
//! Names travel inside the sealed buffer, so opening a row needs nothing but
//! the stored columns and the row id.

use common::RowSealError;
use zeroize::Zeroizing;

use super::fields::FieldSet;

/// Current framing version, written as the first packed byte.
pub const FRAME_VERSION: u8 = 1;

const LEN_PREFIX: usize = 4;

/// Serialise `fields` in order.
///
/// # Errors
///
/// Returns [`RowSealError::MalformedPayload`] if a name or value is longer
/// than a `u32` length prefix can describe.
pub fn pack(fields: &FieldSet) -> Result<Zeroizing<Vec<u8>>, RowSealError> {
    let capacity = 1 + fields
        .iter()
        .map(|(name, value)| 2 * LEN_PREFIX + name.len() + value.len())
        .sum::<usize>();
    let mut buf = Zeroizing::new(Vec::with_capacity(capacity));
    buf.push(FRAME_VERSION);
    for (name, value) in fields.iter() {
        put_chunk(&mut buf, name.as_bytes())?;
        put_chunk(&mut buf, value)?;
    }
    Ok(buf)
}

/// Parse a packed buffer back into a [`FieldSet`].
///
/// # Errors
///
/// Returns [`RowSealError::MalformedPayload`] on an unknown version, a length
/// prefix that runs past the end of the buffer, or a non-UTF-8 name.
pub fn unpack(packed: &[u8]) -> Result<FieldSet, RowSealError> {
    let (&version, mut rest) = packed
        .split_first()
        .ok_or_else(|| malformed("empty buffer"))?;
    if version != FRAME_VERSION {
        return Err(malformed(format!("unsupported framing version {version}")));
    }

    let mut fields = FieldSet::new();
    while !rest.is_empty() {
        let name = take_chunk(&mut rest)?;
        let name = std::str::from_utf8(name).map_err(|_| malformed("field name is not UTF-8"))?;
        let value = take_chunk(&mut rest)?;
        fields.push(name, value);
    }
    Ok(fields)
}

fn put_chunk(buf: &mut Vec<u8>, chunk: &[u8]) -> Result<(), RowSealError> {
    let len = u32::try_from(chunk.len()).map_err(|_| malformed("field exceeds 4 GiB"))?;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(chunk);
    Ok(())
}

fn take_chunk<'a>(rest: &mut &'a [u8]) -> Result<&'a [u8], RowSealError> {
    if rest.len() < LEN_PREFIX {
        return Err(malformed("truncated length prefix"));
    }
    let (prefix, tail) = rest.split_at(LEN_PREFIX);
    let mut len_bytes = [0u8; LEN_PREFIX];
    len_bytes.copy_from_slice(prefix);
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > tail.len() {
        return Err(malformed(format!(
            "declared length {len} exceeds remaining {} bytes",
            tail.len()
        )));
    }
    let (chunk, tail) = tail.split_at(len);
    *rest = tail;
    Ok(chunk)
}

fn malformed(reason: impl Into<String>) -> RowSealError {
    RowSealError::MalformedPayload(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_set_is_just_the_version() {
        let packed = pack(&FieldSet::new()).unwrap();
        assert_eq!(packed.as_slice(), &[FRAME_VERSION]);
        assert!(unpack(&packed).unwrap().is_empty());
    }

    #[test]
    fn layout_is_length_prefixed() {
        let packed = pack(&FieldSet::new().with("ab", "x")).unwrap();
        assert_eq!(
            packed.as_slice(),
            &[FRAME_VERSION, 0, 0, 0, 2, b'a', b'b', 0, 0, 0, 1, b'x']
        );
    }

    #[test]
    fn adjacent_boundary_lengths_survive() {
        let big = vec![0xA5u8; 70_000];
        let set = FieldSet::new()
            .with("empty", Vec::new())
            .with("one", vec![0u8])
            .with("big", big.clone())
            .with("", "x")
            .with("after", Vec::new());
        let back = unpack(&pack(&set).unwrap()).unwrap();
        assert_eq!(back, set);
        assert_eq!(back.get("one"), Some(&[0u8][..]));
        assert_eq!(back.get("big").map(<[u8]>::len), Some(big.len()));
    }

    #[test]
    fn empty_buffer_rejected() {
        assert!(matches!(unpack(&[]), Err(RowSealError::MalformedPayload(_))));
    }

    #[test]
    fn unknown_version_rejected() {
        assert!(unpack(&[2]).is_err());
    }

    #[test]
    fn overlong_declared_length_rejected() {
        let packed = [FRAME_VERSION, 0, 0, 0, 9, b'a'];
        let err = unpack(&packed).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn truncated_prefix_rejected() {
        assert!(unpack(&[FRAME_VERSION, 0, 0]).is_err());
    }

    #[test]
    fn name_without_value_rejected() {
        assert!(unpack(&[FRAME_VERSION, 0, 0, 0, 1, b'a']).is_err());
    }

    #[test]
    fn non_utf8_name_rejected() {
        let packed = [FRAME_VERSION, 0, 0, 0, 1, 0xff, 0, 0, 0, 0];
        assert!(unpack(&packed).is_err());
    }

    proptest! {
        #[test]
        fn pack_unpack_preserves_fields(
            fields in prop::collection::vec(
                (".{0,12}", prop::collection::vec(any::<u8>(), 0..64)),
                0..8,
            )
        ) {
            let set: FieldSet = fields.into_iter().collect();
            let back = unpack(&pack(&set).unwrap()).unwrap();
            prop_assert_eq!(back, set);
        }

        #[test]
        fn unpack_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
            let _ = unpack(&bytes);
        }
    }
}
