//! Request handlers: one function per protocol operation.
//!
//! Handlers are synchronous; each request is a bounded computation over
//! in-memory buffers.

use common::protocol::{EncryptedRowPayload, FieldEntry, OkBody, Request, Response};
use common::RowSealError;
use row_crypto::{FieldSet, RowCipher};
use tracing::{debug, warn};
use uuid::Uuid;

/// Dispatch a parsed request to its handler.
pub fn handle(cipher: &RowCipher, req: Request) -> Response {
    let result = match req {
        Request::Encrypt {
            row_id,
            fields,
            context,
        } => encrypt(cipher, row_id, fields, context.as_deref()),
        Request::Decrypt {
            row_id,
            payload,
            context,
            expect,
        } => decrypt(cipher, row_id, &payload, context.as_deref(), expect.as_deref()),
        Request::Health => Ok(health()),
    };
    match result {
        Ok(body) => Response::Ok(body),
        Err(e) => Response::from(&e),
    }
}

/// `encrypt` — seal an ordered field set for one row.
fn encrypt(
    cipher: &RowCipher,
    row_id: Uuid,
    fields: Vec<FieldEntry>,
    context: Option<&str>,
) -> Result<OkBody, RowSealError> {
    let count = fields.len();
    let set: FieldSet = fields.into_iter().map(|f| (f.name, f.value)).collect();

    let payload = cipher
        .encrypt_row_with_context(&set, row_id, context.map(str::as_bytes))
        .inspect_err(|e| warn!(%row_id, code = e.code(), "encrypt failed"))?;

    debug!(%row_id, fields = count, "row sealed");
    Ok(OkBody {
        payload: Some(payload),
        ..OkBody::default()
    })
}

/// `decrypt` — verify and open a stored row, optionally checking its layout.
fn decrypt(
    cipher: &RowCipher,
    row_id: Uuid,
    payload: &EncryptedRowPayload,
    context: Option<&str>,
    expect: Option<&[String]>,
) -> Result<OkBody, RowSealError> {
    let opened = payload
        .validate_shape()
        .and_then(|()| cipher.decrypt_row_with_context(payload, row_id, context.map(str::as_bytes)))
        .and_then(|set| {
            if let Some(names) = expect {
                let layout: Vec<&str> = names.iter().map(String::as_str).collect();
                set.ensure_layout(&layout)?;
            }
            to_entries(set)
        });

    match opened {
        Ok(fields) => {
            debug!(%row_id, fields = fields.len(), "row opened");
            Ok(OkBody {
                fields: Some(fields),
                ..OkBody::default()
            })
        }
        Err(e) => {
            warn!(
                %row_id,
                code = e.code(),
                integrity_fault = e.is_integrity_fault(),
                "decrypt failed"
            );
            Err(e)
        }
    }
}

/// `health` — liveness check.
fn health() -> OkBody {
    OkBody {
        version: Some(env!("CARGO_PKG_VERSION").into()),
        ..OkBody::default()
    }
}

/// Text is the only value type at this boundary.
fn to_entries(set: FieldSet) -> Result<Vec<FieldEntry>, RowSealError> {
    set.into_iter()
        .map(|f| match String::from_utf8(f.value) {
            Ok(value) => Ok(FieldEntry {
                name: f.name,
                value,
            }),
            Err(_) => Err(RowSealError::MalformedPayload(format!(
                "field `{}` is not valid UTF-8",
                f.name
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use row_crypto::KeyDerivationService;

    const ROW: &str = "11111111-1111-1111-1111-111111111111";

    fn cipher() -> RowCipher {
        RowCipher::new(KeyDerivationService::from_secret(&[0x42u8; 32]).unwrap())
    }

    fn entry(name: &str, value: &str) -> FieldEntry {
        FieldEntry {
            name: name.into(),
            value: value.into(),
        }
    }

    fn seal(c: &RowCipher, context: Option<&str>) -> EncryptedRowPayload {
        let req = Request::Encrypt {
            row_id: Uuid::parse_str(ROW).unwrap(),
            fields: vec![entry("titre", "Alpha"), entry("description", "")],
            context: context.map(str::to_owned),
        };
        match handle(c, req) {
            Response::Ok(OkBody {
                payload: Some(p), ..
            }) => p,
            other => panic!("unexpected response: {other:?}"),
        }
    }

    fn open(
        c: &RowCipher,
        payload: EncryptedRowPayload,
        context: Option<&str>,
        expect: Option<Vec<String>>,
    ) -> Response {
        handle(
            c,
            Request::Decrypt {
                row_id: Uuid::parse_str(ROW).unwrap(),
                payload,
                context: context.map(str::to_owned),
                expect,
            },
        )
    }

    #[test]
    fn encrypt_then_decrypt() {
        let c = cipher();
        let payload = seal(&c, None);
        match open(&c, payload, None, None) {
            Response::Ok(body) => assert_eq!(
                body.fields.unwrap(),
                vec![entry("titre", "Alpha"), entry("description", "")]
            ),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn expected_layout_enforced() {
        let c = cipher();
        let payload = seal(&c, None);
        let resp = open(&c, payload, None, Some(vec!["description".into(), "titre".into()]));
        assert!(matches!(resp, Response::Error { ref code, .. } if code == "malformed_payload"));
    }

    #[test]
    fn context_round_trip() {
        let c = cipher();
        let payload = seal(&c, Some("taches"));
        let wrong = open(&c, payload.clone(), Some("users"), None);
        assert!(matches!(wrong, Response::Error { ref code, .. } if code == "authentication_error"));
        assert!(matches!(open(&c, payload, Some("taches"), None), Response::Ok(_)));
    }

    #[test]
    fn malformed_columns_are_encoding_errors() {
        let c = cipher();
        let mut payload = seal(&c, None);
        payload.iv.truncate(10);
        let resp = open(&c, payload, None, None);
        assert!(matches!(resp, Response::Error { ref code, .. } if code == "encoding_error"));
    }

    #[test]
    fn error_message_never_contains_plaintext() {
        let c = cipher();
        let mut payload = seal(&c, None);
        let first = payload.tag.remove(0);
        payload.tag.insert(0, if first == 'f' { 'e' } else { 'f' });
        let json = serde_json::to_string(&open(&c, payload, None, None)).unwrap();
        assert!(!json.contains("Alpha"));
    }

    #[test]
    fn health_reports_version() {
        match handle(&cipher(), Request::Health) {
            Response::Ok(body) => {
                assert_eq!(body.version.as_deref(), Some(env!("CARGO_PKG_VERSION")))
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
