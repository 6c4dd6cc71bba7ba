//! [`FieldSet`]: the ordered, named plaintext fields of one row.

use common::RowSealError;

/// One named plaintext field.
#[derive(Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: Vec<u8>,
}

/// Ordered plaintext fields belonging to a single row.
///
/// Order is part of the storage contract: the order used when sealing is the
/// order returned when opening. The `Debug` output shows names and value
/// lengths only, so a field set can sit in a log line without leaking content.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    fields: Vec<Field>,
}

impl FieldSet {
    /// Create an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`FieldSet::push`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a field after all existing ones.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Value of the first field called `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_slice())
    }

    /// Value of the first field called `name`, if it is valid UTF-8.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_slice()))
    }

    /// Check that the set holds exactly `layout`, in that order.
    ///
    /// Persistence adapters call this after opening a row to confirm it still
    /// has the column layout they agreed on at write time.
    ///
    /// # Errors
    ///
    /// Returns [`RowSealError::MalformedPayload`] naming the first mismatch.
    pub fn ensure_layout(&self, layout: &[&str]) -> Result<(), RowSealError> {
        if self.fields.len() != layout.len() {
            return Err(RowSealError::MalformedPayload(format!(
                "expected {} fields, found {}",
                layout.len(),
                self.fields.len()
            )));
        }
        for (i, (field, expected)) in self.fields.iter().zip(layout).enumerate() {
            if field.name != *expected {
                return Err(RowSealError::MalformedPayload(format!(
                    "field {i} is `{}`, expected `{expected}`",
                    field.name
                )));
            }
        }
        Ok(())
    }
}

impl<N, V> FromIterator<(N, V)> for FieldSet
where
    N: Into<String>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = FieldSet::new();
        for (name, value) in iter {
            set.push(name, value);
        }
        set
    }
}

impl IntoIterator for FieldSet {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("len", &self.value.len())
            .finish()
    }
}

impl std::fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.fields).finish()
    }
}
