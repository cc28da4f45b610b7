use serde::{Deserialize, Serialize}; // For the snapshot/wire data model

// --- Person Identifier ---

/// Store-assigned identifier of a person record.
///
/// A serde newtype, so it serializes as a bare integer and the snapshot
/// keeps the plain `"id": 3` shape. Ids are assigned by the repository
/// starting at 1 and are never reused after a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersonId(u64);

impl PersonId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
    pub fn value(&self) -> u64 {
        self.0
    }
}
impl From<u64> for PersonId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}
impl From<PersonId> for u64 {
    fn from(id: PersonId) -> Self {
        id.0
    }
}
impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// --- Person Record ---

/// A single person record, exactly as it appears in the snapshot file.
///
/// Field names are kept in the snapshot's camelCase layout
/// (`firstName`, `lastName`, ...) so the file stays a stable source of
/// truth across restarts. No field besides `id` carries any constraint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: String,
    pub age: i32,
}

impl Person {
    /// `true` when `name` equals the first OR the last name.
    /// Exact match, case-sensitive.
    pub fn matches_name(&self, name: &str) -> bool {
        self.first_name == name || self.last_name == name
    }
}
