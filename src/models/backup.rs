//! Snapshot of the whole collection, used for JSON export/import.
use super::{Question, ReviewEvent};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub questions: Vec<Question>,
    #[serde(default)]
    pub reviews: Vec<ReviewEvent>,
}
