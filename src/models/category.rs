//! Category model

use serde::{Deserialize, Serialize};

/// Read-only reference data, ordered by name when listed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}
