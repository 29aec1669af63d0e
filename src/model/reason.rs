use serde::{Deserialize, Serialize};

/// Why a user is visiting the lab ("Study", "Class", ...).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reason {
    pub id: u64,
    pub name: String,
}
