use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub rut: Option<String>,
}
