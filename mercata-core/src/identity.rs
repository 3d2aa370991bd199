use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Admin,
}

/// The identity resolved by upstream auth middleware. Every order operation
/// runs on behalf of one of these; admin-only operations require `Role::Admin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub customer_id: String,
    pub email: Option<String>,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
