use serde::{Deserialize, Serialize};

use super::order::AccountId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    #[serde(rename = "correo")]
    pub email: String,
}
