use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity carried by a bearer token. Trusted as-is once the signature checks
/// out; the referenced user is not looked up again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub username: String,
    pub email: String,
    pub iat: usize,                 // issued at (unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<usize>,         // only present when a ttl is configured
    pub iss: String,
}
