//! Session-related types for dashboard authentication.
//!
//! Minimal identity persisted locally so a returning owner skips the login
//! screen while their provider session is still valid.

use serde::{Deserialize, Serialize};

use clementine_core::{StoreId, UserId};

/// The locally persisted session identity.
///
/// Written when the owner enters the authenticated state, cleared on
/// sign-out. Contains no credentials - only identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Authenticated user's provider-issued id.
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// Store the session was established for.
    #[serde(rename = "projectId")]
    pub store_id: StoreId,
}

/// Storage keys for persisted session data.
pub mod session_keys {
    /// Key for the authenticated user's id.
    pub const USER_ID: &str = "userId";

    /// Key for the store id (historically named `projectId`).
    pub const STORE_ID: &str = "projectId";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_storage_keys() {
        let record = SessionRecord {
            user_id: UserId::new("uid_1"),
            store_id: StoreId::new("store1"),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json[session_keys::USER_ID], "uid_1");
        assert_eq!(json[session_keys::STORE_ID], "store1");
    }
}
