use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Server-side session record backing the opaque bearer tokens handed out on
/// successful verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub token: String,
    pub user_id: ObjectId,
    pub created_at: DateTime,
    pub expires_at: DateTime,
}

impl Session {
    pub fn is_expired(&self, now: DateTime) -> bool {
        now.timestamp_millis() > self.expires_at.timestamp_millis()
    }
}
