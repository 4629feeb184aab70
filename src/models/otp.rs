use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpPurpose {
    Registration,
    Login,
    AdminLogin,
}

impl OtpPurpose {
    /// Parses the wire `type` field. Unknown values are a validation error,
    /// not a deserialization failure, so handlers can answer 400.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REGISTRATION" => Some(OtpPurpose::Registration),
            "LOGIN" => Some(OtpPurpose::Login),
            "ADMIN_LOGIN" => Some(OtpPurpose::AdminLogin),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "User registration",
            OtpPurpose::Login => "User login",
            OtpPurpose::AdminLogin => "Admin login",
        }
    }
}

/// Append-only audit row, one per issuance. Only `is_used` is ever mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpLog {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub otp_code: String,
    pub otp_type: OtpPurpose,
    pub purpose: String,
    pub is_used: bool,
    pub created_at: DateTime,
}

impl OtpLog {
    pub fn new(user_id: ObjectId, code: &str, otp_type: OtpPurpose) -> Self {
        OtpLog {
            id: None,
            user_id,
            otp_code: code.to_string(),
            otp_type,
            purpose: otp_type.description().to_string(),
            is_used: false,
            created_at: DateTime::now(),
        }
    }
}
