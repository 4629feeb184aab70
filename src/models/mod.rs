pub mod earning;
pub mod otp;
pub mod referral;
pub mod session;
pub mod user;

use mongodb::bson::DateTime;

/// RFC 3339 rendering for response payloads.
pub fn rfc3339(dt: DateTime) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(dt.timestamp_millis())
        .map(|d| d.to_rfc3339())
        .unwrap_or_default()
}
