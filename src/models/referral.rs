use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::models::rfc3339;

/// Fixed reward amounts in currency units, set once at creation time.
pub const REFERRAL_COMMISSION: i64 = 10_000;
pub const REFERRAL_BONUS: i64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl ReferralStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ReferralStatus::Pending),
            "CONFIRMED" => Some(ReferralStatus::Confirmed),
            "COMPLETED" => Some(ReferralStatus::Completed),
            "CANCELLED" => Some(ReferralStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Pending => "PENDING",
            ReferralStatus::Confirmed => "CONFIRMED",
            ReferralStatus::Completed => "COMPLETED",
            ReferralStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Edge between a referrer and a referred user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub referrer_id: ObjectId,
    pub referred_id: ObjectId,
    pub status: ReferralStatus,
    pub commission: i64,
    pub bonus: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Referral {
    pub fn new(referrer_id: ObjectId, referred_id: ObjectId) -> Self {
        let now = DateTime::now();
        Referral {
            id: None,
            referrer_id,
            referred_id,
            status: ReferralStatus::Pending,
            commission: REFERRAL_COMMISSION,
            bonus: REFERRAL_BONUS,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Summary of the referred user embedded in stats/analytics payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferredSummary {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralResponse {
    pub id: String,
    pub referrer_id: String,
    pub referred_id: String,
    pub status: ReferralStatus,
    pub commission: i64,
    pub bonus: i64,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred: Option<ReferredSummary>,
}

impl ReferralResponse {
    pub fn from_referral(referral: &Referral, referred: Option<ReferredSummary>) -> Self {
        ReferralResponse {
            id: referral.id.map(|id| id.to_hex()).unwrap_or_default(),
            referrer_id: referral.referrer_id.to_hex(),
            referred_id: referral.referred_id.to_hex(),
            status: referral.status,
            commission: referral.commission,
            bonus: referral.bonus,
            created_at: rfc3339(referral.created_at),
            updated_at: rfc3339(referral.updated_at),
            referred,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_carries_referred_summary() {
        let referral = Referral::new(ObjectId::new(), ObjectId::new());
        let summary = ReferredSummary {
            id: referral.referred_id.to_hex(),
            name: Some("Alice".to_string()),
            email: Some("a@x.com".to_string()),
            created_at: rfc3339(referral.created_at),
        };

        let response = ReferralResponse::from_referral(&referral, Some(summary));
        let referred = response.referred.as_ref().expect("referred summary should survive");
        assert_eq!(referred.name.as_deref(), Some("Alice"));
        assert_eq!(referred.id, referral.referred_id.to_hex());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["referred"]["email"], "a@x.com");
        assert_eq!(json["commission"], REFERRAL_COMMISSION);
    }
}
