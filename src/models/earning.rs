use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::models::rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EarningType {
    ReferralBonus,
    ActivityBonus,
    MilestoneBonus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EarningStatus {
    Pending,
    Approved,
    Paid,
    Cancelled,
}

impl EarningStatus {
    /// Lifecycle: PENDING -> APPROVED -> PAID, or PENDING -> CANCELLED.
    /// PAID and CANCELLED are terminal.
    pub fn can_transition_to(self, next: EarningStatus) -> bool {
        matches!(
            (self, next),
            (EarningStatus::Pending, EarningStatus::Approved)
                | (EarningStatus::Pending, EarningStatus::Cancelled)
                | (EarningStatus::Approved, EarningStatus::Paid)
        )
    }
}

/// A reward grant owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Earning {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub earning_type: EarningType,
    pub amount: i64,
    pub description: String,
    pub status: EarningStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Earning {
    pub fn referral_bonus(user_id: ObjectId, amount: i64, referred_name: &str) -> Self {
        let now = DateTime::now();
        Earning {
            id: None,
            user_id,
            earning_type: EarningType::ReferralBonus,
            amount,
            description: format!("Referral bonus for {}", referred_name),
            status: EarningStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningResponse {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub earning_type: EarningType,
    pub amount: i64,
    pub description: String,
    pub status: EarningStatus,
    pub created_at: String,
}

impl From<Earning> for EarningResponse {
    fn from(e: Earning) -> Self {
        EarningResponse {
            id: e.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: e.user_id.to_hex(),
            earning_type: e.earning_type,
            amount: e.amount,
            description: e.description,
            status: e.status,
            created_at: rfc3339(e.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EarningStatus::*;

    #[test]
    fn pending_can_be_approved_or_cancelled() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Paid));
    }

    #[test]
    fn approved_only_moves_to_paid() {
        assert!(Approved.can_transition_to(Paid));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Cancelled));
    }

    #[test]
    fn paid_and_cancelled_are_terminal() {
        for next in [Pending, Approved, Paid, Cancelled] {
            assert!(!Paid.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }
}
