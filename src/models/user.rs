use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::models::rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Member,
    Moderator,
}

/// Things a role is allowed to do. Handlers check capabilities instead of
/// comparing role strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    AdminLogin,
    ManageReferrals,
}

impl Role {
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::Admin => &[Capability::AdminLogin, Capability::ManageReferrals],
            Role::Member => &[],
            Role::Moderator => &[],
        }
    }

    pub fn allows(&self, cap: Capability) -> bool {
        self.capabilities().contains(&cap)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Pending,
    Active,
}

/// The single active OTP pair on a user. Reissuing overwrites it; successful
/// verification removes it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ActiveOtp {
    pub code: String,
    pub expires_at: DateTime,
    pub created_at: DateTime,
}

impl ActiveOtp {
    pub fn is_expired(&self, now: DateTime) -> bool {
        now.timestamp_millis() > self.expires_at.timestamp_millis()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub role: Role,
    pub status: UserStatus,
    pub is_verified: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_id: Option<ObjectId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_otp: Option<ActiveOtp>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    /// Pending placeholder created when a registration OTP is first issued.
    pub fn pending(email: Option<String>, phone: Option<String>) -> Self {
        let now = DateTime::now();
        User {
            id: None,
            email,
            phone,
            name: None,
            role: Role::Member,
            status: UserStatus::Pending,
            is_verified: false,
            password_hash: None,
            referral_code: None,
            referrer_id: None,
            active_otp: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            email: user.email,
            phone: user.phone,
            name: user.name,
            role: user.role,
            status: user.status,
            is_verified: user.is_verified,
            referral_code: user.referral_code,
            created_at: rfc3339(user.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_holds_admin_capabilities() {
        assert!(Role::Admin.allows(Capability::AdminLogin));
        assert!(Role::Admin.allows(Capability::ManageReferrals));
    }

    #[test]
    fn member_and_moderator_cannot_admin_login() {
        assert!(!Role::Member.allows(Capability::AdminLogin));
        assert!(!Role::Moderator.allows(Capability::AdminLogin));
        assert!(!Role::Member.allows(Capability::ManageReferrals));
    }

    #[test]
    fn otp_expiry_is_strict() {
        let now = DateTime::now();
        let otp = ActiveOtp {
            code: "123456".to_string(),
            expires_at: now,
            created_at: now,
        };
        assert!(!otp.is_expired(now));

        let later = DateTime::from_millis(now.timestamp_millis() + 1);
        assert!(otp.is_expired(later));
    }
}
