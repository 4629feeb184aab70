use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, DateTime, Document},
    Collection, Database,
};
use rand::Rng;

use crate::errors::{AppError, Result};
use crate::models::otp::{OtpLog, OtpPurpose};
use crate::models::user::{ActiveOtp, Capability, User, UserStatus};
use crate::services::notify_service::NotifyService;

/// Codes stay valid for 5 minutes; expiry is checked lazily at verification.
const OTP_TTL_MINUTES: i64 = 5;

/// Identifying key for the OTP flows. Email and phone are interchangeable.
#[derive(Debug, Clone)]
pub enum UserKey {
    Email(String),
    Phone(String),
}

impl UserKey {
    pub fn from_parts(email: Option<String>, phone: Option<String>) -> Result<Self> {
        match (email, phone) {
            (Some(email), _) if !email.trim().is_empty() => Ok(UserKey::Email(email)),
            (_, Some(phone)) if !phone.trim().is_empty() => Ok(UserKey::Phone(phone)),
            _ => Err(AppError::invalid_data("Email or phone number is required")),
        }
    }

    pub fn filter(&self) -> Document {
        match self {
            UserKey::Email(email) => doc! { "email": email },
            UserKey::Phone(phone) => doc! { "phone": phone },
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            UserKey::Email(email) => Some(email),
            UserKey::Phone(_) => None,
        }
    }

    pub fn phone(&self) -> Option<&str> {
        match self {
            UserKey::Email(_) => None,
            UserKey::Phone(phone) => Some(phone),
        }
    }
}

pub struct IssuedOtp {
    pub user_id: ObjectId,
    pub code: String,
}

#[derive(Clone)]
pub struct OtpService {
    db: Database,
    notify: NotifyService,
}

impl OtpService {
    pub fn new(db: Database, notify: NotifyService) -> Self {
        Self { db, notify }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn otp_logs(&self) -> Collection<OtpLog> {
        self.db.collection("otp_logs")
    }

    // Generate 6-digit OTP
    pub fn generate_code() -> String {
        let mut rng = rand::thread_rng();
        format!("{:06}", rng.gen_range(0..1_000_000))
    }

    /// Issues a fresh code against the user matching `key`, overwriting any
    /// previous pair. For the registration purpose a pending placeholder user
    /// is created when none exists yet.
    pub async fn issue(&self, key: &UserKey, purpose: OtpPurpose) -> Result<IssuedOtp> {
        let users = self.users();
        let existing = users.find_one(key.filter()).await?;

        let user_id = match purpose {
            OtpPurpose::Registration => match existing {
                Some(user) if user.is_verified || user.status == UserStatus::Active => {
                    return Err(AppError::invalid_data("Account already exists"));
                }
                // A pending placeholder from an earlier attempt is reused;
                // its code is simply overwritten below.
                Some(user) => user
                    .id
                    .ok_or_else(|| AppError::service("User document missing _id"))?,
                None => {
                    let placeholder = User::pending(
                        key.email().map(str::to_string),
                        key.phone().map(str::to_string),
                    );
                    let inserted = users.insert_one(&placeholder).await?;
                    inserted
                        .inserted_id
                        .as_object_id()
                        .ok_or_else(|| AppError::service("Insert did not return an ObjectId"))?
                }
            },
            OtpPurpose::Login | OtpPurpose::AdminLogin => {
                let user = existing.ok_or_else(|| AppError::not_found("User"))?;
                // Role gate runs before any code is generated.
                if purpose == OtpPurpose::AdminLogin && !user.role.allows(Capability::AdminLogin) {
                    return Err(AppError::forbidden("Admin access required"));
                }
                user.id
                    .ok_or_else(|| AppError::service("User document missing _id"))?
            }
        };

        let code = Self::generate_code();
        let now = DateTime::now();
        let expires_at = DateTime::from_millis(now.timestamp_millis() + OTP_TTL_MINUTES * 60_000);

        let active_otp = ActiveOtp {
            code: code.clone(),
            expires_at,
            created_at: now,
        };

        users
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$set": {
                        "active_otp": to_bson(&active_otp)?,
                        "updated_at": now,
                    }
                },
            )
            .await?;

        self.otp_logs()
            .insert_one(&OtpLog::new(user_id, &code, purpose))
            .await?;

        self.notify.send_otp(key.email(), key.phone(), &code);

        Ok(IssuedOtp { user_id, code })
    }

    /// Verifies a submitted code. On success the pair is cleared, the user is
    /// marked verified and the audit rows are flipped to used. Every failure
    /// path leaves state untouched.
    pub async fn verify(&self, key: &UserKey, code: &str, purpose: OtpPurpose) -> Result<User> {
        let users = self.users();
        let mut user = users
            .find_one(key.filter())
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let active_otp = user.active_otp.as_ref().ok_or(AppError::OtpMismatch)?;
        if active_otp.code != code {
            return Err(AppError::OtpMismatch);
        }

        let now = DateTime::now();
        if active_otp.is_expired(now) {
            return Err(AppError::OtpExpired);
        }

        if purpose == OtpPurpose::AdminLogin && !user.role.allows(Capability::AdminLogin) {
            return Err(AppError::forbidden("Admin access required"));
        }

        let user_id = user
            .id
            .ok_or_else(|| AppError::service("User document missing _id"))?;

        users
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$unset": { "active_otp": "" },
                    "$set": { "is_verified": true, "updated_at": now },
                },
            )
            .await?;

        self.otp_logs()
            .update_many(
                doc! { "user_id": user_id, "otp_code": code, "is_used": false },
                doc! { "$set": { "is_used": true } },
            )
            .await?;

        user.active_otp = None;
        user.is_verified = true;
        user.updated_at = now;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_is_six_digits() {
        for _ in 0..100 {
            let code = OtpService::generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn key_prefers_email_over_phone() {
        let key = UserKey::from_parts(
            Some("a@x.com".to_string()),
            Some("0123456789".to_string()),
        )
        .unwrap();
        assert_eq!(key.email(), Some("a@x.com"));
        assert_eq!(key.phone(), None);
    }

    #[test]
    fn key_requires_some_identifier() {
        assert!(UserKey::from_parts(None, None).is_err());
        assert!(UserKey::from_parts(Some("  ".to_string()), None).is_err());
    }
}
