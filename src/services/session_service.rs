use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    Collection, Database,
};
use rand::Rng;

use crate::errors::Result;
use crate::models::session::Session;
use crate::models::user::User;

#[derive(Clone)]
pub struct SessionService {
    db: Database,
    ttl_days: i64,
}

impl SessionService {
    pub fn new(db: Database, ttl_days: i64) -> Self {
        Self { db, ttl_days }
    }

    fn sessions(&self) -> Collection<Session> {
        self.db.collection("sessions")
    }

    // 64-char hex token
    pub fn generate_token() -> String {
        let mut rng = rand::thread_rng();
        (0..32)
            .map(|_| format!("{:02x}", rng.gen::<u8>()))
            .collect()
    }

    /// Issues a server-validated session token for the user.
    pub async fn create(&self, user_id: ObjectId) -> Result<String> {
        let token = Self::generate_token();
        let now = DateTime::now();
        let expires_at =
            DateTime::from_millis(now.timestamp_millis() + self.ttl_days * 24 * 60 * 60 * 1000);

        let session = Session {
            id: None,
            token: token.clone(),
            user_id,
            created_at: now,
            expires_at,
        };
        self.sessions().insert_one(&session).await?;
        Ok(token)
    }

    /// Resolves a bearer token to its user. Expired or unknown tokens yield
    /// None; expiry is checked lazily like the OTP window.
    pub async fn validate(&self, token: &str) -> Result<Option<User>> {
        let session = match self.sessions().find_one(doc! { "token": token }).await? {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired(DateTime::now()) {
            return Ok(None);
        }

        let users: Collection<User> = self.db.collection("users");
        Ok(users.find_one(doc! { "_id": session.user_id }).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_sixty_four_hex_chars() {
        let token = SessionService::generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        assert_ne!(
            SessionService::generate_token(),
            SessionService::generate_token()
        );
    }
}
