use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    Client, Collection, Database,
};
use rand::Rng;

use crate::errors::{AppError, Result};
use crate::models::earning::Earning;
use crate::models::referral::{Referral, REFERRAL_BONUS, REFERRAL_COMMISSION};
use crate::models::user::User;

#[derive(Clone)]
pub struct ReferralService {
    client: Client,
    db: Database,
    base_url: String,
}

impl ReferralService {
    pub fn new(client: Client, db: Database, base_url: String) -> Self {
        Self {
            client,
            db,
            base_url,
        }
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    // 8-char uppercase hex referral code
    pub fn generate_code() -> String {
        let mut rng = rand::thread_rng();
        (0..4)
            .map(|_| format!("{:02X}", rng.gen::<u8>()))
            .collect()
    }

    pub fn referral_link(&self, code: &str) -> String {
        format!("{}/{}", self.base_url, code)
    }

    /// Assigns a fresh unique code to the user, overwriting any existing one.
    pub async fn assign_referral_code(&self, user_id: ObjectId) -> Result<User> {
        let users = self.users();

        // The unique index is the final arbiter; the lookup keeps collisions
        // from surfacing as 500s in the common case.
        let mut code = Self::generate_code();
        for _ in 0..5 {
            let taken = users
                .find_one(doc! { "referral_code": &code, "_id": { "$ne": user_id } })
                .await?;
            if taken.is_none() {
                break;
            }
            code = Self::generate_code();
        }

        users
            .update_one(
                doc! { "_id": user_id },
                doc! { "$set": { "referral_code": &code, "updated_at": DateTime::now() } },
            )
            .await?;

        users
            .find_one(doc! { "_id": user_id })
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// Resolves a referral code to its owning user.
    pub async fn resolve_referrer(&self, code: &str) -> Result<Option<User>> {
        Ok(self.users().find_one(doc! { "referral_code": code }).await?)
    }

    /// Records a successful referred registration: one Referral edge plus one
    /// Earning for the referrer, committed in a single transaction so a
    /// failure cannot leave an orphaned edge.
    pub async fn record_referral(
        &self,
        referrer_id: ObjectId,
        referred_id: ObjectId,
        referred_name: &str,
    ) -> Result<Referral> {
        if referrer_id == referred_id {
            return Err(AppError::invalid_data("Users cannot refer themselves"));
        }

        let referrals: Collection<Referral> = self.db.collection("referrals");
        let earnings: Collection<Earning> = self.db.collection("earnings");

        let mut referral = Referral::new(referrer_id, referred_id);
        let earning = Earning::referral_bonus(
            referrer_id,
            REFERRAL_COMMISSION + REFERRAL_BONUS,
            referred_name,
        );

        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        let outcome = async {
            let inserted = referrals
                .insert_one(&referral)
                .session(&mut session)
                .await?;
            earnings.insert_one(&earning).session(&mut session).await?;
            Ok::<_, AppError>(inserted.inserted_id.as_object_id())
        }
        .await;

        match outcome {
            Ok(referral_id) => {
                session.commit_transaction().await?;
                referral.id = referral_id;
                Ok(referral)
            }
            Err(e) => {
                session.abort_transaction().await.ok();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_code_is_eight_uppercase_hex_chars() {
        for _ in 0..100 {
            let code = ReferralService::generate_code();
            assert_eq!(code.len(), 8);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        }
    }
}
