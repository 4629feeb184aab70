pub mod auth;
pub mod referral;
