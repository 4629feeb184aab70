pub mod analytics;
pub mod notify_service;
pub mod otp_service;
pub mod referral_service;
pub mod session_service;
