use std::sync::Arc;

use mongodb::{Client, Database};

use crate::config::AppConfig;
use crate::services::notify_service::NotifyService;
use crate::services::otp_service::OtpService;
use crate::services::referral_service::ReferralService;
use crate::services::session_service::SessionService;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub otp_service: OtpService,
    pub referral_service: ReferralService,
    pub session_service: SessionService,
}

impl AppState {
    pub fn new(client: Client, db: Database, config: AppConfig) -> Self {
        let config = Arc::new(config);
        let notify_service = NotifyService::new();
        let otp_service = OtpService::new(db.clone(), notify_service);
        let referral_service =
            ReferralService::new(client, db.clone(), config.referral_base_url.clone());
        let session_service = SessionService::new(db.clone(), config.session_ttl_days);

        AppState {
            db,
            config,
            otp_service,
            referral_service,
            session_service,
        }
    }
}
