/// Mock delivery channel. Real email/SMS providers sit behind this seam; for
/// now codes are written to the server log so they can be read during testing.
#[derive(Clone)]
pub struct NotifyService;

impl NotifyService {
    pub fn new() -> Self {
        NotifyService
    }

    pub fn send_otp(&self, email: Option<&str>, phone: Option<&str>, code: &str) {
        if let Some(email) = email {
            tracing::info!("📧 Sending OTP to email {}: {}", email, code);
        }
        if let Some(phone) = phone {
            tracing::info!("📱 Sending OTP to phone {}: {}", phone, code);
        }
    }
}

impl Default for NotifyService {
    fn default() -> Self {
        Self::new()
    }
}
