use axum::{extract::State, response::Json};
use mongodb::{bson::doc, Collection};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::models::otp::OtpPurpose;
use crate::models::user::{User, UserResponse, UserStatus};
use crate::services::otp_service::UserKey;
use crate::state::AppState;

// Request DTOs
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitRegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub referral_code: Option<String>,
}

// Required fields stay Option so a missing field answers 400, not a
// deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub otp_code: Option<String>,
    pub referral_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "type")]
    pub otp_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub otp_code: Option<String>,
    #[serde(rename = "type")]
    pub otp_type: Option<String>,
}

// Response DTOs
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRegisterResponse {
    pub success: bool,
    pub message: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
    pub session_token: String,
}

fn validated<T: Validate>(req: &T) -> Result<()> {
    req.validate()
        .map_err(|e| AppError::invalid_data(format!("Validation error: {}", e)))
}

// 1. Issue a registration OTP, creating the pending user
pub async fn init_register(
    State(state): State<AppState>,
    Json(req): Json<InitRegisterRequest>,
) -> Result<Json<InitRegisterResponse>> {
    validated(&req)?;
    let key = UserKey::from_parts(req.email, req.phone)?;

    // An unresolvable referral code fails the request before any user or
    // OTP state is created.
    if let Some(code) = &req.referral_code {
        state
            .referral_service
            .resolve_referrer(code)
            .await?
            .ok_or_else(|| AppError::invalid_data("Invalid referral code"))?;
    }

    let issued = state.otp_service.issue(&key, OtpPurpose::Registration).await?;

    Ok(Json(InitRegisterResponse {
        success: true,
        message: "OTP sent for registration verification".to_string(),
        user_id: issued.user_id.to_hex(),
        otp: state.config.expose_otp.then_some(issued.code),
    }))
}

// 2. Complete registration with the submitted code
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    let key = UserKey::from_parts(req.email, req.phone)?;
    let name = req
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::invalid_data("Name is required"))?;
    let otp_code = req
        .otp_code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::invalid_data("OTP code is required"))?;

    // Resolve the referrer before consuming the OTP so a bad code cannot
    // burn a valid verification.
    let referrer = match &req.referral_code {
        Some(code) => Some(
            state
                .referral_service
                .resolve_referrer(code)
                .await?
                .ok_or_else(|| AppError::invalid_data("Invalid referral code"))?,
        ),
        None => None,
    };

    let mut user = state
        .otp_service
        .verify(&key, &otp_code, OtpPurpose::Registration)
        .await?;
    let user_id = user
        .id
        .ok_or_else(|| AppError::service("User document missing _id"))?;

    let referrer_id = match &referrer {
        Some(referrer) => {
            let referrer_id = referrer
                .id
                .ok_or_else(|| AppError::service("Referrer document missing _id"))?;
            if referrer_id == user_id {
                return Err(AppError::invalid_data("Users cannot refer themselves"));
            }
            Some(referrer_id)
        }
        None => None,
    };

    let users: Collection<User> = state.db.collection("users");
    let mut update = doc! {
        "name": &name,
        "status": "ACTIVE",
        "updated_at": mongodb::bson::DateTime::now(),
    };
    if let Some(referrer_id) = referrer_id {
        update.insert("referrer_id", referrer_id);
    }
    users
        .update_one(doc! { "_id": user_id }, doc! { "$set": update })
        .await?;

    if let Some(referrer_id) = referrer_id {
        state
            .referral_service
            .record_referral(referrer_id, user_id, &name)
            .await?;
    }

    let session_token = state.session_service.create(user_id).await?;

    user.name = Some(name);
    user.status = UserStatus::Active;
    user.referrer_id = referrer_id;

    Ok(Json(AuthResponse {
        success: true,
        message: "Registration successful!".to_string(),
        user: user.into(),
        session_token,
    }))
}

// 3. Issue a login / admin-login OTP
pub async fn send_otp(
    State(state): State<AppState>,
    Json(req): Json<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>> {
    let key = UserKey::from_parts(req.email, req.phone)?;
    let purpose = req
        .otp_type
        .as_deref()
        .and_then(OtpPurpose::parse)
        .ok_or_else(|| AppError::invalid_data("Invalid OTP type"))?;

    let issued = state.otp_service.issue(&key, purpose).await?;

    Ok(Json(SendOtpResponse {
        success: true,
        message: "OTP sent".to_string(),
        otp: state.config.expose_otp.then_some(issued.code),
    }))
}

// 4. Verify a login / admin-login OTP
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>> {
    let key = UserKey::from_parts(req.email, req.phone)?;
    let otp_code = req
        .otp_code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::invalid_data("OTP code is required"))?;
    let purpose = req
        .otp_type
        .as_deref()
        .and_then(OtpPurpose::parse)
        .ok_or_else(|| AppError::invalid_data("Invalid OTP type"))?;

    let user = state.otp_service.verify(&key, &otp_code, purpose).await?;
    let user_id = user
        .id
        .ok_or_else(|| AppError::service("User document missing _id"))?;
    let session_token = state.session_service.create(user_id).await?;

    Ok(Json(AuthResponse {
        success: true,
        message: "OTP verified successfully".to_string(),
        user: user.into(),
        session_token,
    }))
}
