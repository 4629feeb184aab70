use std::collections::HashMap;

use axum::{extract::State, response::Json, Extension};
use bcrypt::{hash, DEFAULT_COST};
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    Collection,
};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::earning::{Earning, EarningResponse};
use crate::models::referral::{Referral, ReferralResponse, ReferralStatus, ReferredSummary};
use crate::models::rfc3339;
use crate::models::user::{Capability, Role, User, UserResponse, UserStatus};
use crate::services::analytics::{
    self, EarningTotals, MonthlyBucket, Overview, ReferralCounts, StatusStat,
};
use crate::state::AppState;

// Request DTOs. Required fields stay Option so a missing field answers 400.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralRegisterRequest {
    pub referral_code: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub referral_id: Option<String>,
    pub status: Option<String>,
}

// Response DTOs
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodeResponse {
    pub success: bool,
    pub user: UserResponse,
    pub referral_link: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralRegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBlock {
    pub referrals: ReferralCounts,
    pub earnings: EarningTotals,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub success: bool,
    pub stats: StatsBlock,
    pub referrals: Vec<ReferralResponse>,
    pub earnings: Vec<EarningResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsBlock {
    pub overview: Overview,
    pub monthly_data: Vec<MonthlyBucket>,
    pub status_stats: Vec<StatusStat>,
    pub top_referrals: Vec<ReferralResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub success: bool,
    pub analytics: AnalyticsBlock,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub referral: ReferralResponse,
}

// Generate (or regenerate) the acting user's referral code
pub async fn generate_code(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<GenerateCodeResponse>> {
    let user_id = user
        .id
        .ok_or_else(|| AppError::service("User document missing _id"))?;

    let updated = state.referral_service.assign_referral_code(user_id).await?;
    let code = updated
        .referral_code
        .clone()
        .ok_or_else(|| AppError::service("Referral code missing after assignment"))?;
    let referral_link = state.referral_service.referral_link(&code);

    Ok(Json(GenerateCodeResponse {
        success: true,
        user: updated.into(),
        referral_link,
    }))
}

// Direct registration through a referral code, bypassing the OTP flow
pub async fn register_via_code(
    State(state): State<AppState>,
    Json(req): Json<ReferralRegisterRequest>,
) -> Result<Json<ReferralRegisterResponse>> {
    let (referral_code, email, name, password) =
        match (req.referral_code, req.email, req.name, req.password) {
            (Some(rc), Some(e), Some(n), Some(p))
                if !rc.is_empty() && !e.is_empty() && !n.is_empty() && !p.is_empty() =>
            {
                (rc, e, n, p)
            }
            _ => return Err(AppError::invalid_data("Missing required fields")),
        };

    if password.len() < 6 {
        return Err(AppError::invalid_data(
            "Password must be at least 6 characters",
        ));
    }

    let referrer = state
        .referral_service
        .resolve_referrer(&referral_code)
        .await?
        .ok_or_else(|| AppError::not_found("Referral code"))?;
    let referrer_id = referrer
        .id
        .ok_or_else(|| AppError::service("Referrer document missing _id"))?;

    let users: Collection<User> = state.db.collection("users");
    if users.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(AppError::invalid_data(
            "User with this email already exists",
        ));
    }

    let password_hash = hash(&password, DEFAULT_COST)?;

    let now = DateTime::now();
    let new_user = User {
        id: None,
        email: Some(email),
        phone: None,
        name: Some(name.clone()),
        role: Role::Member,
        status: UserStatus::Active,
        is_verified: false,
        password_hash: Some(password_hash),
        referral_code: None,
        referrer_id: Some(referrer_id),
        active_otp: None,
        created_at: now,
        updated_at: now,
    };

    let inserted = users.insert_one(&new_user).await?;
    let new_user_id = inserted
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::service("Insert did not return an ObjectId"))?;

    state
        .referral_service
        .record_referral(referrer_id, new_user_id, &name)
        .await?;

    let mut user = new_user;
    user.id = Some(new_user_id);

    Ok(Json(ReferralRegisterResponse {
        success: true,
        message: "Registration successful! Welcome aboard.".to_string(),
        user: user.into(),
    }))
}

// Referral stats for the acting user
pub async fn stats(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<StatsResponse>> {
    let user_id = user
        .id
        .ok_or_else(|| AppError::service("User document missing _id"))?;

    let referrals = fetch_referrals(&state, user_id).await?;
    let earnings_coll: Collection<Earning> = state.db.collection("earnings");
    let earnings: Vec<Earning> = earnings_coll
        .find(doc! { "user_id": user_id })
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    let referred = load_referred_summaries(&state, &referrals).await?;

    Ok(Json(StatsResponse {
        success: true,
        stats: StatsBlock {
            referrals: analytics::referral_counts(&referrals),
            earnings: analytics::earning_totals(&earnings),
        },
        referrals: referrals
            .iter()
            .map(|r| ReferralResponse::from_referral(r, referred.get(&r.referred_id).cloned()))
            .collect(),
        earnings: earnings.into_iter().map(EarningResponse::from).collect(),
    }))
}

// Detailed analytics for the acting user
pub async fn analytics_report(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<AnalyticsResponse>> {
    let user_id = user
        .id
        .ok_or_else(|| AppError::service("User document missing _id"))?;

    let referrals = fetch_referrals(&state, user_id).await?;
    let referred = load_referred_summaries(&state, &referrals).await?;

    let top_referrals = analytics::top_referrals(&referrals)
        .into_iter()
        .map(|r| ReferralResponse::from_referral(r, referred.get(&r.referred_id).cloned()))
        .collect();

    Ok(Json(AnalyticsResponse {
        success: true,
        analytics: AnalyticsBlock {
            overview: analytics::overview(&referrals),
            monthly_data: analytics::monthly_buckets(&referrals),
            status_stats: analytics::status_stats(&referrals),
            top_referrals,
        },
    }))
}

// Administrative status update; COMPLETED bulk-approves the referrer's
// pending referral-bonus earnings
pub async fn update_status(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>> {
    if !user.role.allows(Capability::ManageReferrals) {
        return Err(AppError::forbidden("Admin access required"));
    }

    let (raw_id, raw_status) = match (req.referral_id, req.status) {
        (Some(id), Some(status)) if !id.is_empty() && !status.is_empty() => (id, status),
        _ => return Err(AppError::invalid_data("Missing required fields")),
    };

    let referral_id = ObjectId::parse_str(&raw_id)?;
    let status = ReferralStatus::parse(&raw_status)
        .ok_or_else(|| AppError::invalid_data("Invalid referral status"))?;

    let referrals: Collection<Referral> = state.db.collection("referrals");
    let mut referral = referrals
        .find_one(doc! { "_id": referral_id })
        .await?
        .ok_or_else(|| AppError::not_found("Referral"))?;

    let now = DateTime::now();
    referrals
        .update_one(
            doc! { "_id": referral_id },
            doc! { "$set": { "status": status.as_str(), "updated_at": now } },
        )
        .await?;

    if status == ReferralStatus::Completed {
        let earnings: Collection<Earning> = state.db.collection("earnings");
        earnings
            .update_many(
                doc! {
                    "user_id": referral.referrer_id,
                    "earning_type": "REFERRAL_BONUS",
                    "status": "PENDING",
                },
                doc! { "$set": { "status": "APPROVED", "updated_at": now } },
            )
            .await?;
    }

    referral.status = status;
    referral.updated_at = now;

    let referred = load_referred_summaries(&state, std::slice::from_ref(&referral)).await?;

    Ok(Json(UpdateStatusResponse {
        success: true,
        referral: ReferralResponse::from_referral(
            &referral,
            referred.get(&referral.referred_id).cloned(),
        ),
    }))
}

async fn fetch_referrals(state: &AppState, referrer_id: ObjectId) -> Result<Vec<Referral>> {
    let referrals: Collection<Referral> = state.db.collection("referrals");
    Ok(referrals
        .find(doc! { "referrer_id": referrer_id })
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?)
}

async fn load_referred_summaries(
    state: &AppState,
    referrals: &[Referral],
) -> Result<HashMap<ObjectId, ReferredSummary>> {
    if referrals.is_empty() {
        return Ok(HashMap::new());
    }

    let ids: Vec<ObjectId> = referrals.iter().map(|r| r.referred_id).collect();
    let users: Collection<User> = state.db.collection("users");
    let referred: Vec<User> = users
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect()
        .await?;

    Ok(referred
        .into_iter()
        .filter_map(|u| {
            let id = u.id?;
            Some((
                id,
                ReferredSummary {
                    id: id.to_hex(),
                    name: u.name,
                    email: u.email,
                    created_at: rfc3339(u.created_at),
                },
            ))
        })
        .collect())
}
