//! Privacy mask models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserPrivacyMask {
    pub id: i64,
    #[serde(rename = "user")]
    pub user_id: i64,
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius_m: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePrivacyMaskRequest {
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius_m: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePrivacyMaskRequest {
    pub center_lat: Option<f64>,
    pub center_lng: Option<f64>,
    pub radius_m: Option<i64>,
}
