use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::{
    CreatePrivacyMaskRequest, PrivacyMaskRepo, UpdatePrivacyMaskRequest, User, UserPrivacyMask,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath};
use super::validation::check_coordinates;

fn check_radius(errors: &mut ValidationErrorBuilder, radius_m: Option<i64>) {
    if let Some(r) = radius_m {
        if r <= 0 {
            errors.add("radius_m", "Radius must be greater than 0");
        }
    }
}

fn mask_not_found() -> ApiError {
    ApiError::not_found("Privacy mask not found")
}

pub async fn list_masks(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<UserPrivacyMask>>, ApiError> {
    Ok(Json(PrivacyMaskRepo::list_for_user(&state.db, user.id).await?))
}

pub async fn create_mask(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<CreatePrivacyMaskRequest>,
) -> Result<(StatusCode, Json<UserPrivacyMask>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    check_coordinates(&mut errors, "center_lat", Some(req.center_lat), "center_lng", Some(req.center_lng));
    check_radius(&mut errors, Some(req.radius_m));
    errors.finish()?;

    let mask = PrivacyMaskRepo::create(&state.db, user.id, &req).await?;
    tracing::info!(mask_id = mask.id, user_id = user.id, radius_m = mask.radius_m, "Created privacy mask");

    Ok((StatusCode::CREATED, Json(mask)))
}

pub async fn get_mask(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UserPrivacyMask>, ApiError> {
    PrivacyMaskRepo::find_owned(&state.db, id, user.id)
        .await?
        .map(Json)
        .ok_or_else(mask_not_found)
}

pub async fn update_mask(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdatePrivacyMaskRequest>,
) -> Result<Json<UserPrivacyMask>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    check_coordinates(&mut errors, "center_lat", req.center_lat, "center_lng", req.center_lng);
    check_radius(&mut errors, req.radius_m);
    errors.finish()?;

    PrivacyMaskRepo::update(&state.db, id, user.id, &req)
        .await?
        .map(Json)
        .ok_or_else(mask_not_found)
}

pub async fn delete_mask(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    if !PrivacyMaskRepo::delete(&state.db, id, user.id).await? {
        return Err(mask_not_found());
    }
    tracing::info!(mask_id = id, user_id = user.id, "Deleted privacy mask");
    Ok(StatusCode::NO_CONTENT)
}
