use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::{
    CourseMode, CourseTemplateFilter, CourseTemplateRepo, CourseTemplateResponse,
    CreateCourseTemplateRequest, TemplateOwner, UpdateCourseTemplateRequest, User,
};
use crate::AppState;

use super::auth::MaybeUser;
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::validation::{check_spots, validate_max_len, validate_non_negative};

/// List all course modes
pub async fn list_modes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CourseMode>>, ApiError> {
    let modes = CourseTemplateRepo::list_modes(&state.db).await?;
    Ok(Json(modes))
}

/// List the templates the caller can see, optionally filtered
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    ApiQuery(filter): ApiQuery<CourseTemplateFilter>,
) -> Result<Json<Vec<CourseTemplateResponse>>, ApiError> {
    let templates = CourseTemplateRepo::list_visible(&state.db, caller.id(), &filter).await?;
    Ok(Json(templates))
}

pub async fn get_template(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CourseTemplateResponse>, ApiError> {
    let template = CourseTemplateRepo::find_visible(&state.db, id, caller.id())
        .await?
        .ok_or_else(|| ApiError::not_found("Course template not found"))?;

    Ok(Json(CourseTemplateRepo::load_response(&state.db, template).await?))
}

/// Resolve mode codes to ids, failing with the list of unknown codes
async fn resolve_mode_ids(state: &AppState, codes: &[String]) -> Result<Vec<i64>, ApiError> {
    let (modes, missing) = CourseTemplateRepo::resolve_modes(&state.db, codes).await?;
    if !missing.is_empty() {
        return Err(ApiError::validation_field(
            "mode_codes",
            format!("Unknown mode codes: {}", missing.join(", ")),
        ));
    }
    Ok(modes.into_iter().map(|m| m.id).collect())
}

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<CreateCourseTemplateRequest>,
) -> Result<(StatusCode, Json<CourseTemplateResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_max_len(&req.title, 100, "Title") {
        errors.add("title", e);
    }
    if let Err(e) = validate_non_negative(req.default_distance_m, "Distance") {
        errors.add("default_distance_m", e);
    }
    if let Err(e) = validate_non_negative(req.default_duration_min, "Duration") {
        errors.add("default_duration_min", e);
    }
    check_spots(&mut errors, &req.spots);
    errors.finish()?;

    // Nothing is written when a mode code is unknown
    let mode_ids = resolve_mode_ids(&state, &req.mode_codes).await?;

    let template =
        CourseTemplateRepo::create(&state.db, TemplateOwner::User(user.id), &req, &mode_ids)
            .await?;

    tracing::info!(
        template_id = template.id,
        user_id = user.id,
        spots = req.spots.len(),
        "Created course template"
    );

    let response = CourseTemplateRepo::load_response(&state.db, template).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update_template(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateCourseTemplateRequest>,
) -> Result<Json<CourseTemplateResponse>, ApiError> {
    let existing = CourseTemplateRepo::find_visible(&state.db, id, Some(user.id))
        .await?
        .ok_or_else(|| ApiError::not_found("Course template not found"))?;

    if !existing.owner().can_modify(user.id) {
        return Err(ApiError::forbidden(
            "You do not have permission to modify this course template.",
        ));
    }

    let mut errors = ValidationErrorBuilder::new();
    if let Some(ref title) = req.title {
        if let Err(e) = validate_max_len(title, 100, "Title") {
            errors.add("title", e);
        }
    }
    if let Err(e) = validate_non_negative(req.default_distance_m, "Distance") {
        errors.add("default_distance_m", e);
    }
    if let Err(e) = validate_non_negative(req.default_duration_min, "Duration") {
        errors.add("default_duration_min", e);
    }
    if let Some(ref spots) = req.spots {
        check_spots(&mut errors, spots);
    }
    errors.finish()?;

    let mode_ids = match req.mode_codes {
        Some(ref codes) => Some(resolve_mode_ids(&state, codes).await?),
        None => None,
    };

    let template = CourseTemplateRepo::update(&state.db, id, &req, mode_ids.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("Course template not found"))?;

    tracing::info!(template_id = id, user_id = user.id, "Updated course template");

    Ok(Json(CourseTemplateRepo::load_response(&state.db, template).await?))
}

pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let existing = CourseTemplateRepo::find_visible(&state.db, id, Some(user.id))
        .await?
        .ok_or_else(|| ApiError::not_found("Course template not found"))?;

    if !existing.owner().can_modify(user.id) {
        return Err(ApiError::forbidden(
            "You do not have permission to delete this course template.",
        ));
    }

    if !CourseTemplateRepo::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Course template not found"));
    }

    tracing::info!(template_id = id, user_id = user.id, "Deleted course template");
    Ok(StatusCode::NO_CONTENT)
}
