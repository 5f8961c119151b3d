/// Tag and ingredient endpoints
///
/// One set of handlers serves both `/recipe/tags` and `/recipe/ingredients`.
/// The router layers an `Extension<AttributeKind>` on each nest and every
/// handler passes it straight to the model.
///
/// # Endpoints
///
/// - `GET /recipe/{tags,ingredients}` - List own, `?assigned_only=1` for used ones
/// - `POST /recipe/{tags,ingredients}` - Create
/// - `PATCH /recipe/{tags,ingredients}/:id` - Rename
/// - `DELETE /recipe/{tags,ingredients}/:id` - Delete

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{trimmed, ApiJson, ApiQuery},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use recipe_shared::{
    auth::middleware::AuthContext,
    models::attribute::{Attribute, AttributeKind},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Create/rename request
#[derive(Debug, Deserialize, Validate)]
pub struct AttributeRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Ensure this field is between 1 and 255 characters."
    ))]
    pub name: String,
}

/// List query
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub assigned_only: Option<String>,
}

impl ListQuery {
    /// Accepts `0`/`1`; absent means `0`
    pub fn assigned_only(&self) -> ApiResult<bool> {
        match self.assigned_only.as_deref().map(str::trim) {
            None | Some("0") => Ok(false),
            Some("1") => Ok(true),
            Some(_) => Err(ApiError::field(
                "assigned_only",
                "Must be 0 or 1.",
            )),
        }
    }
}

/// Tag or ingredient as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeResponse {
    pub id: i64,
    pub name: String,
}

impl From<Attribute> for AttributeResponse {
    fn from(attribute: Attribute) -> Self {
        Self {
            id: attribute.id,
            name: attribute.name,
        }
    }
}

/// Lists the caller's tags or ingredients, name descending
pub async fn list_attributes(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<AttributeResponse>>> {
    let assigned_only = query.assigned_only()?;

    let items = Attribute::list(&state.db, kind, auth.user_id, assigned_only).await?;

    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// Creates a tag or ingredient owned by the caller
pub async fn create_attribute(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<AttributeRequest>,
) -> ApiResult<(StatusCode, Json<AttributeResponse>)> {
    req.validate()?;

    let attribute = Attribute::create(&state.db, kind, auth.user_id, &req.name).await?;

    tracing::info!(%kind, id = attribute.id, user_id = auth.user_id, "Created attribute");

    Ok((StatusCode::CREATED, Json(attribute.into())))
}

/// Renames one of the caller's tags or ingredients
///
/// # Errors
///
/// - `400 Bad Request`: blank name
/// - `404 Not Found`: no such record owned by the caller
pub async fn update_attribute(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<AttributeRequest>,
) -> ApiResult<Json<AttributeResponse>> {
    req.validate()?;

    let attribute = Attribute::rename(&state.db, kind, auth.user_id, id, &req.name)
        .await?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(attribute.into()))
}

/// Deletes one of the caller's tags or ingredients
///
/// Recipes that used it lose the link; the recipes themselves stay.
pub async fn delete_attribute(
    State(state): State<AppState>,
    Extension(kind): Extension<AttributeKind>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !Attribute::delete(&state.db, kind, auth.user_id, id).await? {
        return Err(ApiError::not_found());
    }

    tracing::info!(%kind, id, user_id = auth.user_id, "Deleted attribute");

    Ok(StatusCode::NO_CONTENT)
}
