/// Recipe endpoints
///
/// # Endpoints
///
/// - `GET /recipe/recipes` - List own, newest first, `?tags=1,2&ingredients=3`
/// - `POST /recipe/recipes` - Create
/// - `GET /recipe/recipes/:id` - Detail with tags/ingredients expanded
/// - `PUT /recipe/recipes/:id` - Full update; omitted relations are cleared
/// - `PATCH /recipe/recipes/:id` - Partial update
/// - `DELETE /recipe/recipes/:id` - Delete, removing the stored image
///
/// Write endpoints answer with the list representation (relation ids);
/// only the detail endpoint expands relations.

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
    extract::{trimmed_opt, ApiJson, ApiQuery},
    routes::images::discard,
    routes::attributes::AttributeResponse,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use recipe_shared::{
    auth::middleware::AuthContext,
    media::MediaStore,
    models::{
        attribute::{Attribute, AttributeKind},
        recipe::{CreateRecipe, Recipe, RecipeDetail, RecipeFilter, RecipeSummary, UpdateRecipe},
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

const REQUIRED: &str = "This field is required.";

/// Largest value NUMERIC(5, 2) holds
const MAX_PRICE: Decimal = Decimal::from_parts(99999, 0, 0, false, 2);

/// Recipe write request
///
/// Which fields are required depends on the method; see [`WriteMode`].
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RecipeRequest {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Ensure this field is between 1 and 255 characters."
    ))]
    pub title: Option<String>,

    /// Decimal string or number
    pub price: Option<Decimal>,

    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub time_minutes: Option<i32>,

    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub link: Option<String>,

    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

/// How a write request treats absent fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// POST and PUT: title, price and time_minutes are required
    Full,
    /// PATCH: everything optional
    Partial,
}

/// List query
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    /// Comma-separated tag ids
    pub tags: Option<String>,
    /// Comma-separated ingredient ids
    pub ingredients: Option<String>,
}

impl RecipeListQuery {
    pub fn filter(&self) -> ApiResult<RecipeFilter> {
        Ok(RecipeFilter {
            tag_ids: parse_ids("tags", self.tags.as_deref())?,
            ingredient_ids: parse_ids("ingredients", self.ingredients.as_deref())?,
        })
    }
}

/// Parses `1,2,3`; blank means no filter
fn parse_ids(field: &str, raw: Option<&str>) -> ApiResult<Option<Vec<i64>>> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };

    raw.split(',')
        .map(|part| {
            part.trim().parse::<i64>().map_err(|_| {
                ApiError::field(field, format!("\"{}\" is not a valid id.", part.trim()))
            })
        })
        .collect::<ApiResult<Vec<i64>>>()
        .map(Some)
}

/// Recipe in lists and write responses
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub title: String,
    pub price: Decimal,
    pub time_minutes: i32,
    pub link: String,
    pub tags: Vec<i64>,
    pub ingredients: Vec<i64>,
    pub image: Option<String>,
}

impl RecipeResponse {
    fn new(summary: RecipeSummary, media: &MediaStore) -> Self {
        let RecipeSummary {
            recipe,
            tag_ids,
            ingredient_ids,
        } = summary;

        Self {
            id: recipe.id,
            image: recipe.image.as_deref().map(|path| media.url(path)),
            title: recipe.title,
            price: recipe.price,
            time_minutes: recipe.time_minutes,
            link: recipe.link,
            tags: tag_ids,
            ingredients: ingredient_ids,
        }
    }
}

/// Recipe detail with nested tags and ingredients
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeDetailResponse {
    pub id: i64,
    pub title: String,
    pub price: Decimal,
    pub time_minutes: i32,
    pub link: String,
    pub tags: Vec<AttributeResponse>,
    pub ingredients: Vec<AttributeResponse>,
    pub image: Option<String>,
}

impl RecipeDetailResponse {
    fn new(detail: RecipeDetail, media: &MediaStore) -> Self {
        let RecipeDetail {
            recipe,
            tags,
            ingredients,
        } = detail;

        Self {
            id: recipe.id,
            image: recipe.image.as_deref().map(|path| media.url(path)),
            title: recipe.title,
            price: recipe.price,
            time_minutes: recipe.time_minutes,
            link: recipe.link,
            tags: tags.into_iter().map(Into::into).collect(),
            ingredients: ingredients.into_iter().map(Into::into).collect(),
        }
    }
}

/// Field checks that need no database
fn check_fields(req: &RecipeRequest, mode: WriteMode) -> Vec<ValidationErrorDetail> {
    let mut errors = req.validate().err().map(validation_details).unwrap_or_default();

    if mode == WriteMode::Full {
        if req.title.is_none() {
            errors.push(ValidationErrorDetail::new("title", REQUIRED));
        }
        if req.price.is_none() {
            errors.push(ValidationErrorDetail::new("price", REQUIRED));
        }
        if req.time_minutes.is_none() {
            errors.push(ValidationErrorDetail::new("time_minutes", REQUIRED));
        }
    }

    if let Some(price) = req.price {
        if let Err(message) = check_price(price) {
            errors.push(ValidationErrorDetail::new("price", message));
        }
    }

    errors
}

/// Price must fit NUMERIC(5, 2) and not be negative
fn check_price(price: Decimal) -> Result<(), &'static str> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err("Ensure this value is greater than or equal to 0.");
    }
    if price.normalize().scale() > 2 {
        return Err("Ensure that there are no more than 2 decimal places.");
    }
    if price > MAX_PRICE {
        return Err("Ensure that there are no more than 5 digits in total.");
    }
    Ok(())
}

/// Every relation id must name one of the owner's records
async fn check_relations(
    db: &PgPool,
    owner_id: i64,
    req: &RecipeRequest,
    errors: &mut Vec<ValidationErrorDetail>,
) -> ApiResult<()> {
    for (kind, ids) in [
        (AttributeKind::Tag, &req.tags),
        (AttributeKind::Ingredient, &req.ingredients),
    ] {
        let Some(ids) = ids else { continue };

        for id in Attribute::missing_ids(db, kind, owner_id, ids).await? {
            errors.push(ValidationErrorDetail::new(
                kind.field(),
                format!("Invalid pk \"{}\" - object does not exist.", id),
            ));
        }
    }

    Ok(())
}

/// Validates a write request against `mode` and the owner's records
async fn validate_request(
    db: &PgPool,
    owner_id: i64,
    req: &RecipeRequest,
    mode: WriteMode,
) -> ApiResult<()> {
    let mut errors = check_fields(req, mode);
    check_relations(db, owner_id, req, &mut errors).await?;

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationError(errors))
    }
}

/// Lists the caller's recipes, newest first
///
/// `?tags=1,2` keeps recipes with any of those tags; `?ingredients=3`
/// likewise. Both together must each match.
pub async fn list_recipes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<RecipeListQuery>,
) -> ApiResult<Json<Vec<RecipeResponse>>> {
    let filter = query.filter()?;

    let recipes = Recipe::list(&state.db, auth.user_id, &filter).await?;

    Ok(Json(
        recipes
            .into_iter()
            .map(|summary| RecipeResponse::new(summary, &state.media))
            .collect(),
    ))
}

/// Creates a recipe owned by the caller
///
/// # Errors
///
/// - `400 Bad Request`: missing or invalid fields, or a tag/ingredient id
///   the caller does not own
pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<RecipeRequest>,
) -> ApiResult<(StatusCode, Json<RecipeResponse>)> {
    validate_request(&state.db, auth.user_id, &req, WriteMode::Full).await?;

    let (Some(title), Some(price), Some(time_minutes)) = (req.title, req.price, req.time_minutes)
    else {
        return Err(ApiError::BadRequest(REQUIRED.to_string()));
    };

    let summary = Recipe::create(
        &state.db,
        auth.user_id,
        CreateRecipe {
            title,
            price,
            time_minutes,
            link: req.link.unwrap_or_default(),
            tag_ids: req.tags.unwrap_or_default(),
            ingredient_ids: req.ingredients.unwrap_or_default(),
        },
    )
    .await?;

    tracing::info!(recipe_id = summary.recipe.id, user_id = auth.user_id, "Created recipe");

    Ok((
        StatusCode::CREATED,
        Json(RecipeResponse::new(summary, &state.media)),
    ))
}

/// One of the caller's recipes with tags and ingredients expanded
pub async fn get_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RecipeDetailResponse>> {
    let detail = Recipe::find_detail(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(RecipeDetailResponse::new(detail, &state.media)))
}

/// Full update
///
/// Title, price and time_minutes are required. Omitted `tags` or
/// `ingredients` detach everything of that kind; omitted `link` resets it.
pub async fn replace_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<RecipeRequest>,
) -> ApiResult<Json<RecipeResponse>> {
    write_recipe(&state, &auth, id, req, WriteMode::Full).await
}

/// Partial update; only supplied fields and relations change
pub async fn update_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<RecipeRequest>,
) -> ApiResult<Json<RecipeResponse>> {
    write_recipe(&state, &auth, id, req, WriteMode::Partial).await
}

async fn write_recipe(
    state: &AppState,
    auth: &AuthContext,
    id: i64,
    req: RecipeRequest,
    mode: WriteMode,
) -> ApiResult<Json<RecipeResponse>> {
    // Unknown recipe wins over payload errors
    if Recipe::find(&state.db, auth.user_id, id).await?.is_none() {
        return Err(ApiError::not_found());
    }

    validate_request(&state.db, auth.user_id, &req, mode).await?;

    let update = match mode {
        WriteMode::Full => UpdateRecipe {
            title: req.title,
            price: req.price,
            time_minutes: req.time_minutes,
            link: Some(req.link.unwrap_or_default()),
            tag_ids: Some(req.tags.unwrap_or_default()),
            ingredient_ids: Some(req.ingredients.unwrap_or_default()),
        },
        WriteMode::Partial => UpdateRecipe {
            title: req.title,
            price: req.price,
            time_minutes: req.time_minutes,
            link: req.link,
            tag_ids: req.tags,
            ingredient_ids: req.ingredients,
        },
    };

    let summary = Recipe::update(&state.db, auth.user_id, id, update)
        .await?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(RecipeResponse::new(summary, &state.media)))
}

/// Deletes one of the caller's recipes and its stored image
pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let recipe = Recipe::delete(&state.db, auth.user_id, id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    // The row is gone either way; a stale file is only logged
    if let Some(image) = recipe.image.as_deref() {
        discard(&state.media, id, image).await;
    }

    tracing::info!(recipe_id = id, user_id = auth.user_id, "Deleted recipe");

    Ok(StatusCode::NO_CONTENT)
}
