/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use recipe_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = recipe_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Extension, Router,
};
use recipe_shared::{auth::middleware::authenticate, media::MediaStore, models::attribute::AttributeKind};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Multipart framing on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Uploaded file storage
    pub media: MediaStore,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let media = MediaStore::new(
            config.media.root.clone(),
            &config.media.url,
            config.media.max_upload_bytes,
        );

        Self {
            db,
            config: Arc::new(config),
            media,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                         # Health check (public)
/// ├── /user/
/// │   ├── POST /create                    # Register (public)
/// │   ├── POST /token                     # Log in (public)
/// │   └── GET|PATCH /me                   # Own profile
/// ├── /recipe/
/// │   ├── GET|POST /tags                  # ?assigned_only=1
/// │   ├── PATCH|DELETE /tags/:id
/// │   ├── GET|POST /ingredients           # ?assigned_only=1
/// │   ├── PATCH|DELETE /ingredients/:id
/// │   ├── GET|POST /recipes               # ?tags=1,2&ingredients=3
/// │   ├── GET|PUT|PATCH|DELETE /recipes/:id
/// │   └── POST /recipes/:id/image         # multipart field `image`
/// └── GET /media/...                      # Stored files
/// ```
///
/// Everything under `/recipe` and `/user/me` requires a token.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_user_routes = Router::new()
        .route("/create", post(routes::user::create_user))
        .route("/token", post(routes::user::create_token));

    let me_routes = Router::new()
        .route(
            "/me",
            get(routes::user::get_me).patch(routes::user::update_me),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            token_auth_layer,
        ));

    let user_routes = public_user_routes.merge(me_routes);

    let recipe_routes = Router::new()
        .nest("/tags", attribute_routes(AttributeKind::Tag))
        .nest("/ingredients", attribute_routes(AttributeKind::Ingredient))
        .route(
            "/recipes",
            get(routes::recipes::list_recipes).post(routes::recipes::create_recipe),
        )
        .route(
            "/recipes/:id",
            get(routes::recipes::get_recipe)
                .put(routes::recipes::replace_recipe)
                .patch(routes::recipes::update_recipe)
                .delete(routes::recipes::delete_recipe),
        )
        .route(
            "/recipes/:id/image",
            post(routes::images::upload_image).layer(DefaultBodyLimit::max(
                state.config.media.max_upload_bytes + MULTIPART_OVERHEAD_BYTES,
            )),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            token_auth_layer,
        ));

    let media_routes = Router::new().nest_service(
        &state.config.media_route(),
        ServeDir::new(&state.config.media.root),
    );

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/user", user_routes)
        .nest("/recipe", recipe_routes)
        .merge(media_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Tag or ingredient routes; the kind reaches handlers as an extension
fn attribute_routes(kind: AttributeKind) -> Router<AppState> {
    use crate::routes::attributes;

    Router::new()
        .route(
            "/",
            get(attributes::list_attributes).post(attributes::create_attribute),
        )
        .route(
            "/:id",
            patch(attributes::update_attribute).delete(attributes::delete_attribute),
        )
        .layer(Extension(kind))
}

/// Token authentication middleware layer
///
/// Resolves the `Authorization` header to a user, then injects
/// `AuthContext` into request extensions.
async fn token_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(&state.db, req.headers()).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
