/// User endpoints
///
/// - `POST /user/create` - Register
/// - `POST /user/token` - Exchange email + password for a token
/// - `GET /user/me` - Own profile
/// - `PATCH /user/me` - Update own name, email or password

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
    extract::{trimmed, trimmed_opt, ApiJson},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use recipe_shared::{
    auth::{middleware::AuthContext, password},
    models::{
        auth_token::AuthToken,
        user::{self, UpdateUser, User, UserExtra},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    pub email: String,

    /// Checked against the minimum length separately
    #[serde(default)]
    pub password: String,

    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Ensure this field is between 1 and 255 characters."
    ))]
    pub name: String,
}

/// Public view of a user; never carries the password
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
        }
    }
}

/// Token request
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Profile update request; absent fields are left alone
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    pub email: Option<String>,

    pub password: Option<String>,

    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Ensure this field is between 1 and 255 characters."
    ))]
    pub name: Option<String>,
}

/// Runs derive validation plus the password length rule
fn check<T: Validate>(req: &T, new_password: Option<&str>) -> ApiResult<()> {
    let mut errors = req.validate().err().map(validation_details).unwrap_or_default();

    if let Some(Err(message)) = new_password.map(password::validate_password_length) {
        errors.push(ValidationErrorDetail::new("password", message));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationError(errors))
    }
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /user/create
/// Content-Type: application/json
///
/// { "email": "kamil@gmail.com", "password": "kamilsiler", "name": "kamil" }
/// ```
///
/// # Response
///
/// `201 Created` with `{ "email": "kamil@gmail.com", "name": "kamil" }`
///
/// # Errors
///
/// - `400 Bad Request`: validation failed or the email is taken
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    check(&req, Some(req.password.as_str()))?;

    let user = user::create_user(
        &state.db,
        &req.email,
        &req.password,
        UserExtra {
            name: req.name,
            ..Default::default()
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Log in
///
/// Issues a fresh token on every success; earlier tokens stay valid.
///
/// # Errors
///
/// - `400 Bad Request`: missing fields, or the credentials do not match an
///   active account. The message does not say which part was wrong.
pub async fn create_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;

    let user = user::authenticate(&state.db, &req.email, &req.password)
        .await?
        .ok_or_else(|| ApiError::BadRequest(BAD_CREDENTIALS.to_string()))?;

    let (_, token) = AuthToken::issue(&state.db, user.id).await?;
    User::update_last_login(&state.db, user.id).await?;

    tracing::info!(user_id = user.id, "Issued auth token");

    Ok(Json(TokenResponse { token }))
}

/// Own profile
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(user.into()))
}

/// Partially update own profile
///
/// A new password is hashed before storage; a new email is normalized and
/// must not belong to another account.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<UpdateMeRequest>,
) -> ApiResult<Json<UserResponse>> {
    check(&req, req.password.as_deref())?;

    let password_hash = req
        .password
        .as_deref()
        .map(password::hash_password)
        .transpose()?;

    let user = User::update(
        &state.db,
        auth.user_id,
        UpdateUser {
            email: req.email,
            password_hash,
            name: req.name,
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(ApiError::not_found)?;

    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(result: ApiResult<()>) -> Vec<ValidationErrorDetail> {
        match result {
            Err(ApiError::ValidationError(details)) => details,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_request_valid() {
        let req = CreateUserRequest {
            email: "kamil@gmail.com".to_string(),
            password: "kamilsiler".to_string(),
            name: "kamil".to_string(),
        };
        assert!(check(&req, Some(req.password.as_str())).is_ok());
    }

    #[test]
    fn test_create_request_short_password() {
        let req = CreateUserRequest {
            email: "kamil@gmail.com".to_string(),
            password: "pw".to_string(),
            name: "kamil".to_string(),
        };
        let errors = details(check(&req, Some(req.password.as_str())));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "password");
    }

    #[test]
    fn test_create_request_missing_fields() {
        let req: CreateUserRequest = serde_json::from_str("{}").unwrap();
        let errors = details(check(&req, Some(req.password.as_str())));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();

        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"password"));
    }

    #[test]
    fn test_update_request_absent_fields_pass() {
        let req: UpdateMeRequest = serde_json::from_str("{}").unwrap();
        assert!(check(&req, req.password.as_deref()).is_ok());

        let req: UpdateMeRequest = serde_json::from_str(r#"{"email": "nope"}"#).unwrap();
        assert_eq!(details(check(&req, req.password.as_deref()))[0].field, "email");
    }

    #[test]
    fn test_whitespace_only_name_rejected() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"email": "kamil@gmail.com", "password": "kamilsiler", "name": "  "}"#,
        )
        .unwrap();
        let errors = details(check(&req, Some(req.password.as_str())));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "name");

        let req: UpdateMeRequest = serde_json::from_str(r#"{"name": "\t"}"#).unwrap();
        assert_eq!(details(check(&req, req.password.as_deref()))[0].field, "name");
    }

    #[test]
    fn test_user_response_has_no_password() {
        let json = serde_json::to_value(UserResponse {
            email: "kamil@gmail.com".to_string(),
            name: "kamil".to_string(),
        })
        .unwrap();
        assert!(json.get("password").is_none());
    }
}
