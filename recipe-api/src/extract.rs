/// Extractors whose rejections render as [`ApiError`]
///
/// Axum's own `Json` and `Query` reject with plain-text bodies and, for
/// JSON, a 422 status. These wrappers route the rejection through
/// `ApiError` so malformed input gets the usual 400 JSON error body.

use axum::extract::{FromRequest, FromRequestParts};
use serde::{Deserialize, Deserializer};

use crate::error::ApiError;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Deserializes a string with surrounding whitespace removed
///
/// Use with `#[serde(default, deserialize_with = ...)]` so a blank-only
/// value reaches validation as an empty string.
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

/// [`trimmed`] for optional fields
pub fn trimmed_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|s| s.map(|s| s.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode, response::IntoResponse};

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let rejection = ApiJson::<Payload>::from_request(req, &()).await.unwrap_err();
        assert_eq!(rejection.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[derive(Debug, Deserialize)]
    struct Named {
        #[serde(default, deserialize_with = "trimmed")]
        name: String,
        #[serde(default, deserialize_with = "trimmed_opt")]
        nickname: Option<String>,
    }

    #[test]
    fn test_trimmed_fields() {
        let named: Named =
            serde_json::from_str(r#"{"name": "  Vegan ", "nickname": "\t v \n"}"#).unwrap();
        assert_eq!(named.name, "Vegan");
        assert_eq!(named.nickname.as_deref(), Some("v"));

        let named: Named = serde_json::from_str(r#"{"name": "   "}"#).unwrap();
        assert_eq!(named.name, "");
        assert_eq!(named.nickname, None);

        let named: Named = serde_json::from_str("{}").unwrap();
        assert_eq!(named.name, "");
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let rejection = ApiJson::<Payload>::from_request(req, &()).await.unwrap_err();
        assert_eq!(rejection.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
