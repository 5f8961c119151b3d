/// Recipe image upload
///
/// # Endpoint
///
/// ```text
/// POST /recipe/recipes/:id/image
/// Content-Type: multipart/form-data
///
/// image=<file>
/// ```
///
/// # Response
///
/// ```json
/// { "id": 1, "image": "/media/uploads/recipe/<uuid>.jpg" }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Multipart, Path, State},
    Extension, Json,
};
use bytes::Bytes;
use recipe_shared::{auth::middleware::AuthContext, media::MediaStore, models::recipe::Recipe};
use serde::{Deserialize, Serialize};

/// Multipart field carrying the file
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub id: i64,
    pub image: String,
}

/// Attaches an image to one of the caller's recipes
///
/// The file is validated and written before the recipe row is touched, so a
/// rejected upload leaves the recipe as it was. A replaced image's file is
/// removed.
///
/// # Errors
///
/// - `400 Bad Request`: no `image` field, or the payload is not an image
/// - `404 Not Found`: no such recipe owned by the caller
/// - `413 Payload Too Large`: file over the configured limit
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<Json<ImageResponse>> {
    if Recipe::find(&state.db, auth.user_id, id).await?.is_none() {
        return Err(ApiError::not_found());
    }

    let (filename, data) = read_image_field(&mut multipart).await?;

    let stored = state
        .media
        .save_recipe_image(filename.as_deref(), &data)
        .await?;

    let swap = match Recipe::replace_image(&state.db, auth.user_id, id, &stored).await {
        Ok(Some(swap)) => swap,
        // Recipe vanished or the update failed: don't leave the file behind
        Ok(None) => {
            discard(&state.media, id, &stored).await;
            return Err(ApiError::not_found());
        }
        Err(e) => {
            discard(&state.media, id, &stored).await;
            return Err(e.into());
        }
    };

    // The row already points at the new file; a stale old file is only logged
    if let Some(previous) = swap.previous.as_deref().filter(|p| *p != stored) {
        discard(&state.media, id, previous).await;
    }

    tracing::info!(recipe_id = id, path = %stored, bytes = data.len(), "Stored recipe image");

    Ok(Json(ImageResponse {
        id: swap.recipe.id,
        image: state.media.url(&stored),
    }))
}

/// Removes a stored file, logging instead of failing
pub(crate) async fn discard(media: &MediaStore, recipe_id: i64, path: &str) {
    if let Err(e) = media.remove(path).await {
        tracing::warn!(recipe_id, path, error = %e, "Failed to remove recipe image");
    }
}

/// Returns the file name and contents of the `image` field
async fn read_image_field(multipart: &mut Multipart) -> ApiResult<(Option<String>, Bytes)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let data = field.bytes().await?;

        if data.is_empty() {
            return Err(ApiError::field(IMAGE_FIELD, "The submitted file is empty."));
        }

        return Ok((filename, data));
    }

    Err(ApiError::field(IMAGE_FIELD, "No file was submitted."))
}
