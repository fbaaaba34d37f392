use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::models::{NewPost, Post};
use crate::db::{posts, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{AppJson, CurrentUser};
use crate::state::AppState;
use crate::storage::ImageUpload;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePostResponse {
    pub message: String,
    pub post_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/user/{username}", get(user_posts))
        .route("/{post_id}", put(update_post).delete(delete_post))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// GET /api/posts: every post, newest first
async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    Ok(Json(posts::list_all(&conn)?))
}

/// GET /api/posts/user/{username}
async fn user_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<Vec<Post>>> {
    let conn = state.db.get()?;
    let author = users::find_identity(&conn, &username)?.ok_or_else(AppError::user_not_found)?;
    Ok(Json(posts::list_by_author(&conn, &author.id)?))
}

/// POST /api/posts: multipart `content` plus optional `image` file
async fn create_post(
    State(state): State<AppState>,
    CurrentUser(author): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<Post>> {
    let (content, upload) = read_post_form(multipart?).await?;

    let image = match upload {
        Some(upload) => {
            if !upload.is_image() {
                return Err(AppError::BadRequest("Only image uploads are allowed".into()));
            }
            let url = state.images.put(upload).await?;
            tracing::info!("Uploaded image for {}: {}", author.username, url);
            Some(url)
        }
        None => None,
    };

    // An image uploaded before a failed insert is left orphaned.
    let new_post = NewPost::new(&content, image)?;
    let post = {
        let conn = state.db.get()?;
        posts::create_post(&conn, &author, &new_post, Utc::now())?
    };

    tracing::info!("{} created post {}", author.username, post.id);
    Ok(Json(post))
}

/// PUT /api/posts/{post_id} (owner only); anyone else gets the same 404 as a missing post
async fn update_post(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(post_id): Path<String>,
    AppJson(req): AppJson<UpdatePostRequest>,
) -> AppResult<Json<Post>> {
    tracing::debug!("{} updating post {}", actor.username, post_id);
    let conn = state.db.get()?;
    let post = posts::update_content(&conn, &post_id, &actor, &req.content, Utc::now())?
        .ok_or_else(AppError::post_not_found)?;
    Ok(Json(post))
}

/// DELETE /api/posts/{post_id} (same ownership policy as update)
async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(post_id): Path<String>,
) -> AppResult<Json<DeletePostResponse>> {
    let conn = state.db.get()?;
    let deleted =
        posts::delete_post(&conn, &post_id, &actor)?.ok_or_else(AppError::post_not_found)?;

    tracing::info!("{} deleted post {}", actor.username, deleted.id);
    Ok(Json(DeletePostResponse {
        message: "Post deleted successfully".into(),
        post_id: deleted.id,
    }))
}

fn bad_form(e: MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid form data: {}", e))
}

async fn read_post_form(mut multipart: Multipart) -> AppResult<(String, Option<ImageUpload>)> {
    let mut content = String::new();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("content") => content = field.text().await.map_err(bad_form)?,
            Some("image") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(bad_form)?;
                // Browsers send an empty part when no file was picked.
                if !data.is_empty() {
                    image = Some(ImageUpload {
                        data,
                        file_name,
                        content_type,
                    });
                }
            }
            _ => {}
        }
    }

    Ok((content, image))
}
