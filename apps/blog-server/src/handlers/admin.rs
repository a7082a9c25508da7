//! Staff-only post and comment management.

use actix_web::{HttpResponse, web};
use chrono::NaiveDate;

use quill_core::DomainError;
use quill_core::domain::Post;
use quill_core::forms::{FieldErrors, PostForm};
use quill_shared::ApiResponse;
use quill_shared::dto::ModerateCommentRequest;

use super::context;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const TITLE_NOT_UNIQUE: &str = "Title must be unique for Publish date.";

/// Titles are unique per publish date.
async fn ensure_title_free(
    state: &AppState,
    title: &str,
    date: NaiveDate,
    exclude_id: Option<i64>,
) -> AppResult<()> {
    if state.posts.title_taken_on(title, date, exclude_id).await? {
        let mut errors = FieldErrors::new();
        errors.add("title", TITLE_NOT_UNIQUE);
        return Err(DomainError::Validation(errors).into());
    }
    Ok(())
}

async fn any_post(state: &AppState, id: i64) -> AppResult<Post> {
    state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::NotFound { entity_type: "Post", id }.into())
}

/// GET /api/admin/posts
pub async fn list_posts(identity: Identity, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    identity.require_staff()?;

    let posts = state.posts.all_posts().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(context::post_dtos(&state, posts).await?)))
}

/// POST /api/admin/posts
pub async fn create_post(
    identity: Identity,
    state: web::Data<AppState>,
    body: web::Json<PostForm>,
) -> AppResult<HttpResponse> {
    identity.require_staff()?;

    let draft = body.validate().map_err(AppError::Validation)?;
    let tag_names = draft.tags.clone();
    let post = draft.into_post(identity.author_id);
    ensure_title_free(&state, &post.title, post.publish_date(), None).await?;

    let (saved, tags) = state.posts.save_with_tags(post, &tag_names).await?;
    tracing::info!(post_id = saved.id, author_id = identity.author_id, status = %saved.status, "Post created");

    let dto = context::post_dto_with_tags(&state, saved, &tags).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(dto)))
}

/// PUT /api/admin/posts/{id}
pub async fn update_post(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<PostForm>,
) -> AppResult<HttpResponse> {
    identity.require_staff()?;

    let mut post = any_post(&state, path.into_inner()).await?;
    let draft = body.validate().map_err(AppError::Validation)?;
    draft.apply_to(&mut post);
    ensure_title_free(&state, &post.title, post.publish_date(), Some(post.id)).await?;

    let (saved, tags) = state.posts.save_with_tags(post, &draft.tags).await?;
    tracing::info!(post_id = saved.id, status = %saved.status, "Post updated");

    let dto = context::post_dto_with_tags(&state, saved, &tags).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(dto)))
}

/// DELETE /api/admin/posts/{id}
pub async fn delete_post(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    identity.require_staff()?;

    let id = path.into_inner();
    state.posts.delete(id).await?;
    tracing::info!(post_id = id, "Post deleted");

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/admin/posts/{id}/comments
pub async fn post_comments(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    identity.require_staff()?;

    let post = any_post(&state, path.into_inner()).await?;
    let comments = state.comments.all_for_post(post.id).await?;
    let dtos: Vec<_> = comments
        .iter()
        .map(|c| context::comment_dto(c, true))
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(dtos)))
}

/// PATCH /api/admin/comments/{id}
pub async fn moderate_comment(
    identity: Identity,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<ModerateCommentRequest>,
) -> AppResult<HttpResponse> {
    identity.require_staff()?;

    let id = path.into_inner();
    let mut comment = state
        .comments
        .find_by_id(id)
        .await?
        .ok_or(DomainError::NotFound { entity_type: "Comment", id })?;

    comment.set_active(body.active);
    let saved = state.comments.save(comment).await?;
    tracing::info!(comment_id = saved.id, active = saved.active, "Comment moderated");

    Ok(HttpResponse::Ok().json(ApiResponse::ok(context::comment_dto(&saved, true))))
}
