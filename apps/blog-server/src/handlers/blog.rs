//! Public blog pages: listings, detail, sharing, comments and search.

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;

use quill_core::DomainError;
use quill_core::domain::Post;
use quill_core::forms::{CommentForm, EmailPostForm, SearchForm};
use quill_core::pagination::{POSTS_PER_PAGE, Paginator};
use quill_core::recommend::SIMILAR_POSTS_LIMIT;
use quill_core::search::SEARCH_SIMILARITY_THRESHOLD;
use quill_core::sharing::recommendation_mail;
use quill_shared::ApiResponse;
use quill_shared::dto::{PostDetailResponse, PostListResponse, SearchHitDto};

use super::context::{self, CommentContext, SearchContext, ShareContext};
use crate::middleware::error::{AppError, AppResult};
use crate::observability::mask_email;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

/// A published post, or 404.
async fn published_post(state: &AppState, id: i64) -> AppResult<Post> {
    state
        .posts
        .find_published(id)
        .await?
        .ok_or_else(|| DomainError::NotFound { entity_type: "Post", id }.into())
}

async fn render_list(
    state: &AppState,
    tag_slug: Option<&str>,
    page: Option<&str>,
) -> AppResult<HttpResponse> {
    let tag = match tag_slug {
        Some(slug) => Some(
            state
                .tags
                .find_by_slug(slug)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("No tag matches '{slug}'")))?,
        ),
        None => None,
    };
    let tag_id = tag.as_ref().map(|t| t.id);

    let count = state.posts.count_published(tag_id).await?;
    let window = Paginator::new(count, POSTS_PER_PAGE).page(page);
    let posts = state
        .posts
        .published_page(tag_id, window.offset, window.limit)
        .await?;

    tracing::debug!(
        tag = ?tag_slug,
        page = window.number,
        num_pages = window.num_pages,
        "Rendering post list"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostListResponse {
        posts: context::post_dtos(state, posts).await?,
        page: context::page_info(&window),
        tag: tag.as_ref().map(context::tag_dto),
    })))
}

/// GET /
pub async fn post_list(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    render_list(&state, None, query.page.as_deref()).await
}

/// GET /page/{page}/
pub async fn post_list_page(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    render_list(&state, None, Some(path.as_str())).await
}

/// GET /tag/{tag_slug}/
pub async fn post_list_by_tag(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    render_list(&state, Some(path.as_str()), query.page.as_deref()).await
}

/// GET /tag/{tag_slug}/page/{page}/
pub async fn post_list_by_tag_page(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (tag_slug, page) = path.into_inner();
    render_list(&state, Some(&tag_slug), Some(&page)).await
}

async fn render_detail(state: &AppState, post: Post) -> AppResult<HttpResponse> {
    let tags = state.tags.tags_for_post(post.id).await?;
    let tag_ids: Vec<i64> = tags.iter().map(|t| t.id).collect();

    let comments = state.comments.active_for_post(post.id).await?;
    let similar = state
        .posts
        .similar_published(post.id, &tag_ids, SIMILAR_POSTS_LIMIT)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostDetailResponse {
        post: context::post_dto_with_tags(state, post, &tags).await?,
        comments: comments
            .iter()
            .map(|c| context::comment_dto(c, false))
            .collect(),
        similar_posts: context::post_dtos(state, similar).await?,
    })))
}

/// GET /{id}/
pub async fn post_detail_by_id(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let post = published_post(&state, path.into_inner()).await?;
    render_detail(&state, post).await
}

/// GET /{year}/{month}/{day}/{slug}/
pub async fn post_detail(
    state: web::Data<AppState>,
    path: web::Path<(i32, u32, u32, String)>,
) -> AppResult<HttpResponse> {
    let (year, month, day, slug) = path.into_inner();
    let not_found = || AppError::NotFound(format!("No post matches {year}/{month}/{day}/{slug}"));

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(not_found)?;
    let mut matches = state.posts.published_by_slug_on(date, &slug).await?;

    // Zero or several candidates are both treated as missing.
    if matches.len() != 1 {
        if matches.len() > 1 {
            tracing::warn!(%date, %slug, count = matches.len(), "Ambiguous post lookup");
        }
        return Err(not_found());
    }

    render_detail(&state, matches.remove(0)).await
}

/// GET /{id}/share/
pub async fn post_share_form(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let post = published_post(&state, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(ShareContext {
        post: context::post_dto(&state, post).await?,
        form: EmailPostForm::default(),
        sent: false,
    })))
}

/// POST /{id}/share/
pub async fn post_share(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    form: web::Form<EmailPostForm>,
) -> AppResult<HttpResponse> {
    let post = published_post(&state, path.into_inner()).await?;
    let form = form.into_inner();

    let share = match form.validate() {
        Ok(share) => share,
        Err(errors) => {
            let context = ShareContext {
                post: context::post_dto(&state, post).await?,
                form,
                sent: false,
            };
            return Ok(HttpResponse::UnprocessableEntity()
                .json(ApiResponse::invalid(context, errors.into_map())));
        }
    };

    let post_url = state.absolute_url(&req, &post.absolute_url())?;
    let mail = recommendation_mail(&share, &post, &post_url, &state.mail_from);
    state.mailer.send(mail).await?;

    tracing::info!(
        post_id = post.id,
        from = %mask_email(&share.email),
        to = %mask_email(&share.to),
        "Post shared by email"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::ok(ShareContext {
        post: context::post_dto(&state, post).await?,
        form,
        sent: true,
    })))
}

/// POST /{id}/comment/
pub async fn post_comment(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    form: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    let post = published_post(&state, path.into_inner()).await?;
    let form = form.into_inner();

    let new_comment = match form.validate() {
        Ok(new_comment) => new_comment,
        Err(errors) => {
            let context = CommentContext {
                post: context::post_dto(&state, post).await?,
                form,
                comment: None,
            };
            return Ok(HttpResponse::UnprocessableEntity()
                .json(ApiResponse::invalid(context, errors.into_map())));
        }
    };

    let saved = state.comments.save(new_comment.into_comment(post.id)).await?;
    tracing::info!(
        post_id = post.id,
        comment_id = saved.id,
        email = %mask_email(&saved.email),
        "Comment added"
    );

    Ok(HttpResponse::Created().json(ApiResponse::ok(CommentContext {
        post: context::post_dto(&state, post).await?,
        form,
        comment: Some(context::comment_dto(&saved, false)),
    })))
}

/// Any method other than POST on the comment endpoint.
pub async fn comment_method_not_allowed() -> AppResult<HttpResponse> {
    Err(AppError::MethodNotAllowed("POST"))
}

/// GET /search/?query=
pub async fn post_search(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> AppResult<HttpResponse> {
    let Some(raw) = query.into_inner().query else {
        return Ok(HttpResponse::Ok().json(ApiResponse::ok(SearchContext::default())));
    };

    let form = SearchForm { query: raw };
    let terms = match form.validate() {
        Ok(terms) => terms,
        Err(errors) => {
            let context = SearchContext {
                form,
                ..SearchContext::default()
            };
            return Ok(HttpResponse::Ok().json(ApiResponse::invalid(context, errors.into_map())));
        }
    };

    let hits = state
        .posts
        .search_published_titles(&terms, SEARCH_SIMILARITY_THRESHOLD)
        .await?;
    tracing::debug!(query = %terms, results = hits.len(), "Title search");

    let (posts, scores): (Vec<Post>, Vec<f32>) =
        hits.into_iter().map(|hit| (hit.post, hit.similarity)).unzip();
    let results = context::post_dtos(&state, posts)
        .await?
        .into_iter()
        .zip(scores)
        .map(|(post, similarity)| SearchHitDto { post, similarity })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(SearchContext {
        form,
        query: Some(terms),
        results,
    })))
}
