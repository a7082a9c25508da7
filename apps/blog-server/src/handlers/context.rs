//! JSON contexts handed to the presentation layer.

use std::collections::HashMap;

use serde::Serialize;

use quill_core::domain::{Comment, Post, Tag};
use quill_core::forms::{CommentForm, EmailPostForm, SearchForm};
use quill_core::pagination::PageWindow;
use quill_shared::dto::{CommentDto, PageInfo, PostDto, SearchHitDto, TagDto};

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// Share page: the post, the (echoed) form and whether mail went out.
#[derive(Debug, Serialize)]
pub struct ShareContext {
    pub post: PostDto,
    pub form: EmailPostForm,
    pub sent: bool,
}

/// Comment submission result.
#[derive(Debug, Serialize)]
pub struct CommentContext {
    pub post: PostDto,
    pub form: CommentForm,
    pub comment: Option<CommentDto>,
}

/// Search page. `query` is only set for a valid submission.
#[derive(Debug, Default, Serialize)]
pub struct SearchContext {
    pub form: SearchForm,
    pub query: Option<String>,
    pub results: Vec<SearchHitDto>,
}

pub fn tag_dto(tag: &Tag) -> TagDto {
    TagDto {
        name: tag.name.clone(),
        slug: tag.slug.clone(),
        url: format!("/tag/{}/", tag.slug),
    }
}

/// Reader-facing views leave out the commenter's address.
pub fn comment_dto(comment: &Comment, with_email: bool) -> CommentDto {
    CommentDto {
        id: comment.id,
        post_id: comment.post_id,
        name: comment.name.clone(),
        email: with_email.then(|| comment.email.clone()),
        body: comment.body.clone(),
        created: comment.created,
        active: comment.active,
    }
}

pub fn page_info(window: &PageWindow) -> PageInfo {
    PageInfo {
        number: window.number,
        num_pages: window.num_pages,
        count: window.count,
        has_previous: window.has_previous(),
        has_next: window.has_next(),
        previous_page_number: window.previous_page_number(),
        next_page_number: window.next_page_number(),
    }
}

fn to_post_dto(post: Post, author: String, tags: &[Tag]) -> PostDto {
    PostDto {
        url: post.absolute_url(),
        id: post.id,
        title: post.title,
        slug: post.slug,
        author,
        body: post.body,
        status: post.status.to_string(),
        publish: post.publish,
        created: post.created,
        updated: post.updated,
        tags: tags.iter().map(tag_dto).collect(),
    }
}

async fn author_name(state: &AppState, author_id: i64) -> AppResult<String> {
    let author = state.authors.find_by_id(author_id).await?;
    Ok(author.map(|a| a.username).unwrap_or_default())
}

/// A post whose tags the caller already loaded.
pub async fn post_dto_with_tags(state: &AppState, post: Post, tags: &[Tag]) -> AppResult<PostDto> {
    let author = author_name(state, post.author_id).await?;
    Ok(to_post_dto(post, author, tags))
}

pub async fn post_dto(state: &AppState, post: Post) -> AppResult<PostDto> {
    let tags = state.tags.tags_for_post(post.id).await?;
    post_dto_with_tags(state, post, &tags).await
}

/// Resolve authors and tags for a listing, looking each author up once.
pub async fn post_dtos(state: &AppState, posts: Vec<Post>) -> AppResult<Vec<PostDto>> {
    let mut authors: HashMap<i64, String> = HashMap::new();
    let mut dtos = Vec::with_capacity(posts.len());

    for post in posts {
        let author = match authors.get(&post.author_id) {
            Some(name) => name.clone(),
            None => {
                let name = author_name(state, post.author_id).await?;
                authors.insert(post.author_id, name.clone());
                name
            }
        };
        let tags = state.tags.tags_for_post(post.id).await?;
        dtos.push(to_post_dto(post, author, &tags));
    }

    Ok(dtos)
}
