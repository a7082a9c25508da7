//! RSS feed and XML sitemap of published posts.

use actix_web::{HttpRequest, HttpResponse, web};
use askama::Template;

use quill_core::domain::Post;

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const FEED_TITLE: &str = "My blog";
const FEED_DESCRIPTION: &str = "New posts of my blog.";
const FEED_ITEMS: usize = 5;
const FEED_DESCRIPTION_WORDS: usize = 30;

// Fields are escaped with `xml_text` before rendering.
#[derive(Template)]
#[template(path = "feed.xml", escape = "none")]
struct FeedTemplate {
    title: String,
    link: String,
    description: String,
    items: Vec<FeedItem>,
}

struct FeedItem {
    title: String,
    link: String,
    description: String,
    pub_date: String,
}

#[derive(Template)]
#[template(path = "sitemap.xml", escape = "none")]
struct SitemapTemplate {
    urls: Vec<SitemapUrl>,
}

struct SitemapUrl {
    loc: String,
    lastmod: String,
}

fn xml_text(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// First `words` words of `text`, with an ellipsis when something was cut.
fn truncate_words(text: &str, words: usize) -> String {
    let mut parts = text.split_whitespace();
    let kept: Vec<&str> = parts.by_ref().take(words).collect();
    let mut truncated = kept.join(" ");
    if parts.next().is_some() {
        truncated.push_str(" …");
    }
    truncated
}

fn render(template: &impl Template) -> AppResult<String> {
    template
        .render()
        .map_err(|e| AppError::Internal(format!("Template rendering failed: {e}")))
}

fn render_feed(
    posts: &[Post],
    absolute: impl Fn(&str) -> AppResult<String>,
) -> AppResult<String> {
    let items = posts
        .iter()
        .take(FEED_ITEMS)
        .map(|post| {
            Ok(FeedItem {
                title: xml_text(&post.title),
                link: xml_text(&absolute(&post.absolute_url())?),
                description: xml_text(&truncate_words(&post.body, FEED_DESCRIPTION_WORDS)),
                pub_date: post.publish.to_rfc2822(),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    render(&FeedTemplate {
        title: xml_text(FEED_TITLE),
        link: xml_text(&absolute("/")?),
        description: xml_text(FEED_DESCRIPTION),
        items,
    })
}

fn render_sitemap(
    posts: &[Post],
    absolute: impl Fn(&str) -> AppResult<String>,
) -> AppResult<String> {
    let urls = posts
        .iter()
        .map(|post| {
            Ok(SitemapUrl {
                loc: xml_text(&absolute(&post.absolute_url())?),
                lastmod: post.updated.format("%Y-%m-%d").to_string(),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    render(&SitemapTemplate { urls })
}

/// GET /feed/
pub async fn latest_posts_feed(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let posts = state.posts.published_posts().await?;
    let body = render_feed(&posts, |path| state.absolute_url(&req, path))?;

    Ok(HttpResponse::Ok()
        .content_type("application/rss+xml; charset=utf-8")
        .body(body))
}

/// GET /sitemap.xml
pub async fn sitemap(req: HttpRequest, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let posts = state.posts.published_posts().await?;
    let body = render_sitemap(&posts, |path| state.absolute_url(&req, path))?;

    Ok(HttpResponse::Ok()
        .content_type("application/xml; charset=utf-8")
        .body(body))
}
