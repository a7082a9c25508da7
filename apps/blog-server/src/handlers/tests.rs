use std::sync::Arc;
use std::time::Duration;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use async_trait::async_trait;
use chrono::{Duration as Days, Utc};
use serde_json::{Value, json};

use quill_core::domain::{Author, Comment, Post, PostStatus};
use quill_core::ports::{
    BaseRepository, CommentRepository, MailError, Mailer, OutgoingMail, PasswordService,
    PostRepository, RateLimiter, TagRepository, TokenService,
};
use quill_core::slug::slugify;
use quill_infra::{
    Argon2PasswordService, InMemoryMailer, InMemoryRateLimiter, InMemoryStore, JwtConfig,
    JwtTokenService, RateLimitConfig,
};

use super::configure_routes;
use crate::config::AllowedHosts;
use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::state::AppState;

struct TestBlog {
    store: Arc<InMemoryStore>,
    mailer: Arc<InMemoryMailer>,
    state: AppState,
    tokens: Arc<dyn TokenService>,
    passwords: Arc<dyn PasswordService>,
    limiter: Arc<dyn RateLimiter>,
}

impl TestBlog {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let mailer = Arc::new(InMemoryMailer::new());
        let state = AppState::in_memory(store.clone(), mailer.clone(), "blog@example.com");

        Self {
            store,
            mailer,
            state,
            tokens: Arc::new(JwtTokenService::new(JwtConfig {
                secret: "test-secret".to_string(),
                ..JwtConfig::default()
            })),
            passwords: Arc::new(Argon2PasswordService::default()),
            limiter: Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
                max_requests: 1_000,
                window: Duration::from_secs(60),
            })),
        }
    }

    async fn author(&self, username: &str, staff: bool) -> Author {
        let hash = self.passwords.hash("s3cret-pass").unwrap();
        let mut author = Author::new(username.into(), format!("{username}@example.com"), hash);
        if staff {
            author = author.staff();
        }
        BaseRepository::<Author, i64>::save(self.store.as_ref(), author)
            .await
            .unwrap()
    }

    async fn post(
        &self,
        author: &Author,
        title: &str,
        status: PostStatus,
        age_days: i64,
        tags: &[&str],
    ) -> Post {
        let mut post = Post::new(author.id, title.into(), slugify(title), format!("About {title}"));
        post.status = status;
        post.publish = Utc::now() - Days::days(age_days);
        let saved = BaseRepository::<Post, i64>::save(self.store.as_ref(), post)
            .await
            .unwrap();

        let names: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        self.store.set_post_tags(saved.id, &names).await.unwrap();
        saved
    }

    async fn comment(&self, post: &Post, name: &str, active: bool) -> Comment {
        let mut comment = Comment::new(
            post.id,
            name.into(),
            format!("{}@example.com", name.to_lowercase()),
            "Great read".into(),
        );
        comment.set_active(active);
        BaseRepository::<Comment, i64>::save(self.store.as_ref(), comment)
            .await
            .unwrap()
    }

    fn bearer(&self, author: &Author) -> (header::HeaderName, String) {
        let token = self
            .tokens
            .generate_token(author.id, &author.username, author.is_staff)
            .unwrap();
        (header::AUTHORIZATION, format!("Bearer {token}"))
    }
}

/// Mailer whose relay is always down.
struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _mail: OutgoingMail) -> Result<(), MailError> {
        Err(MailError::Transport("connection refused".into()))
    }
}

macro_rules! init_app {
    ($blog:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($blog.state.clone()))
                .app_data(web::Data::new($blog.tokens.clone()))
                .app_data(web::Data::new($blog.passwords.clone()))
                .configure(|cfg| {
                    configure_routes(cfg, RateLimitMiddleware::new($blog.limiter.clone()))
                }),
        )
        .await
    };
}

fn titles(posts: &Value) -> Vec<String> {
    posts
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap().to_string())
        .collect()
}

async fn active_comment_count(blog: &TestBlog, post: &Post) -> usize {
    blog.state.comments.active_for_post(post.id).await.unwrap().len()
}

#[actix_web::test]
async fn test_list_shows_published_newest_first() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    blog.post(&ada, "Oldest", PostStatus::Published, 4, &[]).await;
    blog.post(&ada, "Older", PostStatus::Published, 3, &[]).await;
    blog.post(&ada, "Old", PostStatus::Published, 2, &[]).await;
    blog.post(&ada, "Newest", PostStatus::Published, 1, &[]).await;
    blog.post(&ada, "Hidden draft", PostStatus::Draft, 0, &[]).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get().uri("/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(titles(&body["data"]["posts"]), vec!["Newest", "Old", "Older"]);
    assert_eq!(body["data"]["page"]["number"], 1);
    assert_eq!(body["data"]["page"]["num_pages"], 2);
    assert_eq!(body["data"]["posts"][0]["author"], "ada");
}

#[actix_web::test]
async fn test_out_of_range_page_shows_last_page() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    for (i, title) in ["A", "B", "C", "D"].iter().enumerate() {
        blog.post(&ada, title, PostStatus::Published, i as i64, &[]).await;
    }
    let app = init_app!(blog);

    let req = test::TestRequest::get().uri("/?page=99").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["page"]["number"], 2);
    assert_eq!(titles(&body["data"]["posts"]), vec!["D"]);

    let req = test::TestRequest::get().uri("/page/abc/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["page"]["number"], 1);
    assert_eq!(titles(&body["data"]["posts"]), vec!["A", "B", "C"]);
}

#[actix_web::test]
async fn test_empty_listing_is_one_empty_page() {
    let blog = TestBlog::new();
    let app = init_app!(blog);

    let req = test::TestRequest::get().uri("/?page=3").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["page"]["num_pages"], 1);
    assert!(body["data"]["posts"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn test_tag_listing_filters_and_unknown_tag_is_404() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    blog.post(&ada, "Rusty", PostStatus::Published, 1, &["Rust"]).await;
    blog.post(&ada, "Snaky", PostStatus::Published, 2, &["Python"]).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get().uri("/tag/rust/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(titles(&body["data"]["posts"]), vec!["Rusty"]);
    assert_eq!(body["data"]["tag"]["name"], "Rust");

    let req = test::TestRequest::get().uri("/tag/cobol/").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_detail_shows_active_comments_and_similar_posts() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    let post = blog
        .post(&ada, "Target", PostStatus::Published, 0, &["a", "b"])
        .await;
    blog.post(&ada, "Shares A", PostStatus::Published, 1, &["a"]).await;
    blog.post(&ada, "Shares AB", PostStatus::Published, 2, &["a", "b"]).await;
    blog.post(&ada, "Shares none", PostStatus::Published, 3, &["c"]).await;
    blog.comment(&post, "Visible", true).await;
    blog.comment(&post, "Hidden", false).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get().uri(&post.absolute_url()).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["post"]["title"], "Target");
    let comments = body["data"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["name"], "Visible");
    assert!(comments[0].get("email").is_none());
    assert_eq!(
        titles(&body["data"]["similar_posts"]),
        vec!["Shares AB", "Shares A"]
    );
}

#[actix_web::test]
async fn test_detail_of_draft_or_bad_date_is_404() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    let draft = blog.post(&ada, "Secret", PostStatus::Draft, 0, &[]).await;
    let app = init_app!(blog);

    for uri in [
        draft.absolute_url(),
        format!("/{}/", draft.id),
        "/2024/2/30/secret/".to_string(),
    ] {
        let req = test::TestRequest::get().uri(&uri).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[actix_web::test]
async fn test_valid_comment_is_stored_active() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    let post = blog.post(&ada, "Target", PostStatus::Published, 0, &[]).await;
    let app = init_app!(blog);

    let req = test::TestRequest::post()
        .uri(&format!("/{}/comment/", post.id))
        .set_form([("name", "Bob"), ("email", "bob@example.com"), ("body", "Nice")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["comment"]["name"], "Bob");
    assert_eq!(body["data"]["comment"]["active"], true);
    assert_eq!(active_comment_count(&blog, &post).await, 1);
}

#[actix_web::test]
async fn test_comment_get_is_method_not_allowed() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    let post = blog.post(&ada, "Target", PostStatus::Published, 0, &[]).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get()
        .uri(&format!("/{}/comment/", post.id))
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers().get(header::ALLOW).unwrap(), "POST");
    assert_eq!(active_comment_count(&blog, &post).await, 0);
}

#[actix_web::test]
async fn test_invalid_comment_is_rejected() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    let post = blog.post(&ada, "Target", PostStatus::Published, 0, &[]).await;
    let app = init_app!(blog);

    let req = test::TestRequest::post()
        .uri(&format!("/{}/comment/", post.id))
        .set_form([("name", ""), ("email", "not-an-email"), ("body", "Nice")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"]["name"][0], "This field is required.");
    assert_eq!(body["errors"]["email"][0], "Enter a valid email address.");
    assert_eq!(body["data"]["form"]["email"], "not-an-email");
    assert_eq!(active_comment_count(&blog, &post).await, 0);
}

#[actix_web::test]
async fn test_share_sends_one_mail() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    let post = blog.post(&ada, "Django Tips", PostStatus::Published, 0, &[]).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get()
        .uri(&format!("/{}/share/", post.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["sent"], false);

    let req = test::TestRequest::post()
        .uri(&format!("/{}/share/", post.id))
        .set_form([
            ("name", "Ana"),
            ("email", "ana@example.com"),
            ("to", "bob@example.com"),
            ("comments", "Worth it"),
        ])
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["sent"], true);

    let outbox = blog.mailer.outbox().await;
    assert_eq!(outbox.len(), 1);
    assert_eq!(
        outbox[0].subject,
        "Ana (ana@example.com) recommends you read Django Tips"
    );
    assert_eq!(outbox[0].to, vec!["bob@example.com".to_string()]);
    assert_eq!(outbox[0].from, "blog@example.com");
    assert!(outbox[0].body.contains(&post.absolute_url()));
    assert!(outbox[0].body.ends_with("Ana's comments: Worth it"));
}

#[actix_web::test]
async fn test_invalid_share_sends_nothing() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    let post = blog.post(&ada, "Django Tips", PostStatus::Published, 0, &[]).await;
    let app = init_app!(blog);

    let req = test::TestRequest::post()
        .uri(&format!("/{}/share/", post.id))
        .set_form([("name", "Ana"), ("email", "ana@example.com"), ("to", "nobody")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["sent"], false);
    assert!(body["errors"]["to"].is_array());
    assert!(blog.mailer.outbox().await.is_empty());
}

fn share_form(post: &Post) -> test::TestRequest {
    test::TestRequest::post()
        .uri(&format!("/{}/share/", post.id))
        .set_form([
            ("name", "Ana"),
            ("email", "ana@example.com"),
            ("to", "bob@example.com"),
        ])
}

#[actix_web::test]
async fn test_share_mail_failure_is_problem_document() {
    let mut blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    let post = blog.post(&ada, "Django Tips", PostStatus::Published, 0, &[]).await;
    blog.state.mailer = Arc::new(FailingMailer);
    let app = init_app!(blog);

    let res = test::call_service(&app, share_form(&post).to_request()).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["type"], "about:blank");
    assert_eq!(body["title"], "Internal Server Error");
    assert_eq!(body["status"], 500);
    assert!(body.get("data").is_none());
    assert!(!body.to_string().contains("connection refused"));
}

#[actix_web::test]
async fn test_share_rejects_unknown_host() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    let post = blog.post(&ada, "Django Tips", PostStatus::Published, 0, &[]).await;
    let app = init_app!(blog);

    let req = share_form(&post)
        .insert_header((header::HOST, "evil.attacker.test"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["status"], 400);
    assert!(blog.mailer.outbox().await.is_empty());
}

#[actix_web::test]
async fn test_share_links_to_allowed_host() {
    let mut blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    let post = blog.post(&ada, "Django Tips", PostStatus::Published, 0, &[]).await;
    blog.state.allowed_hosts = AllowedHosts::new([".example.com"]);
    let app = init_app!(blog);

    let req = share_form(&post)
        .insert_header((header::HOST, "www.example.com"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let outbox = blog.mailer.outbox().await;
    let link = format!("http://www.example.com{}", post.absolute_url());
    assert!(outbox[0].body.contains(&link));
}

#[actix_web::test]
async fn test_site_url_ignores_host_header() {
    let mut blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    let post = blog.post(&ada, "Django Tips", PostStatus::Published, 0, &[]).await;
    blog.state.site_url = Some("https://blog.example.com".into());
    let app = init_app!(blog);

    let req = share_form(&post)
        .insert_header((header::HOST, "evil.attacker.test"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let outbox = blog.mailer.outbox().await;
    assert!(outbox[0].body.contains("https://blog.example.com/"));
    assert!(!outbox[0].body.contains("evil.attacker.test"));
}

#[actix_web::test]
async fn test_search_matches_misspelled_title() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    blog.post(&ada, "Django Tips", PostStatus::Published, 1, &[]).await;
    blog.post(&ada, "Cooking", PostStatus::Published, 2, &[]).await;
    blog.post(&ada, "Django Drafts", PostStatus::Draft, 0, &[]).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get().uri("/search/?query=djngo").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["data"]["query"], "djngo");
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["post"]["title"], "Django Tips");
    let similarity = results[0]["similarity"].as_f64().unwrap();
    assert!((similarity - 4.0 / 14.0).abs() < 1e-3);
}

#[actix_web::test]
async fn test_search_without_query_has_no_results() {
    let blog = TestBlog::new();
    let app = init_app!(blog);

    for uri in ["/search/", "/search/?query=%20%20"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert!(body["data"]["query"].is_null(), "{uri}");
        assert!(body["data"]["results"].as_array().unwrap().is_empty());
    }
}

#[actix_web::test]
async fn test_login_and_me() {
    let blog = TestBlog::new();
    blog.author("editor", true).await;
    let app = init_app!(blog);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "editor", "password": "wrong" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "editor", "password": "s3cret-pass" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let token = body["access_token"].as_str().unwrap().to_string();
    assert_eq!(body["token_type"], "Bearer");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["username"], "editor");
    assert_eq!(body["is_staff"], true);
}

#[actix_web::test]
async fn test_admin_requires_staff_token() {
    let blog = TestBlog::new();
    let reader = blog.author("reader", false).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get().uri("/api/admin/posts").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/admin/posts")
        .insert_header(blog.bearer(&reader))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_admin_creates_post_with_tags() {
    let blog = TestBlog::new();
    let editor = blog.author("editor", true).await;
    let app = init_app!(blog);

    let payload = json!({
        "title": "Hello World",
        "body": "First post",
        "status": "published",
        "tags": ["Rust", "rust", "Web Dev"],
    });
    let req = test::TestRequest::post()
        .uri("/api/admin/posts")
        .insert_header(blog.bearer(&editor))
        .set_json(&payload)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["slug"], "hello-world");
    assert_eq!(body["data"]["status"], "Published");
    assert_eq!(body["data"]["tags"].as_array().unwrap().len(), 2);
    assert!(blog.store.find_by_slug("web-dev").await.unwrap().is_some());

    // Same title on the same day is refused
    let req = test::TestRequest::post()
        .uri("/api/admin/posts")
        .insert_header(blog.bearer(&editor))
        .set_json(&payload)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["errors"]["title"][0], "Title must be unique for Publish date.");
}

#[actix_web::test]
async fn test_admin_bad_tag_stores_nothing() {
    let blog = TestBlog::new();
    let editor = blog.author("editor", true).await;
    let existing = blog.post(&editor, "Target", PostStatus::Published, 0, &["kept"]).await;
    let app = init_app!(blog);

    let req = test::TestRequest::post()
        .uri("/api/admin/posts")
        .insert_header(blog.bearer(&editor))
        .set_json(json!({ "title": "Fresh", "body": "Text", "tags": ["Rust", "!!!"] }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(blog.store.all_posts().await.unwrap().len(), 1);
    assert!(blog.store.find_by_slug("rust").await.unwrap().is_none());

    let req = test::TestRequest::put()
        .uri(&format!("/api/admin/posts/{}", existing.id))
        .insert_header(blog.bearer(&editor))
        .set_json(json!({ "title": "Renamed", "body": "Text", "tags": ["???"] }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let stored = BaseRepository::<Post, i64>::find_by_id(blog.store.as_ref(), existing.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Target");
    assert_eq!(blog.store.tags_for_post(existing.id).await.unwrap()[0].slug, "kept");
}

#[actix_web::test]
async fn test_admin_moderates_and_deletes() {
    let blog = TestBlog::new();
    let editor = blog.author("editor", true).await;
    let post = blog.post(&editor, "Target", PostStatus::Published, 0, &[]).await;
    let comment = blog.comment(&post, "Spam", true).await;
    let app = init_app!(blog);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/comments/{}", comment.id))
        .insert_header(blog.bearer(&editor))
        .set_json(json!({ "active": false }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["active"], false);
    assert_eq!(active_comment_count(&blog, &post).await, 0);

    let req = test::TestRequest::get()
        .uri(&format!("/api/admin/posts/{}/comments", post.id))
        .insert_header(blog.bearer(&editor))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"][0]["email"], "spam@example.com");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/posts/{}", post.id))
        .insert_header(blog.bearer(&editor))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri(&post.absolute_url()).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_health_without_database() {
    let blog = TestBlog::new();
    let app = init_app!(blog);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "not_configured");
}

#[actix_web::test]
async fn test_feed_lists_published_posts() {
    let blog = TestBlog::new();
    let ada = blog.author("ada", true).await;
    blog.post(&ada, "Public", PostStatus::Published, 1, &[]).await;
    blog.post(&ada, "Private", PostStatus::Draft, 0, &[]).await;
    let app = init_app!(blog);

    let req = test::TestRequest::get().uri("/feed/").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/rss+xml; charset=utf-8"
    );

    let body = test::read_body(res).await;
    let xml = std::str::from_utf8(&body).unwrap();
    assert!(xml.contains("<title>Public</title>"));
    assert!(!xml.contains("Private"));
}

#[actix_web::test]
async fn test_feed_rejects_unknown_host() {
    let blog = TestBlog::new();
    let app = init_app!(blog);

    let req = test::TestRequest::get()
        .uri("/feed/")
        .insert_header((header::HOST, "evil.attacker.test"))
        .to_request();
    let res = test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
