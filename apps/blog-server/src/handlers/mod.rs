//! HTTP handlers and route configuration.

mod admin;
mod auth;
mod blog;
mod context;
mod feeds;
mod health;

#[cfg(test)]
mod tests;

use actix_web::web;

use crate::middleware::rate_limit::RateLimitMiddleware;

/// Configure all application routes.
///
/// `rate_limit` guards the public form submissions (sharing and commenting).
pub fn configure_routes(cfg: &mut web::ServiceConfig, rate_limit: RateLimitMiddleware) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Auth routes
            .service(
                web::scope("/auth")
                    .route("/login", web::post().to(auth::login))
                    .route("/me", web::get().to(auth::me)),
            )
            // Staff routes
            .service(
                web::scope("/admin")
                    .service(
                        web::resource("/posts")
                            .route(web::get().to(admin::list_posts))
                            .route(web::post().to(admin::create_post)),
                    )
                    .service(
                        web::resource(r"/posts/{id:\d+}")
                            .route(web::put().to(admin::update_post))
                            .route(web::delete().to(admin::delete_post)),
                    )
                    .route(r"/posts/{id:\d+}/comments", web::get().to(admin::post_comments))
                    .route(r"/comments/{id:\d+}", web::patch().to(admin::moderate_comment)),
            ),
    )
    .route("/feed/", web::get().to(feeds::latest_posts_feed))
    .route("/sitemap.xml", web::get().to(feeds::sitemap))
    .route("/search/", web::get().to(blog::post_search))
    // Listings
    .route("/", web::get().to(blog::post_list))
    .route("/page/{page}/", web::get().to(blog::post_list_page))
    .route("/tag/{tag_slug}/", web::get().to(blog::post_list_by_tag))
    .route(
        "/tag/{tag_slug}/page/{page}/",
        web::get().to(blog::post_list_by_tag_page),
    )
    // Detail and forms
    .route(r"/{id:\d+}/", web::get().to(blog::post_detail_by_id))
    .route(
        r"/{year:\d+}/{month:\d+}/{day:\d+}/{slug}/",
        web::get().to(blog::post_detail),
    )
    .service(
        web::resource(r"/{id:\d+}/share/")
            .route(web::get().to(blog::post_share_form))
            .route(web::post().to(blog::post_share))
            .wrap(rate_limit.clone()),
    )
    .service(
        web::resource(r"/{id:\d+}/comment/")
            .route(web::post().to(blog::post_comment))
            .default_service(web::to(blog::comment_method_not_allowed))
            .wrap(rate_limit),
    );
}
