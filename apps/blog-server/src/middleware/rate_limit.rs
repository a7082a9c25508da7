//! Rate limiting middleware.
//!
//! Only unsafe methods count against the limit, so wrapping a resource that
//! also serves a GET form leaves the form readable.
//!
//! Clients are keyed on the socket peer IP. `X-Forwarded-For` and `Forwarded`
//! are only honoured with `trust_proxy`, which assumes a reverse proxy in
//! front that overwrites those headers.

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
};
use futures::future::LocalBoxFuture;
use quill_shared::ErrorResponse;
use std::future::{Ready, ready};
use std::rc::Rc;
use std::sync::Arc;

use quill_core::ports::RateLimiter;

/// Rate limiting middleware factory.
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<dyn RateLimiter>,
    trust_proxy: bool,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            limiter,
            trust_proxy: false,
        }
    }

    /// Key clients on the forwarded address instead of the peer.
    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }
}

fn client_key(req: &ServiceRequest, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(addr) = req.connection_info().realip_remote_addr() {
            return addr.to_string();
        }
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            trust_proxy: self.trust_proxy,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Arc<dyn RateLimiter>,
    trust_proxy: bool,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = Arc::clone(&self.limiter);
        let trust_proxy = self.trust_proxy;

        Box::pin(async move {
            if !req.method().is_safe() {
                let key = client_key(&req, trust_proxy);

                match limiter.check(&key).await {
                    Ok(result) if !result.allowed => {
                        let retry_after = result.reset_after.as_secs().max(1);
                        tracing::warn!(client = %key, path = %req.path(), "Rate limit exceeded");

                        let response = HttpResponse::TooManyRequests()
                            .insert_header(("X-RateLimit-Remaining", "0"))
                            .insert_header((header::RETRY_AFTER, retry_after.to_string()))
                            .json(ErrorResponse::too_many_requests(retry_after));

                        return Ok(req.into_response(response).map_into_right_body());
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Rate limiter error, failing open"),
                }
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test, web};
    use quill_infra::{InMemoryRateLimiter, RateLimitConfig};
    use std::time::Duration;

    fn limiter(max_requests: u32) -> Arc<dyn RateLimiter> {
        Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        }))
    }

    #[actix_web::test]
    async fn test_denies_after_burst() {
        let app = test::init_service(
            App::new().service(
                web::resource("/submit")
                    .wrap(RateLimitMiddleware::new(limiter(2)))
                    .route(web::post().to(HttpResponse::Ok)),
            ),
        )
        .await;

        for _ in 0..2 {
            let req = test::TestRequest::post().uri("/submit").to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK);
        }

        let req = test::TestRequest::post().uri("/submit").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(res.headers().contains_key(header::RETRY_AFTER));
    }

    fn submit(peer: &str, forwarded_for: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/submit")
            .peer_addr(peer.parse().unwrap())
            .insert_header(("X-Forwarded-For", forwarded_for))
    }

    #[actix_web::test]
    async fn test_forwarded_header_does_not_reset_limit() {
        let app = test::init_service(
            App::new().service(
                web::resource("/submit")
                    .wrap(RateLimitMiddleware::new(limiter(1)))
                    .route(web::post().to(HttpResponse::Ok)),
            ),
        )
        .await;

        let req = submit("10.0.0.7:40000", "203.0.113.1").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        // Same peer on a new port, claiming another origin
        let req = submit("10.0.0.7:40001", "203.0.113.2").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

        let req = submit("10.0.0.8:40000", "203.0.113.1").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_trusted_proxy_keys_on_forwarded_address() {
        let app = test::init_service(
            App::new().service(
                web::resource("/submit")
                    .wrap(RateLimitMiddleware::new(limiter(1)).trust_proxy(true))
                    .route(web::post().to(HttpResponse::Ok)),
            ),
        )
        .await;

        let req = submit("10.0.0.1:40000", "203.0.113.1").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let req = submit("10.0.0.1:40000", "203.0.113.2").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let req = submit("10.0.0.1:40000", "203.0.113.1").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn test_safe_methods_are_not_counted() {
        let app = test::init_service(
            App::new().service(
                web::resource("/form")
                    .wrap(RateLimitMiddleware::new(limiter(1)))
                    .route(web::get().to(HttpResponse::Ok)),
            ),
        )
        .await;

        for _ in 0..3 {
            let req = test::TestRequest::get().uri("/form").to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK);
        }
    }
}
