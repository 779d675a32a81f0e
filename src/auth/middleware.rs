use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::token::verify_token;
use crate::error::AppError;

/// Paths reachable without a bearer token.
const PUBLIC_PATHS: [&str; 3] = ["/health", "/api/auth/login", "/api/auth/register"];

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| path.starts_with(public))
}

/// Rejects requests without a valid bearer token and stores the decoded
/// `Claims` in the request extensions for `CurrentUser`.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(req.path()) {
            return Box::pin(self.service.call(req));
        }

        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let claims = match bearer {
            Some(token) => verify_token(token),
            None => Err(AppError::Unauthorized("Missing token".into())),
        };

        match claims {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                Box::pin(self.service.call(req))
            }
            Err(app_err) => {
                log::debug!("Rejected {} {}: {}", req.method(), req.path(), app_err);
                Box::pin(async move { Err(app_err.into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::{generate_token, tests::run_with_temp_jwt_secret};
    use actix_web::{http::StatusCode, test::TestRequest, web, App, HttpResponse};

    #[test]
    fn test_public_paths() {
        assert!(is_public("/health"));
        assert!(is_public("/api/auth/login"));
        assert!(is_public("/api/auth/register"));
        assert!(!is_public("/api/events"));
        assert!(!is_public("/api/tasks/claim"));
    }

    #[actix_rt::test]
    async fn test_missing_token_is_unauthorized() {
        let app = actix_web::test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .route("/events", web::get().to(HttpResponse::Ok)),
            ),
        )
        .await;

        let req = TestRequest::get().uri("/api/events").to_request();
        let resp = actix_web::test::try_call_service(&app, req).await;
        match resp {
            Ok(resp) => assert_eq!(resp.status(), StatusCode::UNAUTHORIZED),
            Err(err) => assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED),
        }
    }

    #[actix_rt::test]
    async fn test_valid_token_reaches_handler() {
        let app = actix_web::test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .route("/events", web::get().to(HttpResponse::Ok)),
            ),
        )
        .await;

        // The token is checked when the request is dispatched, so only the
        // dispatch needs the secret; the response is awaited afterwards.
        let mut pending = None;
        run_with_temp_jwt_secret("middleware_secret", || {
            let token = generate_token(11).unwrap();
            let req = TestRequest::get()
                .uri("/api/events")
                .insert_header(("Authorization", format!("Bearer {}", token)))
                .to_request();
            pending = Some(app.call(req));
        });

        let resp = pending.unwrap().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
