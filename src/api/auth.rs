// X-API-Key middleware for the job routes.

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

/// Validates the `X-API-Key` header. When no key is configured every
/// request passes; `/` and `/health` are always open.
pub struct ApiKeyAuth {
    key: Option<String>,
}

impl ApiKeyAuth {
    pub fn new(key: Option<String>) -> Self {
        Self { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiKeyAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiKeyAuthMiddleware {
            service,
            key: self.key.clone(),
        }))
    }
}

pub struct ApiKeyAuthMiddleware<S> {
    service: S,
    key: Option<String>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let open_route = req.path() == "/" || req.path() == "/health";
        let authorized = match (&self.key, open_route) {
            (None, _) | (_, true) => true,
            (Some(key), false) => req
                .headers()
                .get("X-API-Key")
                .and_then(|v| v.to_str().ok())
                .map(|provided| provided == key)
                .unwrap_or(false),
        };

        if authorized {
            let fut = self.service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            });
        }

        tracing::warn!(path = %req.path(), "rejected request with invalid or missing API key");
        Box::pin(async move {
            let response = HttpResponse::Unauthorized()
                .json(serde_json::json!({
                    "status": "unauthorized",
                    "message": "Invalid or missing API key"
                }))
                .map_into_right_body();
            Ok(req.into_response(response))
        })
    }
}
