use crate::handlers::auth::{AuthResult, IdentityClaims, TokenCodec};
use crate::handlers::gate::{self, AuthError};
use crate::models::all_models::UserRole;
use actix_web::{
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures_util::future::{ok, ready, Ready};
use std::{
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

/// The decoded `Authorization` header of the current request.
///
/// `None` when the request carried no token at all. Handlers take this as an
/// extractor and call [`RequestAuth::require`] before touching the database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestAuth(pub Option<AuthResult>);

impl RequestAuth {
    pub fn get(&self) -> Option<&AuthResult> {
        self.0.as_ref()
    }

    pub fn require(&self, role: UserRole) -> Result<&IdentityClaims, AuthError> {
        gate::check(self.get(), role)
    }
}

impl FromRequest for RequestAuth {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(req
            .extensions()
            .get::<RequestAuth>()
            .cloned()
            .unwrap_or_default()))
    }
}

const BEARER_SCHEME: &str = "bearer";

/// Raw token from the `Authorization` header, with an optional `Bearer` scheme removed.
///
/// The scheme matches case-insensitively; a header holding only the scheme has no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?;
    let value = String::from_utf8_lossy(value.as_bytes());
    let value = value.trim();

    let token = match value.get(..BEARER_SCHEME.len()) {
        Some(scheme)
            if scheme.eq_ignore_ascii_case(BEARER_SCHEME)
                && value[BEARER_SCHEME.len()..]
                    .chars()
                    .next()
                    .map_or(true, char::is_whitespace) =>
        {
            value[BEARER_SCHEME.len()..].trim()
        }
        _ => value,
    };

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Decodes the bearer token once per request and stores the result as [`RequestAuth`].
///
/// Never rejects a request on its own; gating is left to the handlers.
pub struct AuthMiddleware {
    codec: TokenCodec,
}

impl AuthMiddleware {
    pub fn new(codec: TokenCodec) -> Self {
        AuthMiddleware { codec }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareMiddleware {
            service: Rc::new(service),
            codec: Rc::new(self.codec.clone()),
        })
    }
}

pub struct AuthMiddlewareMiddleware<S> {
    service: Rc<S>,
    codec: Rc<TokenCodec>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        let auth = bearer_token(req.headers()).map(|token| self.codec.decode(&token));
        if let Some(message) = auth.as_ref().and_then(AuthResult::error) {
            log::debug!("Bearer token rejected for {}: {}", req.path(), message);
        }
        req.extensions_mut().insert(RequestAuth(auth));

        Box::pin(async move { service.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::auth::{TOKEN_TTL_SECS, SESSION_EXPIRED_MESSAGE};
    use actix_web::{test, web, App, HttpResponse};
    use chrono::{Duration, Utc};

    const SECRET: &str = "middleware-test-secret";

    fn user() -> IdentityClaims {
        IdentityClaims {
            id: 12,
            email: "u@x.com".to_string(),
            role: UserRole::User,
        }
    }

    async fn whoami(auth: RequestAuth) -> HttpResponse {
        HttpResponse::Ok().json(auth.get())
    }

    async fn call_whoami(header: Option<String>) -> serde_json::Value {
        let _ = env_logger::builder().is_test(true).try_init();
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(TokenCodec::new(SECRET)))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let mut req = test::TestRequest::get().uri("/whoami");
        if let Some(value) = header {
            req = req.insert_header((AUTHORIZATION, value));
        }
        test::call_and_read_body_json(&app, req.to_request()).await
    }

    #[actix_web::test]
    async fn no_header_means_no_auth() {
        assert_eq!(call_whoami(None).await, serde_json::Value::Null);
        assert_eq!(call_whoami(Some("Bearer ".to_string())).await, serde_json::Value::Null);
    }

    #[actix_web::test]
    async fn bearer_and_raw_tokens_are_decoded() {
        let token = TokenCodec::new(SECRET).encode(&user()).unwrap();
        let expected = serde_json::json!({"id": 12, "email": "u@x.com", "role": "USER"});

        assert_eq!(call_whoami(Some(format!("Bearer {token}"))).await, expected);
        assert_eq!(call_whoami(Some(token)).await, expected);
    }

    #[actix_web::test]
    async fn expired_token_reaches_handler_as_data() {
        let issued_at = Utc::now() - Duration::seconds(TOKEN_TTL_SECS + 5);
        let token = TokenCodec::new(SECRET).encode_at(&user(), issued_at).unwrap();

        let body = call_whoami(Some(format!("Bearer {token}"))).await;
        assert_eq!(body["id"], 0);
        assert_eq!(body["role"], "");
        assert_eq!(body["error"], SESSION_EXPIRED_MESSAGE);
    }

    #[actix_web::test]
    async fn extractor_defaults_to_none_without_middleware() {
        let app = test::init_service(App::new().route("/whoami", web::get().to(whoami))).await;
        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header((AUTHORIZATION, "Bearer whatever"))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::Value::Null);
    }

    #[actix_web::test]
    async fn bearer_prefix_is_optional() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer  abc ".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc".to_string()));

        headers.insert(AUTHORIZATION, "abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi".to_string()));
    }

    #[actix_web::test]
    async fn scheme_alone_carries_no_token() {
        let mut headers = HeaderMap::new();
        for value in ["Bearer", "Bearer ", "bearer", "  BEARER\t "] {
            headers.insert(AUTHORIZATION, value.parse().unwrap());
            assert_eq!(bearer_token(&headers), None, "header {value:?}");
        }
    }

    #[actix_web::test]
    async fn scheme_matches_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc".to_string()));

        headers.insert(AUTHORIZATION, "BEARER\tabc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc".to_string()));

        // Not a scheme, just a token that starts with the same letters.
        headers.insert(AUTHORIZATION, "Bearerabc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("Bearerabc".to_string()));
    }

    #[actix_web::test]
    async fn bare_scheme_header_is_not_decoded() {
        assert_eq!(call_whoami(Some("Bearer".to_string())).await, serde_json::Value::Null);
        assert_eq!(call_whoami(Some("bearer   ".to_string())).await, serde_json::Value::Null);
    }
}
