use crate::middleware::auth_middleware::RequestAuth;
use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use log::{error, info, warn};
use std::{rc::Rc, time::Instant};

/// Principal label for log lines: the user id, `rejected` for a bad token, `anonymous` otherwise.
pub fn principal_label(auth: Option<&RequestAuth>) -> String {
    match auth.and_then(RequestAuth::get) {
        Some(result) => match result.claims() {
            Some(claims) => format!("user:{}", claims.id),
            None => "rejected".to_string(),
        },
        None => "anonymous".to_string(),
    }
}

// Request logger middleware
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestLoggerMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RequestLoggerMiddleware {
            service: Rc::new(service),
        })
    }
}

pub struct RequestLoggerMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let method = req.method().clone();
        let path = req.path().to_owned();

        let service = self.service.clone();
        Box::pin(async move {
            let res = service.call(req).await;
            let elapsed = start_time.elapsed();

            match &res {
                Ok(response) => {
                    // The auth context is attached further in, so read it on the way out.
                    let principal =
                        principal_label(response.request().extensions().get::<RequestAuth>());
                    let status = response.status();
                    if status.is_server_error() {
                        warn!(
                            "[CATALOG] {} {} - {} - Status: {} - Time: {:.2?}",
                            method,
                            path,
                            principal,
                            status.as_u16(),
                            elapsed
                        );
                    } else {
                        info!(
                            "[CATALOG] {} {} - {} - Status: {} - Time: {:.2?}",
                            method,
                            path,
                            principal,
                            status.as_u16(),
                            elapsed
                        );
                    }
                }
                Err(err) => {
                    error!(
                        "[CATALOG-ERROR] {} {} - Error: {} - Time: {:.2?}",
                        method, path, err, elapsed
                    );
                }
            }

            res
        })
    }
}
