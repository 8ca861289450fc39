use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::{Ready, ready};

use super::request_id::CorrelationId;

/// Client details attached to activity log entries
#[derive(Clone, Debug)]
pub struct RequestInfo {
    pub user_agent: String,
    pub ip_address: String,
    pub method: String,
    pub path: String,
    pub correlation_id: Option<String>,
}

impl RequestInfo {
    pub fn from_http_request(req: &HttpRequest) -> Self {
        RequestInfo {
            user_agent: req
                .headers()
                .get("user-agent")
                .and_then(|h| h.to_str().ok())
                .unwrap_or("unknown")
                .to_string(),
            ip_address: req
                .connection_info()
                .realip_remote_addr()
                .map(strip_port)
                .unwrap_or_else(|| "unknown".to_string()),
            method: req.method().to_string(),
            path: req.path().to_string(),
            correlation_id: req.extensions().get::<CorrelationId>().map(|id| id.0.clone()),
        }
    }
}

/// `1.2.3.4:5678` becomes `1.2.3.4`; bracketed IPv6 loses its brackets and port
fn strip_port(addr: &str) -> String {
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest).to_string();
    }
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            host.to_string()
        }
        _ => addr.to_string(),
    }
}

impl FromRequest for RequestInfo {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // Set by the middleware; built on the spot otherwise
        if let Some(request_info) = req.extensions().get::<RequestInfo>() {
            return ready(Ok(request_info.clone()));
        }
        ready(Ok(RequestInfo::from_http_request(req)))
    }
}

pub struct RequestInfoMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RequestInfoMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestInfoMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestInfoMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestInfoMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestInfoMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let request_info = RequestInfo::from_http_request(req.request());
            req.extensions_mut().insert(request_info);

            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("10.0.0.1:8080"), "10.0.0.1");
        assert_eq!(strip_port("10.0.0.1"), "10.0.0.1");
        assert_eq!(strip_port("[::1]:8080"), "::1");
        assert_eq!(strip_port("::1"), "::1");
    }

    #[actix_web::test]
    async fn test_extracts_user_agent_without_middleware() {
        let req = actix_web::test::TestRequest::get()
            .uri("/api/v1/workers")
            .insert_header(("user-agent", "curl/8.0"))
            .peer_addr("192.168.1.9:4000".parse().unwrap())
            .to_http_request();

        let info = RequestInfo::extract(&req).await.unwrap();
        assert_eq!(info.user_agent, "curl/8.0");
        assert_eq!(info.ip_address, "192.168.1.9");
        assert_eq!(info.method, "GET");
        assert_eq!(info.path, "/api/v1/workers");
        assert_eq!(info.correlation_id, None);
    }
}
