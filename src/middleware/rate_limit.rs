//! Fixed-window throttling keyed by client address and, for some policies, by user.
//!
//! Every [`RateLimiter`] owns its counters behind an `Arc`, so the set built once in
//! `main` is shared by all HTTP workers and pruned by one background task per policy.

use std::{
    collections::HashMap,
    fmt,
    net::IpAddr,
    rc::Rc,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use chrono::{DateTime, Duration, Utc};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use uuid::Uuid;

use crate::{config::Config, handlers::shared::ApiResponse, services::auth::claims_from_request};

/// A named throttling rule
#[derive(Debug, Clone, PartialEq)]
pub struct LimitPolicy {
    pub name: &'static str,
    pub max_requests: u32,
    pub window: Duration,
    pub message: String,
    /// Also count requests per authenticated user
    pub per_user: bool,
}

impl LimitPolicy {
    pub fn new(name: &'static str, max_requests: u32, window_seconds: i64) -> Self {
        Self {
            name,
            max_requests,
            window: Duration::try_seconds(window_seconds.max(0)).unwrap_or(Duration::zero()),
            message: "Rate limit exceeded. Please try again later.".to_string(),
            per_user: false,
        }
    }

    pub fn message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }

    pub fn per_user(mut self) -> Self {
        self.per_user = true;
        self
    }

    pub fn general(per_minute: u32) -> Self {
        Self::new("general", per_minute, 60).per_user()
    }

    /// Membership and permission changes
    pub fn sensitive() -> Self {
        Self::new("sensitive", 20, 60)
            .message("Rate limit exceeded for sensitive operation. Please try again later.")
            .per_user()
    }

    pub fn login() -> Self {
        Self::new("login", 5, 300).message("Too many login attempts. Please try again in 5 minutes.")
    }

    pub fn registration() -> Self {
        Self::new("registration", 3, 3600)
            .message("Too many registration attempts. Please try again later.")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ClientKey {
    Addr(IpAddr),
    User(Uuid),
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKey::Addr(ip) => write!(f, "address {}", ip),
            ClientKey::User(id) => write!(f, "user {}", id),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: DateTime<Utc>,
    used: u32,
}

impl Window {
    fn open(now: DateTime<Utc>) -> Self {
        Self {
            opened_at: now,
            used: 1,
        }
    }

    fn is_closed(&self, span: Duration, now: DateTime<Utc>) -> bool {
        now - self.opened_at >= span
    }
}

/// One policy plus the counters it enforces. Clones share counters.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    policy: Arc<LimitPolicy>,
    windows: Arc<Mutex<HashMap<ClientKey, Window>>>,
}

impl RateLimiter {
    pub fn new(policy: LimitPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn policy(&self) -> &LimitPolicy {
        &self.policy
    }

    // A panic while holding the lock leaves counters usable
    fn windows(&self) -> MutexGuard<'_, HashMap<ClientKey, Window>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit_at(&self, key: ClientKey, now: DateTime<Utc>) -> bool {
        let mut windows = self.windows();
        match windows.get_mut(&key) {
            Some(window) if !window.is_closed(self.policy.window, now) => {
                if window.used >= self.policy.max_requests {
                    false
                } else {
                    window.used += 1;
                    true
                }
            }
            _ => {
                windows.insert(key, Window::open(now));
                true
            }
        }
    }

    fn admit(&self, key: ClientKey) -> bool {
        self.admit_at(key, Utc::now())
    }

    fn prune_at(&self, now: DateTime<Utc>) -> usize {
        let span = self.policy.window;
        let mut windows = self.windows();
        let before = windows.len();
        windows.retain(|_, window| !window.is_closed(span, now));
        before - windows.len()
    }

    /// Forget clients whose window has closed. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        self.prune_at(Utc::now())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows().len()
    }

    fn keys_for(&self, req: &ServiceRequest) -> Vec<ClientKey> {
        let mut keys = Vec::with_capacity(2);
        if let Some(addr) = req.peer_addr() {
            keys.push(ClientKey::Addr(addr.ip()));
        }
        // Only a valid token identifies a user
        if self.policy.per_user {
            if let Ok(claims) = claims_from_request(req.request()) {
                keys.push(ClientKey::User(claims.sub));
            }
        }
        keys
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitService {
            service: Rc::new(service),
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let limiter = self.limiter.clone();

        Box::pin(async move {
            for key in limiter.keys_for(&req) {
                if !limiter.admit(key) {
                    log::warn!("{} rate limit reached for {}", limiter.policy.name, key);
                    let response = HttpResponse::TooManyRequests()
                        .json(ApiResponse::<()>::error(&limiter.policy.message));
                    return Ok(req.into_response(response).map_into_right_body());
                }
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

/// Every limiter the app mounts, built once at startup
#[derive(Debug, Clone)]
pub struct RateLimiters {
    pub general: RateLimiter,
    pub sensitive: RateLimiter,
    pub login: RateLimiter,
    pub registration: RateLimiter,
}

impl RateLimiters {
    pub fn from_config(config: &Config) -> Self {
        Self {
            general: RateLimiter::new(LimitPolicy::general(config.rate_limit_per_minute)),
            sensitive: RateLimiter::new(LimitPolicy::sensitive()),
            login: RateLimiter::new(LimitPolicy::login()),
            registration: RateLimiter::new(LimitPolicy::registration()),
        }
    }

    pub fn all(&self) -> [&RateLimiter; 4] {
        [&self.general, &self.sensitive, &self.login, &self.registration]
    }

    /// Starts one pruning task per limiter. Needs a running Tokio runtime.
    pub fn spawn_pruning(&self, interval_seconds: u64) {
        for limiter in self.all() {
            tokio::spawn(prune_periodically(limiter.clone(), interval_seconds));
        }
    }
}

async fn prune_periodically(limiter: RateLimiter, interval_seconds: u64) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_seconds.max(1)));

    loop {
        interval.tick().await;
        let dropped = limiter.prune();
        if dropped > 0 {
            log::debug!("Pruned {} idle clients from the {} limiter", dropped, limiter.policy.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    fn addr(last_octet: u8) -> ClientKey {
        ClientKey::Addr(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet)))
    }

    #[test]
    fn test_blocks_once_window_is_used_up() {
        let limiter = RateLimiter::new(LimitPolicy::new("test", 2, 60));
        let now = Utc::now();

        assert!(limiter.admit_at(addr(1), now));
        assert!(limiter.admit_at(addr(1), now));
        assert!(!limiter.admit_at(addr(1), now));
        assert!(limiter.admit_at(addr(2), now));
    }

    #[test]
    fn test_users_and_addresses_are_counted_apart() {
        let limiter = RateLimiter::new(LimitPolicy::new("test", 1, 60).per_user());
        let (ana, ben) = (Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();

        assert!(limiter.admit_at(ClientKey::User(ana), now));
        assert!(!limiter.admit_at(ClientKey::User(ana), now));
        assert!(limiter.admit_at(ClientKey::User(ben), now));
        assert!(limiter.admit_at(addr(1), now));
    }

    #[test]
    fn test_window_reopens_after_it_closes() {
        let limiter = RateLimiter::new(LimitPolicy::new("test", 1, 60));
        let now = Utc::now();

        assert!(limiter.admit_at(addr(1), now));
        assert!(!limiter.admit_at(addr(1), now + Duration::seconds(59)));
        assert!(limiter.admit_at(addr(1), now + Duration::seconds(60)));
    }

    #[test]
    fn test_clones_share_counters() {
        let limiter = RateLimiter::new(LimitPolicy::login());
        let worker_a = limiter.clone();
        let worker_b = limiter.clone();
        let now = Utc::now();

        for _ in 0..3 {
            assert!(worker_a.admit_at(addr(7), now));
        }
        for _ in 0..2 {
            assert!(worker_b.admit_at(addr(7), now));
        }
        assert!(!worker_a.admit_at(addr(7), now));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_prune_uses_the_policy_window() {
        let limiter = RateLimiter::new(LimitPolicy::new("test", 5, 300));
        let now = Utc::now();

        limiter.admit_at(addr(1), now - Duration::seconds(400));
        limiter.admit_at(addr(2), now - Duration::seconds(100));

        assert_eq!(limiter.prune_at(now), 1);
        assert_eq!(limiter.tracked_clients(), 1);
        assert_eq!(limiter.prune_at(now + Duration::seconds(200)), 1);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_limiters_follow_config() {
        let limiters = RateLimiters::from_config(&Config::test_config());

        assert_eq!(
            limiters.general.policy().max_requests,
            Config::test_config().rate_limit_per_minute
        );
        assert!(limiters.general.policy().per_user);
        assert!(limiters.sensitive.policy().per_user);
        assert_eq!(limiters.login.policy().max_requests, 5);
        assert_eq!(limiters.login.policy().window, Duration::seconds(300));
        assert_eq!(limiters.registration.policy().max_requests, 3);
        assert!(!limiters.registration.policy().per_user);
    }
}
