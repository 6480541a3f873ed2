use crate::{api::router, config::Config};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, Responder, get, web};
use std::sync::Arc;
use tracing::warn;

// Per-route limiter, one request every 60s / n with a burst of n
fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    match GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
    {
        Some(cfg) => Some(Governor::new(&cfg)),
        None => {
            warn!(requests_per_min, "Invalid rate limit, exec endpoint is unlimited");
            None
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let scope = web::scope(&config.api_prefix);
    let exec = web::resource("/exec").route(web::post().to(router::exec));

    // Public, rate limited per client IP
    match build_limiter(config.rate_exec_per_min) {
        Some(limiter) => cfg.service(scope.service(exec.wrap(Arc::new(limiter)))),
        None => cfg.service(scope.service(exec)),
    };
    cfg.service(health);
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Process is up", body = String)),
    tag = "Health"
)]
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}
