use crate::{
    api::{attendance, config as lab_config, heartbeat},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP request budgets, built once and shared by every worker.
#[derive(Clone)]
pub struct RateLimits {
    public: LimiterConfig,
    protected: LimiterConfig,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            public: build_limiter(config.rate_public_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

fn build_limiter(requests_per_min: u32) -> anyhow::Result<LimiterConfig> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("Invalid rate limit of {requests_per_min} requests per minute"))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    let prefix = config.api_prefix.trim_end_matches('/');

    // Public kiosk endpoints, registered ahead of the gated scope
    cfg.service(
        web::resource(format!("{prefix}/attendance/check-in"))
            .wrap(Governor::new(&limits.public))
            .route(web::post().to(attendance::check_in)),
    )
    .service(
        web::resource(format!("{prefix}/attendance/check-out"))
            .wrap(Governor::new(&limits.public))
            .route(web::post().to(attendance::check_out)),
    );

    cfg.service(
        web::scope(&format!("{prefix}/heartbeat-status"))
            .wrap(Governor::new(&limits.public))
            .route("", web::get().to(heartbeat::status))
            .route("/history", web::get().to(heartbeat::history))
            .route("/reset", web::post().to(heartbeat::reset))
            .route("/manual", web::post().to(heartbeat::manual)),
    );

    // Protected routes
    cfg.service(
        web::scope(prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(&limits.protected)) // rate limiting
            .service(
                web::scope("/attendance")
                    .route("/check-in-user", web::post().to(attendance::check_in))
                    .route("/check-out-user", web::post().to(attendance::check_out))
                    .route("/list-active-users", web::get().to(attendance::list_active_users))
                    .route("/list-inactive-users", web::get().to(attendance::list_inactive_users))
                    .route("/list-all-users", web::get().to(attendance::list_all_users))
                    .route("/top-users", web::get().to(attendance::top_users))
                    .route("/lab-utilization", web::get().to(attendance::lab_utilization))
                    .route("/hourly-utilization", web::get().to(attendance::hourly_utilization))
                    .route("/monthly-utilization", web::get().to(attendance::monthly_utilization))
                    .route("/force-auto-checkout", web::post().to(attendance::force_auto_checkout)),
            )
            .service(
                web::scope("/config")
                    .route("/get-config", web::get().to(lab_config::get_config))
                    .route("/update-config", web::put().to(lab_config::update_config)),
            ),
    );
}
