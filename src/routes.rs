use crate::{
    api::{attendance, qr_codes, users},
    auth::handlers,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_cors::Cors;
use actix_web::{http::header, web};
use anyhow::anyhow;

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP quotas. Built once so every worker draws from the same buckets.
pub struct RateLimits {
    login: LimiterConfig,
    protected: LimiterConfig,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: limiter(config.rate_login_per_min, "RATE_LOGIN_PER_MIN")?,
            protected: limiter(config.rate_protected_per_min, "RATE_PROTECTED_PER_MIN")?,
        })
    }
}

fn limiter(requests_per_min: u32, name: &str) -> anyhow::Result<LimiterConfig> {
    if requests_per_min == 0 {
        return Err(anyhow!("{name} must be greater than zero"));
    }

    GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("{name} produced an invalid rate limit"))
}

/// Any origin may call the API from a browser with a bearer token.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods(["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(3600)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    // Public routes
    cfg.service(
        web::scope("/auth").service(
            web::resource("/login")
                .wrap(Governor::new(&limits.login))
                .route(web::post().to(handlers::login)),
        ),
    );

    // Protected routes; each handler authenticates through its AuthUser extractor
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(Governor::new(&limits.protected))
            .service(
                web::scope("/attendance")
                    .service(web::resource("").route(web::get().to(attendance::list_attendance)))
                    .service(web::resource("/check-in").route(web::post().to(attendance::check_in)))
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    ),
            )
            .service(
                web::scope("/users")
                    // /users
                    .service(
                        web::resource("")
                            .route(web::get().to(users::list_users))
                            .route(web::post().to(users::create_user)),
                    )
                    // /users/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(users::update_user))
                            .route(web::delete().to(users::delete_user)),
                    ),
            )
            .service(
                web::scope("/qr-codes")
                    // /qr-codes
                    .service(
                        web::resource("")
                            .route(web::get().to(qr_codes::list_qr_codes))
                            .route(web::post().to(qr_codes::create_qr_code)),
                    )
                    // /qr-codes/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(qr_codes::update_qr_code))
                            .route(web::delete().to(qr_codes::delete_qr_code)),
                    ),
            ),
    );
}
