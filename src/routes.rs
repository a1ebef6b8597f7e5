use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use anyhow::Context;

use crate::{
    api::{departments, health, names, schedule, session},
    config::Config,
};

type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-route rate limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    view: Arc<Limiter>,
    export: Arc<Limiter>,
}

impl Limiters {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            view: Arc::new(build_limiter(config.rate_view_per_min).context("view limiter")?),
            export: Arc::new(build_limiter(config.rate_export_per_min).context("export limiter")?),
        })
    }
}

fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("invalid rate limit configuration")?;
    Ok(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: Limiters) {
    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/schedule")
                    .wrap(limiters.view.clone())
                    // /schedule
                    .service(
                        web::resource("")
                            .route(web::get().to(schedule::get_schedule))
                            .route(web::delete().to(schedule::close_view)),
                    )
                    .service(web::resource("/load").route(web::post().to(schedule::load_schedule)))
                    .service(web::resource("/page").route(web::post().to(schedule::go_to_page)))
                    .service(web::resource("/per-page").route(web::post().to(schedule::set_per_page)))
                    .service(web::resource("/retry").route(web::post().to(schedule::retry)))
                    .service(web::resource("/filter").route(web::put().to(schedule::update_filter)))
                    .service(web::resource("/sort").route(web::post().to(schedule::cycle_sort)))
                    // /schedule/expand/{employee_id}
                    .service(
                        web::resource("/expand/{employee_id}")
                            .route(web::post().to(schedule::toggle_expanded)),
                    )
                    // /schedule/export, also counted against the export limit
                    .service(
                        web::resource("/export")
                            .wrap(limiters.export.clone())
                            .route(web::get().to(schedule::export_schedule)),
                    ),
            )
            .service(
                web::resource("/departments")
                    .wrap(limiters.view.clone())
                    .route(web::get().to(departments::list_departments)),
            )
            .service(
                web::scope("/names")
                    .wrap(limiters.view.clone())
                    .service(web::resource("/match").route(web::post().to(names::match_names)))
                    .service(web::resource("/apply").route(web::post().to(names::apply_names))),
            )
            .service(
                web::scope("/session")
                    .service(web::resource("").route(web::get().to(session::session_info)))
                    .service(
                        web::resource("/token")
                            .route(web::put().to(session::set_token))
                            .route(web::delete().to(session::clear_token)),
                    )
                    // /session/instructions/{key}
                    .service(
                        web::resource("/instructions/{key}")
                            .route(web::get().to(session::instruction_status)),
                    )
                    .service(
                        web::resource("/instructions/{key}/seen")
                            .route(web::post().to(session::mark_instruction_seen)),
                    ),
            )
            .service(web::resource("/health/log").route(web::get().to(health::health_log))),
    );
}
