pub mod engagements;
pub mod trending;
pub mod wsroute;

use crate::metrics;
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(|| async { "OK" }))
        .route("/metrics", web::get().to(metrics::serve_metrics))
        .service(wsroute::ws_handler)
        .service(engagements::record_engagement)
        .service(engagements::remove_from_ranking)
        .service(trending::get_trending);
}
