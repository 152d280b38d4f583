mod chain;
mod digest;
mod health;
pub mod models;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::list_chains)
            .service(chain::get_chain)
            .service(chain::append_block)
            .service(chain::reseal_block)
            .service(chain::validate_chain)
            .service(digest::compute_digest),
    );
}
