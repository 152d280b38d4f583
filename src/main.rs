mod api;
mod blockchain;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use api::AppState;
use blockchain::{HashSchema, INTERACTIVE_DIFFICULTY_BITS, MAX_INTERACTIVE_BITS, PowParams};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);

    let bits: u32 = env::var("POW_BITS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|b| (1..=MAX_INTERACTIVE_BITS).contains(b))
        .unwrap_or(INTERACTIVE_DIFFICULTY_BITS);
    let schema = match env::var("POW_SCHEMA").as_deref() {
        Ok("v1") => HashSchema::V1,
        _ => HashSchema::V2,
    };
    let chain_count: usize = env::var("CHAINS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&n| n >= 1)
        .unwrap_or(3);

    let mut params = PowParams::new(bits).with_schema(schema);
    if let Some(max) = env::var("POW_MAX_ITERS").ok().and_then(|v| v.parse().ok()) {
        params = params.with_max_iterations(max);
    }
    let mine_timeout = Duration::from_millis(
        env::var("MINE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30_000),
    );

    println!(
        "⛓️ Starting hash-chain demo API at http://{host}:{port} ({bits} difficulty bits, {chain_count} chains)"
    );

    let state = web::Data::new(
        AppState::new(params, chain_count, mine_timeout).expect("mine genesis blocks"),
    );

    // Seed each demo chain so the listing has something to show.
    for payload in ["data1", "data2"] {
        for chain in &state.chains {
            let mut bc = chain.lock().expect("mutex poisoned");
            bc.append(payload.as_bytes().to_vec()).expect("seed demo block");
        }
    }

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
