use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};
use std::thread;
use std::time::{Duration, Instant};

use super::models::{
    AppState, AppendRequest, AppendResponse, BlockCheck, ChainResponse, ChainSummary,
    ResealRequest, ResealResponse, ValidateResponse, block_views,
};
use crate::blockchain::MineJob;

/// List every demo chain.
#[get("/chains/")]
pub async fn list_chains(state: web::Data<AppState>) -> impl Responder {
    let summaries: Vec<ChainSummary> = state
        .chains
        .iter()
        .enumerate()
        .map(|(id, chain)| {
            let bc = chain.lock().expect("mutex poisoned");
            ChainSummary {
                id,
                length: bc.len(),
                difficulty_bits: bc.params().difficulty_bits,
                valid: bc.is_valid_chain(),
            }
        })
        .collect();
    HttpResponse::Ok().json(summaries)
}

/// Full block listing for one chain.
#[get("/chains/{id}/")]
pub async fn get_chain(state: web::Data<AppState>, path: web::Path<usize>) -> impl Responder {
    let id = path.into_inner();
    let Some(chain) = state.chains.get(id) else {
        return HttpResponse::NotFound().body("no such chain");
    };
    let bc = chain.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ChainResponse {
        id,
        length: bc.len(),
        difficulty_bits: bc.params().difficulty_bits,
        blocks: block_views(&bc),
    })
}

/// Mine and append a block. The nonce search runs on its own thread, so the
/// chain lock is held only to snapshot the head and to admit the result.
#[post("/chains/{id}/blocks/")]
pub async fn append_block(
    state: web::Data<AppState>,
    path: web::Path<usize>,
    body: web::Json<AppendRequest>,
) -> impl Responder {
    let id = path.into_inner();
    let Some(chain) = state.chains.get(id) else {
        return HttpResponse::NotFound().body("no such chain");
    };

    let (index, previous_hash, params) = {
        let bc = chain.lock().expect("mutex poisoned");
        let last = bc.last_block();
        (last.index + 1, last.hash.clone(), bc.params())
    };

    let job = MineJob::spawn(index, body.payload.clone().into_bytes(), previous_hash, params);
    let deadline = Instant::now() + state.mine_timeout;
    while !job.is_finished() {
        if Instant::now() >= deadline {
            warn!("MINER - chain {id}: cancelling search after {:?}", state.mine_timeout);
            job.cancel();
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    let block = match job.join() {
        Ok(b) => b,
        Err(e) => {
            warn!("MINER - chain {id}: {e}");
            return HttpResponse::ServiceUnavailable().body(e.to_string());
        }
    };

    let mut bc = chain.lock().expect("mutex poisoned");
    match bc.append_mined(block) {
        Ok(b) => {
            info!(
                "MINER - chain {id}: sealed block #{} (hash={}, nonce={})",
                b.index,
                hex::encode(&b.hash),
                b.nonce
            );
            HttpResponse::Ok().json(AppendResponse {
                index: b.index,
                hash: hex::encode(&b.hash),
                nonce: b.nonce,
            })
        }
        Err(e) => {
            warn!("MINER - chain {id}: mined block rejected ({e})");
            HttpResponse::Conflict().body(e.to_string())
        }
    }
}

/// Edit a block in place: replace its payload and re-mine it. Successors
/// keep pointing at the old hash; the response lists what broke.
#[post("/chains/{id}/blocks/{index}/")]
pub async fn reseal_block(
    state: web::Data<AppState>,
    path: web::Path<(usize, u64)>,
    body: web::Json<ResealRequest>,
) -> impl Responder {
    let (id, index) = path.into_inner();
    let Some(chain) = state.chains.get(id) else {
        return HttpResponse::NotFound().body("no such chain");
    };

    let mut bc = chain.lock().expect("mutex poisoned");
    let (hash, nonce) = match bc.reseal(index, body.payload.clone().into_bytes()) {
        Ok(b) => (hex::encode(&b.hash), b.nonce),
        Err(e) => {
            warn!("EDIT - chain {id}: reseal of block #{index} rejected ({e})");
            return HttpResponse::BadRequest().body(e.to_string());
        }
    };
    let broken_links: Vec<u64> = bc
        .validate_linkage()
        .into_iter()
        .filter(|&(_, linked)| !linked)
        .map(|(i, _)| i)
        .collect();

    info!(
        "EDIT - chain {id}: resealed block #{index} ({} broken link(s) downstream)",
        broken_links.len()
    );
    HttpResponse::Ok().json(ResealResponse {
        index,
        hash,
        nonce,
        broken_links,
    })
}

/// Per-block audit flags for display.
#[get("/chains/{id}/validate/")]
pub async fn validate_chain(state: web::Data<AppState>, path: web::Path<usize>) -> impl Responder {
    let id = path.into_inner();
    let Some(chain) = state.chains.get(id) else {
        return HttpResponse::NotFound().body("no such chain");
    };
    let bc = chain.lock().expect("mutex poisoned");
    let blocks: Vec<BlockCheck> = bc
        .validate_all()
        .into_iter()
        .zip(bc.validate_linkage())
        .map(|((index, valid_pow), (_, linked))| BlockCheck {
            index,
            valid_pow,
            linked,
        })
        .collect();
    HttpResponse::Ok().json(ValidateResponse {
        valid: bc.is_valid_chain(),
        blocks,
    })
}
