use actix_web::{HttpResponse, Responder, post, web};
use sha2::{Digest, Sha256};

use super::models::{DigestRequest, DigestResponse};

/// Ad-hoc SHA-256 of a posted payload (the hash playground).
#[post("/digest/")]
pub async fn compute_digest(body: web::Json<DigestRequest>) -> impl Responder {
    let digest = Sha256::digest(body.payload.as_bytes());
    HttpResponse::Ok().json(DigestResponse {
        payload: body.payload.clone(),
        hash: hex::encode(digest),
    })
}
