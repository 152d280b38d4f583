use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

use crate::blockchain::{Blockchain, ChainError, PowParams};

/// Shared application state: one independent in-memory chain per demo slot,
/// each behind its own mutex (single writer per chain).
pub struct AppState {
    pub chains: Vec<Mutex<Blockchain>>,
    /// How long a request-scoped mine may run before it is cancelled.
    pub mine_timeout: Duration,
}

impl AppState {
    /// Mine a genesis block for each of `count` chains.
    pub fn new(params: PowParams, count: usize, mine_timeout: Duration) -> Result<Self, ChainError> {
        let mut chains = Vec::with_capacity(count);
        for _ in 0..count {
            chains.push(Mutex::new(Blockchain::new(params)?));
        }
        Ok(Self {
            chains,
            mine_timeout,
        })
    }
}

/* ---------- Views ---------- */

/// Presentation form of a block: hashes as lowercase hex, timestamp both
/// raw and formatted, payload as lossy UTF-8.
#[derive(Serialize)]
pub struct BlockView {
    pub index: u64,
    pub timestamp: i64,
    pub timestamp_utc: String,
    pub payload: String,
    pub previous_hash: String,
    pub hash: String,
    pub nonce: u64,
    pub valid_pow: bool,
    pub linked: bool,
}

pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn block_views(bc: &Blockchain) -> Vec<BlockView> {
    let pow = bc.validate_all();
    let linkage = bc.validate_linkage();
    bc.blocks()
        .iter()
        .zip(pow.into_iter().zip(linkage))
        .map(|(b, ((_, valid_pow), (_, linked)))| BlockView {
            index: b.index,
            timestamp: b.timestamp,
            timestamp_utc: format_timestamp(b.timestamp),
            payload: String::from_utf8_lossy(&b.payload).into_owned(),
            previous_hash: hex::encode(&b.previous_hash),
            hash: hex::encode(&b.hash),
            nonce: b.nonce,
            valid_pow,
            linked,
        })
        .collect()
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainSummary {
    pub id: usize,
    pub length: usize,
    pub difficulty_bits: u32,
    pub valid: bool,
}

#[derive(Serialize)]
pub struct ChainResponse {
    pub id: usize,
    pub length: usize,
    pub difficulty_bits: u32,
    pub blocks: Vec<BlockView>,
}

#[derive(Deserialize)]
pub struct AppendRequest {
    pub payload: String,
}

#[derive(Serialize)]
pub struct AppendResponse {
    pub index: u64,
    pub hash: String,
    pub nonce: u64,
}

#[derive(Deserialize)]
pub struct ResealRequest {
    pub payload: String,
}

#[derive(Serialize)]
pub struct ResealResponse {
    pub index: u64,
    pub hash: String,
    pub nonce: u64,
    /// Indices whose linkage the edit left broken.
    pub broken_links: Vec<u64>,
}

#[derive(Serialize)]
pub struct BlockCheck {
    pub index: u64,
    pub valid_pow: bool,
    pub linked: bool,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub blocks: Vec<BlockCheck>,
}

/* ---------- Digest API Models ---------- */

#[derive(Deserialize)]
pub struct DigestRequest {
    pub payload: String,
}

#[derive(Serialize)]
pub struct DigestResponse {
    pub payload: String,
    pub hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::PowParams;

    #[test]
    fn block_views_render_hex_and_flags() {
        let bc = Blockchain::new(PowParams::new(8)).unwrap();
        let views = block_views(&bc);
        assert_eq!(views.len(), 1);

        let v = &views[0];
        assert_eq!(v.index, 0);
        assert_eq!(v.payload, "first block");
        assert!(v.previous_hash.is_empty());
        assert_eq!(v.hash.len(), 64);
        assert!(v.hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(v.valid_pow);
        assert!(v.linked);

        let json = serde_json::to_value(v).unwrap();
        assert_eq!(json["hash"].as_str().unwrap().len(), 64);
    }
}
