//! # Demo Workload
//!
//! Operations the dashboard services submit through the pool: token swaps,
//! NFT purchases and compliance attestations. Payloads are shaped like
//! contract calls (4-byte selector + 32-byte words) but never executed.

use sha2::{Digest, Sha256};
use shared_types::{Address, ChainId, GasSettings, Hash, Priority, RecordId, SubmissionRequest, U256};
use tracing::info;
use tx_pool::{PoolError, SubmissionPool};

const GWEI: u64 = 1_000_000_000;

/// Deterministic address for a named demo account.
pub fn demo_address(name: &str) -> Address {
    let digest = Sha256::digest(name.as_bytes());
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[..20]);
    address
}

/// First four bytes of the hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Sha256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

fn encode_call(signature: &str, words: &[[u8; 32]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32 * words.len());
    data.extend_from_slice(&selector(signature));
    for word in words {
        data.extend_from_slice(word);
    }
    data
}

fn word_u256(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

fn word_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}

fn gas(limit: u64, max_fee_gwei: u64, tip_gwei: u64) -> GasSettings {
    GasSettings {
        gas_limit: Some(U256::from(limit)),
        gas_price: None,
        max_fee_per_gas: Some(U256::from(max_fee_gwei) * U256::from(GWEI)),
        max_priority_fee_per_gas: Some(U256::from(tip_gwei) * U256::from(GWEI)),
    }
}

/// Token swap through a DEX router. Time-sensitive, so High priority.
pub fn dex_swap(
    chain_id: ChainId,
    signer: Address,
    router: Address,
    amount_in: U256,
    min_amount_out: U256,
) -> SubmissionRequest {
    let data = encode_call(
        "swapExactTokensForTokens(uint256,uint256,address)",
        &[word_u256(amount_in), word_u256(min_amount_out), word_address(&signer)],
    );
    SubmissionRequest::new(chain_id, signer)
        .to(router)
        .data(data)
        .gas(gas(250_000, 40, 2))
        .priority(Priority::High)
        .label("dex-swap")
}

/// NFT purchase on a marketplace; `price` travels as the call value.
pub fn nft_purchase(
    chain_id: ChainId,
    signer: Address,
    marketplace: Address,
    token_id: U256,
    price: U256,
) -> SubmissionRequest {
    let data = encode_call("buy(uint256)", &[word_u256(token_id)]);
    SubmissionRequest::new(chain_id, signer)
        .to(marketplace)
        .value(price)
        .data(data)
        .gas(gas(180_000, 35, 1))
        .priority(Priority::Normal)
        .label("nft-purchase")
}

/// Compliance attestation anchoring a document digest. Not urgent.
pub fn compliance_attestation(
    chain_id: ChainId,
    signer: Address,
    registry: Address,
    subject_digest: Hash,
) -> SubmissionRequest {
    let data = encode_call("attest(bytes32)", &[subject_digest]);
    SubmissionRequest::new(chain_id, signer)
        .to(registry)
        .data(data)
        .gas(gas(90_000, 30, 1))
        .priority(Priority::Low)
        .label("compliance-attestation")
}

/// One caller's round: swap, then a purchase, then an attestation that
/// waits for the swap to confirm.
pub fn enqueue_round(
    pool: &SubmissionPool,
    chain_id: ChainId,
    caller: &str,
    round: usize,
) -> Result<Vec<RecordId>, PoolError> {
    let signer = demo_address(caller);
    let amount = U256::from(round as u64 + 1) * U256::exp10(18);

    let swap = pool.enqueue(dex_swap(
        chain_id,
        signer,
        demo_address("dex-router"),
        amount,
        amount * U256::from(98u64) / U256::from(100u64),
    ))?;

    let purchase = pool.enqueue(nft_purchase(
        chain_id,
        signer,
        demo_address("nft-marketplace"),
        U256::from(round as u64),
        U256::exp10(17),
    ))?;

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::digest(format!("{caller}/kyc/{round}").as_bytes()));
    let attestation = pool.enqueue(
        compliance_attestation(chain_id, signer, demo_address("attestation-registry"), digest)
            .depends_on(swap),
    )?;

    Ok(vec![swap, purchase, attestation])
}

/// Enqueue `rounds` rounds for every caller.
pub fn enqueue_demo(
    pool: &SubmissionPool,
    chain_id: ChainId,
    callers: &[&str],
    rounds: usize,
) -> Result<Vec<RecordId>, PoolError> {
    let mut ids = Vec::with_capacity(callers.len() * rounds * 3);
    for round in 0..rounds {
        for caller in callers {
            ids.extend(enqueue_round(pool, chain_id, caller, round)?);
        }
    }
    info!(
        records = ids.len(),
        callers = callers.len(),
        rounds = rounds,
        "Demo workload enqueued"
    );
    Ok(ids)
}
