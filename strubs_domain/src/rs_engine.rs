// /////////////////////////////////////////////////////////////////////////////
// STRUBS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Reed-Solomon Engine
//!
//! A thin, stateless wrapper around `reed_solomon_simd` (§4.3). Slot
//! indices `0..K` name data shards, `K..K+M` name parity shards; the engine
//! never reorders them, since slot index determines codeword position.
//!
//! Both `encode` and `reconstruct` are pure functions of their inputs: equal
//! inputs yield equal outputs, and the engine holds no state across calls,
//! so it is safe to call concurrently from multiple stripes in flight.

use reed_solomon_simd::{ReedSolomonDecoder, ReedSolomonEncoder};

use crate::error::StrubsError;

/// `reed_solomon_simd` requires every shard to be a non-zero multiple of 64
/// bytes. Callers deal in logical shard lengths (`D`, or a verifier's
/// payload length) that rarely satisfy this, so every encode/decode in this
/// module pads up to this boundary internally and trims back before
/// returning.
fn padded_shard_len(len: usize) -> usize {
    if len == 0 {
        return 64;
    }
    let rem = len % 64;
    if rem == 0 {
        len
    } else {
        len + (64 - rem)
    }
}

/// Computes `M` parity buffers from `K` equal-length data buffers (§4.3).
///
/// One call encodes one stripe of size `K * shard_len`. All `data_shards`
/// must have the same length; this is the caller's (the write pipeline's)
/// responsibility since it already zero-pads the final stripe to
/// `sliceDataSize` before calling.
pub fn encode(data_shards: &[Vec<u8>], parity_count: usize) -> Result<Vec<Vec<u8>>, StrubsError> {
    if data_shards.is_empty() {
        return Err(StrubsError::internal("rs encode: no data shards given"));
    }
    let shard_len = data_shards[0].len();
    if data_shards.iter().any(|s| s.len() != shard_len) {
        return Err(StrubsError::internal("rs encode: data shards are not equal length"));
    }

    let padded_len = padded_shard_len(shard_len);

    let mut encoder = ReedSolomonEncoder::new(data_shards.len(), parity_count, padded_len)
        .map_err(|e| StrubsError::internal(format!("rs encoder init failed: {e}")))?;
    for shard in data_shards {
        let mut padded = shard.clone();
        padded.resize(padded_len, 0);
        encoder
            .add_original_shard(&padded)
            .map_err(|e| StrubsError::internal(format!("rs encoder add shard failed: {e}")))?;
    }
    let result = encoder.encode().map_err(|e| StrubsError::internal(format!("rs encode failed: {e}")))?;
    Ok(result.recovery_iter().map(|shard| shard[..shard_len].to_vec()).collect())
}

/// Reconstructs missing slots given any `K` surviving slots out of `K+M`
/// (§4.3). `slots[i]` is `Some(bytes)` for present slots and `None` for
/// missing ones; slots `0..k` are data, `k..k+m` are parity. On success,
/// every previously-`None` entry for which reconstruction was requested is
/// filled in.
///
/// Fails with `EUNRECOVERABLE` if fewer than `k` slots are present.
pub fn reconstruct(k: usize, m: usize, shard_len: usize, slots: &mut [Option<Vec<u8>>]) -> Result<(), StrubsError> {
    if slots.len() != k + m {
        return Err(StrubsError::internal("rs reconstruct: slot count does not match k+m"));
    }
    let present = slots.iter().filter(|s| s.is_some()).count();
    if present < k {
        return Err(StrubsError::Unrecoverable { present, k });
    }

    let missing_data: Vec<usize> = (0..k).filter(|&i| slots[i].is_none()).collect();
    if missing_data.is_empty() {
        return reconstruct_missing_parity(k, m, shard_len, slots);
    }

    let padded_len = padded_shard_len(shard_len);

    let mut decoder = ReedSolomonDecoder::new(k, m, padded_len)
        .map_err(|e| StrubsError::internal(format!("rs decoder init failed: {e}")))?;
    for i in 0..k {
        if let Some(bytes) = &slots[i] {
            let mut padded = bytes.clone();
            padded.resize(padded_len, 0);
            decoder
                .add_original_shard(i, &padded)
                .map_err(|e| StrubsError::internal(format!("rs decoder add original failed: {e}")))?;
        }
    }
    for i in 0..m {
        if let Some(bytes) = &slots[k + i] {
            let mut padded = bytes.clone();
            padded.resize(padded_len, 0);
            decoder
                .add_recovery_shard(i, &padded)
                .map_err(|e| StrubsError::internal(format!("rs decoder add recovery failed: {e}")))?;
        }
    }
    let result = decoder.decode().map_err(|e| StrubsError::internal(format!("rs decode failed: {e}")))?;
    for (index, bytes) in result.restored_original_iter() {
        slots[index] = Some(bytes[..shard_len].to_vec());
    }

    reconstruct_missing_parity(k, m, shard_len, slots)
}

/// After all data slots are present (recovered or never missing), any
/// still-missing parity slot can only be recovered by re-running the
/// forward encode over the now-complete data set.
fn reconstruct_missing_parity(k: usize, m: usize, shard_len: usize, slots: &mut [Option<Vec<u8>>]) -> Result<(), StrubsError> {
    let missing_parity: Vec<usize> = (0..m).filter(|&i| slots[k + i].is_none()).collect();
    if missing_parity.is_empty() {
        return Ok(());
    }
    let data_shards: Vec<Vec<u8>> = (0..k)
        .map(|i| slots[i].clone().unwrap_or_else(|| vec![0u8; shard_len]))
        .collect();
    let recomputed = encode(&data_shards, m)?;
    for i in missing_parity {
        slots[k + i] = Some(recomputed[i].clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_shards(k: usize, len: usize) -> Vec<Vec<u8>> {
        (0..k).map(|i| vec![(i + 1) as u8; len]).collect()
    }

    #[test]
    fn encode_is_deterministic() {
        let shards = sample_shards(4, 256);
        let a = encode(&shards, 2).unwrap();
        let b = encode(&shards, 2).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn reconstructs_single_missing_data_slot() {
        let data = sample_shards(4, 256);
        let parity = encode(&data, 2).unwrap();
        let mut slots: Vec<Option<Vec<u8>>> = data.iter().cloned().map(Some).chain(parity.iter().cloned().map(Some)).collect();
        let original = slots[1].clone();
        slots[1] = None;
        reconstruct(4, 2, 256, &mut slots).unwrap();
        assert_eq!(slots[1], original);
    }

    #[test]
    fn reconstructs_two_missing_slots_when_m_is_two() {
        let data = sample_shards(4, 256);
        let parity = encode(&data, 2).unwrap();
        let mut slots: Vec<Option<Vec<u8>>> = data.iter().cloned().map(Some).chain(parity.iter().cloned().map(Some)).collect();
        let (d0, d3) = (slots[0].clone(), slots[3].clone());
        slots[0] = None;
        slots[3] = None;
        reconstruct(4, 2, 256, &mut slots).unwrap();
        assert_eq!(slots[0], d0);
        assert_eq!(slots[3], d3);
    }

    #[test]
    fn fails_unrecoverable_when_too_few_present() {
        let data = sample_shards(4, 256);
        let parity = encode(&data, 2).unwrap();
        let mut slots: Vec<Option<Vec<u8>>> = data.iter().cloned().map(Some).chain(parity.iter().cloned().map(Some)).collect();
        slots[0] = None;
        slots[1] = None;
        slots[2] = None;
        let err = reconstruct(4, 2, 256, &mut slots).unwrap_err();
        assert_eq!(err.code(), "EUNRECOVERABLE");
    }

    #[test]
    fn recovers_missing_parity_from_complete_data() {
        let data = sample_shards(4, 256);
        let parity = encode(&data, 2).unwrap();
        let mut slots: Vec<Option<Vec<u8>>> = data.iter().cloned().map(Some).chain(parity.iter().cloned().map(Some)).collect();
        slots[5] = None;
        reconstruct(4, 2, 256, &mut slots).unwrap();
        assert_eq!(slots[5], Some(parity[1].clone()));
    }

    #[test]
    fn shard_lengths_need_not_be_multiples_of_64() {
        let data = sample_shards(4, 112);
        let parity = encode(&data, 2).unwrap();
        assert_eq!(parity[0].len(), 112);

        let mut slots: Vec<Option<Vec<u8>>> = data.iter().cloned().map(Some).chain(parity.iter().cloned().map(Some)).collect();
        let original = slots[2].clone();
        slots[2] = None;
        reconstruct(4, 2, 112, &mut slots).unwrap();
        assert_eq!(slots[2], original);
    }

    #[test]
    fn encode_handles_shard_len_below_64() {
        let data = sample_shards(2, 5);
        let parity = encode(&data, 1).unwrap();
        assert_eq!(parity[0].len(), 5);
    }
}
