//! Deterministic traffic allocation.
//!
//! Maps a visitor onto exactly one variation of a variation group,
//! respecting the declared traffic weights. Pure function of
//! `(visitorId, variationGroupId, variations)` — no state, no randomness —
//! so independent client runtimes agree on every assignment.

use crate::error::AllocationError;
use crate::model::{Variation, VariationGroup};
use crate::observability::{Event, EventSink};

use super::hash::murmur3_x86_32;

/// Seed shared by every client implementation.
const ALLOCATION_SEED: u32 = 0;

/// Computes the traffic bucket (0–99) for a visitor/group pair.
#[must_use]
pub fn bucket_of(visitor_id: &str, variation_group_id: &str) -> u32 {
    let mut key = Vec::with_capacity(visitor_id.len() + variation_group_id.len());
    key.extend_from_slice(visitor_id.as_bytes());
    key.extend_from_slice(variation_group_id.as_bytes());
    murmur3_x86_32(&key, ALLOCATION_SEED) % 100
}

/// Selects the variation of `group` the visitor falls into.
///
/// Validates the group's traffic sum, hashes the visitor onto a bucket, and
/// walks the variations in declared order accumulating ranges
/// `[start, start + allocation)` until one contains the bucket.
///
/// Emits a debug-level [`Event::HashComputed`] with the raw hash and bucket
/// for auditability.
///
/// # Errors
///
/// - [`AllocationError::InvalidTrafficSum`] if the group's allocations do
///   not sum to exactly 100; the group must be skipped, not retried.
/// - [`AllocationError::UnresolvedBucket`] if no range contains the bucket.
///   Unreachable when the sum invariant holds.
pub fn allocate<'a>(
    visitor_id: &str,
    group: &'a VariationGroup,
    sink: &dyn EventSink,
) -> Result<&'a Variation, AllocationError> {
    // Allocations are attacker-controlled u32s; sum in u64 so a crafted
    // pair cannot wrap back onto 100.
    let sum: u64 = group.variations.iter().map(|v| u64::from(v.allocation)).sum();
    if sum != 100 {
        return Err(AllocationError::InvalidTrafficSum {
            variation_group_id: group.id.clone(),
            sum,
        });
    }

    let mut key = Vec::with_capacity(visitor_id.len() + group.id.len());
    key.extend_from_slice(visitor_id.as_bytes());
    key.extend_from_slice(group.id.as_bytes());
    let hash = murmur3_x86_32(&key, ALLOCATION_SEED);
    let bucket = hash % 100;

    sink.emit(Event::HashComputed {
        visitor_id: visitor_id.to_owned(),
        variation_group_id: group.id.clone(),
        hash,
        bucket,
    });

    variation_for_bucket(bucket, &group.variations).ok_or_else(|| {
        AllocationError::UnresolvedBucket {
            visitor_id: visitor_id.to_owned(),
            variation_group_id: group.id.clone(),
            bucket,
        }
    })
}

/// Walks the declared variations accumulating allocation ranges and returns
/// the first one whose range contains `bucket`.
pub(crate) fn variation_for_bucket(bucket: u32, variations: &[Variation]) -> Option<&Variation> {
    let mut cumulative = 0_u32;
    for variation in variations {
        let end = cumulative + variation.allocation;
        if bucket >= cumulative && bucket < end {
            return Some(variation);
        }
        cumulative = end;
    }
    None
}
