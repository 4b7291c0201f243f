//! Tier metadata and the freelist-or-bump bucket allocator that operates
//! on a tier's raw `Entity` slab.
//!
//! A live bucket's slot 0 holds its child count; a free bucket's first
//! two slots are reinterpreted as an `i32` "next free bucket" pointer
//! (spec §3, "Bucket"). This module is the only place that performs that
//! reinterpretation.

use bytemuck::{Pod, Zeroable};
use core::mem::size_of;

use crate::entity::Entity;
use crate::error::EntitytainerError;

/// Sentinel terminating a tier's freelist chain.
pub(crate) const NO_FREE_BUCKET: i32 = -1;

/// Per-tier metadata, stored directly in the caller's buffer.
///
/// Tier 0 starts with `used_buckets = 1` to reserve bucket index 0, so
/// that no parent ever legitimately decodes to the all-zero `Entry`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct TierRecord {
    pub bucket_size: u32,
    pub total_buckets: u32,
    pub used_buckets: u32,
    pub first_free_bucket: i32,
}

impl TierRecord {
    /// Number of buckets that are neither bump-allocated nor held live.
    pub(crate) fn free_buckets(&self) -> u32 {
        self.total_buckets - self.used_buckets
    }
}

/// How many `Entity` slots a freelist `next` pointer occupies. Tier
/// construction asserts `bucket_size` is at least this large.
pub(crate) const FREE_NEXT_SLOTS: usize = size_of::<i32>() / size_of::<Entity>();

fn read_free_next(bucket: &[Entity]) -> i32 {
    let raw: &[i32] = bytemuck::cast_slice(&bucket[..FREE_NEXT_SLOTS]);
    raw[0]
}

fn write_free_next(bucket: &mut [Entity], next: i32) {
    let raw: &mut [i32] = bytemuck::cast_slice_mut(&mut bucket[..FREE_NEXT_SLOTS]);
    raw[0] = next;
}

/// Draws a bucket from `tier`'s freelist, or bump-allocates one if the
/// freelist is empty. Resets the drawn bucket's count slot to zero.
pub(crate) fn alloc_bucket(
    tier: &mut TierRecord,
    slab: &mut [Entity],
    tier_index: u8,
) -> Result<u32, EntitytainerError> {
    let bucket_size = tier.bucket_size as usize;
    let index = if tier.first_free_bucket != NO_FREE_BUCKET {
        let free = tier.first_free_bucket as u32;
        let offset = free as usize * bucket_size;
        tier.first_free_bucket = read_free_next(&slab[offset..offset + bucket_size]);
        free
    } else {
        if tier.used_buckets >= tier.total_buckets {
            return Err(EntitytainerError::TierExhausted { tier: tier_index });
        }
        tier.used_buckets
    };
    tier.used_buckets += 1;
    let offset = index as usize * bucket_size;
    slab[offset] = 0;
    Ok(index)
}

/// Pushes `bucket_index` onto `tier`'s freelist.
///
/// The source leaves a migration's vacated bucket un-freelisted, which
/// leaks bucket slots (spec §9, "Open questions / likely source bugs").
/// This crate always calls `free_bucket` on the source side of a
/// migration, as the spec recommends.
pub(crate) fn free_bucket(tier: &mut TierRecord, slab: &mut [Entity], bucket_index: u32) {
    let bucket_size = tier.bucket_size as usize;
    let offset = bucket_index as usize * bucket_size;
    write_free_next(&mut slab[offset..offset + bucket_size], tier.first_free_bucket);
    tier.first_free_bucket = bucket_index as i32;
    tier.used_buckets -= 1;
}
