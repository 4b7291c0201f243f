//! The pure sizing calculator (spec §4.1) and the container header laid
//! down as the first region of the caller's buffer.

use bytemuck::{Pod, Zeroable};
use core::mem::size_of;

use crate::tier::TierRecord;
use crate::config::TierSpec;
use crate::entity::{Entity, Entry, MAX_TIERS};
use crate::error::EntitytainerError;

/// Fixed-size header written as the first region of the buffer (spec §6,
/// layout item 1). Self-describing rather than pure padding: it records
/// the configuration the buffer was built with.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub(crate) struct ContainerHeader {
    pub num_tiers: u32,
    pub max_entities: u32,
}

/// Checks the constraints spec §4.1 places on a tier configuration:
/// at most [`MAX_TIERS`] tiers, strictly increasing bucket sizes, and
/// bucket sizes large enough to hold a freelist pointer once freed.
pub(crate) fn validate_tiers(tiers: &[TierSpec]) -> Result<(), EntitytainerError> {
    if tiers.len() > MAX_TIERS {
        return Err(EntitytainerError::TooManyTiers { got: tiers.len() });
    }
    for window in tiers.windows(2) {
        if window[1].bucket_size <= window[0].bucket_size {
            return Err(EntitytainerError::TierSizesNotIncreasing);
        }
    }
    for (index, tier) in tiers.iter().enumerate() {
        if (tier.bucket_size as usize) * size_of::<Entity>() < size_of::<i32>() {
            return Err(EntitytainerError::BucketTooSmall { tier: index as u8, bucket_size: tier.bucket_size });
        }
    }
    Ok(())
}

/// Computes the number of bytes a buffer must hold to construct a
/// container for `max_entities` entities with the given tier layout.
///
/// Pure and deterministic; does not allocate or touch any buffer.
pub fn needed_size(max_entities: usize, tiers: &[TierSpec]) -> Result<usize, EntitytainerError> {
    validate_tiers(tiers)?;

    let mut size = size_of::<ContainerHeader>();
    size += max_entities * size_of::<Entry>();
    size += max_entities * size_of::<Entity>();
    size += tiers.len() * size_of::<TierRecord>();
    for tier in tiers {
        size += tier.bucket_count as usize * tier.bucket_size as usize * size_of::<Entity>();
    }
    Ok(size)
}
