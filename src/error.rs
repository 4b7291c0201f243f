//! Typed errors surfaced at the API boundary in place of the source's
//! assertions (spec §7: "implementations SHOULD surface these as distinct
//! error kinds").

use crate::entity::Entity;

#[cfg(feature = "std")]
use thiserror::Error;

/// Everything that can go wrong calling into an [`crate::Entitytainer`].
///
/// All variants are caller programming errors in the sense that none of
/// them are recovered internally; they exist so a host program can choose
/// how to react (log and skip, assert in debug builds, etc.) instead of
/// the whole process aborting.
#[cfg_attr(feature = "std", derive(Error))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitytainerError {
    /// `entity` is outside `[1, max_entities)`, or is the reserved `0`.
    #[cfg_attr(feature = "std", error("entity {0} is out of range"))]
    InvalidEntity(Entity),
    /// `add_entity` was called for an entity that already has a lookup
    /// entry.
    #[cfg_attr(feature = "std", error("entity {0} was already added"))]
    DuplicateAdd(Entity),
    /// The entity has no children bucket allocated (never added, or its
    /// bucket was released by `remove_entity`).
    #[cfg_attr(feature = "std", error("entity {0} has no children bucket allocated"))]
    NoChildrenBucket(Entity),
    /// `remove_child` was called but `child` is not in `parent`'s bucket.
    #[cfg_attr(feature = "std", error("entity {child} is not a child of entity {parent}"))]
    ChildNotPresent {
        /// The parent that was searched.
        parent: Entity,
        /// The child that was not found.
        child: Entity,
    },
    /// Up-migration was required but `tier` is already the top tier.
    #[cfg_attr(feature = "std", error("tier {tier} is already the top tier, cannot migrate up"))]
    CapacityExceeded {
        /// The tier that would have needed to migrate.
        tier: u8,
    },
    /// A tier has no bucket available, neither on its freelist nor by
    /// bump allocation.
    #[cfg_attr(feature = "std", error("tier {tier} has no free buckets"))]
    TierExhausted {
        /// The tier that ran out of buckets.
        tier: u8,
    },
    /// The supplied buffer is smaller than [`crate::needed_size`] computes
    /// for the given configuration.
    #[cfg_attr(feature = "std", error("buffer too small: need at least {needed} bytes, got {actual}"))]
    BufferTooSmall {
        /// Bytes required.
        needed: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// The supplied buffer's start address does not satisfy the alignment
    /// required to reinterpret it as the container's typed regions.
    #[cfg_attr(feature = "std", error("buffer is not sufficiently aligned"))]
    BufferMisaligned,
    /// More tiers were supplied than an [`crate::entity::Entry`] can
    /// address (see [`crate::entity::MAX_TIERS`]).
    #[cfg_attr(feature = "std", error("at most {} tiers are supported, got {got}", crate::entity::MAX_TIERS))]
    TooManyTiers {
        /// Number of tiers that was supplied.
        got: usize,
    },
    /// Tier bucket sizes were not supplied in strictly increasing order.
    #[cfg_attr(feature = "std", error("tier bucket sizes must be strictly increasing"))]
    TierSizesNotIncreasing,
    /// A tier's bucket size is too small to ever hold a freelist `next`
    /// pointer once freed.
    #[cfg_attr(
        feature = "std",
        error("tier {tier} bucket size {bucket_size} cannot hold a freelist pointer")
    )]
    BucketTooSmall {
        /// Index of the offending tier.
        tier: u8,
        /// The bucket size that was too small.
        bucket_size: u32,
    },
}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for EntitytainerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::InvalidEntity(e) => write!(f, "entity {e} is out of range"),
            Self::DuplicateAdd(e) => write!(f, "entity {e} was already added"),
            Self::NoChildrenBucket(e) => write!(f, "entity {e} has no children bucket allocated"),
            Self::ChildNotPresent { parent, child } => {
                write!(f, "entity {child} is not a child of entity {parent}")
            }
            Self::CapacityExceeded { tier } => {
                write!(f, "tier {tier} is already the top tier, cannot migrate up")
            }
            Self::TierExhausted { tier } => write!(f, "tier {tier} has no free buckets"),
            Self::BufferTooSmall { needed, actual } => {
                write!(f, "buffer too small: need at least {needed} bytes, got {actual}")
            }
            Self::BufferMisaligned => write!(f, "buffer is not sufficiently aligned"),
            Self::TooManyTiers { got } => {
                write!(f, "at most {} tiers are supported, got {got}", crate::entity::MAX_TIERS)
            }
            Self::TierSizesNotIncreasing => write!(f, "tier bucket sizes must be strictly increasing"),
            Self::BucketTooSmall { tier, bucket_size } => {
                write!(f, "tier {tier} bucket size {bucket_size} cannot hold a freelist pointer")
            }
        }
    }
}

/// Shorthand for `Result<T, EntitytainerError>`.
pub type Result<T> = core::result::Result<T, EntitytainerError>;
