//! # entitytainer
//!
//! An embeddable data structure for one-to-many parent→child relationships
//! between small integer entity ids, backed by a single contiguous buffer
//! supplied by the caller.
//!
//! ## Description
//!
//! Its target use is interactive, game-like workloads: attachment
//! hierarchies (holding a weapon in a hand), containment (a potion in a
//! bag in a backpack), organizational trees. For each parent the
//! container holds an ordered list of children; for each child it
//! remembers its current parent.
//!
//! ## Under the Hood
//!
//! The container never allocates. At construction time the caller hands
//! it one buffer, sized by [`needed_size`], and every mutation operates
//! within that buffer. Each parent owns exactly one *bucket* drawn from
//! one of a small number of size *tiers*; when a parent's child count
//! would make its bucket indistinguishable from "full", its bucket
//! *migrates* to the next tier up (and, symmetrically, migrates back down
//! on removal). A 16-bit [`Entry`] word records which tier and which
//! bucket a parent currently lives in, so looking up a parent's children
//! is one array read plus one decode, regardless of how many times that
//! parent's bucket has migrated over its lifetime.
//!
//! This is comparable to a small per-parent `Vec<Entity>` but with no
//! per-insert heap traffic: growth is migration between fixed-size tiers
//! instead of reallocation.
//!
//! ## Example
//!
//! ```
//! use entitytainer::{needed_size, Entitytainer, TierSpec};
//!
//! let tiers = [TierSpec::new(4, 4), TierSpec::new(16, 2), TierSpec::new(256, 2)];
//! let max_entities = 1024;
//! let size = needed_size(max_entities, &tiers).unwrap();
//! let mut memory = vec![0u8; size];
//! let mut container = Entitytainer::create(&mut memory, max_entities, &tiers).unwrap();
//!
//! container.add_entity(3).unwrap();
//! container.add_child(3, 10).unwrap();
//! assert_eq!(container.num_children(3).unwrap(), 1);
//! assert_eq!(&*container.get_children(3).unwrap(), &[10][..]);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

mod config;
mod entity;
mod error;
mod iter;
mod sizing;
mod tier;

#[cfg(test)]
mod tests;

use core::mem::size_of;

pub use self::{
    config::{ReallocThreshold, TierSpec},
    entity::{Entity, Entry, MAX_BUCKETS_PER_TIER, MAX_TIERS, NONE_ENTITY},
    error::{EntitytainerError, Result},
    iter::Children,
    sizing::needed_size,
};

use self::sizing::ContainerHeader;
use self::tier::TierRecord;

/// A one-to-many parent→child relationship container living entirely
/// inside a caller-supplied buffer.
///
/// Construct with [`Entitytainer::create`]. The container borrows the
/// buffer for `'a`; the borrow checker is what enforces spec §5's
/// "caller serializes all accesses" rule — two live containers over the
/// same buffer, or a container outliving its buffer, cannot happen.
pub struct Entitytainer<'a> {
    header: &'a mut ContainerHeader,
    forward: &'a mut [Entry],
    reverse: &'a mut [Entity],
    tiers: &'a mut [TierRecord],
    slabs: Vec<&'a mut [Entity]>,
}

impl<'a> Entitytainer<'a> {
    /// Places a new container inside `buffer`.
    ///
    /// `buffer` must be at least [`needed_size`] bytes for the same
    /// `max_entities`/`tiers`, and its first byte must be 4-byte aligned
    /// (true for anything obtained from a `Vec<u8>`'s allocator, or from
    /// a `Vec<u32>`/`Box<[u32]>` reinterpreted as bytes). If `buffer` is
    /// larger than required, only the leading `needed_size` bytes are
    /// used; the caller is free to carve the remainder up for other
    /// purposes.
    ///
    /// The entire used region is zeroed first, then every tier record is
    /// initialized with an empty freelist, and tier 0 reserves its bucket
    /// index 0 so that no parent ever legitimately decodes to the
    /// all-zero [`Entry`].
    pub fn create(buffer: &'a mut [u8], max_entities: usize, tiers: &[TierSpec]) -> Result<Self> {
        sizing::validate_tiers(tiers)?;
        let needed = needed_size(max_entities, tiers)?;
        if buffer.len() < needed {
            return Err(EntitytainerError::BufferTooSmall { needed, actual: buffer.len() });
        }
        let (used, _unused) = buffer.split_at_mut(needed);
        used.fill(0);

        let (header_bytes, rest) = used.split_at_mut(size_of::<ContainerHeader>());
        let header: &mut ContainerHeader =
            bytemuck::try_from_bytes_mut(header_bytes).map_err(|_| EntitytainerError::BufferMisaligned)?;
        header.num_tiers = tiers.len() as u32;
        header.max_entities = max_entities as u32;

        let (forward_bytes, rest) = rest.split_at_mut(max_entities * size_of::<Entry>());
        let forward: &mut [Entry] =
            bytemuck::try_cast_slice_mut(forward_bytes).map_err(|_| EntitytainerError::BufferMisaligned)?;

        let (reverse_bytes, rest) = rest.split_at_mut(max_entities * size_of::<Entity>());
        let reverse: &mut [Entity] =
            bytemuck::try_cast_slice_mut(reverse_bytes).map_err(|_| EntitytainerError::BufferMisaligned)?;

        let (tier_bytes, mut rest) = rest.split_at_mut(tiers.len() * size_of::<TierRecord>());
        let tier_records: &mut [TierRecord] =
            bytemuck::try_cast_slice_mut(tier_bytes).map_err(|_| EntitytainerError::BufferMisaligned)?;

        let mut slabs = Vec::with_capacity(tiers.len());
        for (index, spec) in tiers.iter().enumerate() {
            tier_records[index] = TierRecord {
                bucket_size: spec.bucket_size,
                total_buckets: spec.bucket_count,
                used_buckets: if index == 0 { 1 } else { 0 },
                first_free_bucket: tier::NO_FREE_BUCKET,
            };
            let slab_bytes_len = spec.bucket_count as usize * spec.bucket_size as usize * size_of::<Entity>();
            let (slab_bytes, remaining) = rest.split_at_mut(slab_bytes_len);
            rest = remaining;
            let slab: &mut [Entity] =
                bytemuck::try_cast_slice_mut(slab_bytes).map_err(|_| EntitytainerError::BufferMisaligned)?;
            slabs.push(slab);
        }
        debug_assert!(rest.is_empty(), "buffer carving must exactly consume the used region");

        Ok(Self { header, forward, reverse, tiers: tier_records, slabs })
    }

    /// Number of tiers this container was constructed with.
    pub fn num_tiers(&self) -> usize {
        self.tiers.len()
    }

    /// The `max_entities` this container was constructed with.
    pub fn max_entities(&self) -> usize {
        self.header.max_entities as usize
    }

    /// Returns `true` if any tier's free bucket count has dropped to or
    /// below `threshold`, signalling that the host should migrate this
    /// container into a larger buffer (growing the buffer itself is an
    /// external collaborator this crate does not implement — see
    /// `DESIGN.md`).
    pub fn needs_realloc(&self, threshold: ReallocThreshold) -> bool {
        self.tiers.iter().any(|tier| {
            let free = tier.free_buckets();
            let limit = match threshold {
                ReallocThreshold::Percent(fraction) => (tier.total_buckets as f64 * fraction) as u32,
                ReallocThreshold::Absolute(count) => count,
            };
            free <= limit
        })
    }

    /// Registers `entity` with the container, giving it an empty
    /// children bucket in tier 0.
    ///
    /// # Errors
    ///
    /// [`EntitytainerError::InvalidEntity`] if out of range,
    /// [`EntitytainerError::DuplicateAdd`] if already added,
    /// [`EntitytainerError::TierExhausted`] if tier 0 has no bucket left.
    pub fn add_entity(&mut self, entity: Entity) -> Result<()> {
        let index = self.check_entity(entity)?;
        if !self.forward[index].is_none() {
            return Err(EntitytainerError::DuplicateAdd(entity));
        }
        let bucket_index = tier::alloc_bucket(&mut self.tiers[0], &mut self.slabs[0], 0)?;
        self.forward[index] = Entry::encode(0, bucket_index);
        Ok(())
    }

    /// Removes `entity` from the container.
    ///
    /// If `entity` is currently a child of some parent, it is first
    /// detached from that parent (which may migrate the parent's bucket
    /// down a tier). If `entity` itself owns a children bucket, every
    /// remaining child is detached (its `get_parent` becomes `0`) before
    /// the bucket is freed — spec §9 notes the source leaves these
    /// dangling; this crate picks the eager-detach option it recommends.
    ///
    /// Silently returns if `entity` was never added.
    pub fn remove_entity(&mut self, entity: Entity) -> Result<()> {
        let index = self.check_entity(entity)?;

        let parent = self.reverse[index];
        if parent != NONE_ENTITY {
            self.remove_child(parent, entity)?;
        }

        let entry = self.forward[index];
        if entry.is_none() {
            return Ok(());
        }
        let (tier_index, bucket_index) = entry.decode();
        let bucket_size = self.tiers[tier_index as usize].bucket_size as usize;
        let offset = bucket_index as usize * bucket_size;

        let child_count = self.slabs[tier_index as usize][offset] as usize;
        for slot in 0..child_count {
            let child = self.slabs[tier_index as usize][offset + 1 + slot];
            if child != NONE_ENTITY {
                self.reverse[child as usize] = NONE_ENTITY;
            }
        }

        let (tier_record, slab) = (&mut self.tiers[tier_index as usize], &mut self.slabs[tier_index as usize]);
        tier::free_bucket(tier_record, slab, bucket_index);
        self.forward[index] = Entry::NONE;
        Ok(())
    }

    /// Appends `child` to `parent`'s children, migrating `parent`'s
    /// bucket up a tier first if this insertion would otherwise make the
    /// bucket indistinguishable from "full" (spec §4.3).
    ///
    /// Duplicate children are not checked; the caller must not add the
    /// same child to the same parent twice.
    ///
    /// # Errors
    ///
    /// [`EntitytainerError::NoChildrenBucket`] if `parent` was never
    /// added, [`EntitytainerError::CapacityExceeded`] if `parent`'s
    /// current tier is already the top tier, or
    /// [`EntitytainerError::TierExhausted`] if the destination tier has
    /// no bucket left.
    pub fn add_child(&mut self, parent: Entity, child: Entity) -> Result<()> {
        let parent_index = self.check_entity(parent)?;
        let child_index = self.check_entity(child)?;

        let entry = self.forward[parent_index];
        if entry.is_none() {
            return Err(EntitytainerError::NoChildrenBucket(parent));
        }
        let (mut tier_index, mut bucket_index) = entry.decode();
        let bucket_size = self.tiers[tier_index as usize].bucket_size as usize;
        let offset = bucket_index as usize * bucket_size;
        let count = self.slabs[tier_index as usize][offset] as usize;

        if count + 1 == bucket_size - 1 {
            let next_tier_index = tier_index + 1;
            if next_tier_index as usize >= self.tiers.len() {
                return Err(EntitytainerError::CapacityExceeded { tier: tier_index });
            }

            let (lower_tiers, upper_tiers) = self.tiers.split_at_mut(next_tier_index as usize);
            let source_tier = &mut lower_tiers[tier_index as usize];
            let dest_tier = &mut upper_tiers[0];
            let (lower_slabs, upper_slabs) = self.slabs.split_at_mut(next_tier_index as usize);
            let source_slab = &mut lower_slabs[tier_index as usize];
            let dest_slab = &mut upper_slabs[0];

            let dest_bucket_index = tier::alloc_bucket(dest_tier, dest_slab, next_tier_index)?;
            let dest_bucket_size = dest_tier.bucket_size as usize;
            let dest_offset = dest_bucket_index as usize * dest_bucket_size;
            // Destination slack may hold a stale freelist pointer or an
            // earlier tenant's children; clear it before copying in.
            for slot in &mut dest_slab[dest_offset..dest_offset + dest_bucket_size] {
                *slot = 0;
            }
            dest_slab[dest_offset..dest_offset + bucket_size]
                .copy_from_slice(&source_slab[offset..offset + bucket_size]);

            tier::free_bucket(source_tier, source_slab, bucket_index);

            tier_index = next_tier_index;
            bucket_index = dest_bucket_index;
            self.forward[parent_index] = Entry::encode(tier_index, bucket_index);
        }

        let bucket_size = self.tiers[tier_index as usize].bucket_size as usize;
        let offset = bucket_index as usize * bucket_size;
        let slab = &mut self.slabs[tier_index as usize];
        let new_count = slab[offset] as usize + 1;
        slab[offset] = new_count as Entity;
        slab[offset + new_count] = child;

        self.reverse[child_index] = parent;
        Ok(())
    }

    /// Removes `child` from `parent`'s children, shifting the children
    /// after it left by one to keep the list contiguous (order among
    /// surviving children is preserved). Migrates `parent`'s bucket down
    /// a tier if the new count now fits the previous tier (spec §4.3).
    ///
    /// # Errors
    ///
    /// [`EntitytainerError::NoChildrenBucket`] if `parent` was never
    /// added, [`EntitytainerError::ChildNotPresent`] if `child` is not
    /// currently one of `parent`'s children.
    pub fn remove_child(&mut self, parent: Entity, child: Entity) -> Result<()> {
        let parent_index = self.check_entity(parent)?;
        let child_index = self.check_entity(child)?;

        let entry = self.forward[parent_index];
        if entry.is_none() {
            return Err(EntitytainerError::NoChildrenBucket(parent));
        }
        let (mut tier_index, mut bucket_index) = entry.decode();
        let bucket_size = self.tiers[tier_index as usize].bucket_size as usize;
        let offset = bucket_index as usize * bucket_size;

        let position = {
            let slab = &self.slabs[tier_index as usize];
            let count = slab[offset] as usize;
            (0..count).find(|&k| slab[offset + 1 + k] == child)
        };
        let position = position.ok_or(EntitytainerError::ChildNotPresent { parent, child })?;

        {
            let slab = &mut self.slabs[tier_index as usize];
            let count = slab[offset] as usize;
            for k in position..count - 1 {
                slab[offset + 1 + k] = slab[offset + 2 + k];
            }
            slab[offset] = (count - 1) as Entity;
        }
        self.reverse[child_index] = NONE_ENTITY;

        if tier_index > 0 {
            let prev_tier_index = tier_index - 1;
            let prev_bucket_size = self.tiers[prev_tier_index as usize].bucket_size as usize;
            let new_count = self.slabs[tier_index as usize][offset] as usize;
            if new_count + 1 == prev_bucket_size - 1 {
                let (lower_tiers, upper_tiers) = self.tiers.split_at_mut(tier_index as usize);
                let dest_tier = &mut lower_tiers[prev_tier_index as usize];
                let source_tier = &mut upper_tiers[0];
                let (lower_slabs, upper_slabs) = self.slabs.split_at_mut(tier_index as usize);
                let dest_slab = &mut lower_slabs[prev_tier_index as usize];
                let source_slab = &mut upper_slabs[0];

                let dest_bucket_index = tier::alloc_bucket(dest_tier, dest_slab, prev_tier_index)?;
                let dest_offset = dest_bucket_index as usize * prev_bucket_size;
                dest_slab[dest_offset..dest_offset + prev_bucket_size]
                    .copy_from_slice(&source_slab[offset..offset + prev_bucket_size]);

                tier::free_bucket(source_tier, source_slab, bucket_index);

                tier_index = prev_tier_index;
                bucket_index = dest_bucket_index;
                self.forward[parent_index] = Entry::encode(tier_index, bucket_index);
            }
        }

        Ok(())
    }

    /// Returns a view over `parent`'s children, in insertion order.
    ///
    /// The returned [`Children`] borrows `self`; it is invalidated by any
    /// later mutation of `parent` (enforced by the borrow checker).
    pub fn get_children(&self, parent: Entity) -> Result<Children<'_>> {
        let parent_index = self.check_entity(parent)?;
        let entry = self.forward[parent_index];
        if entry.is_none() {
            return Err(EntitytainerError::NoChildrenBucket(parent));
        }
        let (tier_index, bucket_index) = entry.decode();
        let bucket_size = self.tiers[tier_index as usize].bucket_size as usize;
        let offset = bucket_index as usize * bucket_size;
        let slab = &self.slabs[tier_index as usize];
        let count = slab[offset] as usize;
        Ok(Children::new(&slab[offset + 1..offset + 1 + count]))
    }

    /// Returns the number of children `parent` currently has.
    pub fn num_children(&self, parent: Entity) -> Result<usize> {
        Ok(self.get_children(parent)?.len())
    }

    /// Returns the position of `child` within `parent`'s children, or
    /// `None` if it is not currently one of them.
    pub fn get_child_index(&self, parent: Entity, child: Entity) -> Result<Option<usize>> {
        let children = self.get_children(parent)?;
        Ok(children.iter().position(|&candidate| candidate == child))
    }

    /// Returns `child`'s current parent, or `0` (`NONE_ENTITY`) if it has
    /// none.
    pub fn get_parent(&self, child: Entity) -> Result<Entity> {
        let index = self.check_entity(child)?;
        Ok(self.reverse[index])
    }

    fn check_entity(&self, entity: Entity) -> Result<usize> {
        if entity <= NONE_ENTITY || entity as usize >= self.header.max_entities as usize {
            return Err(EntitytainerError::InvalidEntity(entity));
        }
        Ok(entity as usize)
    }
}
