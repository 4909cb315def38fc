//! Public and private slot accounting.
//!
//! The two pools are independent: a public join never borrows a private
//! slot. Filled counts never exceed the maximums, so
//! `filled_slots() == max_slots() - available_slots()` always holds.

use xlive_core::{Result, SlotType, XliveError};

/// Slot pool sizes and occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotCounts {
    public_max: u32,
    private_max: u32,
    public_filled: u32,
    private_filled: u32,
}

impl SlotCounts {
    /// Empty pools of the given sizes.
    pub fn new(public_max: u32, private_max: u32) -> Self {
        Self {
            public_max,
            private_max,
            public_filled: 0,
            private_filled: 0,
        }
    }

    /// Pool size.
    pub fn max(&self, slot: SlotType) -> u32 {
        match slot {
            SlotType::Public => self.public_max,
            SlotType::Private => self.private_max,
        }
    }

    /// Occupied slots in one pool.
    pub fn filled(&self, slot: SlotType) -> u32 {
        match slot {
            SlotType::Public => self.public_filled,
            SlotType::Private => self.private_filled,
        }
    }

    /// Open slots in one pool.
    pub fn available(&self, slot: SlotType) -> u32 {
        self.max(slot) - self.filled(slot)
    }

    /// Both pools.
    pub fn max_slots(&self) -> u32 {
        self.public_max + self.private_max
    }

    /// Occupied across both pools.
    pub fn filled_slots(&self) -> u32 {
        self.public_filled + self.private_filled
    }

    /// Open across both pools.
    pub fn available_slots(&self) -> u32 {
        self.available(SlotType::Public) + self.available(SlotType::Private)
    }

    /// Check that `public` and `private` more members would fit.
    pub fn check_room(&self, public: u32, private: u32) -> Result<()> {
        for (slot, requested) in [(SlotType::Public, public), (SlotType::Private, private)] {
            let available = self.available(slot);
            if requested > available {
                return Err(XliveError::CapacityExceeded {
                    requested,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Occupy `count` slots in one pool.
    pub fn fill(&mut self, slot: SlotType, count: u32) -> Result<()> {
        let available = self.available(slot);
        if count > available {
            return Err(XliveError::CapacityExceeded {
                requested: count,
                available,
            });
        }
        match slot {
            SlotType::Public => self.public_filled += count,
            SlotType::Private => self.private_filled += count,
        }
        Ok(())
    }

    /// Free one slot in a pool. Freeing an empty pool is a no-op.
    pub fn release(&mut self, slot: SlotType) {
        match slot {
            SlotType::Public => self.public_filled = self.public_filled.saturating_sub(1),
            SlotType::Private => self.private_filled = self.private_filled.saturating_sub(1),
        }
    }

    /// Whether occupancy exceeds either pool.
    pub fn is_oversubscribed(&self) -> bool {
        self.public_filled > self.public_max || self.private_filled > self.private_max
    }
}
