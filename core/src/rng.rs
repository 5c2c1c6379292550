//! Deterministic random number generation.
//!
//! RULE: Nothing in the save core may call a platform RNG for data that
//! ends up in a save. Derived values (default starter natures, dex
//! consolidation backfill, fresh account ids) draw from a SeededRng taken
//! from the RngBank for their stable slot.
//!
//! Each slot's stream is seeded from (master_seed XOR slot_index), so a
//! new slot never changes an existing slot's stream.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single slot.
pub struct SeededRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SeededRng {
    /// Create an RNG from the master seed and a stable slot index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, slot_index: u64) -> Self {
        let derived_seed = master_seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an integer in [min, min + range).
    pub fn rand_int(&mut self, range: u32, min: u32) -> u32 {
        min + self.next_u64_below(range as u64) as u32
    }

    /// Pick one item uniformly. `items` must not be empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let idx = self.next_u64_below(items.len() as u64) as usize;
        &items[idx]
    }
}

/// All seeded streams for one account, indexed by stable slot.
#[derive(Debug, Clone)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_slot(&self, slot: RngSlot) -> SeededRng {
        SeededRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable slot assignments.
/// NEVER reorder or remove entries. Append only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum RngSlot {
    DefaultStarters = 0,
    Consolidation   = 1,
    AccountIds      = 2,
}

impl RngSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DefaultStarters => "default_starters",
            Self::Consolidation   => "consolidation",
            Self::AccountIds      => "account_ids",
        }
    }
}
