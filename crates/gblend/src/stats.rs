//! Cache statistics.

use std::fmt;

/// Counters collected by a [`Blender`](crate::Blender) when
/// [`BlenderConfig::collect_stats`](crate::BlenderConfig::collect_stats)
/// is set.
///
/// `hits + misses == lookups`; every miss claims exactly one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlendStats {
    /// Calls to `lookup`/`lookup_channel`.
    pub lookups: u64,
    /// Lookups answered by an existing slot.
    pub hits: u64,
    /// Lookups that computed a new gradient.
    pub misses: u64,
    /// Occupied slots skipped while probing.
    pub clashes: u64,
    /// Full-table clears forced by a saturated table.
    pub clears: u64,
}

impl BlendStats {
    /// Fraction of lookups served from the cache, in `[0, 1]`.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }

    /// Fraction of lookups that computed a new gradient, in `[0, 1]`.
    #[must_use]
    pub fn miss_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.misses as f64 / self.lookups as f64
        }
    }

    /// Average number of clashes per lookup.
    #[must_use]
    pub fn clashes_per_lookup(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.clashes as f64 / self.lookups as f64
        }
    }

    /// Slots claimed over the lifetime of the counters.
    #[must_use]
    pub const fn keys_used(&self) -> u64 {
        self.misses
    }

    pub(crate) fn record_hit(&mut self) {
        self.lookups += 1;
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.lookups += 1;
        self.misses += 1;
    }

    pub(crate) fn record_clashes(&mut self, clashes: u64) {
        self.clashes += clashes;
    }

    pub(crate) fn record_clear(&mut self) {
        self.clears += 1;
    }
}

impl fmt::Display for BlendStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Blend cache statistics:")?;
        writeln!(
            f,
            "  Hit rate:    {:.2}% ( {} out of {} )",
            100.0 * self.hit_rate(),
            self.hits,
            self.lookups
        )?;
        writeln!(
            f,
            "  Miss rate:   {:.2}% ( {} out of {} )",
            100.0 * self.miss_rate(),
            self.misses,
            self.lookups
        )?;
        writeln!(f, "  Clashes:     {}", self.clashes)?;
        writeln!(f, "  Keys used:   {}", self.keys_used())?;
        write!(f, "  Caches full: {}", self.clears)
    }
}
