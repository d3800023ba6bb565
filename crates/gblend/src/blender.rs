#![forbid(unsafe_code)]

//! The blend cache engine.
//!
//! [`Blender`] owns the gamma tables, the slot table and the gradient
//! arena. A lookup hashes the (background, foreground) pair to a home slot,
//! probes linearly, and on a miss computes the gradient in place. When the
//! probe wraps around a saturated table, every slot is cleared and the key
//! is stored at its home slot.
//!
//! Views returned by [`Blender::lookup`] and [`Blender::lookup_channel`]
//! borrow the blender, so they cannot be held across another lookup (which
//! might clear the table) or a layout switch.
//!
//! # Example
//!
//! ```
//! use gblend::{Blender, Rgb};
//!
//! let mut blender = Blender::with_gamma(2.2);
//! let ramp = blender.lookup(Rgb::BLACK, Rgb::WHITE);
//! assert_eq!(ramp.get(0), Some(Rgb::BLACK));
//! assert_eq!(ramp.len(), gblend::DEFAULT_SHADE_COUNT);
//! ```

use crate::color::{Channel, Rgb};
use crate::config::{BlenderConfig, ConfigError};
use crate::gamma::{GammaCurve, GammaTables};
use crate::stats::BlendStats;
use crate::store::{CacheStore, ChannelKey, Gradient, Probe, SlotKey, SlotMode};

#[derive(Debug, Clone, Copy)]
struct PixelMemo {
    background: Rgb,
    foreground: Rgb,
    index: usize,
}

#[derive(Debug, Clone, Copy)]
struct ChannelMemo {
    key: ChannelKey,
    index: usize,
}

/// Gamma-correct blend gradient cache.
#[derive(Debug, Clone)]
pub struct Blender {
    config: BlenderConfig,
    tables: GammaTables,
    store: CacheStore,
    stats: Option<BlendStats>,
    // Most recent slot per lookup path; dropped on every clear.
    pixel_memo: Option<PixelMemo>,
    channel_memos: [Option<ChannelMemo>; 3],
}

impl Blender {
    /// Create a blender with an explicit configuration.
    ///
    /// `gamma <= 0` (or any non-finite value) selects the sRGB curve.
    pub fn new(config: BlenderConfig, gamma: f64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, gamma))
    }

    /// Create a blender with the default configuration.
    #[must_use]
    pub fn with_gamma(gamma: f64) -> Self {
        Self::build(BlenderConfig::default(), gamma)
    }

    fn build(config: BlenderConfig, gamma: f64) -> Self {
        let curve = GammaCurve::from_gamma(gamma);
        crate::debug!(
            ?curve,
            key_count = config.key_count,
            shade_count = config.shade_count,
            arena_bytes = config.arena_bytes(),
            "building blend cache"
        );
        Self {
            tables: GammaTables::build(curve, config.gamma_shift),
            store: CacheStore::new(config.key_count, config.shade_count, config.cell_layout),
            stats: config.collect_stats.then(BlendStats::default),
            pixel_memo: None,
            channel_memos: [None; 3],
            config,
        }
    }

    /// Rebuild the gamma tables and reset the cache.
    ///
    /// Returns to full-pixel mode, empties every slot and zeroes the
    /// statistics.
    pub fn init(&mut self, gamma: f64) {
        let curve = GammaCurve::from_gamma(gamma);
        let span = crate::debug_span!("gblend.init", ?curve);
        let _guard = span.enter();

        self.tables = GammaTables::build(curve, self.config.gamma_shift);
        self.store.set_mode(SlotMode::Pixel);
        self.clear();
        if let Some(stats) = self.stats.as_mut() {
            *stats = BlendStats::default();
        }
    }

    #[must_use]
    pub const fn config(&self) -> &BlenderConfig {
        &self.config
    }

    #[must_use]
    pub const fn gamma_curve(&self) -> GammaCurve {
        self.tables.curve()
    }

    #[must_use]
    pub const fn gamma_tables(&self) -> &GammaTables {
        &self.tables
    }

    #[must_use]
    pub fn key_count(&self) -> usize {
        self.store.key_count()
    }

    #[must_use]
    pub fn shade_count(&self) -> usize {
        self.store.shade_count()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.store.occupancy()
    }

    /// Whether the single-channel layout is active.
    #[must_use]
    pub fn channels(&self) -> bool {
        self.store.mode() == SlotMode::Channel
    }

    /// Select the single-channel (`true`) or full-pixel (`false`) layout.
    ///
    /// The layouts share the arena, so an actual change empties the cache.
    /// Requesting the current layout does nothing.
    pub fn use_channels(&mut self, enabled: bool) {
        let mode = if enabled {
            SlotMode::Channel
        } else {
            SlotMode::Pixel
        };
        if self.store.set_mode(mode) {
            self.forget_memos();
            crate::debug!(?mode, "blend cache layout switched");
        }
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        self.store.clear();
        self.forget_memos();
    }

    /// Gradient from `background` to `foreground`, computed on first use.
    ///
    /// Switches to the full-pixel layout first if needed.
    pub fn lookup(&mut self, background: Rgb, foreground: Rgb) -> Gradient<'_> {
        self.use_channels(false);
        let index = self.resolve(SlotKey::Pixel {
            background,
            foreground,
        });
        self.store.pixel_gradient(index)
    }

    /// Single-channel gradient from `background` to `foreground`.
    ///
    /// Switches to the single-channel layout first if needed.
    pub fn lookup_channel(&mut self, background: u8, foreground: u8) -> &[u8] {
        self.use_channels(true);
        let index = self.resolve(SlotKey::Channel(ChannelKey::new(background, foreground)));
        self.store.channel_gradient(index)
    }

    /// Whether a full-pixel gradient for the pair is cached. No side effects.
    #[must_use]
    pub fn contains(&self, background: Rgb, foreground: Rgb) -> bool {
        self.store.mode() == SlotMode::Pixel
            && self.is_cached(SlotKey::Pixel {
                background,
                foreground,
            })
    }

    /// Whether a single-channel gradient for the pair is cached.
    #[must_use]
    pub fn contains_channel(&self, background: u8, foreground: u8) -> bool {
        self.store.mode() == SlotMode::Channel
            && self.is_cached(SlotKey::Channel(ChannelKey::new(background, foreground)))
    }

    /// Map an 8-bit coverage value onto a shade index, rounding to nearest.
    #[inline]
    #[must_use]
    pub fn shade_index(&self, coverage: u8) -> usize {
        let last = self.store.shade_count() - 1;
        (usize::from(coverage) * last + 127) / 255
    }

    /// Blend `foreground` over `background` at `coverage`.
    ///
    /// Repeated calls with the same pair skip the probe entirely.
    pub fn shade(&mut self, background: Rgb, foreground: Rgb, coverage: u8) -> Rgb {
        let n = self.shade_index(coverage);
        if n == 0 {
            return background;
        }
        let index = match self.pixel_memo {
            Some(memo) if memo.background == background && memo.foreground == foreground => {
                memo.index
            }
            _ => {
                self.use_channels(false);
                let index = self.resolve(SlotKey::Pixel {
                    background,
                    foreground,
                });
                self.pixel_memo = Some(PixelMemo {
                    background,
                    foreground,
                    index,
                });
                index
            }
        };
        self.store
            .pixel_gradient(index)
            .get(n)
            .unwrap_or(foreground)
    }

    /// Blend one channel sample at `coverage`, with a memo per channel.
    pub fn shade_channel(
        &mut self,
        channel: Channel,
        background: u8,
        foreground: u8,
        coverage: u8,
    ) -> u8 {
        let n = self.shade_index(coverage);
        if n == 0 {
            return background;
        }
        let key = ChannelKey::new(background, foreground);
        let index = match self.channel_memos[channel.index()] {
            Some(memo) if memo.key == key => memo.index,
            _ => {
                self.use_channels(true);
                let index = self.resolve(SlotKey::Channel(key));
                self.channel_memos[channel.index()] = Some(ChannelMemo { key, index });
                index
            }
        };
        self.store
            .channel_gradient(index)
            .get(n)
            .copied()
            .unwrap_or(foreground)
    }

    /// Current statistics, or `None` when collection is disabled.
    #[must_use]
    pub fn stats(&self) -> Option<BlendStats> {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        if let Some(stats) = self.stats.as_mut() {
            *stats = BlendStats::default();
        }
    }

    /// Emit the statistics report through the logging layer and return it.
    pub fn dump_stats(&self) -> Option<String> {
        let stats = self.stats?;
        let report = stats.to_string();
        crate::info!(
            target: "gblend::stats",
            lookups = stats.lookups,
            hits = stats.hits,
            misses = stats.misses,
            clashes = stats.clashes,
            clears = stats.clears,
            "{report}"
        );
        Some(report)
    }

    fn is_cached(&self, key: SlotKey) -> bool {
        matches!(self.store.probe(key).probe, Probe::Hit(_))
    }

    /// Find or claim the slot for `key`, clearing the table if it is full.
    fn resolve(&mut self, key: SlotKey) -> usize {
        let result = self.store.probe(key);
        if let Some(stats) = self.stats.as_mut() {
            stats.record_clashes(result.clashes);
        }

        let index = match result.probe {
            Probe::Hit(index) => {
                if let Some(stats) = self.stats.as_mut() {
                    stats.record_hit();
                }
                return index;
            }
            Probe::Vacant(index) => index,
            Probe::Full { home } => {
                crate::debug!(
                    key_count = self.store.key_count(),
                    "blend cache full, clearing all slots"
                );
                if let Some(stats) = self.stats.as_mut() {
                    stats.record_clear();
                }
                self.clear();
                home
            }
        };

        if let Some(stats) = self.stats.as_mut() {
            stats.record_miss();
        }
        self.store.claim(index, key, &self.tables);
        index
    }

    fn forget_memos(&mut self) {
        self.pixel_memo = None;
        self.channel_memos = [None; 3];
    }
}
