#![forbid(unsafe_code)]

//! Deterministic cache workload.
//!
//! A seeded generator produces a fixed list of (background, foreground)
//! pairs and, per span, a row of coverage values. Every round blends one
//! span per pair through the cache and folds the resulting pixels into a
//! checksum, so two runs with the same seed and configuration produce the
//! same report.

use std::fmt;

use gblend::{
    BlendStats, Blender, BlenderConfig, GammaCurve, Rgb, SubpixelOrder, blend_gray_span,
    blend_lcd_span,
};
use serde_json::{Value, json};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Simple LCG PRNG for deterministic generation.
#[derive(Debug, Clone)]
struct SeededRng {
    state: u64,
}

impl SeededRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        // LCG parameters from Numerical Recipes
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    fn next_rgb(&mut self) -> Rgb {
        Rgb::from_u32((self.next_u64() >> 40) as u32)
    }

    fn next_u8(&mut self) -> u8 {
        (self.next_u64() >> 56) as u8
    }
}

/// Shape of one harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    pub pairs: usize,
    pub rounds: usize,
    /// Pixels per span.
    pub width: usize,
    pub seed: u64,
    /// Blend LCD spans through the single-channel cache.
    pub channels: bool,
}

/// Outcome of [`run`].
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub workload: Workload,
    pub curve: GammaCurve,
    pub config: BlenderConfig,
    pub stats: BlendStats,
    /// Occupied slots after the last round.
    pub occupancy: usize,
    /// Destination pixels written or inspected.
    pub pixels: u64,
    /// FNV-1a over every blended row.
    pub checksum: u64,
}

/// Run `workload` against `blender`, starting from its current state.
pub fn run(blender: &mut Blender, workload: &Workload) -> Report {
    let mut rng = SeededRng::new(workload.seed);
    let pairs: Vec<(Rgb, Rgb)> = (0..workload.pairs)
        .map(|_| (rng.next_rgb(), rng.next_rgb()))
        .collect();

    let per_pixel = if workload.channels { 3 } else { 1 };
    let mut coverage = vec![0u8; workload.width * per_pixel];
    let mut row = vec![0u32; workload.width];
    let mut checksum = FNV_OFFSET;
    let mut pixels = 0u64;

    gblend::debug!(
        pairs = workload.pairs,
        rounds = workload.rounds,
        channels = workload.channels,
        "running workload"
    );
    blender.use_channels(workload.channels);
    for _ in 0..workload.rounds {
        for &(background, foreground) in &pairs {
            coverage.iter_mut().for_each(|c| *c = rng.next_u8());
            row.fill(background.to_u32());
            if workload.channels {
                blend_lcd_span(blender, &mut row, &coverage, foreground, SubpixelOrder::Rgb);
            } else {
                blend_gray_span(blender, &mut row, &coverage, foreground);
            }
            for &pixel in &row {
                checksum = fnv1a(checksum, pixel);
            }
            pixels += row.len() as u64;
        }
    }

    Report {
        workload: *workload,
        curve: blender.gamma_curve(),
        config: *blender.config(),
        stats: blender.stats().unwrap_or_default(),
        occupancy: blender.occupancy(),
        pixels,
        checksum,
    }
}

fn fnv1a(mut hash: u64, pixel: u32) -> u64 {
    for byte in pixel.to_le_bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn curve_name(curve: GammaCurve) -> &'static str {
    match curve {
        GammaCurve::Srgb => "srgb",
        GammaCurve::Power(_) => "power",
    }
}

impl Report {
    /// Machine-readable form of the report.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "curve": curve_name(self.curve),
            "gamma": self.curve.value(),
            "workload": {
                "pairs": self.workload.pairs,
                "rounds": self.workload.rounds,
                "width": self.workload.width,
                "seed": self.workload.seed,
                "channels": self.workload.channels,
            },
            "config": {
                "key_count": self.config.key_count,
                "shade_count": self.config.shade_count,
                "gamma_shift": self.config.gamma_shift,
                "cell_layout": self.config.cell_layout.as_str(),
            },
            "stats": {
                "lookups": self.stats.lookups,
                "hits": self.stats.hits,
                "misses": self.stats.misses,
                "clashes": self.stats.clashes,
                "clears": self.stats.clears,
                "hit_rate": self.stats.hit_rate(),
                "miss_rate": self.stats.miss_rate(),
            },
            "occupancy": self.occupancy,
            "pixels": self.pixels,
            "checksum": format!("{:016x}", self.checksum),
        })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.workload.channels { "lcd" } else { "gray" };
        writeln!(
            f,
            "gblend workload: curve={} gamma={} pairs={} rounds={} width={} mode={mode}",
            curve_name(self.curve),
            self.curve.value(),
            self.workload.pairs,
            self.workload.rounds,
            self.workload.width,
        )?;
        writeln!(f, "  Pixels:      {}", self.pixels)?;
        writeln!(f, "  Checksum:    {:016x}", self.checksum)?;
        writeln!(
            f,
            "  Occupancy:   {} / {}",
            self.occupancy, self.config.key_count
        )?;
        write!(f, "{}", self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workload(channels: bool) -> Workload {
        Workload {
            pairs: 8,
            rounds: 4,
            width: 16,
            seed: 42,
            channels,
        }
    }

    fn blender() -> Blender {
        Blender::new(BlenderConfig::default().with_stats(true), 0.0).unwrap()
    }

    #[test]
    fn same_seed_same_checksum() {
        let a = run(&mut blender(), &workload(false));
        let b = run(&mut blender(), &workload(false));
        assert_eq!(a, b);
        assert_eq!(a.pixels, 8 * 4 * 16);
    }

    #[test]
    fn different_seed_changes_checksum() {
        let a = run(&mut blender(), &workload(false));
        let other = Workload {
            seed: 43,
            ..workload(false)
        };
        let b = run(&mut blender(), &other);
        assert_ne!(a.checksum, b.checksum);
    }

    #[test]
    fn later_rounds_hit_the_cache() {
        let report = run(&mut blender(), &workload(false));
        let stats = report.stats;
        assert_eq!(stats.hits + stats.misses, stats.lookups);
        assert!(stats.misses <= 8);
        assert!(stats.hits > 0);
        assert_eq!(report.occupancy as u64, stats.misses);
    }

    #[test]
    fn lcd_workload_uses_channel_cache() {
        let mut b = blender();
        let report = run(&mut b, &workload(true));
        assert!(b.channels());
        assert!(report.stats.lookups > 0);
        assert_eq!(report.stats.clears, 0);
    }

    #[test]
    fn json_report_has_stats() {
        let report = run(&mut blender(), &workload(false));
        let value = report.to_json();
        assert_eq!(value["curve"], "srgb");
        assert_eq!(value["workload"]["pairs"], 8);
        assert_eq!(value["stats"]["lookups"], report.stats.lookups);
        assert_eq!(value["stats"]["miss_rate"], report.stats.miss_rate());
        assert_eq!(value["config"]["cell_layout"], "packed");
        assert_eq!(value["checksum"].as_str().map(str::len), Some(16));
    }

    #[test]
    fn text_report_already_holds_the_stats_dump() {
        let mut b = blender();
        let report = run(&mut b, &workload(false));
        let dump = b.dump_stats().unwrap();
        assert_eq!(dump, report.stats.to_string());
        assert!(report.to_string().ends_with(&dump));
    }

    #[test]
    fn text_report_embeds_stats() {
        let report = run(&mut blender(), &workload(false));
        let text = report.to_string();
        assert!(text.starts_with("gblend workload: curve=srgb"));
        assert!(text.contains("Blend cache statistics:"));
        assert!(text.contains("Occupancy:   "));
    }
}
