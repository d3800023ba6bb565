#![forbid(unsafe_code)]

//! Blender configuration.
//!
//! All tunables are resolved once, when a [`Blender`](crate::Blender) is
//! constructed. Defaults can be overridden from the environment:
//!
//! | Variable              | Meaning                               |
//! |-----------------------|---------------------------------------|
//! | `GBLEND_KEY_COUNT`    | slot count (power of two)             |
//! | `GBLEND_SHADE_COUNT`  | shades per gradient (2..=256)         |
//! | `GBLEND_GAMMA_SHIFT`  | fixed-point bits of the linear scale  |
//! | `GBLEND_CELL_LAYOUT`  | `packed` or `bytes`                   |
//! | `GBLEND_STATS`        | collect statistics (`1/0/true/false`) |
//!
//! Unparsable values are ignored; out-of-range values are reported by
//! [`BlenderConfig::validate`].

use std::fmt;

use crate::gamma::MAX_GAMMA_SHIFT;

/// Default number of cache slots.
pub const DEFAULT_KEY_COUNT: usize = 256;
/// Default number of shades per gradient.
pub const DEFAULT_SHADE_COUNT: usize = 16;
/// Default fixed-point precision of the linear-light scale.
pub const DEFAULT_GAMMA_SHIFT: u32 = 4;
/// Largest accepted slot count.
pub const MAX_KEY_COUNT: usize = 1 << 16;
/// Largest accepted shade count (one shade per coverage level).
pub const MAX_SHADE_COUNT: usize = 256;

const ENV_KEY_COUNT: &str = "GBLEND_KEY_COUNT";
const ENV_SHADE_COUNT: &str = "GBLEND_SHADE_COUNT";
const ENV_GAMMA_SHIFT: &str = "GBLEND_GAMMA_SHIFT";
const ENV_CELL_LAYOUT: &str = "GBLEND_CELL_LAYOUT";
const ENV_STATS: &str = "GBLEND_STATS";

/// Storage format of one full-pixel gradient cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellLayout {
    /// `0x00RRGGBB` as a little-endian `u32` (4 bytes per shade).
    #[default]
    Packed,
    /// `r, g, b` bytes (3 bytes per shade).
    Bytes,
}

impl CellLayout {
    /// Bytes used by one shade.
    #[must_use]
    pub const fn cell_size(self) -> usize {
        match self {
            Self::Packed => 4,
            Self::Bytes => 3,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "packed" | "pixel" | "u32" => Some(Self::Packed),
            "bytes" | "rgb" | "u8" => Some(Self::Bytes),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Packed => "packed",
            Self::Bytes => "bytes",
        }
    }
}

/// Invalid [`BlenderConfig`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Slot count must be a power of two in `1..=MAX_KEY_COUNT`.
    KeyCount(usize),
    /// Shade count must be in `2..=MAX_SHADE_COUNT`.
    ShadeCount(usize),
    /// Gamma shift must not exceed `MAX_GAMMA_SHIFT`.
    GammaShift(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyCount(n) => write!(
                f,
                "key count {n} is not a power of two in 1..={MAX_KEY_COUNT}"
            ),
            Self::ShadeCount(n) => {
                write!(f, "shade count {n} is outside 2..={MAX_SHADE_COUNT}")
            }
            Self::GammaShift(n) => {
                write!(f, "gamma shift {n} exceeds {MAX_GAMMA_SHIFT}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Sizing and layout of a blend cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlenderConfig {
    /// Number of hash slots (power of two).
    pub key_count: usize,
    /// Number of shades in every gradient.
    pub shade_count: usize,
    /// Extra fixed-point bits of the linear-light scale.
    pub gamma_shift: u32,
    /// Full-pixel gradient storage format.
    pub cell_layout: CellLayout,
    /// Whether lookups update [`BlendStats`](crate::BlendStats).
    pub collect_stats: bool,
}

impl Default for BlenderConfig {
    fn default() -> Self {
        Self {
            key_count: DEFAULT_KEY_COUNT,
            shade_count: DEFAULT_SHADE_COUNT,
            gamma_shift: DEFAULT_GAMMA_SHIFT,
            cell_layout: CellLayout::Packed,
            collect_stats: false,
        }
    }
}

impl BlenderConfig {
    #[must_use]
    pub const fn with_key_count(mut self, key_count: usize) -> Self {
        self.key_count = key_count;
        self
    }

    #[must_use]
    pub const fn with_shade_count(mut self, shade_count: usize) -> Self {
        self.shade_count = shade_count;
        self
    }

    #[must_use]
    pub const fn with_gamma_shift(mut self, gamma_shift: u32) -> Self {
        self.gamma_shift = gamma_shift;
        self
    }

    #[must_use]
    pub const fn with_cell_layout(mut self, cell_layout: CellLayout) -> Self {
        self.cell_layout = cell_layout;
        self
    }

    #[must_use]
    pub const fn with_stats(mut self, collect_stats: bool) -> Self {
        self.collect_stats = collect_stats;
        self
    }

    /// Check every field against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.key_count.is_power_of_two() || self.key_count > MAX_KEY_COUNT {
            return Err(ConfigError::KeyCount(self.key_count));
        }
        if !(2..=MAX_SHADE_COUNT).contains(&self.shade_count) {
            return Err(ConfigError::ShadeCount(self.shade_count));
        }
        if self.gamma_shift > MAX_GAMMA_SHIFT {
            return Err(ConfigError::GammaShift(self.gamma_shift));
        }
        Ok(())
    }

    /// Default configuration with overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Default configuration with overrides from a custom lookup (for tests).
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_env_overrides(get_env)
    }

    /// Apply environment overrides on top of `self`.
    #[must_use]
    pub fn with_env_overrides<F>(mut self, get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(n) = env_parse(&get_env, ENV_KEY_COUNT) {
            self.key_count = n;
        }
        if let Some(n) = env_parse(&get_env, ENV_SHADE_COUNT) {
            self.shade_count = n;
        }
        if let Some(n) = env_parse(&get_env, ENV_GAMMA_SHIFT) {
            self.gamma_shift = n;
        }
        if let Some(value) = get_env(ENV_CELL_LAYOUT)
            && let Some(layout) = CellLayout::parse(&value)
        {
            self.cell_layout = layout;
        }
        if let Some(value) = get_env(ENV_STATS)
            && let Some(flag) = parse_bool(&value)
        {
            self.collect_stats = flag;
        }
        self
    }

    /// Size in bytes of the gradient arena this configuration allocates.
    #[must_use]
    pub const fn arena_bytes(&self) -> usize {
        self.key_count * self.shade_count * self.cell_layout.cell_size()
    }

    /// Serialize to JSON (for diagnostics).
    #[must_use]
    pub fn to_json(&self) -> String {
        format!(
            r#"{{"key_count":{},"shade_count":{},"gamma_shift":{},"cell_layout":"{}","collect_stats":{}}}"#,
            self.key_count,
            self.shade_count,
            self.gamma_shift,
            self.cell_layout.as_str(),
            self.collect_stats
        )
    }
}

fn env_parse<F, T>(get_env: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    get_env(key).and_then(|value| value.trim().parse().ok())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
