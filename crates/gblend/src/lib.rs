#![forbid(unsafe_code)]

//! Gamma-correct blend gradient cache.
//!
//! Antialiased text and vector output needs, for every (background,
//! foreground) color pair it draws with, a ramp of intermediate colors
//! blended in linear light. [`Blender`] computes each ramp once with
//! integer-only table lookups and keeps it in a fixed-size, open-addressed
//! cache so that repeated pairs cost a hash probe.
//!
//! - [`gamma`]: voltage/linear lookup tables built without `powf`.
//! - [`store`]: slot table and gradient arena.
//! - [`blender`]: the public cache engine.
//! - [`blit`]: grayscale and LCD coverage spans blended through the cache.
//! - [`stats`]: optional per-instance counters.
//! - [`config`]: sizing, layout and environment overrides.

pub mod blender;
pub mod blit;
pub mod color;
pub mod config;
pub mod gamma;
pub mod logging;
pub mod stats;
pub mod store;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, info, trace, warn};

pub use blender::Blender;
pub use blit::{SubpixelOrder, blend_gray_span, blend_lcd_span};
pub use color::{Channel, Rgb};
pub use config::{
    BlenderConfig, CellLayout, ConfigError, DEFAULT_GAMMA_SHIFT, DEFAULT_KEY_COUNT,
    DEFAULT_SHADE_COUNT, MAX_KEY_COUNT, MAX_SHADE_COUNT,
};
pub use gamma::{GammaCurve, GammaTables, MAX_GAMMA_SHIFT};
pub use stats::BlendStats;
pub use store::{ChannelKey, Gradient, SlotKey, SlotMode};
