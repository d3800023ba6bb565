#![forbid(unsafe_code)]

//! Coverage span blending onto `0x00RRGGBB` pixel rows.
//!
//! A rasterizer produces one coverage byte per pixel (grayscale
//! antialiasing) or three per pixel (LCD subpixel antialiasing). These
//! helpers composite a solid foreground onto an existing row through the
//! blend cache. The high byte of every destination pixel is preserved.

use crate::blender::Blender;
use crate::color::{Channel, Rgb};

const HIGH_BYTE: u32 = 0xFF00_0000;

/// Physical order of the subpixels within one LCD pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubpixelOrder {
    /// Red, green, blue from left to right.
    #[default]
    Rgb,
    /// Blue, green, red from left to right.
    Bgr,
}

impl SubpixelOrder {
    /// Channels in coverage order.
    #[must_use]
    pub const fn channels(self) -> [Channel; 3] {
        match self {
            Self::Rgb => [Channel::Red, Channel::Green, Channel::Blue],
            Self::Bgr => [Channel::Blue, Channel::Green, Channel::Red],
        }
    }
}

#[inline]
fn store(pixel: &mut u32, color: Rgb) {
    *pixel = (*pixel & HIGH_BYTE) | color.to_u32();
}

/// Blend `foreground` onto `dst` with one coverage byte per pixel.
///
/// Only `min(dst.len(), coverage.len())` pixels are touched. Coverage 0
/// leaves the pixel alone; coverage 255 writes `foreground` exactly.
pub fn blend_gray_span(blender: &mut Blender, dst: &mut [u32], coverage: &[u8], foreground: Rgb) {
    for (pixel, &c) in dst.iter_mut().zip(coverage) {
        match c {
            0 => {}
            255 => store(pixel, foreground),
            _ => {
                let background = Rgb::from_u32(*pixel);
                let color = blender.shade(background, foreground, c);
                store(pixel, color);
            }
        }
    }
}

/// Blend `foreground` onto `dst` with three coverage bytes per pixel.
///
/// Each channel is blended independently through the single-channel cache.
/// A trailing partial triple in `coverage` is ignored.
pub fn blend_lcd_span(
    blender: &mut Blender,
    dst: &mut [u32],
    coverage: &[u8],
    foreground: Rgb,
    order: SubpixelOrder,
) {
    let channels = order.channels();
    for (pixel, triple) in dst.iter_mut().zip(coverage.chunks_exact(3)) {
        if triple.iter().all(|&c| c == 0) {
            continue;
        }
        let mut color = Rgb::from_u32(*pixel);
        for (&channel, &c) in channels.iter().zip(triple) {
            let fore = foreground.channel(channel);
            let value = match c {
                0 => continue,
                255 => fore,
                _ => blender.shade_channel(channel, color.channel(channel), fore, c),
            };
            color = color.with_channel(channel, value);
        }
        store(pixel, color);
    }
}
