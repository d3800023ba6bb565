#![forbid(unsafe_code)]

//! Open-addressed slot table and the gradient arena behind it.
//!
//! The table has a fixed power-of-two number of slots. Each slot is either
//! empty or holds the key of a fully computed gradient; the gradient itself
//! lives at a fixed offset in one contiguous arena, derived from the slot
//! index, so claiming a slot never allocates.
//!
//! Collisions are resolved by linear probing. There is no per-slot
//! eviction: a slot only becomes empty again when the whole table is
//! cleared.

use crate::color::Rgb;
use crate::config::CellLayout;
use crate::gamma::GammaTables;

// Multipliers of the two home-slot hashes.
const PIXEL_HASH_MUL: usize = 63;
const CHANNEL_HASH_MUL: usize = 17;

/// Packed single-channel key: foreground in the high byte, background in
/// the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelKey(u16);

impl ChannelKey {
    #[must_use]
    pub const fn new(background: u8, foreground: u8) -> Self {
        Self(((foreground as u16) << 8) | background as u16)
    }

    #[must_use]
    pub const fn background(self) -> u8 {
        self.0 as u8
    }

    #[must_use]
    pub const fn foreground(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

/// Key stored in an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKey {
    /// Full-pixel (24-bit RGB) pair.
    Pixel { background: Rgb, foreground: Rgb },
    /// Single-channel (8-bit) pair.
    Channel(ChannelKey),
}

impl SlotKey {
    /// Home slot of the key in a table of `mask + 1` slots.
    #[inline]
    #[must_use]
    pub fn home(self, mask: usize) -> usize {
        match self {
            Self::Pixel {
                background,
                foreground,
            } => (background.to_u32() as usize)
                .wrapping_add((foreground.to_u32() as usize).wrapping_mul(PIXEL_HASH_MUL))
                & mask,
            Self::Channel(key) => {
                (usize::from(key.background())
                    + usize::from(key.foreground()) * CHANNEL_HASH_MUL)
                    & mask
            }
        }
    }
}

/// Which of the two key/value layouts the table currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotMode {
    /// 24-bit color pairs, `shade_count` cells of `cell_size` bytes each.
    #[default]
    Pixel,
    /// 8-bit sample pairs, `shade_count` single bytes each.
    Channel,
}

/// Outcome of a linear probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    /// The key already owns this slot.
    Hit(usize),
    /// First empty slot on the probe sequence.
    Vacant(usize),
    /// Every slot is occupied by another key; `home` is where the key
    /// belongs once the table is cleared.
    Full { home: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProbeResult {
    pub probe: Probe,
    /// Occupied slots holding other keys that the probe walked past.
    pub clashes: u64,
}

/// Borrowed view of one full-pixel gradient.
///
/// Shade 0 is the background, shade `len() - 1` the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gradient<'a> {
    cells: &'a [u8],
    layout: CellLayout,
}

impl<'a> Gradient<'a> {
    /// Number of shades.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len() / self.layout.cell_size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[must_use]
    pub const fn layout(&self) -> CellLayout {
        self.layout
    }

    /// Raw cells in the configured [`CellLayout`].
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.cells
    }

    /// Shade `n`, or `None` past the end.
    #[must_use]
    pub fn get(&self, n: usize) -> Option<Rgb> {
        let size = self.layout.cell_size();
        let start = n.checked_mul(size)?;
        let end = start.checked_add(size)?;
        let cell = self.cells.get(start..end)?;
        Some(read_cell(cell, self.layout))
    }

    /// Shade `n` packed as `0x00RRGGBB`.
    #[must_use]
    pub fn packed(&self, n: usize) -> Option<u32> {
        self.get(n).map(Rgb::to_u32)
    }

    /// Iterate shades from background to foreground.
    pub fn iter(self) -> impl Iterator<Item = Rgb> + 'a {
        let layout = self.layout;
        self.cells
            .chunks_exact(layout.cell_size())
            .map(move |cell| read_cell(cell, layout))
    }
}

#[inline]
fn read_cell(cell: &[u8], layout: CellLayout) -> Rgb {
    match layout {
        CellLayout::Packed => {
            Rgb::from_u32(u32::from_le_bytes([cell[0], cell[1], cell[2], cell[3]]))
        }
        CellLayout::Bytes => Rgb::new(cell[0], cell[1], cell[2]),
    }
}

#[inline]
fn write_cell(cell: &mut [u8], layout: CellLayout, color: Rgb) {
    match layout {
        CellLayout::Packed => cell.copy_from_slice(&color.to_u32().to_le_bytes()),
        CellLayout::Bytes => {
            cell[0] = color.r;
            cell[1] = color.g;
            cell[2] = color.b;
        }
    }
}

/// Blend weight of shade `n` in a gradient of `last + 1` shades.
#[inline]
fn shade_weight(n: usize, last: usize) -> u32 {
    (255 * n / last) as u32
}

/// Fixed-size slot table plus the arena holding every slot's gradient.
#[derive(Debug, Clone)]
pub(crate) struct CacheStore {
    mask: usize,
    shade_count: usize,
    layout: CellLayout,
    mode: SlotMode,
    slots: Vec<Option<SlotKey>>,
    occupied: usize,
    arena: Vec<u8>,
}

impl CacheStore {
    /// `key_count` must be a power of two and `shade_count >= 2`.
    pub fn new(key_count: usize, shade_count: usize, layout: CellLayout) -> Self {
        debug_assert!(key_count.is_power_of_two());
        debug_assert!(shade_count >= 2);
        Self {
            mask: key_count - 1,
            shade_count,
            layout,
            mode: SlotMode::Pixel,
            slots: vec![None; key_count],
            occupied: 0,
            arena: vec![0u8; key_count * shade_count * layout.cell_size()],
        }
    }

    pub fn key_count(&self) -> usize {
        self.slots.len()
    }

    pub fn shade_count(&self) -> usize {
        self.shade_count
    }

    pub fn mode(&self) -> SlotMode {
        self.mode
    }

    pub fn occupancy(&self) -> usize {
        self.occupied
    }

    /// Switch layouts. Returns `true` (and clears) only on an actual change.
    pub fn set_mode(&mut self, mode: SlotMode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.clear();
        true
    }

    /// Mark every slot empty. The arena keeps its stale bytes.
    pub fn clear(&mut self) {
        self.slots.fill(None);
        self.occupied = 0;
    }

    /// Walk the probe sequence of `key` without modifying anything.
    pub fn probe(&self, key: SlotKey) -> ProbeResult {
        let home = key.home(self.mask);
        let mut idx = home;
        let mut clashes = 0;
        loop {
            match self.slots[idx] {
                None => {
                    return ProbeResult {
                        probe: Probe::Vacant(idx),
                        clashes,
                    };
                }
                Some(existing) if existing == key => {
                    return ProbeResult {
                        probe: Probe::Hit(idx),
                        clashes,
                    };
                }
                Some(_) => {
                    clashes += 1;
                    idx = (idx + 1) & self.mask;
                    if idx == home {
                        return ProbeResult {
                            probe: Probe::Full { home },
                            clashes,
                        };
                    }
                }
            }
        }
    }

    /// Store `key` in the empty slot `index` and compute its gradient.
    pub fn claim(&mut self, index: usize, key: SlotKey, tables: &GammaTables) {
        debug_assert!(self.slots[index].is_none(), "slot {index} already occupied");
        match key {
            SlotKey::Pixel {
                background,
                foreground,
            } => {
                debug_assert_eq!(self.mode, SlotMode::Pixel);
                self.fill_pixel(index, background, foreground, tables);
            }
            SlotKey::Channel(channel) => {
                debug_assert_eq!(self.mode, SlotMode::Channel);
                self.fill_channel(index, channel, tables);
            }
        }
        self.slots[index] = Some(key);
        self.occupied += 1;
    }

    #[cfg(test)]
    pub fn slot(&self, index: usize) -> Option<SlotKey> {
        self.slots.get(index).copied().flatten()
    }

    /// Full-pixel gradient owned by slot `index`.
    pub fn pixel_gradient(&self, index: usize) -> Gradient<'_> {
        let len = self.shade_count * self.layout.cell_size();
        let start = index * len;
        Gradient {
            cells: &self.arena[start..start + len],
            layout: self.layout,
        }
    }

    /// Single-channel gradient owned by slot `index`.
    pub fn channel_gradient(&self, index: usize) -> &[u8] {
        let start = index * self.shade_count;
        &self.arena[start..start + self.shade_count]
    }

    fn fill_pixel(
        &mut self,
        index: usize,
        background: Rgb,
        foreground: Rgb,
        tables: &GammaTables,
    ) {
        let layout = self.layout;
        let size = layout.cell_size();
        let len = self.shade_count * size;
        let last = self.shade_count - 1;
        let start = index * len;
        let region = &mut self.arena[start..start + len];

        let back = [background.r, background.g, background.b].map(|c| tables.linearize(c));
        let fore = [foreground.r, foreground.g, foreground.b].map(|c| tables.linearize(c));

        for (n, cell) in region.chunks_exact_mut(size).enumerate() {
            let color = if n == 0 {
                background
            } else {
                let a = shade_weight(n, last);
                Rgb::new(
                    tables.mix(back[0], fore[0], a),
                    tables.mix(back[1], fore[1], a),
                    tables.mix(back[2], fore[2], a),
                )
            };
            write_cell(cell, layout, color);
        }
    }

    fn fill_channel(&mut self, index: usize, key: ChannelKey, tables: &GammaTables) {
        let last = self.shade_count - 1;
        let start = index * self.shade_count;
        let region = &mut self.arena[start..start + self.shade_count];

        let background = key.background();
        let back = tables.linearize(background);
        let fore = tables.linearize(key.foreground());

        region[0] = background;
        for (n, out) in region.iter_mut().enumerate().skip(1) {
            *out = tables.mix(back, fore, shade_weight(n, last));
        }
    }
}
