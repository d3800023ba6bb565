//! Scenario tests for the blend cache: saturated buckets, layout switches,
//! reference ramps and storage formats.

use gblend::{
    BlendStats, Blender, BlenderConfig, CellLayout, Channel, DEFAULT_KEY_COUNT, Rgb,
    SubpixelOrder, blend_gray_span, blend_lcd_span,
};

fn with_stats() -> BlenderConfig {
    BlenderConfig::default().with_stats(true)
}

fn gradient_bytes(blender: &mut Blender, bg: Rgb, fg: Rgb) -> Vec<u8> {
    blender.lookup(bg, fg).as_bytes().to_vec()
}

#[test]
fn colliding_keys_fill_table_then_clear_once() {
    let mut blender = Blender::new(with_stats(), 2.2).unwrap();
    let mut reference = Blender::with_gamma(2.2);
    let keys = DEFAULT_KEY_COUNT as u32;

    // Foreground black and backgrounds at multiples of the slot count all
    // hash to slot 0.
    for i in 0..keys {
        let bg = Rgb::from_u32(i * keys);
        let got = gradient_bytes(&mut blender, bg, Rgb::BLACK);
        reference.clear();
        let want = gradient_bytes(&mut reference, bg, Rgb::BLACK);
        assert_eq!(got, want, "gradient {i} differs");
    }
    assert_eq!(blender.occupancy(), DEFAULT_KEY_COUNT);
    assert_eq!(blender.stats().unwrap().clears, 0);

    // Every earlier key is still resident.
    for i in 0..keys {
        assert!(blender.contains(Rgb::from_u32(i * keys), Rgb::BLACK));
    }

    let overflow = Rgb::from_u32(keys * keys);
    let _ = blender.lookup(overflow, Rgb::BLACK);
    let stats = blender.stats().unwrap();
    assert_eq!(stats.clears, 1);
    assert_eq!(stats.misses, u64::from(keys) + 1);
    assert_eq!(stats.hits, 0);
    assert_eq!(blender.occupancy(), 1);
    assert!(blender.contains(overflow, Rgb::BLACK));
    assert!(!blender.contains(Rgb::BLACK, Rgb::BLACK));
}

#[test]
fn switching_layout_drops_cached_pixels() {
    let mut blender = Blender::new(with_stats(), 0.0).unwrap();
    let (bg, fg) = (Rgb::new(10, 20, 30), Rgb::new(200, 210, 220));
    let _ = blender.lookup(bg, fg);
    assert!(blender.contains(bg, fg));

    blender.use_channels(true);
    blender.use_channels(false);
    assert!(!blender.contains(bg, fg));

    let _ = blender.lookup(bg, fg);
    let stats = blender.stats().unwrap();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 0);
}

#[test]
fn srgb_black_to_white_reference_ramp() {
    let reference: [u8; 16] = [
        0, 73, 102, 124, 141, 156, 170, 182, 193, 203, 213, 222, 231, 239, 247, 255,
    ];
    let mut blender = Blender::with_gamma(0.0);
    let ramp: Vec<Rgb> = blender.lookup(Rgb::BLACK, Rgb::WHITE).iter().collect();
    assert_eq!(ramp.len(), reference.len());
    for (n, (shade, want)) in ramp.iter().zip(reference).enumerate() {
        for channel in Channel::ALL {
            let got = shade.channel(channel);
            assert!(
                got.abs_diff(want) <= 1,
                "shade {n} {channel:?}: got {got}, want {want}"
            );
        }
    }

    let channel_ramp = blender.lookup_channel(0, 255).to_vec();
    let gray: Vec<u8> = ramp.iter().map(|c| c.g).collect();
    assert_eq!(channel_ramp, gray);
}

#[test]
fn gamma_correct_midpoint_is_lighter_than_naive() {
    let mut blender = Blender::with_gamma(2.2);
    let mid = blender.shade(Rgb::BLACK, Rgb::WHITE, 128);
    assert!(mid.r > 128, "midpoint {mid:?} should be lighter than linear");
    assert_eq!(mid.r, mid.g);
    assert_eq!(mid.g, mid.b);
}

#[test]
fn cell_layouts_hold_the_same_colors() {
    let mut packed = Blender::new(BlenderConfig::default(), 1.8).unwrap();
    let bytes_config = BlenderConfig::default().with_cell_layout(CellLayout::Bytes);
    let mut bytes = Blender::new(bytes_config, 1.8).unwrap();
    let pairs = [
        (Rgb::BLACK, Rgb::WHITE),
        (Rgb::new(255, 0, 0), Rgb::new(0, 0, 255)),
        (Rgb::new(17, 99, 230), Rgb::new(240, 8, 64)),
    ];
    for (bg, fg) in pairs {
        let a: Vec<Rgb> = packed.lookup(bg, fg).iter().collect();
        let b: Vec<Rgb> = bytes.lookup(bg, fg).iter().collect();
        assert_eq!(a, b);
        let raw = bytes.lookup(bg, fg).as_bytes().to_vec();
        assert_eq!(&raw[..3], &[bg.r, bg.g, bg.b]);
    }
}

#[test]
fn init_switches_curve_and_resets() {
    let mut blender = Blender::new(with_stats(), 2.2).unwrap();
    let before = gradient_bytes(&mut blender, Rgb::BLACK, Rgb::WHITE);
    blender.init(1.0);
    assert_eq!(blender.stats(), Some(BlendStats::default()));
    assert_eq!(blender.occupancy(), 0);
    let after = gradient_bytes(&mut blender, Rgb::BLACK, Rgb::WHITE);
    assert_ne!(before, after);
}

#[test]
fn spans_share_one_cache() {
    let mut blender = Blender::new(with_stats(), 0.0).unwrap();
    let bg = Rgb::new(255, 255, 255);
    let fg = Rgb::new(0, 0, 0);

    let mut row = vec![bg.to_u32(); 8];
    let coverage = [0, 32, 64, 96, 128, 160, 192, 255];
    blend_gray_span(&mut blender, &mut row, &coverage, fg);
    assert_eq!(row[0], bg.to_u32());
    assert_eq!(row[7], fg.to_u32());
    assert!(row.windows(2).all(|w| (w[0] & 0xFF) >= (w[1] & 0xFF)));
    assert_eq!(blender.stats().unwrap().lookups, 1);

    let mut lcd = vec![bg.to_u32(); 2];
    let subpixels = [0, 128, 255, 255, 128, 0];
    blend_lcd_span(&mut blender, &mut lcd, &subpixels, fg, SubpixelOrder::Rgb);
    assert!(blender.channels());
    let first = Rgb::from_u32(lcd[0]);
    let second = Rgb::from_u32(lcd[1]);
    assert_eq!((first.r, first.b), (255, 0));
    assert_eq!((second.r, second.b), (0, 255));
    assert_eq!(first.g, second.g);
}
