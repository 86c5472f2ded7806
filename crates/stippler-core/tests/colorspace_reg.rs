//! Colour space regression test
//!
//! sRGB <-> L*a*b* conversion: reference colours, round trips over random
//! and exhaustive grey inputs, and lazy plane derivation in PixelImage.

use stippler_core::colorspace::{MAX_LIGHTNESS, lab_to_rgb, rgb_to_lab};
use stippler_core::{Channel, ChannelData, PixelImage};
use stippler_test::{RegParams, images};

fn within_one(a: (u8, u8, u8), b: (u8, u8, u8)) -> bool {
    a.0.abs_diff(b.0) <= 1 && a.1.abs_diff(b.1) <= 1 && a.2.abs_diff(b.2) <= 1
}

#[test]
fn colorspace_reg() {
    let mut rp = RegParams::new("colorspace");

    // --- Test 1: reference colours ---
    eprintln!("=== Reference colours ===");
    let white = rgb_to_lab(255, 255, 255);
    rp.compare_values(MAX_LIGHTNESS, white.l, 1e-3);
    let blue = rgb_to_lab(0, 0, 255);
    rp.compare_values(32.30, blue.l, 0.05);
    rp.compare_values(79.19, blue.a, 0.05);
    rp.compare_values(-107.86, blue.b, 0.05);

    // --- Test 2: every grey level round-trips ---
    eprintln!("=== Grey round trip ===");
    let mut grey_ok = true;
    for v in 0..=255u8 {
        let lab = rgb_to_lab(v, v, v);
        grey_ok &= lab.a.abs() < 0.01 && lab.b.abs() < 0.01;
        grey_ok &= within_one(lab_to_rgb(lab), (v, v, v));
    }
    rp.check(grey_ok, "grey levels round-trip within 1");

    // --- Test 3: random colours round-trip ---
    eprintln!("=== Random round trip ===");
    let mut worst = 0u8;
    for _ in 0..5000 {
        let c = images::random_rgb();
        let back = lab_to_rgb(rgb_to_lab(c.0, c.1, c.2));
        worst = worst
            .max(c.0.abs_diff(back.0))
            .max(c.1.abs_diff(back.1))
            .max(c.2.abs_diff(back.2));
    }
    eprintln!("  worst channel error: {}", worst);
    rp.compare_values(0.0, worst as f64, 1.0);

    // --- Test 4: lazy derivation in both directions ---
    eprintln!("=== Lazy planes ===");
    let img = images::random(16, 9).expect("random image");
    rp.check(!img.has_lab(), "lab not derived before access");
    if let ChannelData::Lab(l) = img.channel(Channel::LStar) {
        rp.compare_values(144.0, l.len() as f64, 0.0);
    }
    rp.check(img.has_lab(), "lab derived after access");

    let lab = img.lab().clone();
    let back = PixelImage::from_lab(16, 9, lab.l, lab.a, lab.b).expect("lab image");
    let mut all_close = true;
    for k in 0..back.pixel_count() {
        all_close &= within_one(
            back.rgb_at_index(k).expect("in bounds"),
            img.rgb_at_index(k).expect("in bounds"),
        );
    }
    rp.check(all_close, "lab-authoritative image reproduces rgb");

    assert!(rp.cleanup(), "colorspace regression test failed");
}
