//! End-to-end pipeline regression test
//!
//! Midtone map of an image fed as the external selection map of a
//! SLIC-backed superpixel filter, driven through the cancellable runner.

use std::sync::atomic::{AtomicBool, Ordering};

use stippler::filter::{LocalDataFilter, ScoreBasis};
use stippler::superpixel::SlicOptions;
use stippler::tone::MidtoneFilter;
use stippler::{Cancellable, Error, IncrementalAlgorithm, run_with_images};
use stippler_test::{RegParams, images};

#[test]
fn pipeline_reg() {
    let mut rp = RegParams::new("pipeline");

    // Dark left half, mid-grey right half: the midtone map is dark on the
    // left, so the external filter selects the left superpixels.
    let make_input = || {
        images::lightness_map(24, 24, |x, _| if x < 12 { 2.0 } else { 50.0 }).expect("input")
    };

    // --- Test 1: midtone map ---
    eprintln!("=== Midtone map ===");
    let mut midtone = MidtoneFilter::default();
    midtone.disable_output();
    let none = run_with_images(&mut midtone, vec![make_input()], &mut |_: &str| {})
        .expect("midtone run");
    rp.check(none.is_none(), "no raster when output is disabled");
    let map = midtone.take_image().expect("midtone map");
    rp.compare_values(0.0, map.lab().l[0], 1e-6);
    rp.compare_values(100.0, map.lab().l[23], 1e-6);

    // --- Test 2: external filter over SLIC ---
    eprintln!("=== External filter ===");
    let mut filter = LocalDataFilter::with_slic(
        SlicOptions::default().with_superpixels(16),
        ScoreBasis::External,
    );
    rp.compare_values(1.0, filter.required_images().len() as f64, 0.0);
    let mut statuses = Vec::new();
    let raster = run_with_images(&mut filter, vec![make_input(), map], &mut |s: &str| {
        statuses.push(s.to_string())
    })
    .expect("filter run")
    .expect("raster output");
    rp.check(raster.dimensions() == (48, 24), "output doubled along width");
    rp.check(statuses.len() > 10, "status per increment");
    let filtered = filter.take_filtered().expect("filtered");
    let w = 24usize;
    let left_selected = (0..24).all(|y| filtered.is_pixel_selected(y * w + 1) == Some(true));
    let right_rejected = (0..24).all(|y| filtered.is_pixel_selected(y * w + 22) == Some(false));
    rp.check(left_selected, "dark map region selected");
    rp.check(right_rejected, "light map region rejected");
    if rp.display() {
        rp.write_raster_and_check(&raster).expect("write filter output");
    }

    // --- Test 3: cancellation between increments ---
    eprintln!("=== Cancellation ===");
    let cancel = AtomicBool::new(false);
    let mut count = 0;
    let mut sink = Cancellable::new(
        |_: &str| {
            count += 1;
            if count == 3 {
                cancel.store(true, Ordering::Relaxed);
            }
        },
        &cancel,
    );
    let mut filter = LocalDataFilter::with_slic(
        SlicOptions::default().with_superpixels(16),
        ScoreBasis::Size,
    );
    let result = run_with_images(&mut filter, vec![make_input()], &mut sink);
    rp.check(
        matches!(result, Err(stippler::filter::FilterError::Core(Error::Cancelled))),
        "run stops when cancelled",
    );
    rp.check(!filter.is_finished(), "cancelled filter is unfinished");

    assert!(rp.cleanup(), "pipeline regression test failed");
}
