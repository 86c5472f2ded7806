//! PixelImage regression test
//!
//! Neighbourhood queries and Sobel gradients on small synthetic images.

use stippler_core::PixelImage;
use stippler_test::{RegParams, images};

#[test]
fn pixelimage_reg() {
    let mut rp = RegParams::new("pixelimage");

    let img = images::uniform(5, 4, (128, 128, 128)).expect("uniform image");

    // --- Test 1: neighbour counts ---
    eprintln!("=== Neighbour counts ===");
    rp.compare_values(2.0, img.four_neighbours(0).len() as f64, 0.0);
    rp.compare_values(3.0, img.four_neighbours(2).len() as f64, 0.0);
    rp.compare_values(4.0, img.four_neighbours(6).len() as f64, 0.0);
    rp.compare_values(3.0, img.eight_neighbours(0).len() as f64, 0.0);
    rp.compare_values(5.0, img.eight_neighbours(2).len() as f64, 0.0);
    rp.compare_values(8.0, img.eight_neighbours(6).len() as f64, 0.0);

    // --- Test 2: replicate at every corner ---
    eprintln!("=== Replicated corners ===");
    let w = img.width() as usize;
    let corners = [0, w - 1, img.pixel_count() - w, img.pixel_count() - 1];
    for &k in &corners {
        let rep = img.eight_neighbours_replicate(k);
        let real = img.eight_neighbours(k);
        let replicated = rep.iter().filter(|&&n| n == k).count();
        rp.compare_values(5.0, replicated as f64, 0.0);
        rp.check(
            real.iter().all(|n| rep.contains(&n)),
            "replicated list keeps the real neighbours",
        );
    }

    // --- Test 3: rectangular windows ---
    eprintln!("=== Rectangular neighbourhood ===");
    let mut window = Vec::new();
    img.rectangular_neighbourhood(2, 2, 1, 1, &mut window);
    rp.compare_values(9.0, window.len() as f64, 0.0);
    img.rectangular_neighbourhood(-3, -3, 4, 4, &mut window);
    rp.compare_values(4.0, window.len() as f64, 0.0);
    rp.check(window == vec![0, 1, 5, 6], "clipped window is row-major");

    // --- Test 4: Sobel responds to a vertical edge only horizontally ---
    eprintln!("=== Sobel ===");
    let edge = images::lightness_map(6, 6, |x, _| if x < 3 { 20.0 } else { 80.0 })
        .expect("edge image");
    let at_edge = edge.sobel_gradient(edge.xy_to_index(3, 2)).expect("in bounds");
    let flat = edge.sobel_gradient(edge.xy_to_index(0, 2)).expect("in bounds");
    rp.check(at_edge.magnitude_squared() > 0.0, "edge has gradient");
    rp.compare_values(0.0, at_edge.sum[1], 1e-9);
    rp.compare_values(0.0, flat.magnitude_squared(), 1e-9);

    // --- Test 5: bounds-checked access ---
    eprintln!("=== Bounds ===");
    let tiny = PixelImage::from_lightness(1, 1, vec![42.0]).expect("1x1 image");
    rp.check(tiny.lab_at(0, 0).is_some(), "inside");
    rp.check(tiny.lab_at(1, 0).is_none(), "outside x");
    rp.check(tiny.rgb_at(0, 1).is_none(), "outside y");
    rp.check(tiny.four_neighbours(0).is_empty(), "no 4-neighbours");
    rp.check(tiny.eight_neighbours_replicate(0) == [0; 8], "all replicated");

    assert!(rp.cleanup(), "pixelimage regression test failed");
}
