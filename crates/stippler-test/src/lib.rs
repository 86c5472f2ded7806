//! stippler-test - Regression test support for the stippler crates
//!
//! Each `tests/*_reg.rs` file opens a [`RegParams`], records numbered checks
//! against it and finishes with `assert!(rp.cleanup())`. Rasters written
//! through [`RegParams::write_raster_and_check`] land in `tests/regout/` at
//! the workspace root and are matched against `tests/golden/` according to
//! `REGTEST_MODE` (`generate`, `compare` or `display`; compare by default).
//!
//! [`images`] builds the small synthetic inputs the tests share.
//!
//! ```ignore
//! let mut rp = RegParams::new("slic");
//! rp.compare_values(4.0, segmentation.n_superpixels() as f64, 0.0);
//! assert!(rp.cleanup(), "slic regression test failed");
//! ```

mod error;
pub mod images;
mod params;
mod png_io;

pub use error::{TestError, TestResult};
pub use params::{RegParams, RegTestMode};
pub use png_io::{read_png, write_png};

/// Workspace root, two levels above this crate's manifest
fn workspace_root() -> String {
    format!("{}/../..", env!("CARGO_MANIFEST_DIR"))
}

/// Directory of golden output files
pub fn golden_dir() -> String {
    format!("{}/tests/golden", workspace_root())
}

/// Directory the tests write their outputs to
pub fn regout_dir() -> String {
    format!("{}/tests/regout", workspace_root())
}
