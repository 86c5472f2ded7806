//! Regression test bookkeeping
//!
//! A [`RegParams`] numbers every check of one test, keeps the failed ones and
//! decides, by [`RegTestMode`], what happens to rasters written during the
//! test: copied to the golden directory, compared against it, or left alone.

use std::fs;
use std::path::{Path, PathBuf};

use stippler_core::Raster;

use crate::error::TestResult;
use crate::png_io::{read_png, write_png};
use crate::{golden_dir, regout_dir};

/// What to do with written output files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegTestMode {
    /// Record outputs as the new golden files
    Generate,
    /// Check outputs against existing golden files
    #[default]
    Compare,
    /// Only write outputs for inspection
    Display,
}

impl RegTestMode {
    /// Mode named by `REGTEST_MODE`, `Compare` when unset or unrecognised
    pub fn from_env() -> Self {
        std::env::var("REGTEST_MODE")
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "generate" => Self::Generate,
            "display" => Self::Display,
            _ => Self::Compare,
        }
    }
}

/// One failed check
#[derive(Debug, Clone)]
struct Failure {
    index: usize,
    message: String,
}

/// State of one regression test
pub struct RegParams {
    /// Short test name; files are named `<name>.<index>.png`
    pub test_name: String,
    pub mode: RegTestMode,
    index: usize,
    failures: Vec<Failure>,
    messages: Vec<String>,
}

impl RegParams {
    /// Start a test, reading the mode from the environment
    pub fn new(test_name: &str) -> Self {
        let mode = RegTestMode::from_env();
        for dir in [golden_dir(), regout_dir()] {
            if let Err(e) = fs::create_dir_all(&dir) {
                eprintln!("cannot create {dir}: {e}");
            }
        }
        eprintln!("\n-------- {test_name}_reg ({mode:?}) --------");

        Self {
            test_name: test_name.to_string(),
            mode,
            index: 0,
            failures: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Number of checks made so far
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn display(&self) -> bool {
        self.mode == RegTestMode::Display
    }

    /// Number the next check
    fn next_index(&mut self) -> usize {
        self.index += 1;
        self.index
    }

    fn fail(&mut self, index: usize, message: String) {
        let message = format!("{}_reg #{index}: {message}", self.test_name);
        eprintln!("{message}");
        self.failures.push(Failure {
            index,
            message: message.clone(),
        });
        self.messages.push(message);
    }

    /// Check `actual` against `expected` with absolute tolerance `delta`
    ///
    /// A NaN on either side always fails.
    pub fn compare_values(&mut self, expected: f64, actual: f64, delta: f64) -> bool {
        let index = self.next_index();
        let diff = (expected - actual).abs();
        let ok = diff <= delta;
        if !ok {
            self.fail(
                index,
                format!("expected {expected}, got {actual} (|diff| {diff} > {delta})"),
            );
        }
        ok
    }

    /// Record a named boolean property
    pub fn check(&mut self, condition: bool, what: &str) -> bool {
        let index = self.next_index();
        if !condition {
            self.fail(index, format!("check failed: {what}"));
        }
        condition
    }

    /// Require two rasters to be pixel-identical
    pub fn compare_rasters(&mut self, r1: &Raster, r2: &Raster) -> bool {
        let index = self.next_index();
        if r1.dimensions() != r2.dimensions() {
            self.fail(
                index,
                format!("raster sizes {:?} and {:?} differ", r1.dimensions(), r2.dimensions()),
            );
            return false;
        }
        let mismatch = r1.data().iter().zip(r2.data()).position(|(a, b)| a != b);
        match mismatch {
            Some(k) => {
                let w = r1.width() as usize;
                self.fail(index, format!("rasters differ at ({}, {})", k % w, k / w));
                false
            }
            None => true,
        }
    }

    /// Write `raster` to the output directory and handle it per mode
    pub fn write_raster_and_check(&mut self, raster: &Raster) -> TestResult<()> {
        let index = self.next_index();
        let path = self.output_path(index, "png");
        write_png(raster, &path.to_string_lossy())?;
        self.check_golden(index, &path)
    }

    /// Write raw bytes to the output directory and handle them per mode
    pub fn write_data_and_check(&mut self, data: &[u8], ext: &str) -> TestResult<()> {
        let index = self.next_index();
        let path = self.output_path(index, ext);
        fs::write(&path, data)?;
        self.check_golden(index, &path)
    }

    fn output_path(&self, index: usize, ext: &str) -> PathBuf {
        PathBuf::from(regout_dir()).join(format!("{}.{index:02}.{ext}", self.test_name))
    }

    fn golden_path(&self, index: usize, ext: &str) -> PathBuf {
        PathBuf::from(golden_dir()).join(format!("{}_golden.{index:02}.{ext}", self.test_name))
    }

    fn check_golden(&mut self, index: usize, output: &Path) -> TestResult<()> {
        let ext = output.extension().and_then(|e| e.to_str()).unwrap_or("");
        let golden = self.golden_path(index, ext);

        match self.mode {
            RegTestMode::Display => {}
            RegTestMode::Generate => {
                fs::copy(output, &golden)?;
                eprintln!("wrote {}", golden.display());
            }
            RegTestMode::Compare if !golden.exists() => {
                eprintln!("{}_reg #{index}: no golden file, skipped", self.test_name);
            }
            RegTestMode::Compare => {
                let same = fs::read(output)? == fs::read(&golden)?
                    || (ext == "png" && same_pixels(output, &golden));
                if !same {
                    self.fail(
                        index,
                        format!("{} differs from {}", output.display(), golden.display()),
                    );
                }
            }
        }
        Ok(())
    }

    /// Report the outcome; `true` when no check failed
    pub fn cleanup(self) -> bool {
        if self.failures.is_empty() {
            eprintln!("{}_reg: all {} checks passed\n", self.test_name, self.index);
            return true;
        }
        eprintln!(
            "{}_reg: {} of {} checks failed",
            self.test_name,
            self.failures.len(),
            self.index
        );
        for failure in &self.failures {
            eprintln!("  [{}] {}", failure.index, failure.message);
        }
        eprintln!();
        false
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Messages of the failed checks, in order
    pub fn failures(&self) -> &[String] {
        &self.messages
    }
}

/// Whether two PNG files decode to the same raster
fn same_pixels(a: &Path, b: &Path) -> bool {
    match (read_png(&a.to_string_lossy()), read_png(&b.to_string_lossy())) {
        (Ok(ra), Ok(rb)) => ra == rb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names() {
        assert_eq!(RegTestMode::parse("generate"), RegTestMode::Generate);
        assert_eq!(RegTestMode::parse(" Display "), RegTestMode::Display);
        assert_eq!(RegTestMode::parse("bogus"), RegTestMode::Compare);
    }

    #[test]
    fn test_values() {
        let mut rp = RegParams::new("params_values");
        assert!(rp.compare_values(100.0, 100.5, 1.0));
        assert!(rp.is_success());
        assert!(!rp.compare_values(100.0, 200.0, 0.0));
        assert!(!rp.compare_values(0.0, f64::NAN, 1.0));
        assert_eq!(rp.failures().len(), 2);
        assert!(rp.failures()[1].contains("#3"));
        assert!(!rp.cleanup());
    }

    #[test]
    fn test_rasters() {
        let mut rp = RegParams::new("params_raster");
        let a = Raster::new(2, 2).unwrap();
        let mut b = a.clone();
        assert!(rp.compare_rasters(&a, &b));
        b.set_rgb(1, 1, 1, 0, 0).unwrap();
        assert!(!rp.compare_rasters(&a, &b));
        assert!(!rp.compare_rasters(&a, &Raster::new(3, 2).unwrap()));
        assert_eq!(rp.index(), 3);
    }

    #[test]
    fn test_png_round_trip() {
        let mut r = Raster::new(3, 2).unwrap();
        r.set_rgb(2, 1, 9, 8, 7).unwrap();
        let _ = fs::create_dir_all(regout_dir());
        let path = format!("{}/params_png_round_trip.png", regout_dir());
        write_png(&r, &path).unwrap();
        assert_eq!(read_png(&path).unwrap(), r);
    }
}
