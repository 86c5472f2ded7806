//! Incremental algorithm protocol
//!
//! Long-running image algorithms are explicit state machines: a stage tag
//! plus a cursor into the current stage's loop. Every call to
//! [`IncrementalAlgorithm::advance`] processes one bounded slice of work and
//! reports a status line, so a host can interleave cancellation checks or
//! UI updates between calls.
//!
//! Failure and completion are sticky. Once either flag is set, `advance`
//! is rejected until the algorithm is initialized again.
//!
//! # Examples
//!
//! ```ignore
//! let mut slic = Slic::new(SlicOptions::default());
//! slic.initialize(vec![image])?;
//! let raster = run_to_completion(&mut slic, &mut |status: &str| eprintln!("{status}"))?;
//! ```

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Error;
use crate::image::PixelImage;
use crate::raster::Raster;

/// Outcome of one successful increment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Whether the algorithm has completed
    pub finished: bool,
    /// Human-readable progress message
    pub status: String,
}

impl Step {
    pub fn progress(status: impl Into<String>) -> Self {
        Self {
            finished: false,
            status: status.into(),
        }
    }

    pub fn done(status: impl Into<String>) -> Self {
        Self {
            finished: true,
            status: status.into(),
        }
    }
}

/// Host-driven, resumable image algorithm
pub trait IncrementalAlgorithm {
    /// Error type; its `Display` text is the status message for a failure
    type Error: std::error::Error + From<Error>;

    /// Short human-readable algorithm name
    fn name(&self) -> &'static str;

    /// Descriptions of the auxiliary images required after the primary one
    fn required_images(&self) -> Vec<String> {
        Vec::new()
    }

    /// Take ownership of the input images and reset to the first stage.
    ///
    /// The primary image comes first, followed by one image per entry of
    /// [`IncrementalAlgorithm::required_images`].
    fn initialize(&mut self, images: Vec<PixelImage>) -> Result<(), Self::Error>;

    /// Process one bounded slice of work
    fn advance(&mut self) -> Result<Step, Self::Error>;

    fn is_finished(&self) -> bool;

    fn has_failed(&self) -> bool;

    /// Skip rendering; results are then only available programmatically
    fn disable_output(&mut self);

    fn is_output_enabled(&self) -> bool;

    /// Hand over the rendered raster
    ///
    /// Only succeeds once the algorithm has finished without failure and
    /// with output enabled.
    fn take_output(&mut self) -> Result<Raster, Self::Error>;
}

/// Stage tag, cursor and sticky flags shared by every algorithm
#[derive(Debug, Clone)]
pub struct AlgorithmState<S> {
    stage: S,
    cursor: usize,
    initialized: bool,
    failed: bool,
    finished: bool,
    output_enabled: bool,
}

impl<S: Copy + PartialEq + Default> Default for AlgorithmState<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Copy + PartialEq + Default> AlgorithmState<S> {
    pub fn new() -> Self {
        Self {
            stage: S::default(),
            cursor: 0,
            initialized: false,
            failed: false,
            finished: false,
            output_enabled: true,
        }
    }

    /// Return to the first stage with cleared flags; output stays as configured.
    pub fn reset(&mut self) {
        self.stage = S::default();
        self.cursor = 0;
        self.initialized = false;
        self.failed = false;
        self.finished = false;
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    #[inline]
    pub fn stage(&self) -> S {
        self.stage
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether the current stage has not processed anything yet
    #[inline]
    pub fn at_stage_start(&self) -> bool {
        self.cursor == 0
    }

    /// Switch to `stage` with the cursor at zero
    pub fn enter(&mut self, stage: S) {
        self.stage = stage;
        self.cursor = 0;
    }

    /// Cursor range to process this call: at most `granularity` items,
    /// never past `limit`
    pub fn chunk(&self, limit: usize, granularity: usize) -> Range<usize> {
        let start = self.cursor.min(limit);
        start..(start + granularity.max(1)).min(limit)
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    /// Reject the call if the algorithm cannot advance
    pub fn check_can_advance(&self) -> Result<(), Error> {
        if self.failed {
            Err(Error::AlreadyFailed)
        } else if self.finished {
            Err(Error::AlreadyFinished)
        } else if !self.initialized {
            Err(Error::NotInitialized)
        } else {
            Ok(())
        }
    }

    /// Set the sticky failure flag and pass the error through
    pub fn fail<E: std::fmt::Display>(&mut self, err: E) -> E {
        tracing::warn!(error = %err, "algorithm failed");
        self.failed = true;
        err
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[inline]
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    #[inline]
    pub fn is_output_enabled(&self) -> bool {
        self.output_enabled
    }

    pub fn disable_output(&mut self) {
        self.output_enabled = false;
    }

    /// Check the conditions for handing over a result
    pub fn check_can_collect(&self) -> Result<(), Error> {
        if self.failed {
            Err(Error::AlreadyFailed)
        } else if !self.finished {
            Err(Error::NotFinished)
        } else {
            Ok(())
        }
    }
}

/// Receiver of per-increment status messages
pub trait ProgressSink {
    fn status(&mut self, message: &str);

    /// Polled between increments; `true` stops the driver
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<F: FnMut(&str)> ProgressSink for F {
    fn status(&mut self, message: &str) {
        self(message)
    }
}

/// Progress sink paired with a cancellation flag another thread may raise
pub struct Cancellable<'a, F> {
    sink: F,
    flag: &'a AtomicBool,
}

impl<'a, F: FnMut(&str)> Cancellable<'a, F> {
    pub fn new(sink: F, flag: &'a AtomicBool) -> Self {
        Self { sink, flag }
    }
}

impl<F: FnMut(&str)> ProgressSink for Cancellable<'_, F> {
    fn status(&mut self, message: &str) {
        (self.sink)(message)
    }

    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Drive an initialized algorithm until it finishes
///
/// Every status line, including the message of a failure, goes to `sink`.
/// Cancellation is checked before each increment.
///
/// # Returns
///
/// The rendered raster, or `None` when output is disabled.
///
/// # Errors
///
/// Returns the algorithm's error on failure, or `Error::Cancelled` when the
/// sink reports cancellation.
pub fn run_to_completion<A, P>(alg: &mut A, sink: &mut P) -> Result<Option<Raster>, A::Error>
where
    A: IncrementalAlgorithm + ?Sized,
    P: ProgressSink + ?Sized,
{
    let mut increments = 0usize;
    loop {
        if sink.is_cancelled() {
            tracing::info!(algorithm = alg.name(), increments, "cancelled");
            return Err(Error::Cancelled.into());
        }
        match alg.advance() {
            Ok(step) => {
                increments += 1;
                sink.status(&step.status);
                if step.finished {
                    break;
                }
            }
            Err(e) => {
                sink.status(&e.to_string());
                return Err(e);
            }
        }
    }
    tracing::debug!(algorithm = alg.name(), increments, "finished");

    if alg.is_output_enabled() {
        alg.take_output().map(Some)
    } else {
        Ok(None)
    }
}

/// Initialize an algorithm with its images and drive it to completion
pub fn run_with_images<A, P>(
    alg: &mut A,
    images: Vec<PixelImage>,
    sink: &mut P,
) -> Result<Option<Raster>, A::Error>
where
    A: IncrementalAlgorithm + ?Sized,
    P: ProgressSink + ?Sized,
{
    if let Err(e) = alg.initialize(images) {
        sink.status(&e.to_string());
        return Err(e);
    }
    run_to_completion(alg, sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    enum CountStage {
        #[default]
        Counting,
        End,
    }

    /// Counts pixels three at a time, fails on request
    struct Counter {
        state: AlgorithmState<CountStage>,
        total: usize,
        fail_at: Option<usize>,
    }

    impl Counter {
        fn new(fail_at: Option<usize>) -> Self {
            Self {
                state: AlgorithmState::new(),
                total: 0,
                fail_at,
            }
        }
    }

    impl IncrementalAlgorithm for Counter {
        type Error = Error;

        fn name(&self) -> &'static str {
            "counter"
        }

        fn initialize(&mut self, images: Vec<PixelImage>) -> Result<(), Error> {
            self.state.reset();
            let image = images.into_iter().next().ok_or(Error::ImageCount {
                expected: 1,
                actual: 0,
            })?;
            self.total = image.pixel_count();
            self.state.mark_initialized();
            Ok(())
        }

        fn advance(&mut self) -> Result<Step, Error> {
            self.state.check_can_advance()?;
            match self.state.stage() {
                CountStage::Counting => {
                    let range = self.state.chunk(self.total, 3);
                    if let Some(f) = self.fail_at
                        && range.contains(&f)
                    {
                        return Err(self.state.fail(Error::CorruptedState));
                    }
                    self.state.set_cursor(range.end);
                    if range.end == self.total {
                        self.state.enter(CountStage::End);
                        self.state.finish();
                        return Ok(Step::done("counted"));
                    }
                    Ok(Step::progress(format!("{}/{}", range.end, self.total)))
                }
                CountStage::End => Err(self.state.fail(Error::CorruptedState)),
            }
        }

        fn is_finished(&self) -> bool {
            self.state.is_finished()
        }

        fn has_failed(&self) -> bool {
            self.state.has_failed()
        }

        fn disable_output(&mut self) {
            self.state.disable_output();
        }

        fn is_output_enabled(&self) -> bool {
            self.state.is_output_enabled()
        }

        fn take_output(&mut self) -> Result<Raster, Error> {
            self.state.check_can_collect()?;
            if !self.state.is_output_enabled() {
                return Err(Error::OutputDisabled);
            }
            Raster::new(1, 1)
        }
    }

    fn image(n: u32) -> PixelImage {
        PixelImage::from_lightness(n, 1, vec![50.0; n as usize]).unwrap()
    }

    #[test]
    fn test_chunk_bounds() {
        let mut s: AlgorithmState<CountStage> = AlgorithmState::new();
        assert_eq!(s.chunk(10, 4), 0..4);
        s.set_cursor(8);
        assert_eq!(s.chunk(10, 4), 8..10);
        s.set_cursor(10);
        assert_eq!(s.chunk(10, 4), 10..10);
    }

    #[test]
    fn test_advance_before_initialize() {
        let mut c = Counter::new(None);
        assert!(matches!(c.advance(), Err(Error::NotInitialized)));
    }

    #[test]
    fn test_driver_collects_statuses() {
        let mut c = Counter::new(None);
        c.initialize(vec![image(7)]).unwrap();
        let mut lines = Vec::new();
        let out = run_to_completion(&mut c, &mut |s: &str| lines.push(s.to_string())).unwrap();
        assert!(out.is_some());
        assert_eq!(lines, vec!["3/7", "6/7", "counted"]);
        assert!(matches!(c.advance(), Err(Error::AlreadyFinished)));
    }

    #[test]
    fn test_failure_is_sticky() {
        let mut c = Counter::new(Some(4));
        c.initialize(vec![image(9)]).unwrap();
        let mut last = String::new();
        let res = run_to_completion(&mut c, &mut |s: &str| last = s.to_string());
        assert!(matches!(res, Err(Error::CorruptedState)));
        assert!(c.has_failed());
        assert_eq!(
            last,
            "Unexpected progress information - Corrupted internal state."
        );
        assert!(matches!(c.advance(), Err(Error::AlreadyFailed)));
        assert!(c.take_output().is_err());

        // reinitializing clears the sticky flag
        c.fail_at = None;
        c.initialize(vec![image(2)]).unwrap();
        assert!(c.advance().unwrap().finished);
    }

    #[test]
    fn test_output_disabled() {
        let mut c = Counter::new(None);
        c.disable_output();
        let out = run_with_images(&mut c, vec![image(2)], &mut |_: &str| {}).unwrap();
        assert!(out.is_none());
        assert!(matches!(c.take_output(), Err(Error::OutputDisabled)));
    }

    #[test]
    fn test_cancellation() {
        let flag = AtomicBool::new(true);
        let mut c = Counter::new(None);
        c.initialize(vec![image(5)]).unwrap();
        let mut sink = Cancellable::new(|_: &str| {}, &flag);
        assert!(matches!(
            run_to_completion(&mut c, &mut sink),
            Err(Error::Cancelled)
        ));
        assert!(!c.is_finished());
    }
}
