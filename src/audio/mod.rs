//! Audio subsystem: block reading, windowing, analysis and smoothing

pub mod analyzer;
pub mod buffer;
pub mod smoother;
pub mod source;

pub use analyzer::{Analysis, SpectrumAnalyzer};
pub use buffer::{RingWindow, UnderrunPolicy};
pub use smoother::LevelSmoother;
pub use source::{BlockReader, ReadOutcome};
