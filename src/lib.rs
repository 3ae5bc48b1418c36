//! # WLED Audio Feeder
//!
//! Real-time spectrum analysis of a raw PCM stream, sent to WLED
//! controllers as audio-sync UDP packets.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ stdin (PCM)  │──▶│ BlockReader  │──▶│  RingWindow  │──▶│  Spectrum    │
//! │ s16le, mono  │   │ audio::source│   │ audio::buffer│   │  Analyzer    │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                                                 │
//!         ┌───────────────────────────────────────────────────────┘
//!         ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ LevelSmoother│──▶│AudioSyncPacket──▶│  Dispatcher  │──▶ UDP (unicast
//! │ audio::smooth│   │   protocol   │   │   network    │    list or
//! └──────────────┘   └──────────────┘   └──────────────┘    multicast)
//! ```
//!
//! One cycle per block, strictly sequential, driven by
//! [`pipeline::StreamLoop`].

pub mod audio;
pub mod config;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod protocol;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate for audio processing
    pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

    /// Default ring window size in bytes
    pub const DEFAULT_BUFFER_SIZE: usize = 2048;

    /// Default block size in bytes (512 samples)
    pub const DEFAULT_CHUNK_SIZE: usize = 1024;

    /// Default WLED audio sync UDP port
    pub const DEFAULT_UDP_PORT: u16 = 11988;

    /// Default multicast group used by WLED audio sync
    pub const DEFAULT_MULTICAST_IP: &str = "239.0.0.1";

    /// Multicast TTL, keeps packets on the local segment
    pub const MULTICAST_TTL: u32 = 1;

    /// Number of frequency bands per packet
    pub const NUM_BANDS: usize = 16;

    /// Full scale of a signed 16-bit sample
    pub const SAMPLE_FULL_SCALE: f64 = 32767.0;

    /// Weight of the previous smoothed level
    pub const SMOOTHING_DECAY: f64 = 0.8;

    /// Weight of the new raw level
    pub const SMOOTHING_GAIN: f64 = 0.2;

    /// Cycles between statistics log lines
    pub const DEFAULT_STATS_INTERVAL: u64 = 1000;
}
