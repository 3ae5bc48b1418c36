//! Error types for the audio feeder

use std::net::SocketAddr;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Spectral analysis failures.
///
/// Returned per block; the stream loop skips the cycle and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Empty audio block")]
    EmptyBlock,

    #[error("Block length {0} is not a whole number of 16-bit samples")]
    OddLength(usize),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket setup failed: {0}")]
    SocketSetup(String),

    #[error("Send to {addr} failed: {reason}")]
    SendFailed { addr: SocketAddr, reason: String },

    #[error("Could not resolve address: {0}")]
    AddressResolution(String),

    #[error("Invalid packet length: {0} bytes")]
    InvalidPacket(usize),

    #[error("Invalid packet header")]
    InvalidHeader,
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
