//! Configuration for the audio feeder
//!
//! Everything here is resolved once before the stream loop starts and is
//! treated as immutable afterwards.

use directories::ProjectDirs;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::audio::buffer::UnderrunPolicy;
use crate::constants::*;
use crate::error::{Error, Result};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub wled: WledConfig,
    pub stream: StreamConfig,
}

/// Input stream format and window sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate of the incoming PCM stream in Hz
    pub sample_rate: u32,
    /// Ring window size in bytes
    pub buffer_size: usize,
    /// Bytes read and analyzed per cycle
    pub chunk_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl AudioConfig {
    /// Number of blocks held by the ring window.
    ///
    /// Integer division: a `buffer_size` that is not a multiple of
    /// `chunk_size` is truncated, not rejected.
    pub fn ring_capacity(&self) -> usize {
        if self.chunk_size == 0 {
            0
        } else {
            self.buffer_size / self.chunk_size
        }
    }

    /// Samples per analyzed block
    pub fn samples_per_block(&self) -> usize {
        self.chunk_size / 2
    }
}

/// Destination controllers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WledConfig {
    /// Unicast hosts, in send order
    #[serde(deserialize_with = "deserialize_addresses")]
    pub addresses: Vec<String>,
    /// Destination port shared by all targets
    pub port: u16,
    /// Send one packet to `multicast_ip` instead of the unicast list
    pub use_multicast: bool,
    pub multicast_ip: String,
}

impl Default for WledConfig {
    fn default() -> Self {
        Self {
            addresses: vec!["127.0.0.1".into()],
            port: DEFAULT_UDP_PORT,
            use_multicast: false,
            multicast_ip: DEFAULT_MULTICAST_IP.into(),
        }
    }
}

/// Stream loop policies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Analyze the previous window contents when a read comes up short
    pub reuse_on_underrun: bool,
    /// Stop the loop when the input stream ends
    pub exit_on_eof: bool,
    /// Cycles between statistics log lines (0 disables)
    pub stats_interval: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reuse_on_underrun: true,
            exit_on_eof: false,
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }
}

impl StreamConfig {
    pub fn underrun_policy(&self) -> UnderrunPolicy {
        if self.reuse_on_underrun {
            UnderrunPolicy::Reuse
        } else {
            UnderrunPolicy::Skip
        }
    }
}

/// Accepts either a TOML array or a single comma-separated string.
fn deserialize_addresses<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Addresses {
        List(Vec<String>),
        Joined(String),
    }

    let raw = match Addresses::deserialize(deserializer)? {
        Addresses::List(list) => list,
        Addresses::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };

    Ok(raw
        .into_iter()
        .map(|addr| addr.trim().to_string())
        .filter(|addr| !addr.is_empty())
        .collect())
}

impl AppConfig {
    const FILE_NAME: &'static str = "feeder.toml";

    /// Default config location, e.g. `~/.config/wled-audio-feeder/feeder.toml`
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "wled-audio-feeder")
            .map(|dirs| dirs.config_dir().join(Self::FILE_NAME))
    }

    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Load `path` if given, else the default location if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => {
                tracing::info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check the invariants the stream loop relies on
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;

        if audio.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".into()));
        }
        if audio.chunk_size == 0 || audio.chunk_size % 2 != 0 {
            return Err(Error::Config(format!(
                "chunk_size must be a positive even number of bytes, got {}",
                audio.chunk_size
            )));
        }
        if audio.ring_capacity() == 0 {
            return Err(Error::Config(format!(
                "buffer_size ({}) must hold at least one chunk ({})",
                audio.buffer_size, audio.chunk_size
            )));
        }

        if self.wled.use_multicast {
            let group: Ipv4Addr = self.wled.multicast_ip.parse().map_err(|_| {
                Error::Config(format!("invalid multicast_ip: {}", self.wled.multicast_ip))
            })?;
            if !group.is_multicast() {
                return Err(Error::Config(format!(
                    "{} is not a multicast address",
                    group
                )));
            }
        } else if self.wled.addresses.is_empty() {
            return Err(Error::Config(
                "at least one address is required when multicast is disabled".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.audio.ring_capacity(), 2);
        assert_eq!(config.wled.port, 11988);
        assert_eq!(config.stream.underrun_policy(), UnderrunPolicy::Reuse);
    }

    #[test]
    fn test_parse_full_document() {
        let config = AppConfig::from_toml(
            r#"
            [audio]
            sample_rate = 48000
            buffer_size = 4096
            chunk_size = 1024

            [wled]
            addresses = ["192.168.1.10", "192.168.1.11"]
            port = 21324
            use_multicast = false

            [stream]
            reuse_on_underrun = false
            exit_on_eof = true
            "#,
        )
        .unwrap();

        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.audio.ring_capacity(), 4);
        assert_eq!(config.wled.addresses, vec!["192.168.1.10", "192.168.1.11"]);
        assert_eq!(config.wled.port, 21324);
        assert_eq!(config.stream.underrun_policy(), UnderrunPolicy::Skip);
        assert!(config.stream.exit_on_eof);
        assert_eq!(config.stream.stats_interval, DEFAULT_STATS_INTERVAL);
    }

    #[test]
    fn test_comma_separated_addresses() {
        let config = AppConfig::from_toml(
            r#"
            [wled]
            addresses = "10.0.0.1, 10.0.0.2 ,10.0.0.3"
            "#,
        )
        .unwrap();

        assert_eq!(config.wled.addresses, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[test]
    fn test_capacity_truncates() {
        let audio = AudioConfig {
            sample_rate: 44100,
            buffer_size: 3000,
            chunk_size: 1024,
        };
        assert_eq!(audio.ring_capacity(), 2);
        assert_eq!(audio.samples_per_block(), 512);
    }

    #[test]
    fn test_rejects_bad_sizes() {
        let mut config = AppConfig::default();
        config.audio.chunk_size = 1023;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.audio.buffer_size = 512;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.audio.sample_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multicast_validation() {
        let mut config = AppConfig::default();
        config.wled.use_multicast = true;
        config.wled.addresses.clear();
        assert!(config.validate().is_ok());

        config.wled.multicast_ip = "192.168.1.1".into();
        assert!(config.validate().is_err());

        config.wled.use_multicast = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.audio.chunk_size, config.audio.chunk_size);
        assert_eq!(parsed.wled.addresses, config.wled.addresses);
    }
}
