//! WLED audio sync wire format (version 2)
//!
//! ```text
//! offset  size  field
//!      0     6  header "00002\0"
//!      6     2  gap (zero)
//!      8     4  raw level            f32 LE
//!     12     4  smoothed level       f32 LE
//!     16     1  peak level           u8
//!     17     1  reserved (zero)
//!     18    16  band values          u8 x 16
//!     34     2  gap (zero)
//!     36     4  magnitude sum        f32 LE
//!     40     4  peak frequency       f32 LE
//! ```
//!
//! The layout is consumed by third-party controllers and must not change.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::audio::analyzer::Analysis;
use crate::constants::NUM_BANDS;
use crate::error::NetworkError;

/// Fixed packet header
pub const HEADER: [u8; 6] = *b"00002\0";

/// Encoded packet length in bytes
pub const PACKET_SIZE: usize = 44;

/// One audio sync packet
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSyncPacket {
    pub raw_level: f32,
    pub smoothed_level: f32,
    pub peak_level: u8,
    pub bands: [u8; NUM_BANDS],
    pub magnitude_sum: f32,
    pub peak_frequency: f32,
}

impl AudioSyncPacket {
    /// Build a packet from an analysis and the current smoothed level
    pub fn from_analysis(analysis: &Analysis, smoothed_level: f64) -> Self {
        Self {
            raw_level: analysis.raw_level as f32,
            smoothed_level: smoothed_level as f32,
            peak_level: analysis.peak_level,
            bands: analysis.bands,
            magnitude_sum: analysis.magnitude_sum as f32,
            peak_frequency: analysis.peak_frequency as f32,
        }
    }

    /// Serialize into the 44-byte wire layout.
    ///
    /// Floats are written as-is, NaN and infinities included.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(PACKET_SIZE);
        buf.put_slice(&HEADER);
        buf.put_bytes(0, 2);
        buf.put_f32_le(self.raw_level);
        buf.put_f32_le(self.smoothed_level);
        buf.put_u8(self.peak_level);
        buf.put_u8(0);
        buf.put_slice(&self.bands);
        buf.put_bytes(0, 2);
        buf.put_f32_le(self.magnitude_sum);
        buf.put_f32_le(self.peak_frequency);
        debug_assert_eq!(buf.len(), PACKET_SIZE);
        buf.freeze()
    }

    /// Parse a received packet
    pub fn decode(data: &[u8]) -> Result<Self, NetworkError> {
        if data.len() != PACKET_SIZE {
            return Err(NetworkError::InvalidPacket(data.len()));
        }
        if data[..HEADER.len()] != HEADER {
            return Err(NetworkError::InvalidHeader);
        }

        let mut buf = &data[HEADER.len()..];
        buf.advance(2);
        let raw_level = buf.get_f32_le();
        let smoothed_level = buf.get_f32_le();
        let peak_level = buf.get_u8();
        buf.advance(1);
        let mut bands = [0u8; NUM_BANDS];
        buf.copy_to_slice(&mut bands);
        buf.advance(2);
        let magnitude_sum = buf.get_f32_le();
        let peak_frequency = buf.get_f32_le();

        Ok(Self {
            raw_level,
            smoothed_level,
            peak_level,
            bands,
            magnitude_sum,
            peak_frequency,
        })
    }
}

/// Narrow arbitrary integers to band bytes.
///
/// Fixed-width truncation: values outside `0..=255` wrap. Missing bands
/// are zero, extra values are dropped.
pub fn truncate_bands(values: &[i64]) -> [u8; NUM_BANDS] {
    let mut bands = [0u8; NUM_BANDS];
    for (band, &value) in bands.iter_mut().zip(values.iter()) {
        *band = value as u8;
    }
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_packet() -> AudioSyncPacket {
        let mut bands = [0u8; NUM_BANDS];
        for (i, band) in bands.iter_mut().enumerate() {
            *band = i as u8;
        }
        AudioSyncPacket {
            raw_level: 1.5,
            smoothed_level: 1.2,
            peak_level: 200,
            bands,
            magnitude_sum: 42.0,
            peak_frequency: 440.0,
        }
    }

    #[test]
    fn test_layout() {
        let encoded = sample_packet().encode();

        assert_eq!(encoded.len(), PACKET_SIZE);
        assert_eq!(&encoded[..6], b"00002\0");
        assert_eq!(&encoded[6..8], &[0, 0]);
        assert_eq!(&encoded[8..12], &1.5f32.to_le_bytes());
        assert_eq!(&encoded[12..16], &1.2f32.to_le_bytes());
        assert_eq!(encoded[16], 200);
        assert_eq!(encoded[17], 0);
        assert_eq!(&encoded[18..34], &(0u8..16).collect::<Vec<_>>()[..]);
        assert_eq!(&encoded[34..36], &[0, 0]);
        assert_eq!(&encoded[36..40], &42.0f32.to_le_bytes());
        assert_eq!(&encoded[40..44], &440.0f32.to_le_bytes());
    }

    #[test]
    fn test_decode_recovers_fields() {
        let packet = sample_packet();
        let decoded = AudioSyncPacket::decode(&packet.encode()).unwrap();

        assert_eq!(decoded.raw_level.to_bits(), 1.5f32.to_bits());
        assert_eq!(decoded.smoothed_level.to_bits(), 1.2f32.to_bits());
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_nan_passes_through() {
        let mut packet = sample_packet();
        packet.magnitude_sum = f32::NAN;
        let encoded = packet.encode();
        assert_eq!(&encoded[36..40], &f32::NAN.to_le_bytes());
        assert!(AudioSyncPacket::decode(&encoded).unwrap().magnitude_sum.is_nan());
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let encoded = sample_packet().encode();

        assert!(matches!(
            AudioSyncPacket::decode(&encoded[..43]),
            Err(NetworkError::InvalidPacket(43))
        ));

        let mut wrong_header = encoded.to_vec();
        wrong_header[4] = b'1';
        assert!(matches!(
            AudioSyncPacket::decode(&wrong_header),
            Err(NetworkError::InvalidHeader)
        ));
    }

    #[test]
    fn test_from_analysis() {
        let analysis = Analysis {
            bands: [7; NUM_BANDS],
            raw_level: 321.25,
            peak_level: 99,
            magnitude_sum: 1e6,
            peak_frequency: 1000.0,
        };
        let packet = AudioSyncPacket::from_analysis(&analysis, 64.25);

        assert_eq!(packet.raw_level, 321.25);
        assert_eq!(packet.smoothed_level, 64.25);
        assert_eq!(packet.peak_level, 99);
        assert_eq!(packet.bands, [7; NUM_BANDS]);
        assert_eq!(packet.magnitude_sum, 1e6);
        assert_eq!(packet.peak_frequency, 1000.0);
    }

    #[test]
    fn test_truncate_bands_wraps() {
        let bands = truncate_bands(&[0, 255, 256, 300, -1]);
        assert_eq!(&bands[..5], &[0, 255, 0, 44, 255]);
        assert!(bands[5..].iter().all(|&b| b == 0));
    }

    proptest! {
        #[test]
        fn prop_fixed_frame(raw in any::<f32>(), peak in any::<u8>(), bands in any::<[u8; 16]>()) {
            let packet = AudioSyncPacket {
                raw_level: raw,
                smoothed_level: 0.0,
                peak_level: peak,
                bands,
                magnitude_sum: 0.0,
                peak_frequency: 0.0,
            };
            let encoded = packet.encode();
            prop_assert_eq!(encoded.len(), PACKET_SIZE);
            prop_assert_eq!(&encoded[..6], &HEADER[..]);
            prop_assert_eq!(encoded[17], 0);
            prop_assert_eq!(&encoded[18..34], &bands[..]);
            prop_assert_eq!(&encoded[8..12], &raw.to_le_bytes()[..]);
        }
    }
}
