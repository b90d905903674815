//! Mergeable approximate histogram of transaction durations.
//!
//! Small histograms keep their raw values and are exact. Once more than
//! [`HISTOGRAM_RAW_VALUE_LIMIT`] values arrive, they are moved into an HDR
//! histogram with a fixed relative error, so memory no longer grows with the
//! number of samples. Count, min and max are always tracked exactly.
//!
//! # Encoding
//!
//! ```text
//! u8   format (0 = raw values, 1 = HDR)
//! u64  count      (little endian)
//! u64  min
//! u64  max
//! u32  payload length
//! ...  payload: u64 raw values, or an HDR V2 serialized histogram
//! ```

use crate::utils::config::{
    HISTOGRAM_INITIAL_HIGHEST_TRACKABLE_NANOS, HISTOGRAM_LOWEST_DISCERNIBLE_NANOS,
    HISTOGRAM_RAW_VALUE_LIMIT, HISTOGRAM_SIGNIFICANT_DIGITS,
};
use crate::utils::error::HistogramError;
use hdrhistogram::serialization::{Deserializer, Serializer, V2Serializer};
use hdrhistogram::Histogram;
use log::debug;
use std::io::Write;

const FORMAT_RAW: u8 = 0;
const FORMAT_HDR: u8 = 1;
const HEADER_LEN: usize = 1 + 8 + 8 + 8 + 4;

/// Reusable buffer for histogram encoding
///
/// One buffer is shared across all collectors built during a flush so the
/// HDR serializer does not allocate a fresh buffer per aggregate.
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    bytes: Vec<u8>,
    hdr: Vec<u8>,
}

impl ScratchBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Duration histogram, values in nanoseconds
#[derive(Debug, Clone, Default)]
pub struct ApproximateHistogram {
    raw: Vec<u64>,
    hdr: Option<Histogram<u64>>,
    count: u64,
    min: u64,
    max: u64,
}

fn new_hdr() -> Result<Histogram<u64>, HistogramError> {
    let mut histogram = Histogram::<u64>::new_with_bounds(
        HISTOGRAM_LOWEST_DISCERNIBLE_NANOS,
        HISTOGRAM_INITIAL_HIGHEST_TRACKABLE_NANOS,
        HISTOGRAM_SIGNIFICANT_DIGITS,
    )
    .map_err(|e| HistogramError::Creation(format!("{:?}", e)))?;
    // grows past the initial upper bound on demand
    histogram.auto(true);
    Ok(histogram)
}

fn record(hdr: &mut Histogram<u64>, value: u64) -> Result<(), HistogramError> {
    hdr.record(value).map_err(|e| HistogramError::Record(format!("{}: {:?}", value, e)))
}

/// Build an HDR histogram holding every raw value
fn hdr_from_raw(raw: &[u64]) -> Result<Histogram<u64>, HistogramError> {
    let mut hdr = new_hdr()?;
    for &value in raw {
        record(&mut hdr, value)?;
    }
    Ok(hdr)
}

impl ApproximateHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded values
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Exact smallest recorded value
    pub fn min(&self) -> Option<u64> {
        (self.count > 0).then_some(self.min)
    }

    /// Exact largest recorded value
    pub fn max(&self) -> Option<u64> {
        (self.count > 0).then_some(self.max)
    }

    /// Whether values have been moved into HDR buckets
    pub fn is_bucketed(&self) -> bool {
        self.hdr.is_some()
    }

    /// Record one value
    ///
    /// # Errors
    /// * `HistogramError::Record` - the HDR histogram rejected the value,
    ///   which is then not counted
    /// * `HistogramError::Creation` - converting to HDR buckets failed; the
    ///   value is counted and the raw values are kept
    pub fn add(&mut self, value: u64) -> Result<(), HistogramError> {
        match self.hdr.as_mut() {
            Some(hdr) => record(hdr, value)?,
            None => self.raw.push(value),
        }
        self.track_extremes(value, value, 1);
        if self.raw.len() > HISTOGRAM_RAW_VALUE_LIMIT {
            self.convert_to_hdr()?;
        }
        Ok(())
    }

    /// Merge another histogram into this one
    ///
    /// Merge is commutative and associative: the resulting count is the sum
    /// of both counts and min/max are the true min/max of the union. On
    /// error `self` is left as it was.
    pub fn merge(&mut self, other: &ApproximateHistogram) -> Result<(), HistogramError> {
        if other.is_empty() {
            return Ok(());
        }

        let fits_raw = self.hdr.is_none()
            && other.hdr.is_none()
            && self.raw.len() + other.raw.len() <= HISTOGRAM_RAW_VALUE_LIMIT;
        if fits_raw {
            self.raw.extend_from_slice(&other.raw);
        } else {
            let mut hdr = match &self.hdr {
                Some(hdr) => hdr.clone(),
                None => hdr_from_raw(&self.raw)?,
            };
            match &other.hdr {
                Some(other_hdr) => hdr
                    .add(other_hdr)
                    .map_err(|e| HistogramError::Merge(format!("{:?}", e)))?,
                None => {
                    for &value in &other.raw {
                        record(&mut hdr, value)?;
                    }
                }
            }
            self.raw = Vec::new();
            self.hdr = Some(hdr);
        }
        self.track_extremes(other.min, other.max, other.count);
        Ok(())
    }

    /// Value at the given percentile (0.0 to 100.0)
    ///
    /// Exact while raw values are kept, within the HDR relative error
    /// afterwards, and always inside `[min, max]`.
    pub fn value_at_percentile(&self, percentile: f64) -> Option<u64> {
        if self.count == 0 {
            return None;
        }
        let quantile = (percentile / 100.0).clamp(0.0, 1.0);
        let value = match &self.hdr {
            Some(hdr) => hdr.value_at_quantile(quantile),
            None => {
                let mut sorted = self.raw.clone();
                sorted.sort_unstable();
                let rank = (quantile * sorted.len() as f64).ceil() as usize;
                sorted[rank.clamp(1, sorted.len()) - 1]
            }
        };
        Some(value.clamp(self.min, self.max))
    }

    /// Mean of recorded values
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        match &self.hdr {
            Some(hdr) => Some(hdr.mean()),
            None => Some(self.raw.iter().map(|&v| v as f64).sum::<f64>() / self.raw.len() as f64),
        }
    }

    /// Encode into the compact binary format described in the module docs
    ///
    /// # Errors
    /// * `HistogramError::Encode` - HDR serialization failed
    /// * `HistogramError::Io` - writing to the scratch buffer failed
    pub fn encode(&self, scratch: &mut ScratchBuffer) -> Result<Vec<u8>, HistogramError> {
        scratch.bytes.clear();
        let (format, payload_len) = match &self.hdr {
            Some(hdr) => {
                scratch.hdr.clear();
                let written = V2Serializer::new()
                    .serialize(hdr, &mut scratch.hdr)
                    .map_err(|e| HistogramError::Encode(format!("{:?}", e)))?;
                (FORMAT_HDR, written)
            }
            None => (FORMAT_RAW, self.raw.len() * 8),
        };
        let payload_len = u32::try_from(payload_len).map_err(|_| {
            HistogramError::Encode(format!("payload too large: {} bytes", payload_len))
        })?;

        let out = &mut scratch.bytes;
        out.write_all(&[format])?;
        out.write_all(&self.count.to_le_bytes())?;
        out.write_all(&self.min.to_le_bytes())?;
        out.write_all(&self.max.to_le_bytes())?;
        out.write_all(&payload_len.to_le_bytes())?;
        if format == FORMAT_HDR {
            out.write_all(&scratch.hdr)?;
        } else {
            for value in &self.raw {
                out.write_all(&value.to_le_bytes())?;
            }
        }

        Ok(scratch.bytes.clone())
    }

    /// Rebuild a histogram from [`encode`](Self::encode) output
    ///
    /// # Errors
    /// * `HistogramError::Truncated` - fewer bytes than the header announces
    /// * `HistogramError::UnknownFormat` - unsupported format tag
    /// * `HistogramError::Decode` - HDR payload is corrupt
    pub fn decode(bytes: &[u8]) -> Result<Self, HistogramError> {
        if bytes.len() < HEADER_LEN {
            return Err(HistogramError::Truncated {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }
        let format = bytes[0];
        let count = read_u64(&bytes[1..9]);
        let min = read_u64(&bytes[9..17]);
        let max = read_u64(&bytes[17..25]);
        let payload_len = read_u32(&bytes[25..29]) as usize;

        let expected = HEADER_LEN + payload_len;
        if bytes.len() < expected {
            return Err(HistogramError::Truncated {
                expected,
                found: bytes.len(),
            });
        }
        let payload = &bytes[HEADER_LEN..expected];

        match format {
            FORMAT_RAW => {
                let raw: Vec<u64> = payload.chunks_exact(8).map(read_u64).collect();
                Ok(Self {
                    raw,
                    hdr: None,
                    count,
                    min,
                    max,
                })
            }
            FORMAT_HDR => {
                let mut reader = payload;
                let mut hdr: Histogram<u64> = Deserializer::new()
                    .deserialize(&mut reader)
                    .map_err(|e| HistogramError::Decode(format!("{:?}", e)))?;
                hdr.auto(true);
                Ok(Self {
                    raw: Vec::new(),
                    hdr: Some(hdr),
                    count,
                    min,
                    max,
                })
            }
            other => Err(HistogramError::UnknownFormat(other)),
        }
    }

    fn track_extremes(&mut self, min: u64, max: u64, count: u64) {
        if self.count == 0 {
            self.min = min;
            self.max = max;
        } else {
            self.min = self.min.min(min);
            self.max = self.max.max(max);
        }
        self.count += count;
    }

    fn convert_to_hdr(&mut self) -> Result<(), HistogramError> {
        if self.hdr.is_some() {
            return Ok(());
        }
        debug!("Converting histogram with {} raw values to HDR buckets", self.raw.len());
        // raw values stay in place until the HDR copy is complete
        self.hdr = Some(hdr_from_raw(&self.raw)?);
        self.raw = Vec::new();
        Ok(())
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram_of(values: impl IntoIterator<Item = u64>) -> ApproximateHistogram {
        let mut histogram = ApproximateHistogram::new();
        for value in values {
            histogram.add(value).unwrap();
        }
        histogram
    }

    #[test]
    fn test_empty_histogram() {
        let histogram = ApproximateHistogram::new();
        assert_eq!(histogram.count(), 0);
        assert_eq!(histogram.min(), None);
        assert_eq!(histogram.value_at_percentile(50.0), None);
        assert_eq!(histogram.mean(), None);
    }

    #[test]
    fn test_raw_percentiles_are_exact() {
        let histogram = histogram_of((1..=100).map(|v| v * 1_000));

        assert!(!histogram.is_bucketed());
        assert_eq!(histogram.value_at_percentile(50.0), Some(50_000));
        assert_eq!(histogram.value_at_percentile(99.0), Some(99_000));
        assert_eq!(histogram.value_at_percentile(100.0), Some(100_000));
        assert_eq!(histogram.value_at_percentile(0.0), Some(1_000));
    }

    #[test]
    fn test_switches_to_buckets_past_raw_limit() {
        let histogram = histogram_of((0..5_000u64).map(|v| v * 1_000));

        assert!(histogram.is_bucketed());
        assert_eq!(histogram.count(), 5_000);
        assert_eq!(histogram.min(), Some(0));
        assert_eq!(histogram.max(), Some(4_999_000));

        let median = histogram.value_at_percentile(50.0).unwrap() as f64;
        assert!((median - 2_500_000.0).abs() / 2_500_000.0 < 0.02, "median {}", median);
    }

    #[test]
    fn test_merge_tracks_true_extremes() {
        let mut a = histogram_of([5_000, 9_000]);
        let b = histogram_of([1_000, 20_000]);

        a.merge(&b).unwrap();

        assert_eq!(a.count(), 4);
        assert_eq!(a.min(), Some(1_000));
        assert_eq!(a.max(), Some(20_000));
    }

    #[test]
    fn test_merge_past_raw_limit_keeps_percentiles() {
        let mut a = histogram_of((1..=800u64).map(|v| v * 100_000));
        let b = histogram_of((801..=1_600u64).map(|v| v * 100_000));

        a.merge(&b).unwrap();

        assert!(a.is_bucketed());
        assert_eq!(a.count(), 1_600);
        let p99 = a.value_at_percentile(99.0).unwrap() as f64;
        assert!((p99 - 158_400_000.0).abs() / 158_400_000.0 < 0.01, "p99 {}", p99);
    }

    #[test]
    fn test_merge_with_empty_is_noop() {
        let mut a = histogram_of([7_000]);
        a.merge(&ApproximateHistogram::new()).unwrap();
        assert_eq!(a.count(), 1);

        let mut empty = ApproximateHistogram::new();
        empty.merge(&a).unwrap();
        assert_eq!(empty.min(), Some(7_000));
    }

    #[test]
    fn test_encode_decode_raw() {
        let histogram = histogram_of([3_000, 1_000, 2_000]);
        let mut scratch = ScratchBuffer::new();

        let bytes = histogram.encode(&mut scratch).unwrap();
        let decoded = ApproximateHistogram::decode(&bytes).unwrap();

        assert!(!decoded.is_bucketed());
        assert_eq!(decoded.count(), 3);
        assert_eq!(decoded.value_at_percentile(50.0), Some(2_000));
    }

    #[test]
    fn test_encode_decode_bucketed() {
        let histogram = histogram_of((1..=3_000u64).map(|v| v * 10_000));
        let mut scratch = ScratchBuffer::new();

        let bytes = histogram.encode(&mut scratch).unwrap();
        let decoded = ApproximateHistogram::decode(&bytes).unwrap();

        assert!(decoded.is_bucketed());
        assert_eq!(decoded.count(), histogram.count());
        assert_eq!(decoded.min(), histogram.min());
        assert_eq!(decoded.max(), histogram.max());
        assert_eq!(
            decoded.value_at_percentile(95.0),
            histogram.value_at_percentile(95.0)
        );
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        let result = ApproximateHistogram::decode(&[FORMAT_RAW, 1, 2]);
        assert!(matches!(result, Err(HistogramError::Truncated { .. })));
    }

    #[test]
    fn test_decode_rejects_unknown_format() {
        let mut bytes = vec![9u8];
        bytes.extend_from_slice(&[0u8; HEADER_LEN - 1]);
        let result = ApproximateHistogram::decode(&bytes);
        assert!(matches!(result, Err(HistogramError::UnknownFormat(9))));
    }
}
