//! Timestamped sensor readings
//!
//! The filter's input contract: an ordered stream of [`SensorReading`]s with
//! monotonically non-decreasing integer timestamps in microseconds. Parsing
//! raw sensor logs into readings is the caller's job; the constructors here
//! only check that the value count matches the declared sensor kind.

use nalgebra::RealField;

use crate::types::spaces::Measurement;
use crate::{FilterError, Result};

/// Conversion factor between reading timestamps and seconds.
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// The kind of sensor a reading originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Cartesian positional sensor reporting (x, y).
    Position,
    /// Polar sensor reporting (range, bearing, range-rate).
    RangeBearing,
}

impl SensorKind {
    /// Dimensionality of this sensor's raw measurement vector.
    #[inline]
    pub fn dimension(&self) -> usize {
        match self {
            SensorKind::Position => 2,
            SensorKind::RangeBearing => 3,
        }
    }
}

/// Raw measurement values, dimensioned per sensor kind.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorData<T: RealField> {
    /// (x, y) in meters.
    Position(Measurement<T, 2>),
    /// (range, bearing, range-rate) in meters, radians, meters/second.
    RangeBearing(Measurement<T, 3>),
}

impl<T: RealField + Copy> SensorData<T> {
    /// The sensor kind these values belong to.
    #[inline]
    pub fn kind(&self) -> SensorKind {
        match self {
            SensorData::Position(_) => SensorKind::Position,
            SensorData::RangeBearing(_) => SensorKind::RangeBearing,
        }
    }
}

/// One timestamped sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading<T: RealField> {
    /// Timestamp in microseconds. Must be non-decreasing across the stream.
    pub timestamp_us: i64,
    /// The measured values.
    pub data: SensorData<T>,
}

impl<T: RealField + Copy> SensorReading<T> {
    /// Creates a positional reading.
    #[inline]
    pub fn position(timestamp_us: i64, x: T, y: T) -> Self {
        Self {
            timestamp_us,
            data: SensorData::Position(Measurement::from_array([x, y])),
        }
    }

    /// Creates a range-bearing reading.
    #[inline]
    pub fn range_bearing(timestamp_us: i64, range: T, bearing: T, range_rate: T) -> Self {
        Self {
            timestamp_us,
            data: SensorData::RangeBearing(Measurement::from_array([range, bearing, range_rate])),
        }
    }

    /// Builds a reading from a declared sensor kind and a raw value slice,
    /// checking dimensionality.
    pub fn from_slice(kind: SensorKind, timestamp_us: i64, values: &[T]) -> Result<Self> {
        if values.len() != kind.dimension() {
            return Err(FilterError::MalformedMeasurement {
                kind,
                expected: kind.dimension(),
                got: values.len(),
            });
        }
        let data = match kind {
            SensorKind::Position => {
                SensorData::Position(Measurement::from_array([values[0], values[1]]))
            }
            SensorKind::RangeBearing => SensorData::RangeBearing(Measurement::from_array([
                values[0], values[1], values[2],
            ])),
        };
        Ok(Self { timestamp_us, data })
    }

    /// The sensor kind of this reading.
    #[inline]
    pub fn kind(&self) -> SensorKind {
        self.data.kind()
    }
}
