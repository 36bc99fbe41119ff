use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single distance reading decoded from the sensor topic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Distance from the sensor to the bin contents, in millimeters
    pub distance_mm: f64,
}

/// Current fill level of the bin
///
/// `fill_percentage` is always derived from `distance_mm` through
/// [`fill_percentage`]; the two fields are written together.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BinState {
    pub distance_mm: f64,
    pub fill_percentage: f64,
}

/// Convert a raw distance into a fill percentage.
///
/// Only the lower bound is clamped. A distance below zero (sensor noise)
/// produces a value above 100, which is passed through unchanged.
pub fn fill_percentage(distance_mm: f64, bin_height_mm: f64) -> f64 {
    (100.0 - (distance_mm / bin_height_mm) * 100.0).max(0.0)
}

/// Bin state shared between the MQTT subscriber and the API handlers
///
/// Cloning is cheap and every clone refers to the same record. Both fields
/// are read and written under one lock, so a reader never observes a
/// distance from one update paired with a percentage from another.
#[derive(Debug, Clone, Default)]
pub struct SharedBinState {
    inner: Arc<RwLock<BinState>>,
}

impl SharedBinState {
    /// Create a zeroed state
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite both fields
    pub fn update(&self, distance_mm: f64, fill_percentage: f64) {
        *self.inner.write() = BinState {
            distance_mm,
            fill_percentage,
        };
    }

    /// Snapshot of the current state
    pub fn read(&self) -> BinState {
        *self.inner.read()
    }

    /// Convert a reading and store the result, returning the new state
    pub fn apply_reading(&self, reading: SensorReading, bin_height_mm: f64) -> BinState {
        let state = BinState {
            distance_mm: reading.distance_mm,
            fill_percentage: fill_percentage(reading.distance_mm, bin_height_mm),
        };
        self.update(state.distance_mm, state.fill_percentage);
        state
    }

    /// True while any reader or writer holds the lock
    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}
