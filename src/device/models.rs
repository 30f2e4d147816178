use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::serial::response::{ModelInfo, SpectrumPoint, SpectrumSample};

/// Optical range and scan options supported by the S250/Prim family
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WavelengthLimits {
    /// nm
    pub start: u16,
    /// nm
    pub end: u16,
    pub resolution: u8,
    pub speeds: Vec<u8>,
}

impl Default for WavelengthLimits {
    fn default() -> Self {
        Self {
            start: 330,
            end: 900,
            resolution: 3,
            speeds: (1..=8).collect(),
        }
    }
}

impl WavelengthLimits {
    pub fn contains(&self, wavelength: u16) -> bool {
        (self.start..=self.end).contains(&wavelength)
    }

    pub fn supports_speed(&self, speed: u8) -> bool {
        self.speeds.contains(&speed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceInfo {
    pub model: ModelInfo,
    pub firmware_version: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AutotestReport {
    pub passed: bool,
    /// Raw result byte; non-zero points at a machine configuration fault
    pub code: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AbsorbanceReading {
    pub wavelength: u16,
    pub absorbance: f64,
    pub status: u8,
}

/// A complete scan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Spectrum {
    pub start_wavelength: u16,
    pub points: Vec<SpectrumPoint>,
    pub acquired_at: DateTime<Utc>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Smallest and largest absorbance in the scan
    pub fn absorbance_range(&self) -> Option<(f64, f64)> {
        let mut values = self.points.iter().map(|p| p.absorbance);
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    pub fn wavelength_range(&self) -> Option<(u16, u16)> {
        Some((self.points.first()?.wavelength, self.points.last()?.wavelength))
    }
}
