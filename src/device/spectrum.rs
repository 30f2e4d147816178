use chrono::Utc;

use super::{DeviceError, Result, Spectrum, SpectrumPoint, SpectrumSample};
use crate::serial::{Response, SpectrumCursor};

/// Accumulates one spectrum transfer, sample by sample.
///
/// Mirrors the codec's cursor so every delivered sample can be checked
/// against the wavelength and count announced by the header.
#[derive(Debug, Clone)]
pub struct SpectrumSession {
    cursor: SpectrumCursor,
    points: Vec<SpectrumPoint>,
}

impl SpectrumSession {
    /// Start from a decoded spectrum header
    pub fn begin(header: &Response) -> Option<Self> {
        match *header {
            Response::SpectrumHeader {
                start_wavelength,
                sample_count,
            } => Some(Self {
                cursor: SpectrumCursor::new(start_wavelength, sample_count),
                points: Vec::with_capacity(sample_count as usize),
            }),
            _ => None,
        }
    }

    pub fn cursor(&self) -> &SpectrumCursor {
        &self.cursor
    }

    pub fn points(&self) -> &[SpectrumPoint] {
        &self.points
    }

    pub fn is_done(&self) -> bool {
        self.cursor.is_complete()
    }

    /// Fraction of the scan received, 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        if self.cursor.total_samples == 0 {
            1.0
        } else {
            self.cursor.next_index as f64 / self.cursor.total_samples as f64
        }
    }

    /// Record the next sample; returns `true` once the scan is complete
    pub fn next(&mut self, sample: SpectrumSample) -> Result<bool> {
        if self.is_done() {
            return Err(DeviceError::UnexpectedResponse {
                command: "spectrum-sample",
                detail: "sample after the last point".to_string(),
            });
        }
        let expected = self.cursor.next_wavelength()?;
        if sample.point.wavelength != expected || sample.total != self.cursor.total_samples {
            return Err(DeviceError::UnexpectedResponse {
                command: "spectrum-sample",
                detail: format!(
                    "got {} nm ({}/{}), expected {} nm of {}",
                    sample.point.wavelength,
                    sample.received,
                    sample.total,
                    expected,
                    self.cursor.total_samples
                ),
            });
        }

        self.points.push(sample.point);
        self.cursor.next_index += 1;
        Ok(self.is_done())
    }

    pub fn finish(self) -> Spectrum {
        Spectrum {
            start_wavelength: self.cursor.start_wavelength,
            points: self.points,
            acquired_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::DecodeError;

    fn sample(wavelength: u16, received: u16, total: u16, absorbance: f64) -> SpectrumSample {
        SpectrumSample {
            point: SpectrumPoint { wavelength, absorbance },
            received,
            total,
        }
    }

    #[test]
    fn test_begin_requires_header() {
        assert!(SpectrumSession::begin(&Response::Firmware(3)).is_none());
        let session = SpectrumSession::begin(&Response::SpectrumHeader {
            start_wavelength: 400,
            sample_count: 3,
        })
        .expect("header starts a session");
        assert_eq!(session.cursor(), &SpectrumCursor::new(400, 3));
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn test_collects_until_done() {
        let mut session = SpectrumSession::begin(&Response::SpectrumHeader {
            start_wavelength: 400,
            sample_count: 2,
        })
        .unwrap();
        assert!(!session.next(sample(400, 1, 2, 0.5)).unwrap());
        assert_eq!(session.progress(), 0.5);
        assert!(session.next(sample(401, 2, 2, 0.25)).unwrap());
        assert!(session.next(sample(402, 3, 2, 0.0)).is_err());

        let spectrum = session.finish();
        assert_eq!(spectrum.start_wavelength, 400);
        assert_eq!(spectrum.len(), 2);
        assert_eq!(spectrum.absorbance_range(), Some((0.25, 0.5)));
        assert_eq!(spectrum.wavelength_range(), Some((400, 401)));
    }

    #[test]
    fn test_rejects_out_of_order_sample() {
        let mut session = SpectrumSession::begin(&Response::SpectrumHeader {
            start_wavelength: 500,
            sample_count: 4,
        })
        .unwrap();
        assert!(session.next(sample(501, 1, 4, 0.1)).is_err());
        assert!(session.points().is_empty());
    }

    #[test]
    fn test_wavelength_overflow_is_a_decode_error() {
        let mut session = SpectrumSession::begin(&Response::SpectrumHeader {
            start_wavelength: u16::MAX,
            sample_count: 2,
        })
        .unwrap();
        assert!(!session.next(sample(u16::MAX, 1, 2, 0.0)).unwrap());
        assert!(matches!(
            session.next(sample(0, 2, 2, 0.0)),
            Err(DeviceError::Decode(DecodeError::WavelengthOverflow { index: 1, .. }))
        ));
    }
}
