//! Incoming half of the protocol: raw response bytes to typed results.
use serde::{Deserialize, Serialize};

use super::protocol::{
    CommandKind, ANS_AUTOTEST_OK, ANS_BASELINE_OK, ANS_GET_ABS_OK, ANS_GET_ZERO_ABS_OK,
    ANS_INIT_NOK, ANS_INIT_OK, ANS_SET_WAVELENGTH_OK,
};

/// Absorbance values travel as `i16` scaled by this factor
pub const ABSORBANCE_SCALE: f64 = 10000.0;

const MODEL_PREFIX: &str = "Secomam";

/// Known instrument model codes
const MODELS: [([u8; 2], &str); 4] = [
    ([b'T', 0x00], "S250 I+/E+"),
    ([b'T', 0x01], "S250 T+"),
    ([b'P', 0x02], "Prim Advanced"),
    ([b'P', 0x01], "Prim Light"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum DecodeError {
    #[error("Expected {expected} response bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Unknown model code {0:02X?}")]
    UnknownModel([u8; 2]),

    #[error("Spectrum sample without an active spectrum")]
    NoActiveSpectrum,

    #[error("Command has no response")]
    NoResponseExpected,

    #[error("Spectrum sample {index} from {start} nm is beyond the wavelength range")]
    WavelengthOverflow { start: u16, index: u16 },
}

/// Answer to [`CommandKind::Init`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitStatus {
    Ready,
    NotReady,
    Unexpected(u8),
}

impl InitStatus {
    pub fn is_ready(self) -> bool {
        self == InitStatus::Ready
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub code: [u8; 2],
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumPoint {
    /// nm
    pub wavelength: u16,
    pub absorbance: f64,
}

/// One decoded spectrum point with its position in the scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSample {
    pub point: SpectrumPoint,
    /// Points received so far, including this one
    pub received: u16,
    pub total: u16,
}

impl SpectrumSample {
    pub fn is_last(&self) -> bool {
        self.received == self.total
    }
}

/// Position within a spectrum transfer.
///
/// The sample response carries no index, so decoding a sample needs the
/// cursor created by the header. Invariant: `next_index <= total_samples`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpectrumCursor {
    pub start_wavelength: u16,
    pub total_samples: u16,
    pub next_index: u16,
}

impl SpectrumCursor {
    pub fn new(start_wavelength: u16, total_samples: u16) -> Self {
        Self {
            start_wavelength,
            total_samples,
            next_index: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.next_index >= self.total_samples
    }

    /// Wavelength of the next sample to arrive
    pub fn next_wavelength(&self) -> Result<u16, DecodeError> {
        self.start_wavelength
            .checked_add(self.next_index)
            .ok_or(DecodeError::WavelengthOverflow {
                start: self.start_wavelength,
                index: self.next_index,
            })
    }
}

/// Typed result of one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Init(InitStatus),
    Firmware(u8),
    Autotest { passed: bool, code: u8 },
    WavelengthSet(bool),
    ZeroAcknowledged(bool),
    AbsorbanceAcknowledged(bool),
    AbsorbanceData { status: u8, absorbance: f64 },
    Baseline(bool),
    SpectrumHeader { start_wavelength: u16, sample_count: u16 },
    SpectrumSample(SpectrumSample),
    Model(ModelInfo),
    /// Bytes arrived but could not be interpreted; the link is still usable
    Undecodable(DecodeError),
}

impl Response {
    /// Whether the instrument reported success for this command
    pub fn is_ok(&self) -> bool {
        match self {
            Response::Init(status) => status.is_ready(),
            Response::Autotest { passed, .. } => *passed,
            Response::WavelengthSet(ok)
            | Response::ZeroAcknowledged(ok)
            | Response::AbsorbanceAcknowledged(ok)
            | Response::Baseline(ok) => *ok,
            Response::Undecodable(_) => false,
            _ => true,
        }
    }
}

/// Scale a raw wire value to absorbance units
pub fn decode_absorbance(raw: i16) -> f64 {
    raw as f64 / ABSORBANCE_SCALE
}

/// Human-readable model name for a 2-byte model code
pub fn model_name(code: [u8; 2]) -> Option<String> {
    MODELS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| format!("{} {}", MODEL_PREFIX, name))
}

/// Decode `raw` as the answer to `kind`.
///
/// A spectrum header installs a fresh cursor; each sample advances it and the
/// cursor is cleared once the last sample is consumed. Sentinel mismatches are
/// reported inside the `Response`, not as errors.
pub fn decode(
    kind: CommandKind,
    raw: &[u8],
    cursor: &mut Option<SpectrumCursor>,
) -> Result<Response, DecodeError> {
    let expected = kind.response_len();
    if expected == 0 {
        return Err(DecodeError::NoResponseExpected);
    }
    if raw.len() != expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            actual: raw.len(),
        });
    }

    let response = match kind {
        CommandKind::Init => Response::Init(match raw[0] {
            ANS_INIT_OK => InitStatus::Ready,
            ANS_INIT_NOK => InitStatus::NotReady,
            other => InitStatus::Unexpected(other),
        }),
        CommandKind::Firmware => Response::Firmware(raw[1]),
        CommandKind::Autotest => Response::Autotest {
            passed: raw[0] == ANS_AUTOTEST_OK,
            code: raw[0],
        },
        CommandKind::SetWavelength => Response::WavelengthSet(raw[0] == ANS_SET_WAVELENGTH_OK),
        CommandKind::GetZeroAbs => Response::ZeroAcknowledged(raw[0] == ANS_GET_ZERO_ABS_OK),
        CommandKind::GetAbs => Response::AbsorbanceAcknowledged(raw[0] == ANS_GET_ABS_OK),
        CommandKind::GetAbsData => Response::AbsorbanceData {
            status: raw[0],
            absorbance: decode_absorbance(i16::from_be_bytes([raw[1], raw[2]])),
        },
        CommandKind::Baseline => Response::Baseline(raw[0] == ANS_BASELINE_OK),
        CommandKind::SpectrumHeader => {
            // bytes 0-1 and 6 carry nothing we use
            let start_wavelength = u16::from_be_bytes([raw[2], raw[3]]);
            let sample_count = u16::from_be_bytes([raw[4], raw[5]]);
            *cursor = Some(SpectrumCursor::new(start_wavelength, sample_count));
            Response::SpectrumHeader {
                start_wavelength,
                sample_count,
            }
        }
        CommandKind::SpectrumSample => {
            let active = cursor
                .as_mut()
                .filter(|c| !c.is_complete())
                .ok_or(DecodeError::NoActiveSpectrum)?;
            let wavelength = match active.next_wavelength() {
                Ok(wavelength) => wavelength,
                Err(e) => {
                    // the transfer can't be followed any further
                    *cursor = None;
                    return Err(e);
                }
            };
            active.next_index += 1;
            let sample = SpectrumSample {
                point: SpectrumPoint {
                    wavelength,
                    absorbance: decode_absorbance(i16::from_be_bytes([raw[0], raw[1]])),
                },
                received: active.next_index,
                total: active.total_samples,
            };
            if active.is_complete() {
                *cursor = None;
            }
            Response::SpectrumSample(sample)
        }
        CommandKind::Model => {
            let code = [raw[0], raw[1]];
            let name = model_name(code).ok_or(DecodeError::UnknownModel(code))?;
            Response::Model(ModelInfo { code, name })
        }
        CommandKind::Stop => return Err(DecodeError::NoResponseExpected),
    };

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_fresh(kind: CommandKind, raw: &[u8]) -> Result<Response, DecodeError> {
        decode(kind, raw, &mut None)
    }

    #[test]
    fn test_init_acks() {
        assert_eq!(
            decode_fresh(CommandKind::Init, &[0x4F]),
            Ok(Response::Init(InitStatus::Ready))
        );
        assert_eq!(
            decode_fresh(CommandKind::Init, &[0x4E]),
            Ok(Response::Init(InitStatus::NotReady))
        );
        assert_eq!(
            decode_fresh(CommandKind::Init, &[0x00]),
            Ok(Response::Init(InitStatus::Unexpected(0x00)))
        );
    }

    #[test]
    fn test_single_byte_acks_reject_every_other_byte() {
        let acks = [
            (CommandKind::Init, ANS_INIT_OK),
            (CommandKind::Autotest, ANS_AUTOTEST_OK),
            (CommandKind::SetWavelength, ANS_SET_WAVELENGTH_OK),
            (CommandKind::GetZeroAbs, ANS_GET_ZERO_ABS_OK),
            (CommandKind::GetAbs, ANS_GET_ABS_OK),
            (CommandKind::Baseline, ANS_BASELINE_OK),
        ];
        for (kind, ack) in acks {
            let ok = decode_fresh(kind, &[ack]).expect("ack should decode");
            assert!(ok.is_ok(), "{} ack not accepted", kind.name());
            for byte in (0..=u8::MAX).filter(|b| *b != ack) {
                let response =
                    decode_fresh(kind, &[byte]).expect("altered ack should still decode");
                assert!(!response.is_ok(), "{} accepted 0x{:02X}", kind.name(), byte);
            }
        }
    }

    #[test]
    fn test_autotest_keeps_error_code() {
        assert_eq!(
            decode_fresh(CommandKind::Autotest, &[0x07]),
            Ok(Response::Autotest { passed: false, code: 7 })
        );
    }

    #[test]
    fn test_firmware_uses_second_byte() {
        assert_eq!(
            decode_fresh(CommandKind::Firmware, &[0xAA, 0x17]),
            Ok(Response::Firmware(0x17))
        );
    }

    #[test]
    fn test_absorbance_fixed_point() {
        for raw in i16::MIN..=i16::MAX {
            assert_eq!(decode_absorbance(raw), raw as f64 / 10000.0);
        }
        assert_eq!(decode_absorbance(-10000), -1.0);
        let bytes = (-50i16).to_be_bytes();
        assert_eq!(
            decode_fresh(CommandKind::GetAbsData, &[0x01, bytes[0], bytes[1]]),
            Ok(Response::AbsorbanceData { status: 1, absorbance: -0.005 })
        );
    }

    #[test]
    fn test_model_table() {
        let response = decode_fresh(CommandKind::Model, b"P\x02").expect("known model");
        assert_eq!(
            response,
            Response::Model(ModelInfo {
                code: *b"P\x02",
                name: "Secomam Prim Advanced".to_string()
            })
        );
        assert_eq!(model_name(*b"T\x00").as_deref(), Some("Secomam S250 I+/E+"));
        assert_eq!(model_name(*b"T\x01").as_deref(), Some("Secomam S250 T+"));
        assert_eq!(model_name(*b"P\x01").as_deref(), Some("Secomam Prim Light"));
    }

    #[test]
    fn test_unknown_model_is_an_error() {
        assert_eq!(
            decode_fresh(CommandKind::Model, b"X\x09"),
            Err(DecodeError::UnknownModel(*b"X\x09"))
        );
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        assert_eq!(
            decode_fresh(CommandKind::SpectrumHeader, &[0; 6]),
            Err(DecodeError::LengthMismatch { expected: 7, actual: 6 })
        );
        assert_eq!(decode_fresh(CommandKind::Stop, &[]), Err(DecodeError::NoResponseExpected));
    }

    #[test]
    fn test_header_ignores_padding_bytes() {
        let mut cursor = None;
        let response = decode(
            CommandKind::SpectrumHeader,
            &[0xFF, 0xEE, 0x01, 0x90, 0x00, 0x03, 0xDD],
            &mut cursor,
        );
        assert_eq!(
            response,
            Ok(Response::SpectrumHeader { start_wavelength: 400, sample_count: 3 })
        );
        assert_eq!(cursor, Some(SpectrumCursor::new(400, 3)));
    }

    #[test]
    fn test_spectrum_cursor_walk() {
        let n = 25u16;
        let mut cursor = Some(SpectrumCursor::new(330, n));
        for i in 0..n {
            let before = cursor.map(|c| c.next_index);
            assert_eq!(before, Some(i));
            let response = decode(CommandKind::SpectrumSample, &[0x00, 0x64], &mut cursor).unwrap();
            let Response::SpectrumSample(sample) = response else {
                panic!("wrong variant");
            };
            assert_eq!(sample.point.wavelength, 330 + i);
            assert_eq!(sample.received, i + 1);
            assert_eq!(sample.total, n);
            assert_eq!(sample.is_last(), i + 1 == n);
        }
        assert_eq!(cursor, None, "cursor should be cleared after the last sample");
        assert_eq!(
            decode(CommandKind::SpectrumSample, &[0, 0], &mut cursor),
            Err(DecodeError::NoActiveSpectrum)
        );
    }

    #[test]
    fn test_new_header_restarts_cursor() {
        let mut cursor = Some(SpectrumCursor {
            start_wavelength: 500,
            total_samples: 10,
            next_index: 4,
        });
        let header = [0, 0, 0x01, 0x4A, 0x00, 0x02, 0];
        decode(CommandKind::SpectrumHeader, &header, &mut cursor).unwrap();
        assert_eq!(cursor, Some(SpectrumCursor::new(330, 2)));
    }

    #[test]
    fn test_empty_spectrum_has_no_samples() {
        let mut cursor = None;
        let header = [0, 0, 0x01, 0x90, 0x00, 0x00, 0];
        decode(CommandKind::SpectrumHeader, &header, &mut cursor).unwrap();
        assert_eq!(
            decode(CommandKind::SpectrumSample, &[0, 0], &mut cursor),
            Err(DecodeError::NoActiveSpectrum)
        );
    }

    #[test]
    fn test_wavelength_past_u16_is_rejected() {
        let mut cursor = None;
        // starts at 65534 nm with 3 samples: the third would be 65536
        let header = [0, 0, 0xFF, 0xFE, 0x00, 0x03, 0];
        decode(CommandKind::SpectrumHeader, &header, &mut cursor).unwrap();
        for expected in [65534u16, 65535] {
            match decode(CommandKind::SpectrumSample, &[0, 0], &mut cursor) {
                Ok(Response::SpectrumSample(sample)) => {
                    assert_eq!(sample.point.wavelength, expected)
                }
                other => panic!("expected a sample, got {:?}", other),
            }
        }
        assert_eq!(
            decode(CommandKind::SpectrumSample, &[0, 0], &mut cursor),
            Err(DecodeError::WavelengthOverflow { start: 65534, index: 2 })
        );
        assert_eq!(cursor, None);
    }
}
