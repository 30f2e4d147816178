//! Outgoing half of the S250/Prim binary protocol.
//!
//! Every request is a fixed frame, usually `ESC` followed by an opcode and an
//! optional big-endian payload. The instrument answers with a fixed number of
//! bytes per command, carried by [`CommandKind::response_len`].
use serde::{Deserialize, Serialize};

pub const CMD_PREFIX: u8 = 0x1B;

pub const CMD_INIT: u8 = 0x5A;
pub const CMD_FIRMWARE: u8 = 0x22;
pub const CMD_AUTOTEST: u8 = 0x33;
pub const CMD_SET_WAVELENGTH: u8 = 0x31;
pub const CMD_GET_ZERO_ABS: u8 = 0x30;
pub const CMD_GET_ABS: u8 = 0x32;
pub const CMD_GET_ABS_DATA: u8 = 0x45;
pub const CMD_BASELINE: u8 = 0x34;
pub const CMD_GET_SPECTRUM: u8 = 0x35;
pub const CMD_GET_TYPE: u8 = 0x51;
pub const CMD_STOP: u8 = 0xE7;

pub const ANS_INIT_OK: u8 = 0x4F;
pub const ANS_INIT_NOK: u8 = 0x4E;
pub const ANS_AUTOTEST_OK: u8 = 0x00;
pub const ANS_SET_WAVELENGTH_OK: u8 = 0x1B;
pub const ANS_GET_ZERO_ABS_OK: u8 = 0x54;
pub const ANS_GET_ABS_OK: u8 = 0x54;
pub const ANS_BASELINE_OK: u8 = 0x1B;

/// Baseline resolution byte; the instrument only supports this value
pub const BASELINE_RESOLUTION: u8 = 3;

/// Identity of a command, independent of its arguments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Init,
    Stop,
    Firmware,
    Autotest,
    SetWavelength,
    GetZeroAbs,
    GetAbs,
    GetAbsData,
    Baseline,
    SpectrumHeader,
    SpectrumSample,
    Model,
}

impl CommandKind {
    pub const ALL: [CommandKind; 12] = [
        CommandKind::Init,
        CommandKind::Stop,
        CommandKind::Firmware,
        CommandKind::Autotest,
        CommandKind::SetWavelength,
        CommandKind::GetZeroAbs,
        CommandKind::GetAbs,
        CommandKind::GetAbsData,
        CommandKind::Baseline,
        CommandKind::SpectrumHeader,
        CommandKind::SpectrumSample,
        CommandKind::Model,
    ];

    /// Number of bytes the instrument sends back
    pub const fn response_len(self) -> usize {
        match self {
            CommandKind::Stop => 0,
            CommandKind::Init
            | CommandKind::Autotest
            | CommandKind::SetWavelength
            | CommandKind::GetZeroAbs
            | CommandKind::GetAbs
            | CommandKind::Baseline => 1,
            CommandKind::Firmware | CommandKind::Model | CommandKind::SpectrumSample => 2,
            CommandKind::GetAbsData => 3,
            CommandKind::SpectrumHeader => 7,
        }
    }

    /// Opcode byte; `None` for the spectrum sample read, which sends nothing
    pub const fn opcode(self) -> Option<u8> {
        match self {
            CommandKind::Init => Some(CMD_INIT),
            CommandKind::Stop => Some(CMD_STOP),
            CommandKind::Firmware => Some(CMD_FIRMWARE),
            CommandKind::Autotest => Some(CMD_AUTOTEST),
            CommandKind::SetWavelength => Some(CMD_SET_WAVELENGTH),
            CommandKind::GetZeroAbs => Some(CMD_GET_ZERO_ABS),
            CommandKind::GetAbs => Some(CMD_GET_ABS),
            CommandKind::GetAbsData => Some(CMD_GET_ABS_DATA),
            CommandKind::Baseline => Some(CMD_BASELINE),
            CommandKind::SpectrumHeader => Some(CMD_GET_SPECTRUM),
            CommandKind::SpectrumSample => None,
            CommandKind::Model => Some(CMD_GET_TYPE),
        }
    }

    /// Whether the frame starts with the `ESC` prefix
    pub const fn is_prefixed(self) -> bool {
        !matches!(self, CommandKind::GetAbsData | CommandKind::SpectrumSample)
    }

    pub const fn name(self) -> &'static str {
        match self {
            CommandKind::Init => "init",
            CommandKind::Stop => "stop",
            CommandKind::Firmware => "firmware",
            CommandKind::Autotest => "autotest",
            CommandKind::SetWavelength => "set-wavelength",
            CommandKind::GetZeroAbs => "get-zero",
            CommandKind::GetAbs => "get-absorbance",
            CommandKind::GetAbsData => "get-absorbance-data",
            CommandKind::Baseline => "baseline",
            CommandKind::SpectrumHeader => "spectrum-header",
            CommandKind::SpectrumSample => "spectrum-sample",
            CommandKind::Model => "model",
        }
    }
}

/// A request with its arguments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Command {
    Init,
    Stop,
    Firmware,
    Autotest,
    /// Move the monochromator to `wavelength` nm with the given detector gain
    SetWavelength { wavelength: u16, gain: u8 },
    GetZeroAbs,
    GetAbs,
    GetAbsData,
    /// Record a baseline between `start` and `end` nm at scan speed 1-8
    Baseline { start: u16, end: u16, speed: u8 },
    SpectrumHeader,
    /// Follow-up read of the next spectrum point; nothing goes on the wire
    SpectrumSample,
    Model,
}

impl Command {
    pub const fn kind(&self) -> CommandKind {
        match self {
            Command::Init => CommandKind::Init,
            Command::Stop => CommandKind::Stop,
            Command::Firmware => CommandKind::Firmware,
            Command::Autotest => CommandKind::Autotest,
            Command::SetWavelength { .. } => CommandKind::SetWavelength,
            Command::GetZeroAbs => CommandKind::GetZeroAbs,
            Command::GetAbs => CommandKind::GetAbs,
            Command::GetAbsData => CommandKind::GetAbsData,
            Command::Baseline { .. } => CommandKind::Baseline,
            Command::SpectrumHeader => CommandKind::SpectrumHeader,
            Command::SpectrumSample => CommandKind::SpectrumSample,
            Command::Model => CommandKind::Model,
        }
    }

    pub const fn response_len(&self) -> usize {
        self.kind().response_len()
    }

    /// Wire frame for this command
    pub fn encode(&self) -> Vec<u8> {
        let kind = self.kind();
        let Some(opcode) = kind.opcode() else {
            return Vec::new();
        };

        let mut frame = Vec::with_capacity(10);
        if kind.is_prefixed() {
            frame.push(CMD_PREFIX);
        }
        frame.push(opcode);

        match *self {
            Command::SetWavelength { wavelength, gain } => {
                frame.extend_from_slice(&wavelength.to_be_bytes());
                frame.extend_from_slice(&[0, 0]);
                frame.push(gain);
            }
            Command::Baseline { start, end, speed } => {
                frame.extend_from_slice(&start.to_be_bytes());
                frame.extend_from_slice(&end.to_be_bytes());
                frame.push(BASELINE_RESOLUTION);
                frame.push(speed);
                frame.extend_from_slice(&[0, 0]);
            }
            _ => {}
        }

        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_frames() {
        assert_eq!(Command::Init.encode(), vec![0x1B, 0x5A]);
        assert_eq!(Command::Stop.encode(), vec![0x1B, 0xE7]);
        assert_eq!(Command::Firmware.encode(), vec![0x1B, 0x22]);
        assert_eq!(Command::Autotest.encode(), vec![0x1B, 0x33]);
        assert_eq!(Command::GetZeroAbs.encode(), vec![0x1B, 0x30]);
        assert_eq!(Command::GetAbs.encode(), vec![0x1B, 0x32]);
        assert_eq!(Command::SpectrumHeader.encode(), vec![0x1B, 0x35]);
        assert_eq!(Command::Model.encode(), vec![0x1B, 0x51]);
    }

    #[test]
    fn test_abs_data_has_no_prefix() {
        assert_eq!(Command::GetAbsData.encode(), vec![0x45]);
    }

    #[test]
    fn test_spectrum_sample_sends_nothing() {
        assert!(Command::SpectrumSample.encode().is_empty());
        assert_eq!(Command::SpectrumSample.response_len(), 2);
    }

    #[test]
    fn test_set_wavelength_layout() {
        let frame = Command::SetWavelength { wavelength: 450, gain: 200 }.encode();
        assert_eq!(frame, vec![0x1B, 0x31, 0x01, 0xC2, 0x00, 0x00, 0xC8]);
    }

    #[test]
    fn test_baseline_layout() {
        let frame = Command::Baseline { start: 330, end: 900, speed: 8 }.encode();
        assert_eq!(
            frame,
            vec![0x1B, 0x34, 0x01, 0x4A, 0x03, 0x84, BASELINE_RESOLUTION, 0x08, 0x00, 0x00]
        );
    }

    #[test]
    fn test_response_lengths() {
        let expected = [
            (CommandKind::Init, 1),
            (CommandKind::Stop, 0),
            (CommandKind::Firmware, 2),
            (CommandKind::Autotest, 1),
            (CommandKind::SetWavelength, 1),
            (CommandKind::GetZeroAbs, 1),
            (CommandKind::GetAbs, 1),
            (CommandKind::GetAbsData, 3),
            (CommandKind::Baseline, 1),
            (CommandKind::SpectrumHeader, 7),
            (CommandKind::SpectrumSample, 2),
            (CommandKind::Model, 2),
        ];
        for (kind, len) in expected {
            assert_eq!(kind.response_len(), len, "wrong response length for {}", kind.name());
        }
    }

    #[test]
    fn test_kind_matches_encoded_opcode() {
        for kind in CommandKind::ALL {
            let command = match kind {
                CommandKind::SetWavelength => Command::SetWavelength { wavelength: 500, gain: 255 },
                CommandKind::Baseline => Command::Baseline { start: 400, end: 500, speed: 1 },
                CommandKind::Init => Command::Init,
                CommandKind::Stop => Command::Stop,
                CommandKind::Firmware => Command::Firmware,
                CommandKind::Autotest => Command::Autotest,
                CommandKind::GetZeroAbs => Command::GetZeroAbs,
                CommandKind::GetAbs => Command::GetAbs,
                CommandKind::GetAbsData => Command::GetAbsData,
                CommandKind::SpectrumHeader => Command::SpectrumHeader,
                CommandKind::SpectrumSample => Command::SpectrumSample,
                CommandKind::Model => Command::Model,
            };
            assert_eq!(command.kind(), kind);
            let frame = command.encode();
            match kind.opcode() {
                Some(op) if kind.is_prefixed() => assert_eq!(&frame[..2], &[CMD_PREFIX, op]),
                Some(op) => assert_eq!(frame[0], op),
                None => assert!(frame.is_empty()),
            }
        }
    }
}
