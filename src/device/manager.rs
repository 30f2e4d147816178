use crate::config::SessionConfig;
use crate::dispatch::PollDriver;
use crate::serial::response::InitStatus;
use crate::serial::{Command, Response, SerialInterface, Transport};

use super::{
    AbsorbanceReading, AutotestReport, DeviceError, DeviceInfo, Result, Spectrum, SpectrumSample,
    SpectrumSession, WavelengthLimits,
};

/// One spectrometer session.
///
/// Holds the state that belongs to a connected instrument (zero reference,
/// selected wavelength, baseline range) and sequences the multi-command
/// workflows on top of the poll driver. Everything is reset when the link
/// drops, since the instrument needs a fresh `Init` afterwards.
pub struct Spectrometer<T: Transport> {
    driver: PollDriver<T>,
    config: SessionConfig,
    limits: WavelengthLimits,
    info: Option<DeviceInfo>,
    wavelength: Option<u16>,
    zero_absorbance: Option<f64>,
    baseline: Option<(u16, u16)>,
}

impl Spectrometer<SerialInterface> {
    /// Open the serial port named by `port_name`, or by the config
    pub fn open(port_name: Option<&str>, config: SessionConfig) -> Result<Self> {
        let port_name = port_name
            .map(str::to_string)
            .or_else(|| config.port_name.clone())
            .ok_or_else(|| {
                DeviceError::InvalidConfiguration("no serial port selected".to_string())
            })?;

        let mut interface = SerialInterface::new();
        interface.connect(&port_name, &config.serial)?;
        Ok(Self::new(interface, config))
    }
}

impl<T: Transport> Spectrometer<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            driver: PollDriver::from_config(transport, &config),
            config,
            limits: WavelengthLimits::default(),
            info: None,
            wavelength: None,
            zero_absorbance: None,
            baseline: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_connected()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn limits(&self) -> &WavelengthLimits {
        &self.limits
    }

    pub fn info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    /// Wavelength selected for single-point absorbance, in nm
    pub fn wavelength(&self) -> Option<u16> {
        self.wavelength
    }

    pub fn zero_absorbance(&self) -> Option<f64> {
        self.zero_absorbance
    }

    pub fn baseline_range(&self) -> Option<(u16, u16)> {
        self.baseline
    }

    async fn execute(&mut self, command: Command) -> Result<Response> {
        if !self.driver.is_connected() {
            return Err(DeviceError::NotConnected);
        }
        match self.driver.execute(command).await {
            Ok(Response::Undecodable(e)) => Err(DeviceError::Decode(e)),
            Ok(response) => Ok(response),
            Err(e) => {
                if !self.driver.is_connected() {
                    log::warn!("Spectrometer link lost: {}", e);
                    self.reset_state();
                }
                Err(e.into())
            }
        }
    }

    fn reset_state(&mut self) {
        self.info = None;
        self.wavelength = None;
        self.zero_absorbance = None;
        self.baseline = None;
    }

    fn unexpected(command: Command, response: &Response) -> DeviceError {
        DeviceError::UnexpectedResponse {
            command: command.kind().name(),
            detail: format!("{:?}", response),
        }
    }

    /// Init handshake; the instrument must report ready
    pub async fn initialize(&mut self) -> Result<()> {
        match self.execute(Command::Init).await? {
            Response::Init(InitStatus::Ready) => {
                log::info!("Spectrometer initialized");
                Ok(())
            }
            Response::Init(InitStatus::NotReady) => {
                Err(DeviceError::Rejected("init: instrument not ready".to_string()))
            }
            Response::Init(InitStatus::Unexpected(byte)) => Err(DeviceError::Rejected(format!(
                "init: unexpected answer 0x{:02X}",
                byte
            ))),
            other => Err(Self::unexpected(Command::Init, &other)),
        }
    }

    pub fn stop(&mut self) -> Result<()> {
        self.driver.fire(Command::Stop)?;
        log::info!("Spectrometer stopped");
        Ok(())
    }

    /// Stop the instrument and release the link
    pub fn shutdown(&mut self) {
        if self.is_connected() {
            if let Err(e) = self.stop() {
                log::warn!("Stop before disconnect failed: {}", e);
            }
        }
        self.driver.dispatcher_mut().transport_mut().disconnect();
        self.reset_state();
    }

    /// Model name then firmware version
    pub async fn device_info(&mut self) -> Result<DeviceInfo> {
        let model = match self.execute(Command::Model).await? {
            Response::Model(model) => model,
            other => return Err(Self::unexpected(Command::Model, &other)),
        };
        let firmware_version = match self.execute(Command::Firmware).await? {
            Response::Firmware(version) => version,
            other => return Err(Self::unexpected(Command::Firmware, &other)),
        };

        let info = DeviceInfo {
            model,
            firmware_version,
        };
        log::info!(
            "Spectrometer: {} (firmware {})",
            info.model.name,
            info.firmware_version
        );
        self.info = Some(info.clone());
        Ok(info)
    }

    pub async fn autotest(&mut self) -> Result<AutotestReport> {
        match self.execute(Command::Autotest).await? {
            Response::Autotest { passed, code } => {
                if !passed {
                    log::warn!("Autotest failed with code {}", code);
                }
                Ok(AutotestReport { passed, code })
            }
            other => Err(Self::unexpected(Command::Autotest, &other)),
        }
    }

    /// Select the absorbance wavelength; any previous zero becomes invalid
    pub async fn set_wavelength(&mut self, wavelength: u16) -> Result<()> {
        if !self.limits.contains(wavelength) {
            return Err(DeviceError::InvalidConfiguration(format!(
                "wavelength {} nm outside {}-{} nm",
                wavelength, self.limits.start, self.limits.end
            )));
        }

        let command = Command::SetWavelength {
            wavelength,
            gain: self.config.default_gain,
        };
        match self.execute(command).await? {
            Response::WavelengthSet(true) => {
                self.wavelength = Some(wavelength);
                self.zero_absorbance = None;
                log::info!("Wavelength set to {} nm", wavelength);
                Ok(())
            }
            Response::WavelengthSet(false) => {
                Err(DeviceError::Rejected(format!("wavelength {} nm", wavelength)))
            }
            other => Err(Self::unexpected(command, &other)),
        }
    }

    /// Measure the reference (blank) at the selected wavelength
    pub async fn measure_zero(&mut self) -> Result<f64> {
        let wavelength = self.require_wavelength()?;
        let reading = self.measure(Command::GetZeroAbs, wavelength).await?;
        self.zero_absorbance = Some(reading.absorbance);
        log::info!("Zero at {} nm: {}", wavelength, reading.absorbance);
        Ok(reading.absorbance)
    }

    /// Measure the sample; needs a zero taken at the same wavelength
    pub async fn measure_absorbance(&mut self) -> Result<AbsorbanceReading> {
        let wavelength = self.require_wavelength()?;
        if self.zero_absorbance.is_none() {
            return Err(DeviceError::InvalidConfiguration(
                "measure the zero before the sample".to_string(),
            ));
        }
        self.measure(Command::GetAbs, wavelength).await
    }

    fn require_wavelength(&self) -> Result<u16> {
        self.wavelength.ok_or_else(|| {
            DeviceError::InvalidConfiguration("no absorbance wavelength selected".to_string())
        })
    }

    // trigger command, then fetch the value with GetAbsData
    async fn measure(&mut self, trigger: Command, wavelength: u16) -> Result<AbsorbanceReading> {
        match self.execute(trigger).await? {
            Response::ZeroAcknowledged(true) | Response::AbsorbanceAcknowledged(true) => {}
            Response::ZeroAcknowledged(false) | Response::AbsorbanceAcknowledged(false) => {
                return Err(DeviceError::Rejected(trigger.kind().name().to_string()))
            }
            other => return Err(Self::unexpected(trigger, &other)),
        }

        match self.execute(Command::GetAbsData).await? {
            Response::AbsorbanceData { status, absorbance } => Ok(AbsorbanceReading {
                wavelength,
                absorbance,
                status,
            }),
            other => Err(Self::unexpected(Command::GetAbsData, &other)),
        }
    }

    /// Record the baseline for spectra between `start` and `end` nm
    pub async fn baseline(&mut self, start: u16, end: u16, speed: u8) -> Result<()> {
        if start >= end || !self.limits.contains(start) || !self.limits.contains(end) {
            return Err(DeviceError::InvalidConfiguration(format!(
                "spectrum range {}-{} nm outside {}-{} nm",
                start, end, self.limits.start, self.limits.end
            )));
        }
        if !self.limits.supports_speed(speed) {
            return Err(DeviceError::InvalidConfiguration(format!(
                "scan speed {} not in {:?}",
                speed, self.limits.speeds
            )));
        }

        let command = Command::Baseline { start, end, speed };
        match self.execute(command).await? {
            Response::Baseline(true) => {
                self.baseline = Some((start, end));
                log::info!("Baseline recorded for {}-{} nm", start, end);
                Ok(())
            }
            Response::Baseline(false) => Err(DeviceError::Rejected("baseline".to_string())),
            other => Err(Self::unexpected(command, &other)),
        }
    }

    /// Scan a spectrum over the baseline range.
    ///
    /// Each point is handed to `on_sample` as soon as it is decoded.
    pub async fn acquire_spectrum<F>(&mut self, mut on_sample: F) -> Result<Spectrum>
    where
        F: FnMut(&SpectrumSample),
    {
        if self.baseline.is_none() {
            return Err(DeviceError::InvalidConfiguration(
                "record a baseline before measuring a spectrum".to_string(),
            ));
        }

        let header = self.execute(Command::SpectrumHeader).await?;
        let mut session = SpectrumSession::begin(&header)
            .ok_or_else(|| Self::unexpected(Command::SpectrumHeader, &header))?;
        log::info!(
            "Receiving spectrum: {} points from {} nm",
            session.cursor().total_samples,
            session.cursor().start_wavelength
        );

        while !session.is_done() {
            let sample = match self.execute(Command::SpectrumSample).await? {
                Response::SpectrumSample(sample) => sample,
                other => return Err(Self::unexpected(Command::SpectrumSample, &other)),
            };
            session.next(sample)?;
            on_sample(&sample);
        }

        let spectrum = session.finish();
        log::info!("Spectrum complete ({} points)", spectrum.len());
        Ok(spectrum)
    }
}

