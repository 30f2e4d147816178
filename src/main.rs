//! Command-line front-end for S250/Prim spectrophotometers.
//!
//! ```bash
//! spectro --port /dev/ttyUSB0 info
//! spectro --port /dev/ttyUSB0 absorbance --wavelength 450
//! spectro --port /dev/ttyUSB0 spectrum --from 400 --to 700 --csv data.csv
//! ```
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use spectro_lib::chart::get_bounds_and_ticks;
use spectro_lib::device::SpectrumSample;
use spectro_lib::{SerialInterface, SessionConfig, Spectrometer};

/// Drive a Secomam S250 / Prim spectrophotometer over a serial port
#[derive(Parser, Debug)]
#[command(name = "spectro")]
#[command(version)]
#[command(about = "Secomam S250 / Prim spectrophotometer control", long_about = None)]
struct Args {
    /// Serial port (overrides the config file)
    #[arg(short, long)]
    port: Option<String>,

    /// JSON session config
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Print model name and firmware version
    Info,
    /// Run the instrument self test
    Autotest,
    /// Measure absorbance at one wavelength (prompts for blank and sample)
    Absorbance {
        #[arg(short, long)]
        wavelength: u16,
    },
    /// Record a baseline and scan a spectrum (prompts for blank and sample)
    Spectrum {
        #[arg(long)]
        from: u16,
        #[arg(long)]
        to: u16,
        #[arg(long, default_value_t = 8)]
        speed: u8,
        /// Write points as CSV
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
        /// Write the spectrum as JSON
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,
    },
    /// Stop the instrument
    Stop,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn wait_for_enter(message: &str) -> Result<()> {
    print!("{} and press Enter...", message);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}

fn print_progress(sample: &SpectrumSample) -> io::Result<()> {
    let mut out = io::stdout().lock();
    write!(
        out,
        "\r{:>4}/{:<4} {} nm  A={:+.4}",
        sample.received, sample.total, sample.point.wavelength, sample.point.absorbance
    )?;
    if sample.is_last() {
        writeln!(out)?;
    }
    out.flush()
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => SessionConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };

    let mut spectro = Spectrometer::<SerialInterface>::open(args.port.as_deref(), config)
        .context("Failed to open serial port")?;

    if let Action::Stop = args.command {
        spectro.shutdown();
        return Ok(());
    }

    spectro
        .initialize()
        .await
        .context("Failed to start the spectrometer")?;

    match args.command {
        Action::Info => {
            let info = spectro.device_info().await?;
            println!("Spectrometer: {}", info.model.name);
            println!("Firmware version: {}", info.firmware_version);
        }
        Action::Autotest => {
            let report = spectro.autotest().await?;
            if !report.passed {
                bail!("Autotest failed: machine configuration error (code {})", report.code);
            }
            println!("Autotest OK");
        }
        Action::Absorbance { wavelength } => {
            spectro.set_wavelength(wavelength).await?;
            wait_for_enter("Insert the blank")?;
            let zero = spectro.measure_zero().await?;
            println!("Zero at {} nm: {:.4}", wavelength, zero);
            wait_for_enter("Insert the sample")?;
            let reading = spectro.measure_absorbance().await?;
            println!("Absorbance at {} nm: {:.4}", reading.wavelength, reading.absorbance);
        }
        Action::Spectrum {
            from,
            to,
            speed,
            csv,
            json,
        } => {
            wait_for_enter("Insert the blank")?;
            spectro.baseline(from, to, speed).await?;
            println!("Baseline recorded for {}-{} nm", from, to);
            wait_for_enter("Insert the sample")?;
            let mut progress_error = None;
            let spectrum = spectro
                .acquire_spectrum(|sample| {
                    if let Err(e) = print_progress(sample) {
                        progress_error.get_or_insert(e);
                    }
                })
                .await?;
            if let Some(e) = progress_error {
                return Err(e).context("Failed to write scan progress");
            }

            if let Some((lo, hi)) = spectrum.absorbance_range() {
                let y = get_bounds_and_ticks(lo, hi, 10);
                println!(
                    "Absorbance {:.4} to {:.4} (axis {} to {}, tick {})",
                    lo, hi, y.min, y.max, y.major_tick
                );
            }
            if let Some(path) = csv {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                spectrum.write_csv(BufWriter::new(file))?;
                println!("Spectrum saved to {}", path.display());
            }
            if let Some(path) = json {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                spectrum.write_json(BufWriter::new(file))?;
                println!("Spectrum saved to {}", path.display());
            }
        }
        Action::Stop => {}
    }

    spectro.shutdown();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(args).await
}
