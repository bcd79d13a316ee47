//! band-eq: command-line front end for the equalizer core

use anyhow::{Context, Result, anyhow};
use band_equalizer::audio::{list_output_devices, CpalSink, OutputSink};
use band_equalizer::{Band, Equalizer, EqualizerConfig, FilterBank, PlaybackState, SpectrumAnalyzer};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Monitor refresh interval (about 20 Hz)
const MONITOR_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(author, version, about = "Three-band FIR equalizer", long_about = None)]
struct Cli {
    /// JSON preset; flags below override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Engine sample rate in Hz
    #[arg(long, global = true)]
    sample_rate: Option<u32>,

    /// Samples per processed block
    #[arg(long, global = true)]
    block_size: Option<usize>,

    /// FIR length per band
    #[arg(long, global = true)]
    taps: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the filter bank design
    Bands,

    /// Equalize a file and write the result as WAV
    Render {
        /// Input audio file (WAV, MP3, OGG, FLAC)
        #[arg(short, long)]
        input: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        gains: GainArgs,
    },

    /// Play a file through the equalizer
    Play {
        /// Input audio file (WAV, MP3, OGG, FLAC)
        #[arg(short, long)]
        input: PathBuf,

        /// Output device name (default device if omitted)
        #[arg(short, long)]
        device: Option<String>,

        /// Start position in seconds
        #[arg(long, default_value_t = 0.0)]
        start: f64,

        #[command(flatten)]
        gains: GainArgs,
    },

    /// List output devices
    Devices,

    /// Write the effective configuration as JSON
    SaveConfig {
        /// Output JSON file
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct GainArgs {
    /// Low band gain in dB
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    low: f64,

    /// Mid band gain in dB
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    mid: f64,

    /// High band gain in dB
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    high: f64,
}

impl GainArgs {
    fn apply(&self, engine: &Equalizer) -> Result<()> {
        for (band, db) in [(Band::Low, self.low), (Band::Mid, self.mid), (Band::High, self.high)] {
            engine
                .set_gain_db(band.index(), db)
                .with_context(|| format!("Invalid gain for {} band", band.name()))?;
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Command::Bands => print_bands(config),
        Command::Render { input, output, gains } => render(config, input, output, gains),
        Command::Play { input, device, start, gains } => {
            let sink: Box<dyn OutputSink> = match device {
                Some(name) => Box::new(CpalSink::with_device(name.clone())),
                None => Box::new(CpalSink::new()),
            };
            play(config, sink, input, *start, gains)
        }
        Command::Devices => print_devices(),
        Command::SaveConfig { output } => config
            .save_json_file(output)
            .with_context(|| format!("Failed to write {:?}", output)),
    }
}

fn load_config(cli: &Cli) -> Result<EqualizerConfig> {
    let mut config = match &cli.config {
        Some(path) => EqualizerConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config file: {:?}", path))?,
        None => EqualizerConfig::default(),
    };

    if let Some(rate) = cli.sample_rate {
        config.sample_rate = rate;
    }
    if let Some(block_size) = cli.block_size {
        config.block_size = block_size;
    }
    if let Some(taps) = cli.taps {
        config.num_taps = taps;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_bands(config: EqualizerConfig) -> Result<()> {
    let bank = FilterBank::from_config(&config).context("Failed to build filter bank")?;

    println!(
        "{} taps at {} Hz, group delay {:.1} samples ({:.2} ms), transition ~{:.0} Hz",
        bank.num_taps(),
        bank.sample_rate(),
        bank.group_delay_samples(),
        1000.0 * bank.group_delay_samples() / bank.sample_rate() as f64,
        bank.transition_width_hz()
    );

    let check_freqs = [50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0];
    for band in Band::ALL {
        let [lo, hi] = bank.band_edges(band);
        let response = bank.response_db(band, &check_freqs);
        let summary: Vec<String> = check_freqs
            .iter()
            .zip(response.iter())
            .map(|(f, db)| format!("{:>5.0} Hz {:>7.1} dB", f, db))
            .collect();
        println!("{:<4} {:>7.0}-{:<7.0} Hz | {}", band.name(), lo, hi, summary.join(" | "));
    }

    Ok(())
}

fn render(config: EqualizerConfig, input: &Path, output: &Path, gains: &GainArgs) -> Result<()> {
    let mut engine = Equalizer::new(config)?;
    gains.apply(&engine)?;

    engine
        .load_file(input)
        .with_context(|| format!("Failed to load {:?}", input))?;

    let started = Instant::now();
    engine
        .save_processed(output)
        .with_context(|| format!("Failed to write {:?}", output))?;

    log::info!(
        "Rendered {:.2} s of audio in {:.2} s",
        engine.duration_secs(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn play(
    config: EqualizerConfig,
    sink: Box<dyn OutputSink>,
    input: &Path,
    start: f64,
    gains: &GainArgs,
) -> Result<()> {
    let mut engine = Equalizer::with_sink(config, sink)?;
    gains.apply(&engine)?;

    engine
        .load_file(input)
        .with_context(|| format!("Failed to load {:?}", input))?;
    engine.seek(start);

    let mut monitor = engine
        .take_monitor()
        .ok_or_else(|| anyhow!("Monitor queue unavailable"))?;
    let mut analyzer = SpectrumAnalyzer::for_frames(monitor.frame_size(), engine.config().sample_rate);

    engine.play().context("Failed to start playback")?;

    // Wakes at end of stream, otherwise once per monitor interval
    while engine.wait_for_end(MONITOR_INTERVAL) == PlaybackState::Playing {
        if let Some(frame) = monitor.pop_latest() {
            let peak = frame.iter().fold(0.0f64, |p, &x| p.max(x.abs()));
            let dominant = analyzer.spectrum(&frame).dominant_frequency().unwrap_or(0.0);
            log::info!(
                "{:>7.2} / {:.2} s  peak {:>6.1} dBFS  dominant {:>7.0} Hz",
                engine.position_secs(),
                engine.duration_secs(),
                20.0 * peak.max(1e-10).log10(),
                dominant
            );
        }
    }

    if monitor.dropped() > 0 {
        log::debug!("Monitor dropped {} frames", monitor.dropped());
    }
    if engine.faults() > 0 {
        log::warn!("{} blocks were silenced after non-finite output", engine.faults());
    }

    Ok(())
}

fn print_devices() -> Result<()> {
    let devices = list_output_devices().context("Failed to enumerate output devices")?;
    if devices.is_empty() {
        println!("No output devices found");
    }
    for device in devices {
        println!("{} ({} Hz, {} ch)", device.name, device.sample_rate, device.channels);
    }
    Ok(())
}
