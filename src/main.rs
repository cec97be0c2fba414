use ambiscope::audio::{AmbientTone, Signal, SoundEngine, WavSignal};
use ambiscope::conf::{Settings, config_path};
use ambiscope::raster;
use ambiscope::visual::{Point, VisualizationMode, bars, waveform};
use ambiscope::visualizer::{Frame, FrameClock, Visualizer};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use jiff::Zoned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "ambiscope")]
#[command(about = "Ambient tone synthesizer with a spectrum bar and waveform visualizer")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render frames offline without touching the audio device
    Render {
        /// Visualization mode to start in
        #[arg(long, value_enum)]
        mode: Option<VisualizationMode>,

        /// Use the expanded 200x80 canvas
        #[arg(long)]
        expanded: bool,

        /// Number of frames to render
        #[arg(long, default_value = "60")]
        frames: u64,

        /// Toggle the visualization mode every N frames
        #[arg(long)]
        toggle_every: Option<u64>,

        /// Visualize a WAV file instead of the ambient tone
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output directory (defaults to a timestamped directory under the data dir)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "png")]
        format: OutputFormat,
    },

    /// Play the ambient tone and visualize it in real time
    Live {
        /// Visualization mode to start in
        #[arg(long, value_enum)]
        mode: Option<VisualizationMode>,

        /// Use the expanded 200x80 canvas
        #[arg(long)]
        expanded: bool,

        /// How long to play in seconds
        #[arg(long, default_value = "10")]
        seconds: u64,

        /// Toggle the visualization mode every N seconds
        #[arg(long)]
        toggle_every: Option<u64>,

        /// Where to write the final frame as PNG
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List available audio output devices
    Devices,

    /// Show the effective settings
    Config {
        /// Write the effective settings to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Png,
    Json,
}

/// A frame plus its derived geometry, for JSON output
#[derive(Serialize)]
struct FrameSummary {
    #[serde(flatten)]
    frame: Frame,
    #[serde(skip_serializing_if = "Option::is_none")]
    bar_heights: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    points: Option<Vec<Point>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    markers: Option<usize>,
}

impl FrameSummary {
    fn from_frame(frame: Frame) -> Self {
        match frame.mode {
            VisualizationMode::Bars => Self {
                bar_heights: Some(bars::bar_heights(&frame.buffer, &frame.config)),
                points: None,
                markers: None,
                frame,
            },
            VisualizationMode::Waveform => Self {
                bar_heights: None,
                points: Some(waveform::waveform_points(&frame.buffer, &frame.config)),
                markers: Some(waveform::peak_markers(&frame.buffer, &frame.config).len()),
                frame,
            },
        }
    }
}

fn frame_path(dir: &Path, frame: &Frame) -> PathBuf {
    dir.join(format!("frame_{:05}_{}.png", frame.index, frame.mode))
}

fn write_frame(dir: &Path, frame: &Frame) -> Result<PathBuf> {
    let pixmap = raster::render_frame(frame)?;
    let path = frame_path(dir, frame);
    raster::save_png(&pixmap, &path)?;
    Ok(path)
}

fn timestamped_dir(base: PathBuf) -> Result<PathBuf> {
    let timestamp = Zoned::now().strftime("%Y-%m-%d_%H-%M-%S");
    let dir = base.join(timestamp.to_string());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    Ok(dir)
}

fn apply_overrides(settings: &mut Settings, mode: Option<VisualizationMode>, expanded: bool) {
    if let Some(mode) = mode {
        settings.mode = mode;
    }
    if expanded {
        settings.expanded = true;
    }
}

fn render_offline(
    settings: &Settings,
    frames: u64,
    toggle_every: Option<u64>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let signal: Box<dyn Signal> = match input {
        Some(path) => Box::new(WavSignal::open(&path)?),
        None => Box::new(AmbientTone::with_params(
            settings.sample_rate,
            settings.tone_root_hz,
            settings.tone_gain,
        )),
    };

    let mut engine = SoundEngine::new(signal);
    engine.start_offline()?;

    let dir = match (format, output) {
        (OutputFormat::Json, _) => None,
        (OutputFormat::Png, Some(dir)) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            Some(dir)
        }
        (OutputFormat::Png, None) => Some(timestamped_dir(settings.frames_dir()?)?),
    };

    let mut visualizer = Visualizer::new(
        settings.mode,
        settings.canvas(),
        FrameClock::new(settings.fps, false),
    );

    let pb = ProgressBar::new(frames);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .progress_chars("#>-"),
    );

    let mut summaries = Vec::new();
    let mut failure = None;

    let rendered = visualizer.run(&engine, Some(frames), |visualizer, frame| {
        pb.inc(1);
        let index = frame.index;

        if let Some(dir) = &dir {
            if let Err(e) = write_frame(dir, &frame) {
                failure = Some(e);
                return false;
            }
        } else {
            summaries.push(FrameSummary::from_frame(frame));
        }

        if let Some(n) = toggle_every.filter(|&n| n > 0) {
            if (index + 1) % n == 0 {
                visualizer.toggle_mode();
            }
        }
        true
    });
    pb.finish_and_clear();

    if let Some(e) = failure {
        return Err(e);
    }

    if rendered < frames {
        log::info!(
            "'{}' ended after {} of {} frames",
            engine.signal_name(),
            rendered,
            frames
        );
    }

    match dir {
        Some(dir) => println!("Rendered {} frames to {}", rendered, dir.display()),
        None => println!("{}", serde_json::to_string_pretty(&summaries)?),
    }

    Ok(())
}

fn run_live(
    settings: &Settings,
    seconds: u64,
    toggle_every: Option<u64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let sample_rate = SoundEngine::default_output_sample_rate()
        .context("Failed to query the default output device")?;
    let tone = AmbientTone::with_params(sample_rate, settings.tone_root_hz, settings.tone_gain);

    let mut engine = SoundEngine::new(Box::new(tone));
    engine.start_device().context("Failed to start audio output")?;

    let mut visualizer = Visualizer::new(
        settings.mode,
        settings.canvas(),
        FrameClock::new(settings.fps, true),
    );

    let started = Instant::now();
    let deadline = Duration::from_secs(seconds);
    let toggle_interval = toggle_every.filter(|&s| s > 0).map(Duration::from_secs);
    let mut last_toggle = started;
    let mut last_frame = None;

    println!("Playing ambient tone for {}s (Ctrl+C to stop)", seconds);

    let rendered = visualizer.run(&engine, None, |visualizer, frame| {
        let now = Instant::now();
        if let Some(interval) = toggle_interval {
            if now - last_toggle >= interval {
                visualizer.toggle_mode();
                last_toggle = now;
            }
        }
        last_frame = Some(frame);
        now - started < deadline
    });

    engine.stop();

    let elapsed = started.elapsed().as_secs_f32();
    println!(
        "Rendered {} frames in {:.1}s ({:.1} fps)",
        rendered,
        elapsed,
        rendered as f32 / elapsed.max(f32::EPSILON)
    );

    if let Some(frame) = last_frame {
        let path = match output {
            Some(path) => path,
            None => {
                let dir = timestamped_dir(settings.frames_dir()?)?;
                frame_path(&dir, &frame)
            }
        };
        let pixmap = raster::render_frame(&frame)?;
        raster::save_png(&pixmap, &path)?;
        println!("Last frame written to {}", path.display());
    }

    Ok(())
}

fn list_devices() -> Result<()> {
    let devices = SoundEngine::list_output_devices()?;

    println!("Available Output Devices:");
    println!("{:<30} {:<10} {:<12} Channels", "Name", "Default", "Sample Rate");
    println!("{}", "-".repeat(64));

    for device in devices {
        let default_str = if device.is_default { "YES" } else { "NO" };
        let sample_rate = device
            .sample_rate
            .map(|sr| sr.to_string())
            .unwrap_or_else(|| "-".to_string());
        let channels = device
            .channels
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        let name: String = device.name.chars().take(30).collect();

        println!("{:<30} {:<10} {:<12} {}", name, default_str, sample_rate, channels);
    }

    Ok(())
}

fn show_config(settings: &Settings, save: bool) -> Result<()> {
    match config_path() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# (no config directory)"),
    }
    print!("{}", settings.to_toml()?);

    if save {
        let path = settings.save()?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut settings = Settings::load();

    let result = match cli.command {
        Commands::Render {
            mode,
            expanded,
            frames,
            toggle_every,
            input,
            output,
            format,
        } => {
            apply_overrides(&mut settings, mode, expanded);
            render_offline(&settings, frames, toggle_every, input, output, format)
        }

        Commands::Live {
            mode,
            expanded,
            seconds,
            toggle_every,
            output,
        } => {
            apply_overrides(&mut settings, mode, expanded);
            run_live(&settings, seconds, toggle_every, output)
        }

        Commands::Devices => list_devices(),

        Commands::Config { save } => show_config(&settings, save),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
