//! Ambient tone synthesizer with a spectrum bar and waveform visualizer
//!
//! The pipeline, leaf first:
//! - [`audio::SoundEngine`] plays a [`audio::Signal`] and feeds a [`audio::SignalTap`]
//! - [`audio::Analyser`] turns the tap into byte snapshots once per frame
//! - [`visual::render`] maps a snapshot to [`visual::DrawCommand`]s
//! - [`raster`] replays the commands on a tiny-skia pixmap
//!
//! [`visualizer::Visualizer`] owns the frame loop and the mode controller.

pub mod audio;
pub mod conf;
pub mod controller;
pub mod raster;
pub mod visual;
pub mod visualizer;
