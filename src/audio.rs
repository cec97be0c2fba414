//! Audio side of the pipeline: signal sources, the engine that plays them,
//! the shared tap and the analyser reading from it.

mod analyser;
mod buffer;
mod engine;
mod signal;
mod tap;

pub use analyser::{
    Analyser, AnalyserError, Connection, MAX_DECIBELS, MIN_DECIBELS, SMOOTHING_TIME_CONSTANT,
    amplitude_to_byte,
};
pub use buffer::SampleBuffer;
pub use engine::{EngineError, OutputDeviceInfo, SoundEngine};
pub use signal::{AmbientTone, Signal, WavSignal};
pub use tap::SignalTap;
