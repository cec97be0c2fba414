//! Per-frame sample snapshots

use serde::Serialize;
use std::ops::Deref;

/// One frame's worth of byte samples taken from the analyser.
///
/// Frequency snapshots hold one magnitude per bin, time-domain snapshots hold
/// raw amplitudes with 128 as the zero line. The contents never change after
/// creation; a new buffer is sampled for every frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleBuffer(Box<[u8]>);

impl From<Vec<u8>> for SampleBuffer {
    fn from(samples: Vec<u8>) -> Self {
        Self(samples.into_boxed_slice())
    }
}

impl From<&[u8]> for SampleBuffer {
    fn from(samples: &[u8]) -> Self {
        Self(samples.into())
    }
}

impl Deref for SampleBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}
