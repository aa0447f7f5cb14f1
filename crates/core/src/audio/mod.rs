use serde::{Deserialize, Serialize};

/// Nominal number of samples in the spectrum and waveform sequences.
pub const AUDIO_BINS: usize = 576;

/// Per-frame audio features handed to every effect.
///
/// Produced by the host's analysis pipeline; effects only read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSnapshot {
    /// Low band energy, roughly `[0, 1]`.
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    /// Whether a beat was detected on this frame.
    pub beat: bool,
    pub spectrum: Vec<f32>,
    pub waveform: Vec<f32>,
}

impl Default for AudioSnapshot {
    fn default() -> Self {
        Self::silent()
    }
}

impl AudioSnapshot {
    /// Snapshot with zeroed levels and zero-filled sequences.
    pub fn silent() -> Self {
        Self {
            bass: 0.0,
            mid: 0.0,
            treble: 0.0,
            beat: false,
            spectrum: vec![0.0; AUDIO_BINS],
            waveform: vec![0.0; AUDIO_BINS],
        }
    }

    pub fn with_levels(bass: f32, mid: f32, treble: f32, beat: bool) -> Self {
        Self {
            bass,
            mid,
            treble,
            beat,
            ..Self::silent()
        }
    }

    /// Average of the three band levels.
    pub fn loudness(&self) -> f32 {
        (self.bass + self.mid + self.treble) / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_snapshot_has_nominal_lengths() {
        let audio = AudioSnapshot::silent();
        assert_eq!(audio.spectrum.len(), AUDIO_BINS);
        assert_eq!(audio.waveform.len(), AUDIO_BINS);
        assert!(!audio.beat);
    }

    #[test]
    fn levels_are_carried_through() {
        let audio = AudioSnapshot::with_levels(0.9, 0.3, 0.0, true);
        assert!(audio.beat);
        assert!((audio.loudness() - 0.4).abs() < 1e-6);
    }
}
