use crate::{AudioSnapshot, Environment};

/// Frame duration assumed when the host does not provide one.
pub const DEFAULT_FRAME_SECONDS: f64 = 1.0 / 60.0;

/// Animation state owned by one node instance.
///
/// Kept explicit so that several nodes, or several copies of the same
/// preset, never share counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeState {
    /// Seconds rendered so far.
    pub time: f64,
    /// Index of the frame being rendered, starting at 0.
    pub frame: u64,
    /// Beats seen so far, including the current frame.
    pub beat_count: u64,
    /// Whether the init script has run for the current init source.
    pub initialized: bool,
}

impl NodeState {
    /// Records the beat flag of the frame about to be rendered.
    pub fn begin_frame(&mut self, beat: bool) {
        if beat {
            self.beat_count += 1;
        }
    }

    /// Moves to the next frame. Negative deltas are ignored.
    pub fn end_frame(&mut self, delta_seconds: f64) {
        self.time += delta_seconds.max(0.0);
        self.frame += 1;
    }

    /// Writes the per-frame globals scripts can read.
    pub fn seed(&self, env: &mut Environment, width: usize, height: usize, audio: &AudioSnapshot) {
        env.set("time", self.time);
        env.set("frame", self.frame as f64);
        env.set("w", width as f64);
        env.set("h", height as f64);
        env.set("bass", f64::from(audio.bass));
        env.set("mid", f64::from(audio.mid));
        env.set("treble", f64::from(audio.treble));
        env.set_bool("beat", audio.beat);
        env.set("beatcount", self.beat_count as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_time_and_counts_beats() {
        let mut state = NodeState::default();
        state.begin_frame(true);
        state.end_frame(DEFAULT_FRAME_SECONDS);
        state.begin_frame(false);
        state.end_frame(-1.0);

        assert_eq!(state.frame, 2);
        assert_eq!(state.beat_count, 1);
        assert!((state.time - DEFAULT_FRAME_SECONDS).abs() < 1e-12);
    }

    #[test]
    fn seeds_frame_globals() {
        let mut state = NodeState::default();
        state.begin_frame(true);
        let mut env = Environment::new();
        state.seed(&mut env, 64, 48, &AudioSnapshot::with_levels(0.5, 0.25, 0.0, true));

        assert_eq!(env.get("w"), 64.0);
        assert_eq!(env.get("h"), 48.0);
        assert_eq!(env.get("bass"), 0.5);
        assert_eq!(env.get("beat"), 1.0);
        assert_eq!(env.get("beatcount"), 1.0);
    }
}
