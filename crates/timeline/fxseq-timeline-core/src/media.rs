//! Media collaborator used by media-backed effects.

use serde::{Deserialize, Serialize};

/// Playback control of an effect's backing media. Positions are in seconds.
pub trait MediaPlayback {
    fn seek(&mut self, seconds: f64);
    fn play(&mut self);
    fn pause(&mut self);
}

/// Media stand-in for hosts without real media (servers replaying timing,
/// tests). Tracks position and play state, and counts seeks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadlessMedia {
    pub position: f64,
    pub playing: bool,
    pub seeks: u32,
}

impl HeadlessMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance position by `dt_ms` while playing.
    pub fn advance(&mut self, dt_ms: f64) {
        if self.playing {
            self.position += dt_ms / 1000.0;
        }
    }
}

impl MediaPlayback for HeadlessMedia {
    fn seek(&mut self, seconds: f64) {
        self.position = seconds;
        self.seeks += 1;
    }

    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_media_tracks_position() {
        let mut m = HeadlessMedia::new();
        m.seek(1.5);
        m.advance(500.0);
        assert_eq!(m.position, 1.5);
        m.play();
        m.advance(500.0);
        assert_eq!(m.position, 2.0);
        m.pause();
        assert!(!m.playing);
        assert_eq!(m.seeks, 1);
    }
}
