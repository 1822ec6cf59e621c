//! Actors
//!
//! A player-style entity built from an imported model. The model itself is
//! not simulated: physics sees a capsule fitted to the model's bounding box,
//! and the body is kinematic with rotations locked so the game drives it by
//! velocity. The model node is drawn one unit below the body and turned to
//! face the direction of travel.
//!
//! Actor assets are described by a small RON payload:
//!
//! ```ron
//! (
//!     position: (0.0, 2.0, 0.0),
//!     bounds: (min: (-0.5, 0.0, -0.5), max: (0.5, 4.0, 0.5)),
//!     clips: ["idle", "walk"],
//! )
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::render::Bounds;

/// Additional mass given to actor bodies
pub const ACTOR_MASS: f32 = 100.0;

/// Error type for actor loading
#[derive(Debug)]
pub enum ActorError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    /// Bounding box is empty or not finite
    NoGeometry,
    /// Kind was never registered
    UnrecognizedKind(&'static str),
}

impl From<std::io::Error> for ActorError {
    fn from(e: std::io::Error) -> Self {
        ActorError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for ActorError {
    fn from(e: ron::error::SpannedError) -> Self {
        ActorError::ParseError(e)
    }
}

impl std::fmt::Display for ActorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorError::IoError(e) => write!(f, "IO error: {}", e),
            ActorError::ParseError(e) => write!(f, "Parse error: {}", e),
            ActorError::NoGeometry => write!(f, "Actor has no usable geometry"),
            ActorError::UnrecognizedKind(name) => write!(f, "Unrecognized entity kind: {}", name),
        }
    }
}

impl std::error::Error for ActorError {}

/// Everything needed to build an actor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorPayload {
    #[serde(default)]
    pub position: [f32; 3],
    pub bounds: Bounds,
    /// Animation clip names, in index order
    #[serde(default)]
    pub clips: Vec<String>,
}

impl ActorPayload {
    pub fn from_ron_str(s: &str) -> Result<Self, ActorError> {
        let payload: ActorPayload = ron::from_str(s)?;
        payload.validate()?;
        Ok(payload)
    }

    /// Read a payload from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ActorError> {
        let contents = fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Fetch a payload through macroquad's file loader (works on web too)
    pub async fn fetch(path: &str) -> Result<Self, ActorError> {
        let contents = macroquad::file::load_string(path)
            .await
            .map_err(|e| ActorError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string())))?;
        Self::from_ron_str(&contents)
    }

    fn validate(&self) -> Result<(), ActorError> {
        let size = self.bounds.size();
        if !size.is_finite() || size.y <= 0.0 || size.x < 0.0 || size.z < 0.0 {
            return Err(ActorError::NoGeometry);
        }
        Ok(())
    }
}

/// Animation and facing state of an actor
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActorState {
    pub clips: Vec<String>,
    pub animation_index: usize,
    /// Seconds into the current clip
    pub clip_time: f32,
    /// Yaw of the model, radians
    pub facing: f32,
}

impl ActorState {
    pub fn new(clips: Vec<String>) -> Self {
        Self {
            clips,
            ..Self::default()
        }
    }

    /// Name of the clip currently playing
    pub fn current_clip(&self) -> Option<&str> {
        self.clips.get(self.animation_index).map(String::as_str)
    }

    /// Switch to clip `index`. No-op when it is already playing, out of
    /// range, or there are no clips.
    pub fn play(&mut self, index: usize) -> bool {
        if self.clips.is_empty() || index == self.animation_index || index >= self.clips.len() {
            return false;
        }
        self.animation_index = index;
        self.clip_time = 0.0;
        true
    }

    pub fn advance(&mut self, delta: f32) {
        if !self.clips.is_empty() {
            self.clip_time += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PAYLOAD: &str = r#"(
        position: (1.0, 2.0, 3.0),
        bounds: (min: (-0.5, 0.0, -0.5), max: (0.5, 4.0, 0.5)),
        clips: ["idle", "walk"],
    )"#;

    #[test]
    fn test_parse_payload() {
        let payload = ActorPayload::from_ron_str(PAYLOAD).unwrap();
        assert_eq!(payload.position, [1.0, 2.0, 3.0]);
        assert_eq!(payload.bounds.size().y, 4.0);
        assert_eq!(payload.clips, vec!["idle".to_string(), "walk".to_string()]);
    }

    #[test]
    fn test_flat_bounds_rejected() {
        let flat = "(bounds: (min: (0.0, 1.0, 0.0), max: (1.0, 1.0, 1.0)))";
        assert!(matches!(ActorPayload::from_ron_str(flat), Err(ActorError::NoGeometry)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PAYLOAD.as_bytes()).unwrap();

        let payload = ActorPayload::load(file.path()).unwrap();
        assert_eq!(payload.clips.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ActorPayload::load("does/not/exist.ron");
        assert!(matches!(result, Err(ActorError::IoError(_))));
    }

    #[test]
    fn test_play_clip() {
        let mut state = ActorState::new(vec!["idle".into(), "walk".into()]);
        assert_eq!(state.current_clip(), Some("idle"));

        state.advance(0.5);
        assert!(!state.play(0));
        assert_eq!(state.clip_time, 0.5);

        assert!(state.play(1));
        assert_eq!(state.current_clip(), Some("walk"));
        assert_eq!(state.clip_time, 0.0);
        assert!(!state.play(5));
    }

    #[test]
    fn test_play_without_clips() {
        let mut state = ActorState::default();
        assert!(!state.play(1));
        state.advance(1.0);
        assert_eq!(state.clip_time, 0.0);
    }
}
