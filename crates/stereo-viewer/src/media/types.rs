use serde::{Deserialize, Serialize};

/// A decoded frame ready for GPU upload.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub data: Vec<u8>, // RGBA8
    pub width: u32,
    pub height: u32,
}

/// Notifications from a media source. Each fires at most once per logical
/// event and may arrive at any point relative to the render tick.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// The source has enough data to start. Fires once per load.
    CanPlay,
    /// A play request was accepted and the stream is advancing.
    Playing,
    /// A play request was declined by the platform.
    PlayRejected(String),
    /// The stream reached its natural end.
    Ended,
    /// A position change requested through `set_current_time` completed.
    Seeked,
}

/// Whether play requests need a prior user gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoplayPolicy {
    #[default]
    Allowed,
    RequireGesture,
}
