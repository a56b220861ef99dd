pub mod decoder;
pub mod player;
pub mod types;
#[cfg(feature = "video")]
pub mod video;

pub use decoder::{MediaError, MediaSource, load_media};
pub use player::MediaPlayer;
pub use types::{AutoplayPolicy, DecodedFrame, MediaEvent};

/// Playback operations on an externally owned media source.
///
/// Every call is fire-and-forget: acceptance of `play()` and completion of
/// `set_current_time()` are reported later as `MediaEvent`s.
pub trait MediaTransport {
    /// Start or resume. On a stream that reached its end, restarts from the beginning.
    fn play(&mut self);
    fn pause(&mut self);
    /// Request a seek. Completion arrives as `MediaEvent::Seeked`.
    fn set_current_time(&mut self, secs: f64);
    fn current_time(&self) -> f64;
}
