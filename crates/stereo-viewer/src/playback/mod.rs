pub mod clock;
pub mod controller;

pub use controller::{PlaybackController, PlaybackPhase};
