pub mod camera;
pub mod presentation;
pub mod rig;

pub use camera::{CameraPose, StereoCamera};
pub use presentation::{PoseSource, PresentationLoop, RenderBackend, RenderError};
pub use rig::{Eye, StereoRig};
