use thiserror::Error;

use super::camera::CameraPose;
use super::rig::{StereoRig, StereoTexture, TextureHandle};
use crate::media::DecodedFrame;
use crate::session::{HeadsetSession, Views};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render surface lost or outdated")]
    SurfaceLost,
    #[error("GPU out of memory")]
    OutOfMemory,
    #[error("surface error: {0}")]
    Surface(String),
    #[error("unknown texture handle {0}")]
    UnknownTexture(u64),
}

/// Live head pose, read once per tick.
pub trait PoseSource {
    fn current_pose(&self) -> CameraPose;
}

/// What the stereo pipeline needs from a renderer.
pub trait RenderBackend {
    fn create_media_texture(&mut self, width: u32, height: u32)
    -> Result<TextureHandle, RenderError>;
    /// Overwrite the texture contents in place with a new frame.
    fn update_texture(
        &mut self,
        texture: &StereoTexture,
        frame: &DecodedFrame,
    ) -> Result<(), RenderError>;
    fn set_render_size(&mut self, width: u32, height: u32);
    fn render(&mut self, rig: &StereoRig, views: &Views) -> Result<(), RenderError>;
}

/// Keeps the stereo pair a fixed distance in front of the viewer, facing them.
pub struct PresentationLoop {
    distance: f32,
    ticks: u64,
}

impl PresentationLoop {
    pub fn new(distance: f32) -> Self {
        Self { distance, ticks: 0 }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// One display refresh: follow the pose, re-anchor, submit.
    pub fn tick(
        &mut self,
        rig: &mut StereoRig,
        pose: &impl PoseSource,
        session: &HeadsetSession,
        backend: &mut impl RenderBackend,
    ) -> Result<(), RenderError> {
        rig.camera_mut().set_pose(pose.current_pose());

        let camera = rig.camera();
        let anchor = camera.position() + camera.forward() * self.distance;
        let rotation = camera.rotation();
        rig.anchor_surfaces(anchor, rotation);

        self.ticks += 1;
        let views = session.views(rig.camera());
        backend.render(rig, &views)
    }
}
