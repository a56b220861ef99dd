//! Headset session toggle and the per-eye views it implies.
//!
//! Not presenting: one view over the whole viewport, seeing whatever layers
//! the camera has enabled. Presenting: two half-width views, each seeing
//! layer 0 plus its own eye layer, offset by half the IPD.

use glam::{Mat4, Vec3};

use crate::scene::camera::{StereoCamera, view_from};
use crate::scene::rig::{Eye, EyeSurface, LayerMask};

/// Default inter-pupillary distance in world units.
pub const IPD: f32 = 0.063;

/// Region of the negotiated viewport, normalised to 0..1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewBounds {
    pub const FULL: ViewBounds = ViewBounds::new(0.0, 0.0, 1.0, 1.0);
    pub const LEFT_HALF: ViewBounds = ViewBounds::new(0.0, 0.0, 0.5, 1.0);
    pub const RIGHT_HALF: ViewBounds = ViewBounds::new(0.5, 0.0, 0.5, 1.0);

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderView {
    pub eye: Option<Eye>,
    pub bounds: ViewBounds,
    pub view: Mat4,
    pub projection: Mat4,
    pub layers: LayerMask,
    pub position: Vec3,
}

impl RenderView {
    pub fn sees(&self, surface: &EyeSurface) -> bool {
        self.layers.intersects(surface.layers())
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Views {
    Mono(RenderView),
    Stereo(RenderView, RenderView),
}

impl Views {
    pub fn iter(&self) -> impl Iterator<Item = &RenderView> {
        let (first, second) = match self {
            Views::Mono(v) => (v, None),
            Views::Stereo(l, r) => (l, Some(r)),
        };
        std::iter::once(first).chain(second)
    }
}

#[derive(Debug)]
pub struct HeadsetSession {
    presenting: bool,
    ipd: f32,
}

impl HeadsetSession {
    pub fn new(presenting: bool) -> Self {
        Self { presenting, ipd: IPD }
    }

    pub fn is_presenting(&self) -> bool {
        self.presenting
    }

    /// Enter or exit presentation. Returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.presenting = !self.presenting;
        if self.presenting {
            log::info!("Headset session started");
        } else {
            log::info!("Headset session ended");
        }
        self.presenting
    }

    pub fn views(&self, camera: &StereoCamera) -> Views {
        if !self.presenting {
            return Views::Mono(RenderView {
                eye: None,
                bounds: ViewBounds::FULL,
                view: camera.view_matrix(),
                projection: camera.projection(),
                layers: camera.layers(),
                position: camera.position(),
            });
        }
        Views::Stereo(
            self.eye_view(camera, Eye::Left),
            self.eye_view(camera, Eye::Right),
        )
    }

    fn eye_view(&self, camera: &StereoCamera, eye: Eye) -> RenderView {
        let (sign, bounds) = match eye {
            Eye::Left => (-1.0, ViewBounds::LEFT_HALF),
            Eye::Right => (1.0, ViewBounds::RIGHT_HALF),
        };
        let position = camera.position() + camera.right() * (sign * self.ipd * 0.5);
        let mut layers = LayerMask::default();
        layers.enable(eye.layer());
        // Each eye gets half the letterboxed width.
        let aspect = camera.aspect() * bounds.width;
        RenderView {
            eye: Some(eye),
            bounds,
            view: view_from(position, camera.rotation()),
            projection: camera.projection_with_aspect(aspect),
            layers,
            position,
        }
    }
}
