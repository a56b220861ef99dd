use std::rc::{Rc, Weak};

use glam::{Mat4, Quat, Vec2, Vec3};

use super::camera::StereoCamera;
use super::presentation::{RenderBackend, RenderError};
use crate::stimulus::StimulusConfig;

/// Size of each eye plane in world units.
pub const SURFACE_SIZE: Vec2 = Vec2::new(2.0, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    /// Camera layer that renders this eye's surface.
    pub fn layer(self) -> u8 {
        match self {
            Eye::Left => 1,
            Eye::Right => 2,
        }
    }

    /// Half of the shared texture this eye samples.
    pub fn uv_rect(self) -> UvRect {
        match self {
            Eye::Left => UvRect::new(0.0, 0.5, 0.0, 1.0),
            Eye::Right => UvRect::new(0.5, 1.0, 0.0, 1.0),
        }
    }
}

/// Visibility bitmask. Layer 0 is enabled by default, like every object and
/// camera in a freshly built scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMask(u32);

impl Default for LayerMask {
    fn default() -> Self {
        Self(1)
    }
}

impl LayerMask {
    pub fn only(layer: u8) -> Self {
        Self(1 << layer)
    }

    pub fn enable(&mut self, layer: u8) {
        self.0 |= 1 << layer;
    }

    pub fn set(&mut self, layer: u8) {
        self.0 = 1 << layer;
    }

    pub fn test_layer(self, layer: u8) -> bool {
        self.0 & (1 << layer) != 0
    }

    /// True when the two masks share at least one layer.
    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u_min: f32,
    pub u_max: f32,
    pub v_min: f32,
    pub v_max: f32,
}

impl UvRect {
    pub const fn new(u_min: f32, u_max: f32, v_min: f32, v_max: f32) -> Self {
        Self {
            u_min,
            u_max,
            v_min,
            v_max,
        }
    }

    pub fn area(&self) -> f32 {
        (self.u_max - self.u_min).max(0.0) * (self.v_max - self.v_min).max(0.0)
    }

    /// Area shared with `other`. Touching edges count as zero.
    pub fn overlap_area(&self, other: &UvRect) -> f32 {
        let w = self.u_max.min(other.u_max) - self.u_min.max(other.u_min);
        let h = self.v_max.min(other.v_max) - self.v_min.max(other.v_min);
        w.max(0.0) * h.max(0.0)
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.u_min, self.u_max, self.v_min, self.v_max]
    }
}

/// Backend-issued id for a GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// The single texture shared by both eye surfaces.
#[derive(Debug, PartialEq, Eq)]
pub struct StereoTexture {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }
}

/// One eye's plane. Holds a non-owning reference to the shared texture.
#[derive(Debug, Clone)]
pub struct EyeSurface {
    pub eye: Eye,
    pub uv: UvRect,
    pub size: Vec2,
    transform: Transform,
    layers: LayerMask,
    texture: Weak<StereoTexture>,
}

impl EyeSurface {
    fn new(eye: Eye, texture: &Rc<StereoTexture>) -> Self {
        Self {
            eye,
            uv: eye.uv_rect(),
            size: SURFACE_SIZE,
            transform: Transform::default(),
            layers: LayerMask::only(eye.layer()),
            texture: Rc::downgrade(texture),
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn layers(&self) -> LayerMask {
        self.layers
    }

    pub fn texture(&self) -> Option<Rc<StereoTexture>> {
        self.texture.upgrade()
    }

    /// Model matrix scaling the unit quad to `size`.
    pub fn model_matrix(&self) -> Mat4 {
        self.transform.matrix() * Mat4::from_scale(self.size.extend(1.0))
    }
}

/// The assembled stereo pair: one texture, two eye surfaces, one camera.
///
/// Only the rig creates the texture; surfaces just observe it.
pub struct StereoRig {
    texture: Rc<StereoTexture>,
    surfaces: [EyeSurface; 2],
    camera: StereoCamera,
}

impl StereoRig {
    pub fn build(
        backend: &mut impl RenderBackend,
        media_size: (u32, u32),
        config: &StimulusConfig,
    ) -> Result<Self, RenderError> {
        let texture = Rc::new(create_texture(backend, media_size)?);
        let surfaces = Eye::BOTH.map(|eye| EyeSurface::new(eye, &texture));
        log::info!(
            "Stereo rig built: {}x{} texture, aspect {}",
            texture.width,
            texture.height,
            config.target_aspect
        );
        Ok(Self {
            texture,
            surfaces,
            camera: StereoCamera::new(config),
        })
    }

    pub fn texture(&self) -> &StereoTexture {
        &self.texture
    }

    pub fn surface(&self, eye: Eye) -> &EyeSurface {
        match eye {
            Eye::Left => &self.surfaces[0],
            Eye::Right => &self.surfaces[1],
        }
    }

    pub fn surfaces(&self) -> &[EyeSurface; 2] {
        &self.surfaces
    }

    pub fn camera(&self) -> &StereoCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut StereoCamera {
        &mut self.camera
    }

    /// Place both surfaces at `position` facing along `rotation`.
    pub fn anchor_surfaces(&mut self, position: Vec3, rotation: Quat) {
        let transform = Transform { position, rotation };
        for surface in &mut self.surfaces {
            surface.transform = transform;
        }
    }
}

fn create_texture(
    backend: &mut impl RenderBackend,
    (width, height): (u32, u32),
) -> Result<StereoTexture, RenderError> {
    let (width, height) = (width.max(1), height.max(1));
    let handle = backend.create_media_texture(width, height)?;
    Ok(StereoTexture {
        handle,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::test_support::RecordingBackend;
    use crate::stimulus::SIDE_BY_SIDE_VIDEO;

    fn rig(size: (u32, u32)) -> (StereoRig, RecordingBackend) {
        let mut backend = RecordingBackend::default();
        let rig = StereoRig::build(&mut backend, size, &SIDE_BY_SIDE_VIDEO).unwrap();
        (rig, backend)
    }

    #[test]
    fn uv_halves_partition_unit_square() {
        for size in [(2560, 1280), (1, 1), (3, 7), (1920, 1080)] {
            let (rig, _) = rig(size);
            let l = rig.surface(Eye::Left).uv;
            let r = rig.surface(Eye::Right).uv;
            assert_eq!(l.overlap_area(&r), 0.0);
            assert!((l.area() + r.area() - 1.0).abs() < 1e-6);
            assert_eq!(l.u_min, 0.0);
            assert_eq!(l.u_max, r.u_min);
            assert_eq!(r.u_max, 1.0);
            assert_eq!((l.v_min, l.v_max), (0.0, 1.0));
            assert_eq!((r.v_min, r.v_max), (0.0, 1.0));
        }
    }

    #[test]
    fn one_texture_shared_by_both_surfaces() {
        let (rig, backend) = rig((2560, 1280));
        assert_eq!(backend.created.len(), 1);
        let l = rig.surface(Eye::Left).texture().unwrap();
        let r = rig.surface(Eye::Right).texture().unwrap();
        assert!(Rc::ptr_eq(&l, &r));
        assert_eq!(l.handle, rig.texture().handle);
    }

    #[test]
    fn surfaces_are_eye_exclusive() {
        let (rig, _) = rig((4, 2));
        let l = rig.surface(Eye::Left).layers();
        let r = rig.surface(Eye::Right).layers();
        assert!(l.test_layer(1) && !l.test_layer(2) && !l.test_layer(0));
        assert!(r.test_layer(2) && !r.test_layer(1) && !r.test_layer(0));
        assert!(!l.intersects(r));
    }

    #[test]
    fn surfaces_share_size_and_transform() {
        let (mut rig, _) = rig((4, 2));
        rig.anchor_surfaces(Vec3::new(0.0, 1.0, -3.0), Quat::from_rotation_y(0.5));
        let l = rig.surface(Eye::Left);
        let r = rig.surface(Eye::Right);
        assert_eq!(l.size, Vec2::new(2.0, 1.0));
        assert_eq!(l.size, r.size);
        assert_eq!(l.transform(), r.transform());
    }

    #[test]
    fn layer_mask_ops() {
        let mut m = LayerMask::default();
        assert!(m.test_layer(0));
        m.enable(2);
        assert!(m.test_layer(0) && m.test_layer(2));
        m.set(1);
        assert!(!m.test_layer(0) && m.test_layer(1));
        assert!(m.intersects(LayerMask::only(1)));
    }
}
