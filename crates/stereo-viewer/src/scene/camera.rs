use glam::{Mat4, Quat, Vec3};

use super::rig::LayerMask;
use crate::stimulus::{PreviewEyes, StimulusConfig};

pub const FOV_Y_DEGREES: f32 = 70.0;
pub const NEAR: f32 = 1.0;
pub const FAR: f32 = 2000.0;

/// Position and orientation reported by a pose source once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

/// Perspective camera whose aspect is pinned to the stimulus format.
///
/// The render surface is letterboxed to match `aspect`; the aspect is never
/// taken from window pixels.
#[derive(Debug, Clone)]
pub struct StereoCamera {
    pub fov_y_degrees: f32,
    aspect: f32,
    pub near: f32,
    pub far: f32,
    position: Vec3,
    rotation: Quat,
    layers: LayerMask,
}

impl StereoCamera {
    pub fn new(config: &StimulusConfig) -> Self {
        let mut layers = LayerMask::default();
        layers.enable(1);
        if config.preview == PreviewEyes::BothEyes {
            layers.enable(2);
        }
        Self {
            fov_y_degrees: FOV_Y_DEGREES,
            aspect: config.target_aspect,
            near: NEAR,
            far: FAR,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            layers,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn layers(&self) -> LayerMask {
        self.layers
    }

    pub fn set_pose(&mut self, pose: CameraPose) {
        self.position = pose.position;
        self.rotation = pose.orientation.normalize();
    }

    /// World-space viewing direction (-Z in camera space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn projection(&self) -> Mat4 {
        self.projection_with_aspect(self.aspect)
    }

    pub fn projection_with_aspect(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), aspect, self.near, self.far)
    }

    pub fn view_matrix(&self) -> Mat4 {
        view_from(self.position, self.rotation)
    }
}

/// Inverse of the camera's world transform.
pub fn view_from(position: Vec3, rotation: Quat) -> Mat4 {
    Mat4::from_rotation_translation(rotation, position).inverse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::{SIDE_BY_SIDE_VIDEO, SQUARE_IMAGE};

    #[test]
    fn defaults_match_stimulus() {
        let cam = StereoCamera::new(&SIDE_BY_SIDE_VIDEO);
        assert_eq!(cam.aspect(), 2.0);
        assert_eq!(cam.fov_y_degrees, 70.0);
        assert_eq!((cam.near, cam.far), (1.0, 2000.0));
    }

    #[test]
    fn preview_layers_follow_preset() {
        let video = StereoCamera::new(&SIDE_BY_SIDE_VIDEO).layers();
        assert!(video.test_layer(0));
        assert!(video.test_layer(1));
        assert!(!video.test_layer(2));

        let image = StereoCamera::new(&SQUARE_IMAGE).layers();
        assert!(image.test_layer(1));
        assert!(image.test_layer(2));
    }

    #[test]
    fn forward_follows_rotation() {
        let mut cam = StereoCamera::new(&SIDE_BY_SIDE_VIDEO);
        assert!((cam.forward() - Vec3::NEG_Z).length() < 1e-6);
        cam.set_pose(CameraPose {
            position: Vec3::ZERO,
            orientation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        });
        assert!((cam.forward() - Vec3::NEG_X).length() < 1e-6);
    }

    #[test]
    fn view_matrix_inverts_pose() {
        let mut cam = StereoCamera::new(&SIDE_BY_SIDE_VIDEO);
        cam.set_pose(CameraPose {
            position: Vec3::new(1.0, 2.0, 3.0),
            orientation: Quat::from_rotation_x(0.3),
        });
        let p = cam.view_matrix().transform_point3(cam.position());
        assert!(p.length() < 1e-5);
    }
}
