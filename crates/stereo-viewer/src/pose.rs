//! Desktop stand-in for headset tracking.
//!
//! Arrow keys turn at a fixed rate while held; dragging with the left mouse
//! button turns by cursor distance. Position stays at the origin.

use glam::{EulerRot, Quat, Vec3};
use winit::keyboard::KeyCode;

use crate::scene::{CameraPose, PoseSource};

const PITCH_LIMIT: f32 = 89.0_f32 * (std::f32::consts::PI / 180.0);
/// Radians per second while an arrow key is held.
const KEY_TURN_RATE: f32 = 1.2;
/// Radians per pixel of mouse drag.
const DRAG_SENSITIVITY: f32 = 0.004;

#[derive(Debug, Default)]
pub struct DesktopPose {
    yaw: f32,
    pitch: f32,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
}

impl DesktopPose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Apply a relative turn. Positive yaw turns left, positive pitch looks up.
    pub fn rotate(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw = (self.yaw + d_yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch + d_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn recenter(&mut self) {
        self.yaw = 0.0;
        self.pitch = 0.0;
        log::info!("View recentered");
    }

    /// Returns true if the key was consumed.
    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        match key {
            KeyCode::ArrowLeft => self.left = pressed,
            KeyCode::ArrowRight => self.right = pressed,
            KeyCode::ArrowUp => self.up = pressed,
            KeyCode::ArrowDown => self.down = pressed,
            KeyCode::KeyR => {
                if pressed {
                    self.recenter();
                }
            }
            _ => return false,
        }
        true
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
        if !dragging {
            self.last_cursor = None;
        }
    }

    pub fn handle_cursor(&mut self, x: f64, y: f64) {
        if self.dragging {
            if let Some((lx, ly)) = self.last_cursor {
                let dx = (x - lx) as f32;
                let dy = (y - ly) as f32;
                self.rotate(dx * DRAG_SENSITIVITY, dy * DRAG_SENSITIVITY);
            }
            self.last_cursor = Some((x, y));
        }
    }

    /// Integrate held arrow keys over `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let yaw_dir = f32::from(u8::from(self.left)) - f32::from(u8::from(self.right));
        let pitch_dir = f32::from(u8::from(self.up)) - f32::from(u8::from(self.down));
        if yaw_dir != 0.0 || pitch_dir != 0.0 {
            self.rotate(yaw_dir * KEY_TURN_RATE * dt, pitch_dir * KEY_TURN_RATE * dt);
        }
    }
}

impl PoseSource for DesktopPose {
    fn current_pose(&self) -> CameraPose {
        CameraPose {
            position: Vec3::ZERO,
            orientation: Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0),
        }
    }
}
