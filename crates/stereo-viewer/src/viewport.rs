use crate::scene::{RenderBackend, StereoCamera};

/// Render-surface size in (possibly fractional) pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const ZERO: Viewport = Viewport {
        width: 0.0,
        height: 0.0,
    };

    /// Whole-pixel size for the render surface.
    pub fn pixels(&self) -> (u32, u32) {
        (self.width.floor() as u32, self.height.floor() as u32)
    }
}

/// Largest `target_aspect` rectangle that fits in the available area.
///
/// Full width is tried first; if the derived height overflows, height is
/// clamped and width derived from it instead.
pub fn compute_viewport(available_width: f64, available_height: f64, target_aspect: f64) -> Viewport {
    if available_width <= 0.0 || available_height <= 0.0 || target_aspect <= 0.0 {
        return Viewport::ZERO;
    }
    let mut width = available_width;
    let mut height = width / target_aspect;
    if height > available_height {
        height = available_height;
        width = height * target_aspect;
    }
    Viewport { width, height }
}

/// Re-runs viewport negotiation on every layout change and re-asserts the
/// camera aspect.
pub struct ViewportNegotiator {
    target_aspect: f32,
    current: Viewport,
}

impl ViewportNegotiator {
    pub fn new(target_aspect: f32) -> Self {
        Self {
            target_aspect,
            current: Viewport::ZERO,
        }
    }

    pub fn current(&self) -> Viewport {
        self.current
    }

    pub fn negotiate(
        &mut self,
        available_width: u32,
        available_height: u32,
        backend: &mut impl RenderBackend,
        camera: &mut StereoCamera,
    ) -> Viewport {
        let viewport = compute_viewport(
            f64::from(available_width),
            f64::from(available_height),
            f64::from(self.target_aspect),
        );
        let (w, h) = viewport.pixels();
        if w > 0 && h > 0 {
            backend.set_render_size(w, h);
        } else {
            log::debug!("Skipping render resize for empty area {available_width}x{available_height}");
        }
        camera.set_aspect(self.target_aspect);
        log::debug!(
            "Viewport {}x{} -> {:.1}x{:.1}",
            available_width,
            available_height,
            viewport.width,
            viewport.height
        );
        self.current = viewport;
        viewport
    }
}
