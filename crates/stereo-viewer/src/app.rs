use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use crossbeam_channel::Receiver;
use winit::keyboard::KeyCode;
use winit::window::Window;

use crate::gpu::{GpuBackend, GpuContext};
use crate::media::{MediaEvent, MediaPlayer, MediaSource};
use crate::playback::PlaybackController;
use crate::pose::DesktopPose;
use crate::scene::{PresentationLoop, RenderBackend, RenderError, StereoRig};
use crate::session::HeadsetSession;
use crate::settings::SettingsConfig;
use crate::stimulus::{ContentKind, StimulusConfig};
use crate::viewport::ViewportNegotiator;

/// What the command line asked for.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub media_path: PathBuf,
    pub stimulus: &'static StimulusConfig,
    pub headset: bool,
}

/// Everything one viewer instance owns. Built once the window exists.
pub struct ViewerApp {
    pub window: Arc<Window>,
    pub settings: SettingsConfig,
    player: MediaPlayer,
    media_events: Receiver<MediaEvent>,
    controller: Option<PlaybackController>,
    rig: StereoRig,
    negotiator: ViewportNegotiator,
    presenter: PresentationLoop,
    session: HeadsetSession,
    pose: DesktopPose,
    backend: GpuBackend,
    last_frame: Instant,
    pub quit_requested: bool,
}

impl ViewerApp {
    pub fn new(
        window: Arc<Window>,
        options: &LaunchOptions,
        settings: SettingsConfig,
        source: MediaSource,
    ) -> Result<Self> {
        let stimulus = options.stimulus;
        stimulus.validate()?;

        if source.content_kind() != stimulus.content {
            log::warn!(
                "Stimulus '{}' expects {:?} content but {} is {:?}",
                stimulus.name,
                stimulus.content,
                options.media_path.display(),
                source.content_kind()
            );
        }

        let gpu = GpuContext::new(window.clone())?;
        let mut backend = GpuBackend::new(gpu);
        let mut rig = StereoRig::build(&mut backend, source.dimensions(), stimulus)?;

        let controller = (source.content_kind() == ContentKind::Video)
            .then(|| PlaybackController::new(stimulus));
        let (player, media_events) = MediaPlayer::new(source, settings.autoplay);

        let mut negotiator = ViewportNegotiator::new(stimulus.target_aspect);
        let size = window.inner_size();
        negotiator.negotiate(size.width, size.height, &mut backend, rig.camera_mut());

        log::info!(
            "Viewer ready: stimulus '{}', {} loop(s), pause frame {} ({}s)",
            stimulus.name,
            stimulus.max_loops,
            stimulus.pause_frame,
            stimulus.pause_time()
        );

        Ok(Self {
            window,
            settings,
            player,
            media_events,
            controller,
            rig,
            negotiator,
            presenter: PresentationLoop::new(stimulus.eye_distance),
            session: HeadsetSession::new(options.headset),
            pose: DesktopPose::new(),
            backend,
            last_frame: Instant::now(),
            quit_requested: false,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.backend.resize_surface(width, height);
        self.negotiator
            .negotiate(width, height, &mut self.backend, self.rig.camera_mut());
    }

    /// Reconfigure the swapchain at its current size after a lost surface.
    pub fn recover_surface(&mut self) {
        let (w, h) = self.backend.window_size();
        self.resize(w, h);
    }

    /// Click or Space: counts as a user gesture and as a start request.
    pub fn on_user_activation(&mut self) {
        self.player.notify_user_gesture();
        if let Some(controller) = self.controller.as_mut() {
            controller.on_user_activation(&mut self.player);
        }
    }

    pub fn toggle_headset(&mut self) {
        self.session.toggle();
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.pose.set_dragging(dragging);
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        self.pose.handle_cursor(x, y);
    }

    /// Keys that steer the desktop pose. Returns true if consumed.
    pub fn pose_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        self.pose.handle_key(key, pressed)
    }

    /// Per-frame work that runs before rendering.
    pub fn update(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;

        self.pose.update(dt as f32);
        self.player.advance(dt);

        if let Some(controller) = self.controller.as_mut() {
            for event in self.media_events.try_iter() {
                controller.handle(&event, &mut self.player);
            }
        } else {
            // Still images never play; just keep the queue empty.
            for event in self.media_events.try_iter() {
                log::debug!("Media event without controller: {event:?}");
            }
        }

        if self.player.take_frame_dirty() {
            if let Some(frame) = self.player.current_frame() {
                if let Err(e) = self.backend.update_texture(self.rig.texture(), frame) {
                    log::error!("Texture upload failed: {e}");
                }
            }
        }
    }

    pub fn render(&mut self) -> Result<(), RenderError> {
        self.presenter
            .tick(&mut self.rig, &self.pose, &self.session, &mut self.backend)
    }
}
