mod app;
mod gpu;
mod media;
mod playback;
mod pose;
mod scene;
mod session;
mod settings;
mod stimulus;
mod viewport;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use app::{LaunchOptions, ViewerApp};
use media::MediaSource;
use scene::RenderError;
use settings::SettingsConfig;
use stimulus::{PRESETS, StimulusConfig};

const USAGE: &str = "usage: stereo-viewer <media-path> [--stimulus <name>] [--headset]";

#[derive(Debug, PartialEq)]
struct CliArgs {
    media_path: PathBuf,
    stimulus: Option<String>,
    headset: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut media_path = None;
    let mut stimulus = None;
    let mut headset = false;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--stimulus" => match args.next() {
                Some(name) => stimulus = Some(name),
                None => bail!("--stimulus needs a name\n{USAGE}"),
            },
            "--headset" => headset = true,
            flag if flag.starts_with("--") => bail!("unknown flag '{flag}'\n{USAGE}"),
            _ if media_path.is_some() => bail!("more than one media path given\n{USAGE}"),
            _ => media_path = Some(PathBuf::from(arg)),
        }
    }

    let Some(media_path) = media_path else {
        bail!("{USAGE}");
    };
    Ok(CliArgs {
        media_path,
        stimulus,
        headset,
    })
}

fn resolve_stimulus(args: &CliArgs) -> Result<&'static StimulusConfig> {
    match &args.stimulus {
        Some(name) => match StimulusConfig::by_name(name) {
            Some(config) => Ok(config),
            None => {
                let known: Vec<&str> = PRESETS.iter().map(|p| p.name).collect();
                bail!("unknown stimulus '{name}' (known: {})", known.join(", "))
            }
        },
        None => Ok(StimulusConfig::for_content(media::decoder::content_kind_for(
            &args.media_path,
        )?)),
    }
}

struct ViewerShell {
    options: LaunchOptions,
    pending: Option<(SettingsConfig, MediaSource)>,
    app: Option<ViewerApp>,
    window: Option<Arc<Window>>,
}

impl ViewerShell {
    fn new(options: LaunchOptions, settings: SettingsConfig, source: MediaSource) -> Self {
        Self {
            options,
            pending: Some((settings, source)),
            app: None,
            window: None,
        }
    }
}

impl ApplicationHandler for ViewerShell {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let Some((settings, source)) = self.pending.take() else {
            return;
        };

        let mut attrs = WindowAttributes::default()
            .with_title(format!("Stereo Viewer - {}", self.options.stimulus.name))
            .with_inner_size(winit::dpi::LogicalSize::new(
                settings.window_width,
                settings.window_height,
            ));
        if settings.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        match ViewerApp::new(window.clone(), &self.options, settings, source) {
            Ok(app) => {
                self.app = Some(app);
                window.request_redraw();
            }
            Err(e) => {
                log::error!("Failed to initialize viewer: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(app) = self.app.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                app.quit_requested = true;
            }
            WindowEvent::Resized(size) => {
                app.resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                if !app.pose_key(key, pressed) && pressed && !repeat {
                    match key {
                        KeyCode::Escape => app.quit_requested = true,
                        KeyCode::Space => app.on_user_activation(),
                        KeyCode::KeyV => app.toggle_headset(),
                        KeyCode::KeyF => {
                            let window = &app.window;
                            let fullscreen = window.fullscreen().is_none();
                            window.set_fullscreen(
                                fullscreen.then_some(Fullscreen::Borderless(None)),
                            );
                            app.settings.fullscreen = fullscreen;
                            app.settings.save();
                        }
                        _ => {}
                    }
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                if pressed {
                    app.on_user_activation();
                }
                app.set_dragging(pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                app.cursor_moved(position.x, position.y);
            }
            WindowEvent::RedrawRequested => {
                app.update();

                match app.render() {
                    Ok(()) => {}
                    Err(RenderError::SurfaceLost) => app.recover_surface(),
                    Err(RenderError::OutOfMemory) => {
                        log::error!("Out of GPU memory");
                        event_loop.exit();
                    }
                    Err(e) => {
                        log::warn!("Render error: {e}");
                    }
                }

                app.window.request_redraw();
            }
            _ => {}
        }

        if app.quit_requested {
            event_loop.exit();
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let stimulus = resolve_stimulus(&args)?;
    let settings = SettingsConfig::load();
    let source = media::load_media(&args.media_path)?;

    let options = LaunchOptions {
        media_path: args.media_path,
        stimulus,
        headset: args.headset,
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut shell = ViewerShell::new(options, settings, source);
    event_loop.run_app(&mut shell)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parses_path_and_flags() {
        let cli = parse_args(args(&["clip.mp4", "--stimulus", "sbs-video", "--headset"])).unwrap();
        assert_eq!(
            cli,
            CliArgs {
                media_path: PathBuf::from("clip.mp4"),
                stimulus: Some("sbs-video".into()),
                headset: true,
            }
        );
    }

    #[test]
    fn path_is_required() {
        assert!(parse_args(args(&["--headset"])).is_err());
        assert!(parse_args(args(&[])).is_err());
    }

    #[test]
    fn rejects_unknown_flag_and_dangling_stimulus() {
        assert!(parse_args(args(&["a.png", "--loops", "5"])).is_err());
        assert!(parse_args(args(&["a.png", "--stimulus"])).is_err());
        assert!(parse_args(args(&["a.png", "b.png"])).is_err());
    }

    #[test]
    fn stimulus_defaults_from_extension() {
        let cli = parse_args(args(&["stereo.jpg"])).unwrap();
        assert_eq!(resolve_stimulus(&cli).unwrap().name, "square-image");
        let cli = parse_args(args(&["stereo.webm"])).unwrap();
        assert_eq!(resolve_stimulus(&cli).unwrap().name, "sbs-video");
    }

    #[test]
    fn named_stimulus_overrides_extension() {
        let cli = parse_args(args(&["stereo.png", "--stimulus", "sbs-video"])).unwrap();
        assert_eq!(resolve_stimulus(&cli).unwrap().name, "sbs-video");
        let cli = parse_args(args(&["stereo.png", "--stimulus", "nope"])).unwrap();
        assert!(resolve_stimulus(&cli).is_err());
    }
}
