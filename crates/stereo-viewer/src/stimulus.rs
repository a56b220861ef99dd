use thiserror::Error;

use crate::playback::clock::frame_to_secs;

/// Kind of content a stimulus shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Side-by-side video, played a fixed number of times then frozen on a frame.
    Video,
    /// Side-by-side still image.
    Image,
}

/// Which eye layers the desktop (non-headset) camera shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewEyes {
    LeftEye,
    BothEyes,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("stimulus '{name}': target aspect must be positive, got {value}")]
    Aspect { name: &'static str, value: f32 },
    #[error("stimulus '{name}': frame rate must be positive, got {value}")]
    FrameRate { name: &'static str, value: f64 },
    #[error("stimulus '{name}': eye distance must be positive, got {value}")]
    EyeDistance { name: &'static str, value: f32 },
    #[error("stimulus '{name}': max loops must be at least 1")]
    MaxLoops { name: &'static str },
}

/// Fixed constants for one stimulus variant. There is no runtime override;
/// each variant a study uses is one of the presets below.
#[derive(Debug, Clone, PartialEq)]
pub struct StimulusConfig {
    pub name: &'static str,
    pub content: ContentKind,
    /// Width / height of the rendered output and the camera projection.
    pub target_aspect: f32,
    /// Number of natural end-of-stream events before the terminal pause.
    pub max_loops: u32,
    /// Frame the video freezes on once all loops have played.
    pub pause_frame: u32,
    pub frame_rate: f64,
    /// Distance from the viewer to the eye surfaces, in scene units.
    pub eye_distance: f32,
    pub preview: PreviewEyes,
}

pub const SIDE_BY_SIDE_VIDEO: StimulusConfig = StimulusConfig {
    name: "sbs-video",
    content: ContentKind::Video,
    target_aspect: 2.0,
    max_loops: 3,
    pause_frame: 48,
    frame_rate: 16.0,
    eye_distance: 3.0,
    preview: PreviewEyes::LeftEye,
};

pub const SQUARE_IMAGE: StimulusConfig = StimulusConfig {
    name: "square-image",
    content: ContentKind::Image,
    target_aspect: 1.0,
    max_loops: 1,
    pause_frame: 0,
    frame_rate: 16.0,
    eye_distance: 3.0,
    preview: PreviewEyes::BothEyes,
};

pub const PRESETS: &[&StimulusConfig] = &[&SIDE_BY_SIDE_VIDEO, &SQUARE_IMAGE];

impl StimulusConfig {
    pub fn by_name(name: &str) -> Option<&'static StimulusConfig> {
        PRESETS.iter().copied().find(|p| p.name == name)
    }

    /// Default preset for a media kind when none is named on the command line.
    pub fn for_content(content: ContentKind) -> &'static StimulusConfig {
        match content {
            ContentKind::Video => &SIDE_BY_SIDE_VIDEO,
            ContentKind::Image => &SQUARE_IMAGE,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_aspect <= 0.0 || !self.target_aspect.is_finite() {
            return Err(ConfigError::Aspect {
                name: self.name,
                value: self.target_aspect,
            });
        }
        if self.frame_rate <= 0.0 || !self.frame_rate.is_finite() {
            return Err(ConfigError::FrameRate {
                name: self.name,
                value: self.frame_rate,
            });
        }
        if self.eye_distance <= 0.0 || !self.eye_distance.is_finite() {
            return Err(ConfigError::EyeDistance {
                name: self.name,
                value: self.eye_distance,
            });
        }
        if self.max_loops == 0 {
            return Err(ConfigError::MaxLoops { name: self.name });
        }
        Ok(())
    }

    /// Media time of the terminal pause frame, in seconds.
    pub fn pause_time(&self) -> f64 {
        frame_to_secs(self.pause_frame, self.frame_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for preset in PRESETS {
            assert!(preset.validate().is_ok(), "{} invalid", preset.name);
        }
    }

    #[test]
    fn video_preset_constants() {
        let v = &SIDE_BY_SIDE_VIDEO;
        assert_eq!(v.target_aspect, 2.0);
        assert_eq!(v.max_loops, 3);
        assert_eq!(v.pause_frame, 48);
        assert_eq!(v.frame_rate, 16.0);
        assert_eq!(v.eye_distance, 3.0);
        assert_eq!(v.pause_time(), 3.0);
    }

    #[test]
    fn image_preset_is_square() {
        assert_eq!(SQUARE_IMAGE.target_aspect, 1.0);
        assert_eq!(SQUARE_IMAGE.preview, PreviewEyes::BothEyes);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(StimulusConfig::by_name("sbs-video"), Some(&SIDE_BY_SIDE_VIDEO));
        assert_eq!(StimulusConfig::by_name("square-image"), Some(&SQUARE_IMAGE));
        assert!(StimulusConfig::by_name("nope").is_none());
    }

    #[test]
    fn default_for_content() {
        assert_eq!(StimulusConfig::for_content(ContentKind::Video).name, "sbs-video");
        assert_eq!(StimulusConfig::for_content(ContentKind::Image).name, "square-image");
    }

    #[test]
    fn zero_loops_rejected() {
        let cfg = StimulusConfig {
            max_loops: 0,
            ..SIDE_BY_SIDE_VIDEO
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::MaxLoops { name: "sbs-video" })
        );
    }

    #[test]
    fn bad_aspect_rejected() {
        let cfg = StimulusConfig {
            target_aspect: 0.0,
            ..SQUARE_IMAGE
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Aspect { .. })));
        let cfg = StimulusConfig {
            target_aspect: f32::NAN,
            ..SQUARE_IMAGE
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Aspect { .. })));
    }

    #[test]
    fn bad_frame_rate_rejected() {
        let cfg = StimulusConfig {
            frame_rate: -1.0,
            ..SIDE_BY_SIDE_VIDEO
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("frame rate"));
    }
}
