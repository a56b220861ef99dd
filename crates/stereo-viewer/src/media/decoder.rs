use std::path::Path;

use thiserror::Error;

use super::types::DecodedFrame;
use crate::stimulus::ContentKind;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to open image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("unsupported media extension '{0}'")]
    UnsupportedExtension(String),
    #[error("video support not compiled in (enable the `video` feature)")]
    VideoDisabled,
    #[error("ffmpeg/ffprobe not found on PATH")]
    FfmpegMissing,
    #[error("ffprobe: {0}")]
    Probe(String),
    #[error("ffmpeg: {0}")]
    Decode(String),
    #[error("video is {secs:.1}s long, limit is {limit:.0}s")]
    TooLong { secs: f64, limit: f64 },
    #[error("video decoded zero frames")]
    NoFrames,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "mkv", "avi"];

/// Decoded stimulus content: one still frame, or every frame of a video.
pub enum MediaSource {
    Static(DecodedFrame),
    Video {
        frames: Vec<DecodedFrame>,
        frame_rate: f64,
    },
}

impl MediaSource {
    pub fn frame_count(&self) -> usize {
        match self {
            MediaSource::Static(_) => 1,
            MediaSource::Video { frames, .. } => frames.len(),
        }
    }

    pub fn content_kind(&self) -> ContentKind {
        match self {
            MediaSource::Static(_) => ContentKind::Image,
            MediaSource::Video { .. } => ContentKind::Video,
        }
    }

    /// Natural size of the source; defines its aspect ratio.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            MediaSource::Static(f) => (f.width, f.height),
            MediaSource::Video { frames, .. } => {
                frames.first().map_or((1, 1), |f| (f.width, f.height))
            }
        }
    }

    /// Frame at `index`, clamped to the last frame. `None` only for a video
    /// with no frames.
    pub fn frame(&self, index: usize) -> Option<&DecodedFrame> {
        match self {
            MediaSource::Static(f) => Some(f),
            MediaSource::Video { frames, .. } => frames.get(index).or_else(|| frames.last()),
        }
    }
}

/// Classify a path by extension without decoding it.
pub fn content_kind_for(path: &Path) -> Result<ContentKind, MediaError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ContentKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ContentKind::Video)
    } else {
        Err(MediaError::UnsupportedExtension(ext))
    }
}

/// Load a stereo image or video from a file path.
pub fn load_media(path: &Path) -> Result<MediaSource, MediaError> {
    match content_kind_for(path)? {
        ContentKind::Image => load_static_image(path),
        ContentKind::Video => load_video(path),
    }
}

fn load_static_image(path: &Path) -> Result<MediaSource, MediaError> {
    let img = image::open(path).map_err(|source| MediaError::Image {
        path: path.display().to_string(),
        source,
    })?;
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();

    log::info!("Loaded image {}: {}x{}", path.display(), w, h);

    Ok(MediaSource::Static(DecodedFrame {
        data: rgba.into_raw(),
        width: w,
        height: h,
    }))
}

#[cfg(feature = "video")]
fn load_video(path: &Path) -> Result<MediaSource, MediaError> {
    use super::video;

    if !video::ffmpeg_available() {
        return Err(MediaError::FfmpegMissing);
    }
    let meta = video::probe_video(path)?;
    if meta.duration_secs > video::MAX_PREDECODE_SECS {
        return Err(MediaError::TooLong {
            secs: meta.duration_secs,
            limit: video::MAX_PREDECODE_SECS,
        });
    }
    let frames = video::decode_all_frames(path, &meta)?;
    Ok(MediaSource::Video {
        frames,
        frame_rate: meta.frame_rate,
    })
}

#[cfg(not(feature = "video"))]
fn load_video(_path: &Path) -> Result<MediaSource, MediaError> {
    Err(MediaError::VideoDisabled)
}
