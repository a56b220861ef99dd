//! Video stimuli through `ffprobe` / `ffmpeg` subprocesses.
//!
//! The whole clip is decoded to RGBA up front so that a seek to frame N is an
//! index lookup and every run shows the same frames at the same times.

use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use super::decoder::MediaError;
use super::types::DecodedFrame;

/// Longest clip accepted for pre-decoding, in seconds.
pub const MAX_PREDECODE_SECS: f64 = 60.0;

/// Both `ffprobe` and `ffmpeg` answer `-version`. Checked once per process.
pub fn ffmpeg_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        ["ffprobe", "ffmpeg"].iter().all(|tool| {
            Command::new(tool)
                .arg("-version")
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .is_ok_and(|s| s.success())
        })
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub duration_secs: f64,
}

impl VideoMeta {
    fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    fn estimated_frames(&self) -> usize {
        ((self.duration_secs * self.frame_rate).ceil() as usize).min(self.frame_limit())
    }

    /// Most frames a clip at this rate may decode to within `MAX_PREDECODE_SECS`.
    fn frame_limit(&self) -> usize {
        (MAX_PREDECODE_SECS * self.frame_rate).ceil() as usize
    }
}

pub fn probe_video(path: &Path) -> Result<VideoMeta, MediaError> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0", "-of", "json"])
        .args([
            "-show_entries",
            "stream=width,height,avg_frame_rate,r_frame_rate,duration:format=duration",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| MediaError::Probe(format!("could not run: {e}")))?;

    if !output.status.success() {
        return Err(MediaError::Probe(format!(
            "{} exited with {}",
            path.display(),
            output.status
        )));
    }

    let json: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| MediaError::Probe(format!("unreadable output: {e}")))?;
    parse_probe_output(&json)
}

fn parse_probe_output(json: &serde_json::Value) -> Result<VideoMeta, MediaError> {
    let stream = json["streams"]
        .get(0)
        .ok_or_else(|| MediaError::Probe("no video stream".into()))?;

    let dimension = |key: &str| {
        stream[key]
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|&v| v > 0)
            .ok_or_else(|| MediaError::Probe(format!("missing {key}")))
    };
    let width = dimension("width")?;
    let height = dimension("height")?;

    // Pause times are computed from the frame rate, so a guessed rate is not acceptable.
    let frame_rate = ["avg_frame_rate", "r_frame_rate"]
        .iter()
        .find_map(|key| stream[*key].as_str().and_then(parse_frame_rate))
        .ok_or_else(|| MediaError::Probe("no usable frame rate".into()))?;

    // Some containers only carry a stream-level duration. Zero means unknown;
    // the decode loop still enforces the frame cap.
    let seconds = |v: &serde_json::Value| v.as_str().and_then(|s| s.parse::<f64>().ok());
    let duration_secs = seconds(&json["format"]["duration"])
        .or_else(|| seconds(&stream["duration"]))
        .unwrap_or(0.0);

    Ok(VideoMeta {
        width,
        height,
        frame_rate,
        duration_secs,
    })
}

/// `"30000/1001"` or `"16"`. `None` for zero, negative or malformed rates.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => num.trim().parse::<f64>().ok()? / den.trim().parse::<f64>().ok()?,
        None => rate.trim().parse::<f64>().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Decode every frame of the first video stream as RGBA8, one frame per
/// source frame (no frame-rate conversion).
pub fn decode_all_frames(path: &Path, meta: &VideoMeta) -> Result<Vec<DecodedFrame>, MediaError> {
    let frame_bytes = meta.frame_bytes();
    let estimate = meta.estimated_frames();
    log::info!(
        "Decoding {}: {}x{} @ {}fps, ~{} frames (~{}MB)",
        path.display(),
        meta.width,
        meta.height,
        meta.frame_rate,
        estimate,
        estimate * frame_bytes / (1024 * 1024),
    );

    let mut child = Command::new("ffmpeg")
        .args(["-nostdin", "-loglevel", "error", "-i"])
        .arg(path)
        .args(["-map", "0:v:0", "-an", "-fps_mode", "passthrough"])
        .args(["-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| MediaError::Decode(format!("could not run: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| MediaError::Decode("stdout not captured".into()))?;
    let reader = BufReader::with_capacity(frame_bytes.max(1 << 16), stdout);

    let frames = match read_frames(reader, meta) {
        Ok(frames) => frames,
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }
    };

    let status = child
        .wait()
        .map_err(|e| MediaError::Decode(format!("wait failed: {e}")))?;
    if !status.success() {
        log::warn!("ffmpeg exited with {status} after {} frames", frames.len());
    }
    if frames.is_empty() {
        return Err(MediaError::NoFrames);
    }

    log::info!(
        "Decoded {} frames ({:.2}s of video)",
        frames.len(),
        frames.len() as f64 / meta.frame_rate
    );
    Ok(frames)
}

/// Split raw RGBA output into frames, stopping with `TooLong` as soon as the
/// stream runs past the pre-decode limit.
fn read_frames(mut reader: impl Read, meta: &VideoMeta) -> Result<Vec<DecodedFrame>, MediaError> {
    let frame_bytes = meta.frame_bytes();
    let limit = meta.frame_limit();
    let mut frames = Vec::with_capacity(meta.estimated_frames());
    loop {
        let mut data = vec![0u8; frame_bytes];
        match reader.read_exact(&mut data) {
            Ok(()) if frames.len() >= limit => {
                return Err(MediaError::TooLong {
                    secs: (frames.len() + 1) as f64 / meta.frame_rate,
                    limit: MAX_PREDECODE_SECS,
                });
            }
            Ok(()) => frames.push(DecodedFrame {
                data,
                width: meta.width,
                height: meta.height,
            }),
            // End of stream, or a truncated trailing frame.
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(frames),
            Err(e) => return Err(MediaError::Decode(format!("read failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rate_fraction() {
        assert_eq!(parse_frame_rate("16/1"), Some(16.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 1e-2);
    }

    #[test]
    fn frame_rate_rejects_unusable() {
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("10/0"), None);
        assert_eq!(parse_frame_rate("garbage"), None);
    }

    #[test]
    fn metadata_json_reads_first_stream() {
        let json = serde_json::json!({
            "streams": [
                { "width": 2560, "height": 1280, "avg_frame_rate": "16/1", "r_frame_rate": "32/1" }
            ],
            "format": { "duration": "4.000000" }
        });
        let meta = parse_probe_output(&json).unwrap();
        assert_eq!(
            meta,
            VideoMeta {
                width: 2560,
                height: 1280,
                frame_rate: 16.0,
                duration_secs: 4.0,
            }
        );
        assert_eq!(meta.estimated_frames(), 64);
    }

    #[test]
    fn metadata_falls_back_to_r_frame_rate() {
        let json = serde_json::json!({
            "streams": [ { "width": 4, "height": 2, "avg_frame_rate": "0/0", "r_frame_rate": "16/1" } ]
        });
        let meta = parse_probe_output(&json).unwrap();
        assert_eq!(meta.frame_rate, 16.0);
        assert_eq!(meta.duration_secs, 0.0);
    }

    #[test]
    fn metadata_without_stream_or_rate_fails() {
        let none = serde_json::json!({ "streams": [] });
        assert!(matches!(parse_probe_output(&none), Err(MediaError::Probe(_))));
        let no_rate = serde_json::json!({ "streams": [ { "width": 4, "height": 2 } ] });
        assert!(matches!(parse_probe_output(&no_rate), Err(MediaError::Probe(_))));
    }

    #[test]
    fn stream_duration_used_when_format_has_none() {
        let json = serde_json::json!({
            "streams": [
                { "width": 2560, "height": 1280, "avg_frame_rate": "16/1", "duration": "600.0" }
            ],
            "format": {}
        });
        let meta = parse_probe_output(&json).unwrap();
        assert_eq!(meta.duration_secs, 600.0);
        assert!(meta.duration_secs > MAX_PREDECODE_SECS);
    }

    #[test]
    fn format_duration_wins_over_stream_duration() {
        let json = serde_json::json!({
            "streams": [ { "width": 4, "height": 2, "avg_frame_rate": "16/1", "duration": "9.5" } ],
            "format": { "duration": "4.0" }
        });
        assert_eq!(parse_probe_output(&json).unwrap().duration_secs, 4.0);
    }

    fn tiny_meta(frame_rate: f64) -> VideoMeta {
        VideoMeta {
            width: 2,
            height: 1,
            frame_rate,
            duration_secs: 0.0,
        }
    }

    #[test]
    fn read_frames_splits_and_drops_partial_tail() {
        let meta = tiny_meta(16.0);
        let mut raw: Vec<u8> = (0..24).collect();
        raw.extend([0xff; 3]);
        let frames = read_frames(std::io::Cursor::new(raw), &meta).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].data, vec![8, 9, 10, 11, 12, 13, 14, 15]);
        assert_eq!((frames[2].width, frames[2].height), (2, 1));
    }

    #[test]
    fn read_frames_stops_at_limit_without_duration() {
        let meta = tiny_meta(1.0);
        assert_eq!(meta.frame_limit(), 60);

        let exact = vec![0u8; 60 * meta.frame_bytes()];
        assert_eq!(read_frames(std::io::Cursor::new(exact), &meta).unwrap().len(), 60);

        // An unbounded stream must not be read to the end.
        let endless = std::io::repeat(7);
        match read_frames(endless, &meta) {
            Err(MediaError::TooLong { secs, limit }) => {
                assert_eq!(limit, MAX_PREDECODE_SECS);
                assert_eq!(secs, 61.0);
            }
            other => panic!("expected TooLong, got {:?}", other.map(|f| f.len())),
        }
    }
}
