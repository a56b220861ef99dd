/// Presentation time of a frame index at a fixed frame rate, in seconds.
pub fn frame_to_secs(frame: u32, frame_rate: f64) -> f64 {
    frame as f64 / frame_rate
}

/// Frame index shown at a media time. Rounds to the nearest frame so a time
/// produced by `frame_to_secs` maps back to the same frame.
pub fn secs_to_frame(secs: f64, frame_rate: f64) -> usize {
    if secs <= 0.0 || frame_rate <= 0.0 {
        return 0;
    }
    (secs * frame_rate).round() as usize
}
