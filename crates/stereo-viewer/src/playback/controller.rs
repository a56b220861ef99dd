use super::clock::frame_to_secs;
use crate::media::{MediaEvent, MediaTransport};
use crate::stimulus::StimulusConfig;

/// Where the controller is in the play / loop / freeze sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackPhase {
    /// Nothing requested yet, or the last play request was rejected.
    Idle,
    /// Play requested and not rejected. Also covers the restart after each loop.
    Playing,
    /// All loops done; waiting for the seek to the pause frame to complete.
    Seeking { target_secs: f64 },
    /// Paused on the pause frame. Terminal.
    Locked,
}

/// Loop counter and terminal-pause constants for one video stimulus.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub loops_completed: u32,
    pub max_loops: u32,
    pub pause_frame: u32,
    pub frame_rate: f64,
    pub locked: bool,
}

/// Drives a video through `max_loops` natural plays, then seeks to
/// `pause_frame` and pauses there for good.
///
/// All input arrives through the `on_*` methods (or `handle` for queued media
/// events). Once locked, no event changes the state or reaches the media.
pub struct PlaybackController {
    state: PlaybackState,
    phase: PlaybackPhase,
    ready_seen: bool,
}

impl PlaybackController {
    pub fn new(config: &StimulusConfig) -> Self {
        Self {
            state: PlaybackState {
                loops_completed: 0,
                max_loops: config.max_loops,
                pause_frame: config.pause_frame,
                frame_rate: config.frame_rate,
                locked: false,
            },
            phase: PlaybackPhase::Idle,
            ready_seen: false,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn is_locked(&self) -> bool {
        self.state.locked
    }

    /// Dispatch one queued media notification.
    pub fn handle(&mut self, event: &MediaEvent, media: &mut impl MediaTransport) {
        match event {
            MediaEvent::CanPlay => self.on_ready_to_play(media),
            MediaEvent::Playing => self.on_playing(),
            MediaEvent::PlayRejected(reason) => self.on_play_rejected(reason),
            MediaEvent::Ended => self.on_playback_ended(media),
            MediaEvent::Seeked => self.on_seek_completed(media),
        }
    }

    /// Click / key press from the viewer. Starts playback if nothing has
    /// started yet; ignored while playing, seeking or locked.
    pub fn on_user_activation(&mut self, media: &mut impl MediaTransport) {
        if self.state.locked {
            log::debug!("User activation ignored: playback locked");
            return;
        }
        if self.phase != PlaybackPhase::Idle {
            return;
        }
        log::info!("User activation: requesting playback");
        self.request_play(media);
    }

    /// First can-play notification for this load. Requests playback even if a
    /// user activation already did, so either signal satisfies autoplay rules.
    pub fn on_ready_to_play(&mut self, media: &mut impl MediaTransport) {
        if self.ready_seen {
            log::debug!("Duplicate can-play ignored");
            return;
        }
        self.ready_seen = true;
        match self.phase {
            PlaybackPhase::Idle | PlaybackPhase::Playing => {
                log::info!("Media ready to play");
                self.request_play(media);
            }
            PlaybackPhase::Seeking { .. } | PlaybackPhase::Locked => {
                log::debug!("Can-play ignored during terminal sequence");
            }
        }
    }

    fn on_playing(&mut self) {
        log::info!(
            "Playback started (loop {} of {})",
            self.state.loops_completed + 1,
            self.state.max_loops
        );
    }

    /// The platform declined a play request. Counters are untouched and
    /// nothing is retried; the next activation or can-play may succeed.
    pub fn on_play_rejected(&mut self, reason: &str) {
        log::warn!("Play request rejected: {reason}");
        if self.phase == PlaybackPhase::Playing {
            self.phase = PlaybackPhase::Idle;
        }
    }

    /// Natural end of stream. Restarts until `max_loops` plays have finished,
    /// then runs the terminal sequence.
    pub fn on_playback_ended(&mut self, media: &mut impl MediaTransport) {
        if self.state.locked || matches!(self.phase, PlaybackPhase::Seeking { .. }) {
            log::debug!("Ended ignored: playback already stopped");
            return;
        }

        self.state.loops_completed = (self.state.loops_completed + 1).min(self.state.max_loops);
        log::info!(
            "Video ended. Play count: {}/{}",
            self.state.loops_completed,
            self.state.max_loops
        );

        if self.state.loops_completed < self.state.max_loops {
            self.request_play(media);
        } else {
            self.pause_at_frame(self.state.pause_frame, media);
        }
    }

    /// Terminal sequence: seek to `frame`, pause once the seek is confirmed.
    /// A no-op once the sequence has begun.
    pub fn pause_at_frame(&mut self, frame: u32, media: &mut impl MediaTransport) {
        if self.state.locked || matches!(self.phase, PlaybackPhase::Seeking { .. }) {
            return;
        }
        let target_secs = frame_to_secs(frame, self.state.frame_rate);
        media.set_current_time(target_secs);
        self.phase = PlaybackPhase::Seeking { target_secs };
        log::info!("Seeking to {target_secs}s (frame {frame})");
    }

    pub fn on_seek_completed(&mut self, media: &mut impl MediaTransport) {
        let PlaybackPhase::Seeking { target_secs } = self.phase else {
            log::debug!("Seek completion ignored outside terminal sequence");
            return;
        };
        media.pause();
        self.state.locked = true;
        self.phase = PlaybackPhase::Locked;
        log::info!(
            "Paused at frame {} (time: {}s, requested {}s)",
            self.state.pause_frame,
            media.current_time(),
            target_secs
        );
    }

    fn request_play(&mut self, media: &mut impl MediaTransport) {
        media.play();
        self.phase = PlaybackPhase::Playing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::SIDE_BY_SIDE_VIDEO;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Play,
        Pause,
        Seek(f64),
    }

    #[derive(Default)]
    struct RecordingMedia {
        calls: Vec<Call>,
        time: f64,
    }

    impl MediaTransport for RecordingMedia {
        fn play(&mut self) {
            self.calls.push(Call::Play);
        }
        fn pause(&mut self) {
            self.calls.push(Call::Pause);
        }
        fn set_current_time(&mut self, secs: f64) {
            self.time = secs;
            self.calls.push(Call::Seek(secs));
        }
        fn current_time(&self) -> f64 {
            self.time
        }
    }

    fn started() -> (PlaybackController, RecordingMedia) {
        let mut c = PlaybackController::new(&SIDE_BY_SIDE_VIDEO);
        let mut m = RecordingMedia::default();
        c.on_ready_to_play(&mut m);
        (c, m)
    }

    #[test]
    fn new_controller_is_idle() {
        let c = PlaybackController::new(&SIDE_BY_SIDE_VIDEO);
        assert_eq!(c.phase(), PlaybackPhase::Idle);
        assert_eq!(c.state().loops_completed, 0);
        assert!(!c.is_locked());
    }

    #[test]
    fn ready_requests_play_once() {
        let (mut c, mut m) = started();
        c.on_ready_to_play(&mut m);
        assert_eq!(m.calls, vec![Call::Play]);
        assert_eq!(c.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn ready_after_activation_still_requests_play() {
        let mut c = PlaybackController::new(&SIDE_BY_SIDE_VIDEO);
        let mut m = RecordingMedia::default();
        c.on_user_activation(&mut m);
        c.on_ready_to_play(&mut m);
        assert_eq!(m.calls, vec![Call::Play, Call::Play]);
    }

    #[test]
    fn activation_while_playing_is_ignored() {
        let (mut c, mut m) = started();
        c.on_user_activation(&mut m);
        c.on_user_activation(&mut m);
        assert_eq!(m.calls, vec![Call::Play]);
    }

    #[test]
    fn three_loops_then_seek_pause_lock() {
        let (mut c, mut m) = started();
        c.on_playback_ended(&mut m);
        c.on_playback_ended(&mut m);
        assert_eq!(c.state().loops_completed, 2);
        assert_eq!(m.calls, vec![Call::Play, Call::Play, Call::Play]);

        c.on_playback_ended(&mut m);
        assert_eq!(c.state().loops_completed, 3);
        assert_eq!(c.phase(), PlaybackPhase::Seeking { target_secs: 3.0 });
        assert!(!c.is_locked());
        assert_eq!(m.calls.last(), Some(&Call::Seek(3.0)));

        c.on_seek_completed(&mut m);
        assert!(c.is_locked());
        assert_eq!(c.phase(), PlaybackPhase::Locked);
        assert_eq!(
            m.calls,
            vec![Call::Play, Call::Play, Call::Play, Call::Seek(3.0), Call::Pause]
        );
    }

    #[test]
    fn ended_after_lock_is_ignored() {
        let (mut c, mut m) = started();
        for _ in 0..3 {
            c.on_playback_ended(&mut m);
        }
        c.on_seek_completed(&mut m);
        let before = m.calls.clone();

        c.on_playback_ended(&mut m);
        assert_eq!(m.calls, before);
        assert_eq!(c.state().loops_completed, 3);
        assert!(c.is_locked());
    }

    #[test]
    fn ended_while_seeking_does_not_restart_or_reseek() {
        let (mut c, mut m) = started();
        for _ in 0..4 {
            c.on_playback_ended(&mut m);
        }
        let seeks = m.calls.iter().filter(|c| matches!(c, Call::Seek(_))).count();
        assert_eq!(seeks, 1);
        assert_eq!(m.calls.last(), Some(&Call::Seek(3.0)));
        assert_eq!(c.state().loops_completed, 3);
    }

    #[test]
    fn activation_after_lock_never_plays() {
        let (mut c, mut m) = started();
        for _ in 0..3 {
            c.on_playback_ended(&mut m);
        }
        c.on_seek_completed(&mut m);
        let plays_before = m.calls.iter().filter(|c| **c == Call::Play).count();

        c.on_user_activation(&mut m);
        c.on_ready_to_play(&mut m);

        let plays_after = m.calls.iter().filter(|c| **c == Call::Play).count();
        assert_eq!(plays_before, plays_after);
    }

    #[test]
    fn loops_monotonic_and_capped() {
        let (mut c, mut m) = started();
        let mut prev = 0;
        let mut lock_transitions = 0;
        let mut was_locked = false;
        for _ in 0..10 {
            c.on_playback_ended(&mut m);
            c.on_seek_completed(&mut m);
            let loops = c.state().loops_completed;
            assert!(loops >= prev);
            assert!(loops <= c.state().max_loops);
            prev = loops;
            if c.is_locked() && !was_locked {
                lock_transitions += 1;
            }
            was_locked = c.is_locked();
        }
        assert_eq!(prev, 3);
        assert_eq!(lock_transitions, 1);
    }

    #[test]
    fn rejected_play_returns_to_idle_and_keeps_counters() {
        let (mut c, mut m) = started();
        c.on_play_rejected("NotAllowedError");
        assert_eq!(c.phase(), PlaybackPhase::Idle);
        assert_eq!(c.state().loops_completed, 0);
        assert!(!c.is_locked());
        assert_eq!(m.calls, vec![Call::Play]);

        c.on_user_activation(&mut m);
        assert_eq!(m.calls, vec![Call::Play, Call::Play]);
    }

    #[test]
    fn stray_seek_completion_is_ignored() {
        let (mut c, mut m) = started();
        c.on_seek_completed(&mut m);
        assert!(!c.is_locked());
        assert_eq!(m.calls, vec![Call::Play]);
    }

    #[test]
    fn seek_never_confirmed_leaves_stream_unlocked() {
        let (mut c, mut m) = started();
        for _ in 0..3 {
            c.on_playback_ended(&mut m);
        }
        assert!(!c.is_locked());
        assert!(!m.calls.contains(&Call::Pause));
    }

    #[test]
    fn handle_dispatches_events() {
        let mut c = PlaybackController::new(&SIDE_BY_SIDE_VIDEO);
        let mut m = RecordingMedia::default();
        c.handle(&MediaEvent::CanPlay, &mut m);
        c.handle(&MediaEvent::Playing, &mut m);
        for _ in 0..3 {
            c.handle(&MediaEvent::Ended, &mut m);
        }
        c.handle(&MediaEvent::Seeked, &mut m);
        assert!(c.is_locked());
        assert_eq!(m.time, 3.0);
    }

    #[test]
    fn single_loop_config_freezes_after_first_end() {
        let cfg = StimulusConfig {
            max_loops: 1,
            pause_frame: 8,
            ..SIDE_BY_SIDE_VIDEO
        };
        let mut c = PlaybackController::new(&cfg);
        let mut m = RecordingMedia::default();
        c.on_user_activation(&mut m);
        c.on_playback_ended(&mut m);
        assert_eq!(m.calls, vec![Call::Play, Call::Seek(0.5)]);
    }

    #[test]
    fn real_player_loops_three_times_then_freezes_on_pause_frame() {
        use crate::media::{AutoplayPolicy, DecodedFrame, MediaPlayer, MediaSource};

        let frames = (0..64)
            .map(|i| DecodedFrame {
                data: vec![i as u8; 4],
                width: 1,
                height: 1,
            })
            .collect();
        let source = MediaSource::Video {
            frames,
            frame_rate: 16.0,
        };
        let (mut player, events) = MediaPlayer::new(source, AutoplayPolicy::Allowed);
        let mut c = PlaybackController::new(&SIDE_BY_SIDE_VIDEO);

        let (mut ends, mut plays) = (0, 0);
        let mut tick = |c: &mut PlaybackController, player: &mut MediaPlayer| {
            player.advance(1.0 / 60.0);
            for event in events.try_iter() {
                match event {
                    MediaEvent::Ended => ends += 1,
                    MediaEvent::Playing => plays += 1,
                    _ => {}
                }
                c.handle(&event, player);
            }
        };

        // 64 frames at 16 fps is 4 s per loop; 5000 ticks is ~83 s.
        for _ in 0..5000 {
            tick(&mut c, &mut player);
        }
        // A late click must not restart a locked stimulus.
        c.on_user_activation(&mut player);
        for _ in 0..120 {
            tick(&mut c, &mut player);
        }

        assert_eq!(ends, 3);
        assert_eq!(plays, 3);
        assert!(c.is_locked());
        assert_eq!(c.state().loops_completed, 3);
        assert_eq!(player.current_frame_index(), 48);
        assert!(!player.is_playing());
    }
}
