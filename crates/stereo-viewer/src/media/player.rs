use crossbeam_channel::{Receiver, Sender};

use super::decoder::MediaSource;
use super::types::{AutoplayPolicy, DecodedFrame, MediaEvent};
use super::MediaTransport;
use crate::playback::clock::{frame_to_secs, secs_to_frame};

/// Plays a decoded `MediaSource` at its native frame rate.
///
/// Outcomes of `play()` and `set_current_time()` are not returned; they are
/// queued as `MediaEvent`s and show up on the receiver handed out by `new`,
/// the same way a platform media element reports them.
pub struct MediaPlayer {
    source: MediaSource,
    events: Sender<MediaEvent>,
    policy: AutoplayPolicy,
    user_gesture_seen: bool,
    can_play_sent: bool,
    playing: bool,
    ended: bool,
    current_frame: usize,
    frame_elapsed_secs: f64,
    pending_seek: Option<f64>,
    frame_dirty: bool,
}

impl MediaPlayer {
    pub fn new(source: MediaSource, policy: AutoplayPolicy) -> (Self, Receiver<MediaEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let player = Self {
            source,
            events: tx,
            policy,
            user_gesture_seen: false,
            can_play_sent: false,
            playing: false,
            ended: false,
            current_frame: 0,
            frame_elapsed_secs: 0.0,
            pending_seek: None,
            frame_dirty: true,
        };
        (player, rx)
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn current_frame_index(&self) -> usize {
        self.current_frame
    }

    pub fn current_frame(&self) -> Option<&DecodedFrame> {
        self.source.frame(self.current_frame)
    }

    /// Record that the user interacted with the viewer. Unlocks `play()` under
    /// `AutoplayPolicy::RequireGesture`.
    pub fn notify_user_gesture(&mut self) {
        self.user_gesture_seen = true;
    }

    /// True once per newly shown frame; the caller re-uploads the texture.
    pub fn take_frame_dirty(&mut self) -> bool {
        std::mem::take(&mut self.frame_dirty)
    }

    fn frame_rate(&self) -> Option<f64> {
        match &self.source {
            MediaSource::Video { frame_rate, .. } => Some(*frame_rate),
            MediaSource::Static(_) => None,
        }
    }

    fn emit(&self, event: MediaEvent) {
        // Receiver lives as long as the app; a closed queue just drops the event.
        let _ = self.events.send(event);
    }

    fn show_frame(&mut self, frame: usize) {
        if frame != self.current_frame {
            self.current_frame = frame;
            self.frame_dirty = true;
        }
        self.frame_elapsed_secs = 0.0;
    }

    /// Advance the media clock by `dt` seconds. Called once per render tick.
    pub fn advance(&mut self, dt: f64) {
        let Some(fps) = self.frame_rate() else {
            return;
        };

        if !self.can_play_sent {
            self.can_play_sent = true;
            self.emit(MediaEvent::CanPlay);
        }

        if let Some(target) = self.pending_seek.take() {
            let last = self.source.frame_count().saturating_sub(1);
            let frame = secs_to_frame(target, fps).min(last);
            self.show_frame(frame);
            self.ended = false;
            self.emit(MediaEvent::Seeked);
        }

        if !self.playing {
            return;
        }

        let frame_duration = 1.0 / fps;
        self.frame_elapsed_secs += dt;
        while self.frame_elapsed_secs >= frame_duration {
            self.frame_elapsed_secs -= frame_duration;
            let next = self.current_frame + 1;
            if next >= self.source.frame_count() {
                self.playing = false;
                self.ended = true;
                self.frame_elapsed_secs = 0.0;
                self.emit(MediaEvent::Ended);
                return;
            }
            self.current_frame = next;
            self.frame_dirty = true;
        }
    }
}

impl MediaTransport for MediaPlayer {
    fn play(&mut self) {
        if self.frame_rate().is_none() {
            self.emit(MediaEvent::PlayRejected("still image cannot play".into()));
            return;
        }
        if self.policy == AutoplayPolicy::RequireGesture && !self.user_gesture_seen {
            self.emit(MediaEvent::PlayRejected(
                "play() requires a user gesture".into(),
            ));
            return;
        }
        if self.playing {
            return;
        }
        if self.ended {
            self.ended = false;
            self.show_frame(0);
        }
        self.playing = true;
        self.emit(MediaEvent::Playing);
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn set_current_time(&mut self, secs: f64) {
        self.pending_seek = Some(secs);
    }

    fn current_time(&self) -> f64 {
        match self.frame_rate() {
            Some(fps) => frame_to_secs(self.current_frame as u32, fps),
            None => 0.0,
        }
    }
}
