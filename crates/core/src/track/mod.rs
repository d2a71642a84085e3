use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{error::positive_rate, FrameAsset, Result, Sprite};

/// Slack applied before flooring a frame position, so that products such as
/// `0.1 * 30` land on frame 3 rather than 2.
const FRAME_EPSILON: f64 = 1e-9;

/// Stable identity of a registered track. Never reused by a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub(crate) u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a track's local tick counter follows the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Advance by the scheduler's average catch-up per tick, so skipped
    /// scheduler frames are skipped here too.
    #[default]
    Synced,
    /// Advance exactly one local tick per scheduler tick.
    Unsynced,
}

/// What happens when a track runs past its last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Wrap back to the first frame.
    #[default]
    Loop,
    /// Show the final frame of the sequence, hold it and deregister the
    /// track.
    Once,
}

/// Passed to the frame hook after a track displayed a new frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEvent {
    pub track: TrackId,
    pub index: usize,
    pub len: usize,
    /// True when this frame came from wrapping past the end of the sequence.
    pub wrapped: bool,
}

/// Deferred registry changes requested while a tick is in progress.
#[derive(Debug, Default)]
pub struct TickControl {
    current: Option<TrackId>,
    stops: Vec<TrackId>,
}

impl TickControl {
    pub(crate) fn begin(&mut self, track: TrackId) {
        self.current = Some(track);
    }

    /// Track currently being advanced.
    pub fn track(&self) -> Option<TrackId> {
        self.current
    }

    /// Deregisters the track being advanced once the tick completes.
    pub fn stop(&mut self) {
        if let Some(track) = self.current {
            self.stop_track(track);
        }
    }

    /// Deregisters `track` once the tick completes. Tracks later in the
    /// registry still get advanced during the current tick.
    pub fn stop_track(&mut self, track: TrackId) {
        if !self.stops.contains(&track) {
            self.stops.push(track);
        }
    }

    pub(crate) fn take_stops(&mut self) -> Vec<TrackId> {
        self.current = None;
        std::mem::take(&mut self.stops)
    }
}

type FrameHook = Box<dyn FnMut(FrameEvent, &mut TickControl)>;

/// A flipbook: an ordered frame sequence plus its playback cursor.
pub struct PlaybackTrack {
    frames: Vec<FrameAsset>,
    target_fps: f64,
    speed: f64,
    sync: SyncMode,
    mode: PlayMode,
    frame_position: f64,
    local_ticks: u64,
    last_shown: Option<usize>,
    primed: bool,
    loops: u64,
    on_frame: Option<FrameHook>,
}

impl PlaybackTrack {
    /// Creates a track playing `frames` at `target_fps` on a scheduler that
    /// ticks at `scheduler_rate`. Public construction goes through
    /// [`Scheduler::track`](crate::Scheduler::track).
    pub(crate) fn new(
        frames: Vec<FrameAsset>,
        target_fps: f64,
        scheduler_rate: f64,
    ) -> Result<Self> {
        let target_fps = positive_rate("track fps", target_fps)?;
        let scheduler_rate = positive_rate("scheduler target rate", scheduler_rate)?;

        Ok(Self {
            frames,
            target_fps,
            speed: target_fps / scheduler_rate,
            sync: SyncMode::default(),
            mode: PlayMode::default(),
            frame_position: 0.0,
            local_ticks: 0,
            last_shown: None,
            primed: false,
            loops: 0,
            on_frame: None,
        })
    }

    /// Recomputes the speed for a scheduler ticking at `scheduler_rate`.
    /// The rate has already been validated by that scheduler.
    pub(crate) fn retime(&mut self, scheduler_rate: f64) {
        let speed = self.target_fps / scheduler_rate;
        if speed != self.speed {
            tracing::debug!(from = self.speed, to = speed, "retimed track for scheduler rate");
            self.speed = speed;
        }
    }

    pub fn with_sync(mut self, sync: SyncMode) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_mode(mut self, mode: PlayMode) -> Self {
        self.mode = mode;
        self
    }

    /// Installs a hook that runs every time the track shows a new frame.
    pub fn on_frame<F>(mut self, hook: F) -> Self
    where
        F: FnMut(FrameEvent, &mut TickControl) + 'static,
    {
        self.on_frame = Some(Box::new(hook));
        self
    }

    pub fn frames(&self) -> &[FrameAsset] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn target_fps(&self) -> f64 {
        self.target_fps
    }

    /// Frames advanced per local tick.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.sync
    }

    pub fn play_mode(&self) -> PlayMode {
        self.mode
    }

    pub fn frame_position(&self) -> f64 {
        self.frame_position
    }

    pub fn local_ticks(&self) -> u64 {
        self.local_ticks
    }

    pub fn last_shown(&self) -> Option<usize> {
        self.last_shown
    }

    /// Number of times the sequence wrapped back to its first frame.
    pub fn loops(&self) -> u64 {
        self.loops
    }

    /// Resets the cursor so the next tick shows the first frame again.
    pub fn rewind(&mut self) {
        self.frame_position = 0.0;
        self.local_ticks = 0;
        self.last_shown = None;
        self.primed = false;
    }

    /// Number of local ticks the counter advances for one scheduler tick.
    pub(crate) fn step_for(&self, synced_step: u64) -> u64 {
        match self.sync {
            SyncMode::Synced => synced_step,
            SyncMode::Unsynced => 1,
        }
    }

    /// Moves the cursor `step` local ticks forward and pushes the resulting
    /// frame into `sprite` if it differs from the one already shown.
    ///
    /// Returns the index pushed to the sprite, if any. Empty tracks never touch
    /// the sprite.
    pub(crate) fn advance(
        &mut self,
        id: TrackId,
        step: u64,
        sprite: &mut dyn Sprite,
        control: &mut TickControl,
    ) -> Result<Option<usize>> {
        if self.frames.is_empty() {
            return Ok(None);
        }

        if self.primed {
            self.local_ticks = self.local_ticks.saturating_add(step);
        } else {
            self.primed = true;
        }

        self.frame_position = self.speed * self.local_ticks as f64;
        let mut index = (self.frame_position + FRAME_EPSILON).floor() as usize;
        let mut wrapped = false;

        if index >= self.frames.len() {
            match self.mode {
                PlayMode::Once => {
                    control.stop();
                    index = self.frames.len() - 1;
                }
                PlayMode::Loop => {
                    self.local_ticks = 0;
                    self.frame_position = 0.0;
                    self.loops += 1;
                    index = 0;
                    wrapped = true;
                }
            }
        }

        if self.last_shown == Some(index) {
            return Ok(None);
        }
        self.last_shown = Some(index);

        sprite.set_asset(&self.frames[index])?;

        if let Some(hook) = self.on_frame.as_mut() {
            let event = FrameEvent {
                track: id,
                index,
                len: self.frames.len(),
                wrapped,
            };
            hook(event, control);
        }

        Ok(Some(index))
    }
}

impl fmt::Debug for PlaybackTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackTrack")
            .field("frames", &self.frames.len())
            .field("target_fps", &self.target_fps)
            .field("speed", &self.speed)
            .field("sync", &self.sync)
            .field("mode", &self.mode)
            .field("local_ticks", &self.local_ticks)
            .field("last_shown", &self.last_shown)
            .finish_non_exhaustive()
    }
}
