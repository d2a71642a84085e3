use std::time::Duration;

use crate::{
    error::positive_rate, Clock, DiagnosticsSink, FlipbookError, FrameAsset, PlaybackTrack,
    Result, Sprite, SystemClock, TickControl, TickReport, TrackFailure, TrackId,
};

/// A track together with the sprite it drives.
pub struct Registration {
    pub track: PlaybackTrack,
    pub sprite: Box<dyn Sprite>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("track", &self.track)
            .finish_non_exhaustive()
    }
}

struct Entry {
    id: TrackId,
    registration: Registration,
}

/// Outcome of a single pass over the registered tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSummary {
    pub tracks_advanced: usize,
    pub sprite_updates: usize,
    pub failures: Vec<TrackFailure>,
    /// Tracks removed at the end of the pass.
    pub finished: Vec<TrackId>,
}

/// Drives every registered track at a shared target rate.
///
/// Each outer iteration ([`Scheduler::run_once`]) advances all tracks in
/// registration order and then either sleeps, when the pass finished early,
/// or adds the frames lost to the catch-up counter, when it finished late.
/// Synced tracks advance by the average catch-up per iteration, so they jump
/// forward instead of playing in slow motion.
pub struct Scheduler<C: Clock = SystemClock> {
    target_rate: f64,
    turn: u64,
    catch_up: u64,
    entries: Vec<Entry>,
    next_id: u64,
    finished: Vec<(TrackId, Registration)>,
    keep_finished: bool,
    clock: C,
    diagnostics: Option<Box<dyn DiagnosticsSink>>,
}

impl Scheduler<SystemClock> {
    /// Creates a wall-clock scheduler ticking at `target_rate` per second.
    pub fn new(target_rate: f64) -> Result<Self> {
        Self::with_clock(target_rate, SystemClock::new())
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(target_rate: f64, clock: C) -> Result<Self> {
        Ok(Self {
            target_rate: positive_rate("scheduler target rate", target_rate)?,
            turn: 0,
            catch_up: 0,
            entries: Vec::new(),
            next_id: 0,
            finished: Vec::new(),
            keep_finished: false,
            clock,
            diagnostics: None,
        })
    }

    pub fn set_diagnostics(&mut self, sink: Box<dyn DiagnosticsSink>) {
        self.diagnostics = Some(sink);
    }

    pub fn clear_diagnostics(&mut self) {
        self.diagnostics = None;
    }

    /// Builds a track whose speed is derived from this scheduler's rate.
    pub fn track(&self, frames: Vec<FrameAsset>, target_fps: f64) -> Result<PlaybackTrack> {
        PlaybackTrack::new(frames, target_fps, self.target_rate)
    }

    pub fn target_rate(&self) -> f64 {
        self.target_rate
    }

    /// Completed outer iterations.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Logical ticks elapsed, including skip compensation.
    pub fn catch_up(&self) -> u64 {
        self.catch_up
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.position(id).is_some()
    }

    /// Registered track ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.entries.iter().map(|entry| entry.id)
    }

    pub fn get(&self, id: TrackId) -> Option<&PlaybackTrack> {
        self.position(id)
            .map(|index| &self.entries[index].registration.track)
    }

    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut PlaybackTrack> {
        self.position(id)
            .map(|index| &mut self.entries[index].registration.track)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Appends a track to the registry. Tracks are advanced in registration
    /// order, so when two tracks share a sprite the later one wins a tick.
    pub fn register<S>(&mut self, track: PlaybackTrack, sprite: S) -> TrackId
    where
        S: Sprite + 'static,
    {
        self.register_boxed(Registration {
            track,
            sprite: Box::new(sprite),
        })
    }

    /// Re-registers a previously removed track. Its cursor resumes where it
    /// stopped; its speed is recomputed for this scheduler's rate.
    pub fn register_boxed(&mut self, mut registration: Registration) -> TrackId {
        registration.track.retime(self.target_rate);
        let id = TrackId(self.next_id);
        self.next_id += 1;
        tracing::debug!(
            track = %id,
            frames = registration.track.len(),
            fps = registration.track.target_fps(),
            sync = ?registration.track.sync_mode(),
            "registered track"
        );
        self.entries.push(Entry { id, registration });
        id
    }

    /// Removes a track, handing it back. Fails with
    /// [`FlipbookError::NotRegistered`] if it is not registered.
    pub fn deregister(&mut self, id: TrackId) -> Result<Registration> {
        let index = self.position(id).ok_or(FlipbookError::NotRegistered(id))?;
        tracing::debug!(track = %id, "deregistered track");
        Ok(self.entries.remove(index).registration)
    }

    /// Keeps registrations removed from within a tick so they can be
    /// collected with [`take_finished`](Self::take_finished). Off by default:
    /// removed tracks are dropped and only their ids are reported.
    pub fn keep_finished(&mut self, keep: bool) {
        self.keep_finished = keep;
        if !keep {
            self.finished.clear();
        }
    }

    /// Registrations removed from within a tick (self-stopping or
    /// [`PlayMode::Once`](crate::PlayMode::Once) tracks), oldest first.
    /// Always empty unless [`keep_finished`](Self::keep_finished) is on.
    pub fn take_finished(&mut self) -> Vec<(TrackId, Registration)> {
        std::mem::take(&mut self.finished)
    }

    /// Local ticks a synced track advances during the next pass.
    fn synced_step(&self) -> u64 {
        if self.turn == 0 {
            return 1;
        }
        (self.catch_up as f64 / self.turn as f64).round() as u64
    }

    /// Advances every registered track once, in registration order.
    ///
    /// A failing sprite is reported and skipped; the remaining tracks are
    /// still advanced. Removals requested during the pass take effect once it
    /// completes.
    pub fn tick(&mut self) -> TickSummary {
        let synced_step = self.synced_step();
        let mut control = TickControl::default();
        let mut summary = TickSummary::default();

        for entry in &mut self.entries {
            let Registration { track, sprite } = &mut entry.registration;
            control.begin(entry.id);
            let step = track.step_for(synced_step);

            match track.advance(entry.id, step, &mut **sprite, &mut control) {
                Ok(Some(_)) => summary.sprite_updates += 1,
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(track = %entry.id, %err, "track update failed");
                    summary.failures.push(TrackFailure {
                        track: entry.id,
                        message: err.to_string(),
                    });
                }
            }
            summary.tracks_advanced += 1;
        }

        for id in control.take_stops() {
            match self.deregister(id) {
                Ok(registration) => {
                    summary.finished.push(id);
                    if self.keep_finished {
                        self.finished.push((id, registration));
                    }
                }
                Err(err) => tracing::debug!(%err, "ignoring stop request"),
            }
        }

        summary
    }

    /// One outer iteration: a [`tick`](Self::tick) followed by rate control.
    ///
    /// Counters saturate and out-of-range sleeps are skipped, so extreme
    /// rates degrade the pacing but never abort the loop.
    pub fn run_once(&mut self) -> TickReport {
        let start = self.clock.now();
        let summary = self.tick();
        let middle = self.clock.now();
        let elapsed = middle.saturating_sub(start).as_secs_f64();

        let mut execution_rate = None;
        let mut frames_skipped = 0;
        let mut slept = Duration::ZERO;

        if elapsed > 0.0 {
            let measured = (1.0 / elapsed).round();
            execution_rate = Some(measured);

            if self.target_rate > measured {
                let time_diff = elapsed - 1.0 / self.target_rate;
                // Rounding noise near the target can produce a negative skip.
                frames_skipped = (self.target_rate * time_diff).round().max(0.0) as u64;
                self.catch_up = self.catch_up.saturating_add(frames_skipped);
            } else if measured > self.target_rate {
                let pause = 1.0 / self.target_rate - elapsed;
                if pause > 0.0 {
                    match Duration::try_from_secs_f64(pause) {
                        Ok(pause) => {
                            slept = pause;
                            self.clock.sleep(slept);
                        }
                        Err(err) => tracing::debug!(pause, %err, "sleep out of range, skipping"),
                    }
                }
            }
        }

        let tick = self.turn;
        self.catch_up = self.catch_up.saturating_add(1);
        self.turn = self.turn.saturating_add(1);

        let total = self.clock.now().saturating_sub(start).as_secs_f64();
        let display_rate = (total > 0.0)
            .then(|| (1.0 / total).round() + (frames_skipped as f64 / total).round());

        let report = TickReport {
            tick,
            target_rate: self.target_rate,
            execution_rate,
            display_rate,
            frames_skipped,
            slept_seconds: slept.as_secs_f64(),
            tracks_advanced: summary.tracks_advanced,
            sprite_updates: summary.sprite_updates,
            failures: summary.failures,
            finished: summary.finished,
        };

        if let Some(sink) = self.diagnostics.as_mut() {
            sink.report(&report);
        }
        report
    }

    /// Runs `iterations` outer iterations back to back.
    pub fn run_for(&mut self, iterations: u64) -> Vec<TickReport> {
        (0..iterations).map(|_| self.run_once()).collect()
    }

    fn position(&self, id: TrackId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }
}

impl<C: Clock + std::fmt::Debug> std::fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("target_rate", &self.target_rate)
            .field("turn", &self.turn)
            .field("catch_up", &self.catch_up)
            .field("tracks", &self.entries.len())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
