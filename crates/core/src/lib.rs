//! Core library for the Flipbook animation player.
//!
//! A [`Scheduler`] ticks at a fixed target rate and advances every registered
//! [`PlaybackTrack`], pushing the current [`FrameAsset`] of each track into
//! its [`Sprite`]. When a pass over the tracks runs late the scheduler records
//! how many frames were lost so synced tracks can skip ahead; when it runs
//! early the scheduler sleeps off the remainder of the tick.
//!
//! Decoding frames and drawing sprites are left to the caller, through
//! [`AssetSource`] and [`Sprite`] implementations.

pub mod assets;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod scheduler;
pub mod sprite;
pub mod track;

pub use assets::{AssetSource, DirectorySource, FrameAsset, FrameSize};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, SchedulerConfig, TrackConfig};
pub use diagnostics::{
    ConsoleOverlay, DiagnosticsSink, RateBand, TickReport, TracingDiagnostics, TrackFailure,
};
pub use error::{FlipbookError, Result};
pub use scheduler::{Registration, Scheduler, TickSummary};
pub use sprite::{Sprite, SpriteSlot};
pub use track::{FrameEvent, PlayMode, PlaybackTrack, SyncMode, TickControl, TrackId};
