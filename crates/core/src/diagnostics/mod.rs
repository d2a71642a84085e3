use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::TrackId;

/// A track whose update failed during a tick. The tick carried on regardless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFailure {
    pub track: TrackId,
    pub message: String,
}

/// Measurements of one outer scheduler iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Index of the iteration, starting at 0.
    pub tick: u64,
    pub target_rate: f64,
    /// `round(1 / elapsed)` of the track pass. `None` when nothing measurable
    /// elapsed.
    pub execution_rate: Option<f64>,
    /// Effective display rate including skipped frames.
    pub display_rate: Option<f64>,
    pub frames_skipped: u64,
    pub slept_seconds: f64,
    pub tracks_advanced: usize,
    pub sprite_updates: usize,
    pub failures: Vec<TrackFailure>,
    /// Tracks that removed themselves during this iteration.
    pub finished: Vec<TrackId>,
}

/// Consumer of per-tick reports. Must not influence scheduling.
pub trait DiagnosticsSink {
    fn report(&mut self, report: &TickReport);
}

/// How close the measured execution rate is to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateBand {
    OnTarget,
    Slight,
    Moderate,
    Heavy,
    Critical,
}

impl RateBand {
    pub fn classify(measured: f64, target: f64) -> Self {
        if measured >= target {
            Self::OnTarget
        } else if measured >= target * 0.8 {
            Self::Slight
        } else if measured >= target * 0.5 {
            Self::Moderate
        } else if measured >= target * 0.2 {
            Self::Heavy
        } else {
            Self::Critical
        }
    }

    /// 256-colour palette index used as background by the console overlay.
    pub fn ansi_background(self) -> u8 {
        match self {
            Self::OnTarget => 85,
            Self::Slight => 87,
            Self::Moderate => 221,
            Self::Heavy => 202,
            Self::Critical => 9,
        }
    }
}

/// Forwards reports to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report(&mut self, report: &TickReport) {
        tracing::trace!(
            tick = report.tick,
            target_rate = report.target_rate,
            execution_rate = ?report.execution_rate,
            display_rate = ?report.display_rate,
            frames_skipped = report.frames_skipped,
            slept_seconds = report.slept_seconds,
            "scheduler tick"
        );
        if report.frames_skipped > 0 {
            tracing::debug!(
                tick = report.tick,
                frames_skipped = report.frames_skipped,
                "scheduler fell behind target rate"
            );
        }
    }
}

/// ANSI overlay drawn in the top-left corner of a terminal.
#[derive(Debug)]
pub struct ConsoleOverlay<W: Write> {
    out: W,
}

impl<W: Write> ConsoleOverlay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, report: &TickReport) -> std::io::Result<()> {
        const RESET: &str = "\x1b[0m";
        const PLAIN: &str = "\x1b[38;5;15m\x1b[48;5;16m";

        write!(self.out, "{RESET}\x1b[1;1H| >>>> scheduler debug")?;
        write!(
            self.out,
            "{RESET}\x1b[2;1H|{PLAIN}  FPS/RATE_CAP: {}{RESET}",
            report.target_rate
        )?;
        if let Some(rate) = report.execution_rate {
            let band = RateBand::classify(rate, report.target_rate);
            write!(
                self.out,
                "{RESET}\x1b[3;1H|\x1b[38;5;16m\x1b[48;5;{}m  EXECUTION_RATE: {rate:<6}{RESET}",
                band.ansi_background()
            )?;
        }
        if let Some(rate) = report.display_rate {
            write!(
                self.out,
                "{RESET}\x1b[4;1H|{PLAIN}  DISPLAY_REFRESH_RATE: {rate:>3}{RESET}"
            )?;
        }
        write!(
            self.out,
            "{RESET}\x1b[5;1H|{PLAIN}  SKIPPED_FRAMES_NOW: {} {RESET}",
            report.frames_skipped
        )?;
        self.out.flush()
    }
}

impl<W: Write> DiagnosticsSink for ConsoleOverlay<W> {
    fn report(&mut self, report: &TickReport) {
        if let Err(err) = self.draw(report) {
            tracing::warn!(%err, "failed to draw diagnostics overlay");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rate_bands() {
        assert_eq!(RateBand::classify(40.0, 35.0), RateBand::OnTarget);
        assert_eq!(RateBand::classify(30.0, 35.0), RateBand::Slight);
        assert_eq!(RateBand::classify(20.0, 35.0), RateBand::Moderate);
        assert_eq!(RateBand::classify(10.0, 35.0), RateBand::Heavy);
        assert_eq!(RateBand::classify(2.0, 35.0), RateBand::Critical);
    }

    #[test]
    fn overlay_writes_all_measurements() {
        let mut overlay = ConsoleOverlay::new(Vec::new());
        overlay.report(&TickReport {
            target_rate: 35.0,
            execution_rate: Some(12.0),
            display_rate: Some(30.0),
            frames_skipped: 2,
            ..TickReport::default()
        });

        let text = String::from_utf8(overlay.into_inner()).unwrap();
        assert!(text.contains("FPS/RATE_CAP: 35"));
        assert!(text.contains("EXECUTION_RATE: 12"));
        assert!(text.contains("48;5;202m"));
        assert!(text.contains("DISPLAY_REFRESH_RATE:  30"));
        assert!(text.contains("SKIPPED_FRAMES_NOW: 2"));
    }
}
