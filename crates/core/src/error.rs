use crate::TrackId;

/// Result alias that carries the custom [`FlipbookError`] type.
pub type Result<T> = std::result::Result<T, FlipbookError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum FlipbookError {
    /// A tick rate or playback rate that is zero, negative or not finite.
    #[error("{what} must be a positive, finite rate (got {value})")]
    InvalidRate { what: &'static str, value: f64 },
    /// The track is not (or no longer) registered with the scheduler.
    #[error("track {0} is not registered")]
    NotRegistered(TrackId),
    /// A sprite sink refused an asset update.
    #[error("sprite rejected update: {0}")]
    Sprite(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration files that could not be parsed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Checks that `value` is usable as a rate, returning it unchanged.
pub(crate) fn positive_rate(what: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FlipbookError::InvalidRate { what, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_positive_rates() {
        assert_eq!(positive_rate("fps", 24.0).unwrap(), 24.0);
    }

    #[test]
    fn describes_every_variant_without_free_form_messages() {
        let missing = FlipbookError::NotRegistered(TrackId(4));
        assert_eq!(missing.to_string(), "track #4 is not registered");

        let sprite = FlipbookError::Sprite("surface lost".to_string());
        assert_eq!(sprite.to_string(), "sprite rejected update: surface lost");
    }

    #[test]
    fn rejects_degenerate_rates() {
        for value in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let err = positive_rate("target rate", value).unwrap_err();
            assert!(format!("{err}").starts_with("target rate"));
        }
    }
}
