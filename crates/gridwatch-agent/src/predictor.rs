//! Risk prediction over a weather forecast.
//!
//! Each forecast entry is delegated to the rating provider; per-line risk
//! is derived from the same thresholds the issue detector uses. No
//! statistical fitting happens here: the model is deterministic physics,
//! so confidence is a fixed conservative constant.

use std::sync::Arc;

use gridwatch_core::error::{Error, Result};
use gridwatch_core::provider::{ForecastEntry, RatingProvider};
use gridwatch_core::state::Thresholds;
use gridwatch_core::types::{Prediction, RiskLevel};

/// Confidence assigned to every prediction.
pub const PREDICTION_CONFIDENCE: f64 = 0.9;

/// Projects future loading and risk by replaying forecast weather through
/// the rating provider.
pub struct Predictor {
    provider: Arc<dyn RatingProvider>,
}

impl Predictor {
    pub fn new(provider: Arc<dyn RatingProvider>) -> Self {
        Self { provider }
    }

    /// Predict per-line loading and risk for each forecast entry, in order.
    ///
    /// Provider failure for any entry propagates immediately, so the
    /// caller sees where the sequence stopped rather than a silently
    /// shortened result. An empty forecast yields an empty result.
    pub async fn predict(
        &self,
        forecast: &[ForecastEntry],
        thresholds: &Thresholds,
    ) -> Result<Vec<Prediction>> {
        let mut predictions = Vec::with_capacity(forecast.len());

        for entry in forecast {
            let lines = self
                .provider
                .compute_ratings(&entry.weather)
                .await
                .map_err(Error::from)?;

            let risk_levels = lines
                .iter()
                .map(|(name, line)| (name.clone(), risk_for(line.loading_pct, thresholds)))
                .collect();

            predictions.push(Prediction {
                timestamp: entry.timestamp,
                lines,
                risk_levels,
                confidence: PREDICTION_CONFIDENCE,
            });
        }

        Ok(predictions)
    }
}

/// Risk level for a predicted loading percentage.
fn risk_for(loading_pct: f64, thresholds: &Thresholds) -> RiskLevel {
    if loading_pct >= thresholds.critical_loading {
        RiskLevel::High
    } else if loading_pct >= thresholds.high_loading {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
