//! End-to-end decision-loop tests: detect → recommend → feedback → learn,
//! with real file persistence.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use gridwatch_agent::{GridMonitorAgent, PREDICTION_CONFIDENCE};
use gridwatch_core::config::AgentConfig;
use gridwatch_core::error::Error;
use gridwatch_core::provider::{ForecastEntry, ProviderError, RatingProvider, WeatherParams};
use gridwatch_core::types::{Feedback, FeedbackOutcome, IssueKind, LineLoading};
use gridwatch_storage::{FailingStateStore, FileStateStore, MemoryStateStore, StateStore};

/// Provider returning a fixed per-line map.
struct StaticProvider {
    lines: HashMap<String, LineLoading>,
}

impl StaticProvider {
    fn new(loadings: &[(&str, f64, f64)]) -> Self {
        let lines = loadings
            .iter()
            .map(|(name, rating, flow)| (name.to_string(), LineLoading::new(*rating, *flow)))
            .collect();
        Self { lines }
    }
}

#[async_trait]
impl RatingProvider for StaticProvider {
    async fn compute_ratings(
        &self,
        _weather: &WeatherParams,
    ) -> std::result::Result<HashMap<String, LineLoading>, ProviderError> {
        Ok(self.lines.clone())
    }
}

/// Provider replaying a scripted sequence of grid states, one per call.
struct SequenceProvider {
    sequence: Mutex<Vec<HashMap<String, LineLoading>>>,
}

impl SequenceProvider {
    fn from_loadings(loadings: &[f64]) -> Self {
        let sequence = loadings
            .iter()
            .rev()
            .map(|pct| {
                HashMap::from([("L1".to_string(), LineLoading::new(100.0, *pct))])
            })
            .collect();
        Self {
            sequence: Mutex::new(sequence),
        }
    }
}

#[async_trait]
impl RatingProvider for SequenceProvider {
    async fn compute_ratings(
        &self,
        _weather: &WeatherParams,
    ) -> std::result::Result<HashMap<String, LineLoading>, ProviderError> {
        self.sequence
            .lock()
            .await
            .pop()
            .ok_or_else(|| ProviderError::MissingData("sequence exhausted".to_string()))
    }
}

struct FailingProvider;

#[async_trait]
impl RatingProvider for FailingProvider {
    async fn compute_ratings(
        &self,
        _weather: &WeatherParams,
    ) -> std::result::Result<HashMap<String, LineLoading>, ProviderError> {
        Err(ProviderError::Computation("solver diverged".to_string()))
    }
}

fn test_config(dir: &std::path::Path) -> AgentConfig {
    init_tracing();
    AgentConfig {
        state_path: dir.join("agent_state.json"),
        decision_log_path: dir.join("agent_decisions.log"),
        ..AgentConfig::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn overload_produces_ranked_actions_and_persists() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    let provider = Arc::new(StaticProvider::new(&[
        ("L1", 100.0, 110.0), // 110% — critical
        ("L2", 100.0, 92.0),  // 92% — high
        ("L3", 100.0, 40.0),
    ]));
    let store = Arc::new(FileStateStore::new(&config.state_path));
    let agent = GridMonitorAgent::start(config.clone(), provider, store.clone()).await;

    let actions = agent
        .recommend(Some(WeatherParams::default()), None)
        .await?;

    assert!(!actions.is_empty());
    assert_eq!(actions[0].kind, IssueKind::CriticalLoading);
    assert_eq!(actions[0].priority, 1);
    assert!(actions.windows(2).all(|w| w[0].priority <= w[1].priority));

    // State survived to disk with the snapshot and the actions.
    let persisted = store.load().await;
    assert_eq!(persisted.history.len(), 1);
    assert_eq!(persisted.action_history.len(), actions.len());

    // Decision log got one line per issue plus the recommendation batch.
    let log_text = tokio::fs::read_to_string(&config.decision_log_path).await?;
    assert!(log_text.lines().count() >= actions.len());
    Ok(())
}

#[tokio::test]
async fn rising_loading_sequence_surfaces_trend_issue() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    let provider = Arc::new(SequenceProvider::from_loadings(&[
        60.0, 65.0, 70.0, 75.0, 80.0,
    ]));
    let agent =
        GridMonitorAgent::start(config, provider, Arc::new(MemoryStateStore::new())).await;

    for _ in 0..5 {
        agent.recommend(Some(WeatherParams::default()), None).await?;
    }

    let status = agent.status().await?;
    assert!(
        status
            .open_issues
            .iter()
            .any(|i| i.kind == IssueKind::RisingTrend),
        "expected a rising-trend issue, got {:?}",
        status.open_issues
    );
    assert_eq!(status.history_size, 5);
    Ok(())
}

#[tokio::test]
async fn rejected_feedback_raises_threshold_and_persists() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    let provider = Arc::new(StaticProvider::new(&[("L1", 100.0, 92.0)]));
    let store = Arc::new(FileStateStore::new(&config.state_path));
    let agent = GridMonitorAgent::start(config, provider, store.clone()).await;

    let actions = agent
        .recommend(Some(WeatherParams::default()), None)
        .await?;
    let high_action = actions
        .iter()
        .find(|a| a.kind == IssueKind::HighLoading)
        .expect("high-loading action");

    let ack = agent
        .feedback(Feedback {
            action_id: high_action.id.clone(),
            outcome: FeedbackOutcome::Rejected,
            success: None,
            metrics: None,
            notes: Some("planned maintenance window".to_string()),
        })
        .await?;

    assert_eq!(ack.adjustment, "raised");
    assert_eq!(ack.thresholds.high_loading, 92.0);
    assert_eq!(store.load().await.thresholds.high_loading, 92.0);
    Ok(())
}

#[tokio::test]
async fn unknown_action_feedback_fails_without_state_change() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    let provider = Arc::new(StaticProvider::new(&[("L1", 100.0, 40.0)]));
    let agent =
        GridMonitorAgent::start(config, provider, Arc::new(MemoryStateStore::new())).await;

    let before = agent.status().await?;
    let err = agent
        .feedback(Feedback {
            action_id: "no-such-action".to_string(),
            outcome: FeedbackOutcome::Rejected,
            success: None,
            metrics: None,
            notes: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownAction(_)));
    let after = agent.status().await?;
    assert_eq!(after.thresholds, before.thresholds);
    assert_eq!(after.action_history_size, before.action_history_size);
    Ok(())
}

#[tokio::test]
async fn predictions_carry_fixed_confidence_and_risk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    let provider = Arc::new(StaticProvider::new(&[
        ("L1", 100.0, 105.0),
        ("L2", 100.0, 50.0),
    ]));
    let agent =
        GridMonitorAgent::start(config, provider, Arc::new(MemoryStateStore::new())).await;

    let forecast = vec![
        ForecastEntry {
            timestamp: Utc::now(),
            weather: WeatherParams::default(),
        },
        ForecastEntry {
            timestamp: Utc::now() + chrono::Duration::hours(1),
            weather: WeatherParams {
                ambient_temp_c: 40.0,
                ..WeatherParams::default()
            },
        },
    ];
    let predictions = agent.predict(&forecast).await?;

    assert_eq!(predictions.len(), 2);
    for p in &predictions {
        assert_eq!(p.confidence, PREDICTION_CONFIDENCE);
        assert_eq!(
            p.risk_levels["L1"],
            gridwatch_core::types::RiskLevel::High
        );
        assert_eq!(p.risk_levels["L2"], gridwatch_core::types::RiskLevel::Low);
    }

    // Prediction is read-only: no history append.
    assert_eq!(agent.status().await?.history_size, 0);
    Ok(())
}

#[tokio::test]
async fn empty_forecast_predicts_nothing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let agent = GridMonitorAgent::start(
        test_config(dir.path()),
        Arc::new(StaticProvider::new(&[])),
        Arc::new(MemoryStateStore::new()),
    )
    .await;

    assert!(agent.predict(&[]).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn provider_failure_aborts_cycle_before_history_append() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let agent = GridMonitorAgent::start(
        test_config(dir.path()),
        Arc::new(FailingProvider),
        Arc::new(MemoryStateStore::new()),
    )
    .await;

    let err = agent
        .recommend(Some(WeatherParams::default()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider(_)));
    assert_eq!(agent.status().await?.history_size, 0);
    Ok(())
}

#[tokio::test]
async fn disabled_agent_rejects_every_operation() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = AgentConfig {
        enabled: false,
        ..test_config(dir.path())
    };
    let agent = GridMonitorAgent::start(
        config,
        Arc::new(StaticProvider::new(&[("L1", 100.0, 110.0)])),
        Arc::new(MemoryStateStore::new()),
    )
    .await;

    assert!(matches!(agent.status().await, Err(Error::AgentDisabled)));
    assert!(matches!(agent.predict(&[]).await, Err(Error::AgentDisabled)));
    assert!(matches!(
        agent.recommend(None, None).await,
        Err(Error::AgentDisabled)
    ));
    assert!(matches!(
        agent
            .feedback(Feedback {
                action_id: "a1".to_string(),
                outcome: FeedbackOutcome::Accepted,
                success: Some(true),
                metrics: None,
                notes: None,
            })
            .await,
        Err(Error::AgentDisabled)
    ));
    Ok(())
}

#[tokio::test]
async fn save_failure_surfaces_error_but_keeps_memory_state() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    let provider = Arc::new(StaticProvider::new(&[("L1", 100.0, 110.0)]));
    let agent =
        GridMonitorAgent::start(config.clone(), provider, Arc::new(FailingStateStore)).await;

    let err = agent
        .recommend(Some(WeatherParams::default()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));

    // The cycle completed in memory before the save failed.
    let status = agent.status().await?;
    assert_eq!(status.history_size, 1);
    assert!(status.action_history_size > 0);

    // Recover one of the retained action ids from the decision log and
    // apply feedback over the same failing store.
    let log_text = tokio::fs::read_to_string(&config.decision_log_path).await?;
    let action_id = log_text
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .find_map(|v| v["details"]["ids"][0].as_str().map(str::to_string))
        .expect("logged recommendation id");

    let err = agent
        .feedback(Feedback {
            action_id,
            outcome: FeedbackOutcome::Rejected,
            success: None,
            metrics: None,
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));

    // The threshold adjustment stands in memory despite the failed save.
    assert_eq!(agent.status().await?.thresholds.high_loading, 92.0);
    Ok(())
}

#[tokio::test]
async fn state_survives_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = test_config(dir.path());
    let provider = Arc::new(StaticProvider::new(&[("L1", 100.0, 95.0)]));

    {
        let store = Arc::new(FileStateStore::new(&config.state_path));
        let agent =
            GridMonitorAgent::start(config.clone(), provider.clone(), store).await;
        agent.recommend(Some(WeatherParams::default()), None).await?;
    }

    // A new agent over the same store picks up where the first left off.
    let store = Arc::new(FileStateStore::new(&config.state_path));
    let agent = GridMonitorAgent::start(config, provider, store).await;
    let status = agent.status().await?;
    assert_eq!(status.history_size, 1);
    assert!(status.action_history_size > 0);
    Ok(())
}

#[tokio::test]
async fn recommend_limit_caps_results() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let provider = Arc::new(StaticProvider::new(&[
        ("L1", 100.0, 110.0),
        ("L2", 100.0, 111.0),
        ("L3", 100.0, 112.0),
        ("L4", 100.0, 92.0),
    ]));
    let agent = GridMonitorAgent::start(
        test_config(dir.path()),
        provider,
        Arc::new(MemoryStateStore::new()),
    )
    .await;

    let actions = agent
        .recommend(Some(WeatherParams::default()), Some(2))
        .await?;
    assert_eq!(actions.len(), 2);
    assert!(actions.iter().all(|a| a.kind == IssueKind::CriticalLoading));
    Ok(())
}
