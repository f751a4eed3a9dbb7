//! Shared helpers for panel integration tests
#![allow(dead_code)]

use acp_engine::{AlarmPanel, Clock, ManualScheduler, MockClock, NullBackend, PanelConfig};
use acp_events::EventBus;
use acp_store::PanelStore;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once, honoring RUST_LOG
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Fixed start time for deterministic window math
pub fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub struct TestPanel {
    pub panel: Arc<AlarmPanel>,
    pub clock: MockClock,
    pub scheduler: Arc<ManualScheduler>,
    pub bus: Arc<EventBus>,
}

impl TestPanel {
    /// Advance the clock and release every timer that came due
    pub async fn advance(&self, seconds: i64) {
        self.clock.advance(Duration::seconds(seconds));
        self.scheduler.run_due(self.clock.now()).await;
    }
}

/// Parse a panel config from YAML, the way a host would
pub fn yaml_config(yaml: &str) -> PanelConfig {
    serde_yaml::from_str(yaml).expect("test config must parse")
}

/// Build and start a panel with no persistence attached
pub async fn start_panel(config: PanelConfig) -> TestPanel {
    start_panel_at(config, None, t0()).await
}

/// Build and start a panel against a store, at a given clock time
pub async fn start_panel_at(
    config: PanelConfig,
    store: Option<Arc<PanelStore>>,
    now: DateTime<Utc>,
) -> TestPanel {
    init_tracing();
    let clock = MockClock::at(now);
    let scheduler = Arc::new(ManualScheduler::new());
    let bus = Arc::new(EventBus::new());
    let panel = AlarmPanel::new(
        config,
        Arc::new(clock.clone()),
        scheduler.clone(),
        bus.clone(),
        store,
        Arc::new(NullBackend),
    )
    .expect("test config must build");
    panel.start().await;
    TestPanel {
        panel,
        clock,
        scheduler,
        bus,
    }
}
