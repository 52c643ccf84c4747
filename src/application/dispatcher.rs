//! Alert Dispatcher
//!
//! Fans a cycle's milestone events out to enrichers, then notifiers.
//! Every failure is isolated to one event and one collaborator.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::MilestoneEvent;
use crate::ports::alerts::{Annotation, MilestoneAlert, MilestoneEnricher, MilestoneNotifier};

/// Counters for one `dispatch` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub alerts: usize,
    /// Successful notifier deliveries (one alert x one notifier)
    pub delivered: usize,
    pub failed: usize,
    pub enrichment_failures: usize,
}

#[derive(Default)]
pub struct AlertDispatcher {
    enrichers: Vec<Arc<dyn MilestoneEnricher>>,
    notifiers: Vec<Arc<dyn MilestoneNotifier>>,
    alert_delay: Duration,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause between consecutive alerts
    pub fn with_alert_delay(mut self, delay: Duration) -> Self {
        self.alert_delay = delay;
        self
    }

    pub fn add_enricher(&mut self, enricher: Arc<dyn MilestoneEnricher>) {
        self.enrichers.push(enricher);
    }

    pub fn add_notifier(&mut self, notifier: Arc<dyn MilestoneNotifier>) {
        self.notifiers.push(notifier);
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Run every enricher against `event`; failed enrichers contribute nothing
    async fn enrich(&self, event: &MilestoneEvent, summary: &mut DispatchSummary) -> MilestoneAlert {
        let mut alert = MilestoneAlert::new(event.clone());

        for enricher in &self.enrichers {
            match enricher.enrich(event).await {
                Ok(pairs) => alert.annotations.extend(pairs.into_iter().map(|(key, value)| Annotation {
                    source: enricher.name().to_string(),
                    key,
                    value,
                })),
                Err(e) => {
                    summary.enrichment_failures += 1;
                    tracing::warn!("Enricher {} failed for {}: {}", enricher.name(), event.address, e);
                }
            }
        }

        alert
    }

    pub async fn dispatch(&self, events: &[MilestoneEvent]) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for (index, event) in events.iter().enumerate() {
            if index > 0 && !self.alert_delay.is_zero() {
                tokio::time::sleep(self.alert_delay).await;
            }

            let alert = self.enrich(event, &mut summary).await;
            summary.alerts += 1;

            for notifier in &self.notifiers {
                match notifier.notify(&alert).await {
                    Ok(()) => summary.delivered += 1,
                    Err(e) => {
                        summary.failed += 1;
                        tracing::warn!(
                            "Notifier {} failed for {} {}: {}",
                            notifier.name(), event.symbol, event.milestone_label, e
                        );
                    }
                }
            }
        }

        if summary.alerts > 0 {
            tracing::info!(
                "Dispatched {} alerts: {} delivered, {} failed",
                summary.alerts, summary.delivered, summary.failed
            );
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MilestoneKind, NewToken, TrackedToken};
    use crate::ports::mocks::{RecordingNotifier, StaticEnricher};

    fn event(address: &str, label: &str) -> MilestoneEvent {
        let token: TrackedToken = NewToken::new(address, "solana", "TKN", "Token", 1.0).into();
        MilestoneEvent::new(&token, 2.0, label, MilestoneKind::Gain, vec![label.to_string()], 2.0, 100.0)
    }

    #[tokio::test]
    async fn test_enrich_then_notify() {
        let recorder = RecordingNotifier::new();
        let mut dispatcher = AlertDispatcher::new();
        dispatcher.add_enricher(Arc::new(StaticEnricher::new("narrative", "story", "cat coin")));
        dispatcher.add_enricher(Arc::new(StaticEnricher::failing("wallets")));
        dispatcher.add_notifier(Arc::new(recorder.clone()));

        let summary = dispatcher.dispatch(&[event("a", "2x"), event("b", "2x")]).await;

        assert_eq!(summary, DispatchSummary { alerts: 2, delivered: 2, failed: 0, enrichment_failures: 2 });
        let alerts = recorder.get_alerts();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].annotation("story"), Some("cat coin"));
        assert_eq!(alerts[0].annotations[0].source, "narrative");
    }

    #[tokio::test]
    async fn test_failing_notifier_is_isolated() {
        let recorder = RecordingNotifier::new();
        let mut dispatcher = AlertDispatcher::new();
        dispatcher.add_notifier(Arc::new(RecordingNotifier::failing()));
        dispatcher.add_notifier(Arc::new(recorder.clone()));

        let summary = dispatcher.dispatch(&[event("a", "5x")]).await;

        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(recorder.get_alerts()[0].event.milestone_label, "5x");
    }

    #[tokio::test(start_paused = true)]
    async fn test_alert_delay_between_alerts() {
        let mut dispatcher = AlertDispatcher::new().with_alert_delay(Duration::from_secs(1));
        dispatcher.add_notifier(Arc::new(RecordingNotifier::new()));

        let started = tokio::time::Instant::now();
        dispatcher.dispatch(&[event("a", "2x"), event("b", "2x"), event("c", "2x")]).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_no_events() {
        let dispatcher = AlertDispatcher::new();
        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.dispatch(&[]).await, DispatchSummary::default());
    }
}
