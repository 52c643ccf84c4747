//! Console notifier: alerts go to the log

use async_trait::async_trait;

use crate::ports::alerts::{AlertError, MilestoneAlert, MilestoneNotifier};
use super::format::format_alert;

#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MilestoneNotifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    async fn notify(&self, alert: &MilestoneAlert) -> Result<(), AlertError> {
        tracing::info!(
            address = %alert.event.address,
            milestone = %alert.event.milestone_label,
            "\n{}",
            format_alert(alert)
        );
        Ok(())
    }
}
