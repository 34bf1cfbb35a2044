use dekk_core::{NotificationError, NotificationPort};

/// Writes run reports to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationPort for LogNotifier {
    async fn send_report(
        &self,
        recipient: &str,
        subject: &str,
        body_lines: &[String],
    ) -> Result<(), NotificationError> {
        tracing::info!(recipient, subject, lines = body_lines.len(), "sync report");
        for line in body_lines {
            tracing::info!(recipient, "  {line}");
        }
        Ok(())
    }
}
