use std::time::Duration;

use super::status::{AgentStatus, StatusChannel};

/// Polls `channel` up to `iterations` times, `interval` apart, calling
/// `on_update` whenever the observed value changes. Returns early with the
/// terminal status once one appears, otherwise the last status seen. The run
/// itself is unaffected when this gives up.
pub async fn watch_status<F>(
    channel: &StatusChannel,
    iterations: u32,
    interval: Duration,
    mut on_update: F,
) -> AgentStatus
where
    F: FnMut(&AgentStatus),
{
    let mut last_raw: Option<String> = None;
    let mut current = channel.status();

    for i in 0..iterations.max(1) {
        let raw = channel.get();
        current = AgentStatus::from_raw(&raw);
        if last_raw.as_deref() != Some(raw.as_str()) {
            on_update(&current);
            last_raw = Some(raw);
        }

        if current.is_terminal() {
            break;
        }

        if i + 1 < iterations {
            tokio::time::sleep(interval).await;
        }
    }

    current
}
