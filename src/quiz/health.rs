use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::quiz::client::QuizClient;

/// The part of the `/health` payload the player cares about.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct HealthPayload {
    pub mock: bool,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ServiceStatus {
    #[default]
    Unreachable,
    Demo,
    Live { model: Option<String> },
}

impl From<HealthPayload> for ServiceStatus {
    fn from(payload: HealthPayload) -> Self {
        if payload.mock {
            ServiceStatus::Demo
        } else {
            ServiceStatus::Live {
                model: payload.model,
            }
        }
    }
}

impl ServiceStatus {
    pub fn label(&self) -> String {
        match self {
            ServiceStatus::Unreachable => "🔴 Quiz service unreachable (demo quiz still works)".to_string(),
            ServiceStatus::Demo => "🟡 Quiz service online, demo mode".to_string(),
            ServiceStatus::Live { model: Some(model) } => {
                format!("🟢 Quiz service online, live ({})", model)
            }
            ServiceStatus::Live { model: None } => "🟢 Quiz service online, live".to_string(),
        }
    }
}

/// Probes the service every `interval` and publishes the result.
///
/// The task stops once every receiver is gone.
pub fn spawn_probe(client: Arc<QuizClient>, interval: Duration) -> watch::Receiver<ServiceStatus> {
    let (tx, rx) = watch::channel(ServiceStatus::default());

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }
            let status = client.check_service_availability().await;
            tx.send_if_modified(|current| {
                if *current == status {
                    return false;
                }
                info!("Quiz service status: {}", status.label());
                *current = status;
                true
            });
        }
    });

    rx
}
