use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::status::HeartbeatTracker;
use crate::config::{HeartbeatSettings, InstanceIdentity};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterInstance<'a> {
    instance_id: &'a str,
    name: &'a str,
    port: u16,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct RegisterReply {
    message: Option<String>,
}

/// Periodically registers this instance with the main server.
pub struct HeartbeatClient {
    http: reqwest::Client,
    endpoint: String,
    identity: InstanceIdentity,
    interval: Duration,
    tracker: Arc<HeartbeatTracker>,
}

impl HeartbeatClient {
    pub fn new(
        identity: InstanceIdentity,
        settings: &HeartbeatSettings,
        tracker: Arc<HeartbeatTracker>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(settings.timeout).build()?;
        let endpoint = format!(
            "{}/api/instance/create-instance",
            identity.main_server_url.trim_end_matches('/')
        );

        Ok(Self {
            http,
            endpoint,
            identity,
            interval: settings.interval,
            tracker,
        })
    }

    /// Sends one heartbeat; failures are recorded and logged, never raised.
    pub async fn send(&self) -> bool {
        let started = Instant::now();
        let body = RegisterInstance {
            instance_id: &self.identity.instance_id,
            name: &self.identity.name,
            port: self.identity.port,
            description: &self.identity.description,
        };

        let result = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        let elapsed = started.elapsed().as_millis() as u64;

        match result {
            Ok(resp) => {
                let reply = resp.json::<RegisterReply>().await.ok();
                info!(
                    instance_id = %self.identity.instance_id,
                    response_ms = elapsed,
                    reply = ?reply.and_then(|r| r.message),
                    "Heartbeat registered with main server"
                );
                self.tracker.record(true, Some(elapsed), None);
                true
            }
            Err(e) => {
                if e.is_timeout() {
                    warn!(endpoint = %self.endpoint, response_ms = elapsed, "Heartbeat timed out");
                } else if let Some(status) = e.status() {
                    warn!(endpoint = %self.endpoint, %status, "Heartbeat rejected by main server");
                } else {
                    error!(endpoint = %self.endpoint, error = %e, "Heartbeat could not reach main server");
                }
                self.tracker.record(false, Some(elapsed), Some(e.to_string()));
                false
            }
        }
    }

    /// Sends immediately, then once per interval, for the life of the process.
    pub fn spawn(self: Arc<Self>) {
        info!(
            instance_id = %self.identity.instance_id,
            environment = %self.identity.environment,
            endpoint = %self.endpoint,
            interval_secs = self.interval.as_secs(),
            "Starting heartbeat"
        );
        self.tracker.set_active(true);

        actix_web::rt::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.send().await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstanceEnvironment;

    fn identity(url: &str) -> InstanceIdentity {
        InstanceIdentity {
            instance_id: "FZ105".into(),
            name: "Lab FZ105".into(),
            port: 3000,
            description: "Computer lab".into(),
            main_server_url: url.into(),
            environment: InstanceEnvironment::Test,
        }
    }

    fn settings() -> HeartbeatSettings {
        HeartbeatSettings {
            enabled: true,
            interval: Duration::from_secs(15),
            timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn builds_the_registration_endpoint() {
        let tracker = Arc::new(HeartbeatTracker::default());
        let client = HeartbeatClient::new(identity("http://10.0.0.2:3002/"), &settings(), tracker).unwrap();

        assert_eq!(client.endpoint, "http://10.0.0.2:3002/api/instance/create-instance");
    }

    #[test]
    fn registration_body_uses_camel_case() {
        let body = RegisterInstance {
            instance_id: "FZ105",
            name: "Lab",
            port: 3000,
            description: "",
        };
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["instanceId"], "FZ105");
        assert_eq!(value["port"], 3000);
    }

    #[actix_web::test]
    async fn unreachable_server_is_recorded_as_failure() {
        let tracker = Arc::new(HeartbeatTracker::default());
        // port 9 (discard) on loopback refuses connections
        let client = HeartbeatClient::new(identity("http://127.0.0.1:9"), &settings(), tracker.clone()).unwrap();

        assert!(!client.send().await);

        let history = tracker.history(10);
        assert_eq!(history.len(), 1);
        assert!(!history[0].success);
        assert!(history[0].error.is_some());
    }
}
