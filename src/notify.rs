//! Webhook notifier for job boundaries. A notifier failure is never allowed
//! to fail the job that triggered it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;

const MAX_ATTEMPTS: u32 = 6;
const RETRY_DELAY: Duration = Duration::from_secs(1);

struct WebhookTarget {
    url: String,
    user: String,
    password: String,
}

#[derive(Clone)]
pub struct Notifier {
    http: reqwest::Client,
    target: Option<Arc<WebhookTarget>>,
}

impl Notifier {
    /// Credentials completeness is validated by `Config::from_env`.
    pub fn from_config(cfg: &Config) -> Self {
        let target = if cfg.webhook_enabled {
            match (&cfg.webhook_url, &cfg.webhook_bot_usr, &cfg.webhook_bot_pw) {
                (Some(url), Some(user), Some(password)) => Some(Arc::new(WebhookTarget {
                    url: url.clone(),
                    user: user.clone(),
                    password: password.clone(),
                })),
                _ => None,
            }
        } else {
            None
        };
        Self {
            http: reqwest::Client::new(),
            target,
        }
    }

    pub fn disabled() -> Self {
        Self {
            http: reqwest::Client::new(),
            target: None,
        }
    }

    /// Post a markdown message to the webhook. Logs and returns on failure.
    pub async fn send(&self, message: &str) {
        let Some(target) = &self.target else {
            return;
        };

        for attempt in 1..=MAX_ATTEMPTS {
            let result = self
                .http
                .post(&target.url)
                .basic_auth(&target.user, Some(&target.password))
                .json(&serde_json::json!({ "content": message }))
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    debug!(attempt, "webhook sent");
                    return;
                }
                Ok(resp) => {
                    warn!(status = %resp.status(), attempt, "webhook rejected; retrying");
                }
                Err(err) => {
                    warn!(error = %err, attempt, "webhook request failed; retrying");
                }
            }
            tokio::time::sleep(RETRY_DELAY).await;
        }
        warn!(attempts = MAX_ATTEMPTS, "webhook failed after retries; giving up");
    }
}
