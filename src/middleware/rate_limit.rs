//! Login throttling. Every attempt is charged to both the client address and
//! the email being tried, so rotating either one alone does not reset the
//! budget.
use crate::domain::models::normalize_email;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum AttemptKey {
    Client(String),
    Email(String),
}

#[derive(Clone)]
pub struct LoginLimiter {
    attempts: Arc<RwLock<HashMap<AttemptKey, VecDeque<Instant>>>>,
    max_attempts: usize,
    window: Duration,
}

impl LoginLimiter {
    pub fn new(max_attempts: usize, window_secs: u64) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            max_attempts,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Records a login attempt and reports whether it may proceed.
    ///
    /// Rejected attempts are not recorded, so a blocked client regains
    /// access once its oldest allowed attempt leaves the window.
    pub async fn allow(&self, client: &str, email: &str) -> bool {
        self.allow_at(client, email, Instant::now()).await
    }

    async fn allow_at(&self, client: &str, email: &str, now: Instant) -> bool {
        let keys = [
            AttemptKey::Client(client.to_string()),
            AttemptKey::Email(normalize_email(email)),
        ];
        let mut attempts = self.attempts.write().await;

        for key in &keys {
            if let Some(history) = attempts.get_mut(key) {
                self.expire(history, now);
                if history.len() >= self.max_attempts {
                    tracing::warn!("Login throttled on {:?}", key);
                    return false;
                }
            }
        }

        for key in keys {
            attempts.entry(key).or_default().push_back(now);
        }
        true
    }

    fn expire(&self, history: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = history.front() {
            if now.duration_since(oldest) < self.window {
                break;
            }
            history.pop_front();
        }
    }

    /// Forgets clients and emails with no attempts left in the window.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, history| {
            self.expire(history, now);
            !history.is_empty()
        });
        tracing::debug!("Login limiter cleanup: {} tracked keys", attempts.len());
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.attempts.read().await.len()
    }
}
