// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side cooldown after repeated failed attempts.
//!
//! Owned by the calling layer (a sign-in form, a verification-code screen),
//! not by the identity or inventory services. Repeated failures inside a
//! window trigger an escalating cooldown; a rate-limit response from the
//! backend triggers a cooldown immediately from a separate, longer table.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::error::{AppError, Result};

/// Failure counting and escalation tables.
#[derive(Debug, Clone)]
pub struct ThrottlePolicy {
    /// Failures inside `window` that trigger a cooldown
    pub max_failures: usize,
    pub window: Duration,
    /// Cooldown per consecutive trigger; the last entry repeats
    pub cooldowns: Vec<Duration>,
    /// Cooldown per consecutive 429; the last entry repeats
    pub rate_limit_cooldowns: Vec<Duration>,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            max_failures: 3,
            window: Duration::minutes(5),
            cooldowns: vec![
                Duration::seconds(30),
                Duration::seconds(60),
                Duration::minutes(5),
            ],
            rate_limit_cooldowns: vec![
                Duration::seconds(60),
                Duration::minutes(5),
                Duration::minutes(15),
            ],
        }
    }
}

fn escalate(table: &[Duration], strikes: usize) -> Duration {
    table
        .get(strikes)
        .or_else(|| table.last())
        .copied()
        .unwrap_or_else(Duration::zero)
}

/// Failure tracker for one action.
#[derive(Debug, Clone)]
pub struct AttemptThrottle {
    policy: ThrottlePolicy,
    failures: Vec<DateTime<Utc>>,
    strikes: usize,
    rate_limit_strikes: usize,
    blocked_until: Option<DateTime<Utc>>,
}

impl AttemptThrottle {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            failures: Vec::new(),
            strikes: 0,
            rate_limit_strikes: 0,
            blocked_until: None,
        }
    }

    pub fn blocked_until(&self) -> Option<DateTime<Utc>> {
        self.blocked_until
    }

    /// `Err(Throttled)` while a cooldown is running.
    pub fn check(&self, now: DateTime<Utc>) -> Result<()> {
        match self.blocked_until {
            Some(until) if until > now => {
                let millis = (until - now).num_milliseconds();
                Err(AppError::Throttled {
                    retry_after_secs: (millis + 999) / 1000,
                })
            }
            _ => Ok(()),
        }
    }

    /// Count a failed attempt. Input errors the user can fix do not count.
    pub fn record_failure(&mut self, now: DateTime<Utc>, err: &AppError) {
        if matches!(err, AppError::Validation(_) | AppError::Throttled { .. }) {
            return;
        }

        if err.is_rate_limited() {
            let cooldown = escalate(&self.policy.rate_limit_cooldowns, self.rate_limit_strikes);
            self.rate_limit_strikes += 1;
            self.failures.clear();
            self.block(now, cooldown);
            return;
        }

        let window = self.policy.window;
        self.failures.retain(|at| now - *at < window);
        self.failures.push(now);

        if self.failures.len() >= self.policy.max_failures {
            let cooldown = escalate(&self.policy.cooldowns, self.strikes);
            self.strikes += 1;
            self.failures.clear();
            self.block(now, cooldown);
        }
    }

    pub fn record_success(&mut self) {
        self.failures.clear();
        self.strikes = 0;
        self.rate_limit_strikes = 0;
        self.blocked_until = None;
    }

    fn block(&mut self, now: DateTime<Utc>, cooldown: Duration) {
        let until = now + cooldown;
        tracing::debug!(
            cooldown_secs = cooldown.num_seconds(),
            "Attempt cooldown started"
        );
        self.blocked_until = Some(until);
    }
}

/// Throttles keyed by action name, shareable across tasks.
#[derive(Debug)]
pub struct ThrottleRegistry {
    policy: ThrottlePolicy,
    throttles: DashMap<String, AttemptThrottle>,
}

impl ThrottleRegistry {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            throttles: DashMap::new(),
        }
    }

    pub fn check(&self, key: &str, now: DateTime<Utc>) -> Result<()> {
        match self.throttles.get(key) {
            Some(throttle) => throttle.check(now),
            None => Ok(()),
        }
    }

    pub fn record_failure(&self, key: &str, now: DateTime<Utc>, err: &AppError) {
        self.throttles
            .entry(key.to_string())
            .or_insert_with(|| AttemptThrottle::new(self.policy.clone()))
            .record_failure(now, err);
    }

    pub fn record_success(&self, key: &str) {
        if let Some(mut throttle) = self.throttles.get_mut(key) {
            throttle.record_success();
        }
    }

    /// Run `op` unless `key` is cooling down, and record its outcome.
    pub async fn attempt<T, F>(&self, key: &str, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check(key, Utc::now())?;

        let result = op.await;
        match &result {
            Ok(_) => self.record_success(key),
            Err(e) => self.record_failure(key, Utc::now(), e),
        }
        result
    }
}

impl Default for ThrottleRegistry {
    fn default() -> Self {
        Self::new(ThrottlePolicy::default())
    }
}
