//! Global cooldown between dispatched alerts

use chrono::{DateTime, Duration, Utc};

/// Minimum wall-clock spacing between two alerts, shared by every source
#[derive(Debug, Clone)]
pub struct CooldownGate {
    cooldown: Duration,
    last_alert_at: Option<DateTime<Utc>>,
}

impl CooldownGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert_at: None,
        }
    }

    /// `true` when no alert was sent yet or the cooldown has fully elapsed
    pub fn allowed(&self, now: DateTime<Utc>) -> bool {
        match self.last_alert_at {
            None => true,
            Some(last) => now - last >= self.cooldown,
        }
    }

    /// Time left before the gate reopens (zero when open)
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        match self.last_alert_at {
            None => Duration::zero(),
            Some(last) => (self.cooldown - (now - last)).max(Duration::zero()),
        }
    }

    pub fn mark_alerted(&mut self, at: DateTime<Utc>) {
        self.last_alert_at = Some(at);
    }

    pub fn last_alert_at(&self) -> Option<DateTime<Utc>> {
        self.last_alert_at
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
