use std::time::Duration;

use crate::config::ReconnectPolicy;

/// Delay source for reconnect attempts.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    policy: ReconnectPolicy,
    current: Duration,
}

impl ReconnectBackoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        let current = Self::initial(&policy);
        Self { policy, current }
    }

    fn initial(policy: &ReconnectPolicy) -> Duration {
        match policy {
            ReconnectPolicy::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            ReconnectPolicy::Exponential { initial_ms, .. } => Duration::from_millis(*initial_ms),
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        match &self.policy {
            ReconnectPolicy::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            ReconnectPolicy::Exponential {
                max_ms,
                factor,
                jitter,
                ..
            } => {
                let max = Duration::from_millis(*max_ms);
                let delay = self.current.min(max);
                self.current = Duration::from_secs_f64(
                    (self.current.as_secs_f64() * factor).min(max.as_secs_f64()),
                );
                if *jitter {
                    // +/- 25% around the nominal delay, never above the cap.
                    let spread = delay.as_secs_f64() * 0.25;
                    let offset = (rand::random::<f64>() - 0.5) * 2.0 * spread;
                    Duration::from_secs_f64((delay.as_secs_f64() + offset).clamp(0.0, max.as_secs_f64()))
                } else {
                    delay
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.current = Self::initial(&self.policy);
    }
}
