//! Configuration for the ring scheduler

use super::error::{RingError, RingResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a ring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingConfig {
    /// Name used in logs and metric labels
    #[serde(default = "default_name")]
    pub name: String,

    /// Number of slots in the wheel
    #[serde(default = "default_size")]
    pub size: usize,

    /// Capacity of the registration event queue
    #[serde(default = "default_queue_buf")]
    pub queue_buf: usize,

    /// Containers larger than this are not returned to the pools
    #[serde(default = "default_pool_limit")]
    pub pool_limit: usize,

    /// Initial capacity of pooled task lists
    #[serde(default = "default_pool_init")]
    pub pool_init: usize,

    /// Reschedule failed tasks on the next tick
    #[serde(default = "default_true")]
    pub retry: bool,

    /// Longest a registration waits for queue space (milliseconds)
    #[serde(default = "default_register_max_wait")]
    pub register_max_wait_ms: u64,

    /// Period of the default ticker (milliseconds)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl RingConfig {
    /// Create a new builder for RingConfig
    pub fn builder() -> RingConfigBuilder {
        RingConfigBuilder::default()
    }

    pub fn register_max_wait(&self) -> Duration {
        Duration::from_millis(self.register_max_wait_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> RingResult<()> {
        if self.size == 0 {
            return Err(RingError::InvalidConfig(
                "size must be greater than 0".to_string(),
            ));
        }

        if self.queue_buf == 0 {
            return Err(RingError::InvalidConfig(
                "queue_buf must be greater than 0".to_string(),
            ));
        }

        if self.register_max_wait_ms == 0 {
            return Err(RingError::InvalidConfig(
                "register_max_wait_ms must be greater than 0".to_string(),
            ));
        }

        if self.tick_interval_ms == 0 {
            return Err(RingError::InvalidConfig(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            size: default_size(),
            queue_buf: default_queue_buf(),
            pool_limit: default_pool_limit(),
            pool_init: default_pool_init(),
            retry: default_true(),
            register_max_wait_ms: default_register_max_wait(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

fn default_name() -> String {
    "ring".to_string()
}

fn default_size() -> usize {
    60
}

fn default_queue_buf() -> usize {
    64
}

fn default_pool_limit() -> usize {
    256
}

fn default_pool_init() -> usize {
    16
}

fn default_true() -> bool {
    true
}

fn default_register_max_wait() -> u64 {
    50
}

fn default_tick_interval() -> u64 {
    1000
}

/// Builder for RingConfig
#[derive(Debug, Clone, Default)]
pub struct RingConfigBuilder {
    config: RingConfig,
}

impl RingConfigBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.config.size = size;
        self
    }

    pub fn queue_buf(mut self, queue_buf: usize) -> Self {
        self.config.queue_buf = queue_buf;
        self
    }

    pub fn pool_limit(mut self, limit: usize) -> Self {
        self.config.pool_limit = limit;
        self
    }

    pub fn pool_init(mut self, init: usize) -> Self {
        self.config.pool_init = init;
        self
    }

    pub fn retry(mut self, retry: bool) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn register_max_wait(mut self, wait: Duration) -> Self {
        self.config.register_max_wait_ms = wait.as_millis() as u64;
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> RingResult<RingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RingConfig::default();
        assert_eq!(config.size, 60);
        assert_eq!(config.register_max_wait(), Duration::from_millis(50));
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert!(config.retry);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = RingConfig::builder()
            .name("jobs")
            .size(8)
            .queue_buf(4)
            .retry(false)
            .register_max_wait(Duration::from_millis(20))
            .build()
            .unwrap();

        assert_eq!(config.name, "jobs");
        assert_eq!(config.size, 8);
        assert_eq!(config.queue_buf, 4);
        assert!(!config.retry);
        assert_eq!(config.register_max_wait_ms, 20);
    }

    #[test]
    fn test_zero_size_rejected() {
        let result = RingConfig::builder().size(0).build();
        assert!(matches!(result, Err(RingError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_queue_rejected() {
        let result = RingConfig::builder().queue_buf(0).build();
        assert!(matches!(result, Err(RingError::InvalidConfig(_))));
    }
}
