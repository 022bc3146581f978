use std::time::Duration;

use crate::{
    consts::{HEADER_LEN, MAX_PAYLOAD, POLL_TIMEOUT, UDP_MAX_PAYLOAD},
    error::{Result, StopWaitError},
};

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Largest payload carried by one DATA packet
    pub max_payload: usize,
    /// Wait for a single inbound datagram before retransmitting or polling again
    pub poll_timeout: Duration,
    /// Give up on a chunk after this many transmissions. `None` retries forever.
    pub retry_limit: Option<usize>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            max_payload: MAX_PAYLOAD,
            poll_timeout: POLL_TIMEOUT,
            retry_limit: None,
        }
    }
}

impl ChannelConfig {
    pub fn new(max_payload: usize) -> Result<Self> {
        let config = ChannelConfig {
            max_payload,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn max_datagram(&self) -> usize {
        HEADER_LEN + self.max_payload
    }

    pub fn validate(&self) -> Result<()> {
        let ceiling = UDP_MAX_PAYLOAD - HEADER_LEN;
        if self.max_payload == 0 || self.max_payload > ceiling {
            return Err(StopWaitError::BadConfig(format!(
                "max_payload must be within 1..={ceiling}, got {}",
                self.max_payload
            )));
        }
        if self.poll_timeout.is_zero() {
            return Err(StopWaitError::BadConfig(
                "poll_timeout must be non-zero".to_string(),
            ));
        }
        if self.retry_limit == Some(0) {
            return Err(StopWaitError::BadConfig(
                "retry_limit must allow at least one transmission".to_string(),
            ));
        }
        Ok(())
    }
}
