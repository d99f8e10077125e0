// ABOUTME: Bounded-wait configuration for each probe step.
// ABOUTME: Every step defaults to five seconds.

use crate::ssh::DEFAULT_TIMEOUT;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub connect: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub auth: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub channel_open: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub channel_close: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl TimeoutsConfig {
    /// Name of the first timeout that is zero, if any.
    pub(crate) fn first_zero(&self) -> Option<&'static str> {
        [
            ("connect", self.connect),
            ("auth", self.auth),
            ("channel_open", self.channel_open),
            ("channel_close", self.channel_close),
        ]
        .into_iter()
        .find(|(_, d)| d.is_zero())
        .map(|(name, _)| name)
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        TimeoutsConfig {
            connect: default_timeout(),
            auth: default_timeout(),
            channel_open: default_timeout(),
            channel_close: default_timeout(),
        }
    }
}
