use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, str::FromStr, time::Duration};

use crate::{Error, InternalResult};

/// Settings shared by an [`EventWaiter`](crate::EventWaiter) and the
/// [`EventBus`](crate::EventBus) feeding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaiterConfig {
    /// Timeout used by `EventWaiter::wait`.
    #[serde(default = "default_timeout", with = "duration_ms")]
    pub default_timeout: Duration,

    /// Capacity of an event bus built with `EventBus::from_config`.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            default_timeout: default_timeout(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl WaiterConfig {
    // JSONファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }
}

impl FromStr for WaiterConfig {
    type Err = Error;

    fn from_str(s: &str) -> InternalResult<Self> {
        from_str(s)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::config(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

// デフォルト値の定義
fn default_timeout() -> Duration {
    Duration::from_millis(1000)
}

fn default_event_buffer_size() -> usize {
    1000
}

pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Whole milliseconds, clamped to `u64::MAX`.
    pub fn saturating_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(saturating_millis(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
