//! Configuration types for reqsweep

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::error::SpecError;

/// Capacity and pacing for one kind of work (network calls or storage writes)
///
/// `limit` bounds how many units run at once; `rate` is how long a finished
/// unit keeps its slot before the next waiter may take it. Both must be
/// strictly positive, so the only ways to obtain one are [`RateLimit::new`],
/// `Default` and deserialization.
///
/// ```compile_fail
/// use reqsweep::config::RateLimit;
/// use std::time::Duration;
///
/// let unchecked = RateLimit { rate: Duration::ZERO, limit: 0 };
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RateLimit {
    #[serde(with = "duration_serde")]
    rate: Duration,
    limit: usize,
}

impl RateLimit {
    /// Create a validated rate limit
    ///
    /// # Arguments
    ///
    /// * `rate_secs` - Seconds a slot stays occupied after each unit of work
    /// * `limit` - Maximum concurrent units
    ///
    /// # Examples
    ///
    /// ```
    /// use reqsweep::config::RateLimit;
    ///
    /// let limit = RateLimit::new(0.5, 4).unwrap();
    /// assert_eq!(limit.limit(), 4);
    ///
    /// assert!(RateLimit::new(0.0, 0).is_err());
    /// assert!(RateLimit::new(1e30, 1).is_err());
    /// ```
    pub fn new(rate_secs: f64, limit: usize) -> Result<Self, SpecError> {
        let invalid = || SpecError::InvalidRateLimit {
            rate: rate_secs,
            limit,
        };
        // try_from_secs_f64 rejects NaN, negatives and overflow
        let rate = Duration::try_from_secs_f64(rate_secs).map_err(|_| invalid())?;
        if rate.is_zero() || limit == 0 {
            return Err(invalid());
        }
        Ok(Self { rate, limit })
    }

    /// Delay a slot is held after its unit of work finishes
    pub fn rate(&self) -> Duration {
        self.rate
    }

    /// Maximum concurrent units
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            limit: default_limit(),
        }
    }
}

impl<'de> Deserialize<'de> for RateLimit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default = "default_rate_secs")]
            rate: f64,
            #[serde(default = "default_limit")]
            limit: usize,
        }

        let raw = Raw::deserialize(deserializer)?;
        RateLimit::new(raw.rate, raw.limit).map_err(serde::de::Error::custom)
    }
}

/// How axes of different lengths are combined
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Pad shorter axes by repeating their last element
    #[default]
    FillForward,
    /// Only length-1 axes are broadcast; any other mismatch is an error
    Strict,
}

/// Dispatch behaviour for a batch of requests
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Network call limiter (default: 5 concurrent, 5s pacing)
    #[serde(default)]
    pub network: RateLimit,

    /// Storage write limiter (default: 5 concurrent, 5s pacing)
    #[serde(default)]
    pub storage: RateLimit,

    /// Return every descriptor with its outcome after dispatch (default: false)
    #[serde(default)]
    pub collect: bool,

    /// Log each request and save at info level instead of debug (default: false)
    #[serde(default)]
    pub verbose: bool,

    /// Per-request timeout for the HTTP transport (default: 10s)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Axis alignment policy (default: fill-forward)
    #[serde(default)]
    pub alignment: Alignment,

    /// Wait for outstanding storage writes before returning (default: true)
    #[serde(default = "default_true")]
    pub wait_for_storage: bool,

    /// Capacity of the event broadcast channel (default: 1024)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            network: RateLimit::default(),
            storage: RateLimit::default(),
            collect: false,
            verbose: false,
            request_timeout: default_request_timeout(),
            alignment: Alignment::default(),
            wait_for_storage: true,
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_rate() -> Duration {
    Duration::from_secs_f64(default_rate_secs())
}

pub(crate) fn default_rate_secs() -> f64 {
    5.0
}

pub(crate) fn default_limit() -> usize {
    5
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

fn default_event_buffer() -> usize {
    1024
}

// Durations are written as fractional seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
