use anyhow::{anyhow, bail, Error, Result};
use rand::Rng;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// A uniformly random delay between two bounds, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self> {
        if min_ms > max_ms {
            bail!("delay range minimum {}ms exceeds maximum {}ms", min_ms, max_ms);
        }
        Ok(DelayRange { min_ms, max_ms })
    }

    #[cfg(test)]
    pub const fn none() -> Self {
        DelayRange { min_ms: 0, max_ms: 0 }
    }

    pub fn pick(&self) -> Duration {
        if self.max_ms == 0 {
            return Duration::from_millis(0);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }

    pub async fn wait(&self, reason: &str) {
        let duration = self.pick();
        if duration.as_millis() > 0 {
            debug!(?duration, reason, "sleeping");
            sleep(duration).await;
        }
    }
}

/// Parses `MIN-MAX` or a single fixed value, both in milliseconds.
impl FromStr for DelayRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |value: &str| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| anyhow!("invalid delay {:?}, expected milliseconds like 2000-5000", s))
        };
        match s.split_once('-') {
            Some((min, max)) => DelayRange::new(parse(min)?, parse(max)?),
            None => {
                let fixed = parse(s)?;
                DelayRange::new(fixed, fixed)
            }
        }
    }
}

impl Display for DelayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min_ms, self.max_ms)
    }
}

/// Courtesy delays between requests. Politeness delays apply after every step regardless of the
/// outcome; the backoff delay is added only after a step that failed.
#[derive(Debug, Clone)]
pub struct Pacing {
    pub after_conversion: DelayRange,
    pub after_panorama: DelayRange,
    pub after_point: DelayRange,
    pub backoff: DelayRange,
}

pub const CONVERSION_DELAY: DelayRange = DelayRange { min_ms: 1000, max_ms: 2000 };
pub const PANORAMA_DELAY: DelayRange = DelayRange { min_ms: 1000, max_ms: 3000 };
pub const POINT_DELAY: DelayRange = DelayRange { min_ms: 2000, max_ms: 5000 };
pub const BACKOFF_DELAY: DelayRange = DelayRange { min_ms: 5000, max_ms: 10000 };

impl Pacing {
    #[cfg(test)]
    pub fn disabled() -> Self {
        Pacing {
            after_conversion: DelayRange::none(),
            after_panorama: DelayRange::none(),
            after_point: DelayRange::none(),
            backoff: DelayRange::none(),
        }
    }

    pub async fn conversion_done(&self, ok: bool) {
        self.after_conversion.wait("conversion batch").await;
        self.backoff_if_failed(ok).await;
    }

    pub async fn panorama_done(&self, ok: bool) {
        self.after_panorama.wait("panorama").await;
        self.backoff_if_failed(ok).await;
    }

    pub async fn point_done(&self, ok: bool) {
        self.after_point.wait("point").await;
        self.backoff_if_failed(ok).await;
    }

    async fn backoff_if_failed(&self, ok: bool) {
        if !ok {
            self.backoff.wait("backoff after failure").await;
        }
    }
}
