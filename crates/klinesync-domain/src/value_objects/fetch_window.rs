use chrono::{DateTime, Utc};

/// Closed interval `[start_ms, end_ms]` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl FetchWindow {
    pub fn new(start_ms: i64, end_ms: i64) -> Result<Self, String> {
        if start_ms > end_ms {
            return Err(format!(
                "fetch window start ({start_ms}) is after end ({end_ms})"
            ));
        }
        Ok(Self { start_ms, end_ms })
    }

    pub fn contains(&self, ts_ms: i64) -> bool {
        ts_ms >= self.start_ms && ts_ms <= self.end_ms
    }

    pub fn start_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_ms)
    }

    pub fn end_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.end_ms)
    }
}

impl std::fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.start_utc(), self.end_utc()) {
            (Some(start), Some(end)) => write!(f, "{} .. {}", start.to_rfc3339(), end.to_rfc3339()),
            _ => write!(f, "{} .. {}", self.start_ms, self.end_ms),
        }
    }
}
