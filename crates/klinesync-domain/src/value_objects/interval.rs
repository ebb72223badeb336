use serde::{Deserialize, Serialize};

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Kline bucket width, labelled the way the exchange expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KlineInterval {
    pub label: String,
    pub step_ms: i64,
}

impl KlineInterval {
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        // `1M` (month) and `1m` (minute) only differ by case.
        let (label, step_ms) = match trimmed {
            "1M" => ("1M", 30 * DAY_MS),
            other => match other.to_lowercase().as_str() {
                "1m" | "1min" => ("1m", MINUTE_MS),
                "3m" | "3min" => ("3m", 3 * MINUTE_MS),
                "5m" | "5min" => ("5m", 5 * MINUTE_MS),
                "15m" | "15min" => ("15m", 15 * MINUTE_MS),
                "30m" | "30min" => ("30m", 30 * MINUTE_MS),
                "1h" | "1hour" => ("1h", HOUR_MS),
                "2h" | "2hour" => ("2h", 2 * HOUR_MS),
                "4h" | "4hour" => ("4h", 4 * HOUR_MS),
                "6h" | "6hour" => ("6h", 6 * HOUR_MS),
                "8h" | "8hour" => ("8h", 8 * HOUR_MS),
                "12h" | "12hour" => ("12h", 12 * HOUR_MS),
                "1d" | "1day" => ("1d", DAY_MS),
                "3d" | "3day" => ("3d", 3 * DAY_MS),
                "1w" | "1week" => ("1w", 7 * DAY_MS),
                "1month" => ("1M", 30 * DAY_MS),
                _ => return Err(format!("unsupported kline interval: {value}")),
            },
        };
        Ok(Self {
            label: label.to_string(),
            step_ms,
        })
    }

    /// Number of buckets whose open time falls inside `[start_ms, end_ms]`
    /// when buckets are aligned to `start_ms`.
    pub fn buckets_between(&self, start_ms: i64, end_ms: i64) -> i64 {
        if end_ms < start_ms {
            return 0;
        }
        (end_ms - start_ms) / self.step_ms + 1
    }
}

impl Default for KlineInterval {
    fn default() -> Self {
        Self {
            label: "1h".to_string(),
            step_ms: HOUR_MS,
        }
    }
}

impl TryFrom<String> for KlineInterval {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<KlineInterval> for String {
    fn from(value: KlineInterval) -> Self {
        value.label
    }
}
