use serde::{Deserialize, Serialize};

/// Asset every candidate symbol is priced in (e.g. `USDT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuoteAsset(String);

impl QuoteAsset {
    pub fn parse(value: &str) -> Result<Self, String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("quote asset is empty".to_string());
        }
        if !trimmed
            .chars()
            .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit())
        {
            return Err(format!(
                "quote asset must be upper-case alphanumeric: {value}"
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for QuoteAsset {
    fn default() -> Self {
        Self("USDT".to_string())
    }
}

impl TryFrom<String> for QuoteAsset {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<QuoteAsset> for String {
    fn from(value: QuoteAsset) -> Self {
        value.0
    }
}

impl std::fmt::Display for QuoteAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exchange pair identifier: base currency followed by the quote asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Returns `None` for the self-pair (`USDT` against `USDT`) and blank codes.
    pub fn from_pair(currency: &str, quote: &QuoteAsset) -> Option<Self> {
        let base = currency.trim();
        if base.is_empty() || base == quote.as_str() {
            return None;
        }
        Some(Self(format!("{base}{quote}")))
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
