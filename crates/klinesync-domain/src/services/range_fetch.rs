use crate::errors::PipelineError;
use crate::repositories::exchange::{KlinePageRequest, KlineSource};
use crate::value_objects::fetch_window::FetchWindow;
use crate::value_objects::interval::KlineInterval;
use crate::value_objects::kline::RawKline;
use crate::value_objects::symbol::Symbol;
use std::time::Duration;

pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct RangeFetchOptions {
    pub interval: KlineInterval,
    pub page_size: u32,
    /// Pause between consecutive page requests.
    pub request_delay: Duration,
}

impl Default for RangeFetchOptions {
    fn default() -> Self {
        Self {
            interval: KlineInterval::default(),
            page_size: MAX_PAGE_SIZE,
            request_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The exchange returned an empty page.
    Exhausted,
    /// The cursor moved past the end of the window.
    Covered,
    /// A page kept no new row and its last open time did not move past
    /// the cursor.
    NoProgress,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeFetchOutcome {
    pub rows: Vec<RawKline>,
    pub pages: u32,
    /// Rows dropped because their open time fell outside the window.
    pub trimmed: usize,
    /// Rows dropped because their open time did not advance.
    pub duplicates: usize,
    pub stop: StopReason,
}

/// Walks `window` page by page until the exchange runs dry, the window is
/// covered, or a page fails to move the cursor forward.
///
/// Returned rows have strictly increasing open times, all inside the window.
pub fn fetch_range(
    source: &dyn KlineSource,
    symbol: &Symbol,
    window: FetchWindow,
    options: &RangeFetchOptions,
) -> Result<RangeFetchOutcome, PipelineError> {
    let mut cursor = window.start_ms;
    let mut rows: Vec<RawKline> = Vec::new();
    let mut last_kept: Option<i64> = None;
    let mut pages = 0u32;
    let mut trimmed = 0usize;
    let mut duplicates = 0usize;

    let stop = loop {
        let request = KlinePageRequest {
            symbol: symbol.clone(),
            interval: options.interval.clone(),
            start_ms: cursor,
            end_ms: window.end_ms,
            limit: options.page_size.clamp(1, MAX_PAGE_SIZE),
        };
        let page = source
            .fetch_page(&request)
            .map_err(|err| PipelineError::fetch_failed(symbol.as_str(), err))?;
        pages += 1;

        let Some(last_row) = page.last() else {
            break StopReason::Exhausted;
        };
        let last_open_time = last_row.open_time().ok_or_else(|| {
            PipelineError::SchemaMismatch(format!(
                "{symbol}: kline row without an integer open time"
            ))
        })?;

        let page_len = page.len();
        let kept_before = rows.len();
        for row in page {
            let open_time = row.open_time().ok_or_else(|| {
                PipelineError::SchemaMismatch(format!(
                    "{symbol}: kline row without an integer open time"
                ))
            })?;
            if !window.contains(open_time) {
                trimmed += 1;
                continue;
            }
            if last_kept.is_some_and(|prev| open_time <= prev) {
                duplicates += 1;
                continue;
            }
            last_kept = Some(open_time);
            rows.push(row);
        }

        tracing::debug!(
            symbol = %symbol,
            page = pages,
            cursor,
            rows = page_len,
            last_open_time,
            "kline page"
        );

        // A one-row page at the cursor still advances when its row was kept.
        let kept = rows.len() - kept_before;
        if last_open_time <= cursor && kept == 0 {
            tracing::warn!(
                symbol = %symbol,
                cursor,
                last_open_time,
                "kline page made no progress, stopping"
            );
            break StopReason::NoProgress;
        }

        cursor = cursor.max(last_open_time).saturating_add(1);
        if cursor > window.end_ms {
            break StopReason::Covered;
        }

        if !options.request_delay.is_zero() {
            std::thread::sleep(options.request_delay);
        }
    };

    Ok(RangeFetchOutcome {
        rows,
        pages,
        trimmed,
        duplicates,
        stop,
    })
}
