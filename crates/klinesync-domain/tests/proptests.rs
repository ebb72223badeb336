use klinesync_domain::repositories::exchange::{KlinePageRequest, KlineSource, SymbolDirectory};
use klinesync_domain::services::normalize::normalize;
use klinesync_domain::services::range_fetch::{fetch_range, RangeFetchOptions};
use klinesync_domain::services::symbols::resolve_symbols;
use klinesync_domain::value_objects::fetch_window::FetchWindow;
use klinesync_domain::value_objects::kline::RawKline;
use klinesync_domain::value_objects::symbol::{QuoteAsset, Symbol};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;

fn raw_row(open_time: i64) -> RawKline {
    RawKline(vec![
        json!(open_time),
        json!("1.0"),
        json!("2.0"),
        json!("0.5"),
        json!("1.5"),
        json!("3.0"),
        json!(open_time + 59_999),
        json!("4.5"),
        json!(7),
        json!("1.0"),
        json!("1.5"),
        json!("0"),
    ])
}

/// In-memory exchange over a fixed set of bucket open times. With
/// `honor_end = false` it behaves like a server that ignores `endTime`.
struct HistoryExchange {
    open_times: Vec<i64>,
    honor_end: bool,
}

impl KlineSource for HistoryExchange {
    fn fetch_page(&self, request: &KlinePageRequest) -> Result<Vec<RawKline>, String> {
        Ok(self
            .open_times
            .iter()
            .copied()
            .filter(|ts| *ts >= request.start_ms)
            .filter(|ts| !self.honor_end || *ts <= request.end_ms)
            .take(request.limit as usize)
            .map(raw_row)
            .collect())
    }
}

struct StaticDirectory(Vec<String>);

impl SymbolDirectory for StaticDirectory {
    fn list_symbols(&self) -> Result<Vec<String>, String> {
        Ok(self.0.clone())
    }
}

fn options(page_size: u32) -> RangeFetchOptions {
    RangeFetchOptions {
        page_size,
        request_delay: Duration::ZERO,
        ..RangeFetchOptions::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn fetched_open_times_strictly_increase_inside_window(
        buckets in prop::collection::btree_set(0i64..500, 0..120),
        start in 0i64..300,
        span in 0i64..300,
        page_size in 1u32..40,
        honor_end in any::<bool>(),
    ) {
        let open_times: Vec<i64> = buckets.iter().map(|b| b * 60_000).collect();
        let exchange = HistoryExchange { open_times: open_times.clone(), honor_end };
        let window = FetchWindow::new(start * 60_000, (start + span) * 60_000).unwrap();

        let outcome = fetch_range(&exchange, &Symbol::new("BTCUSDT"), window, &options(page_size))
            .expect("fetch");
        let fetched: Vec<i64> = outcome.rows.iter().filter_map(|r| r.open_time()).collect();

        prop_assert!(fetched.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(fetched.iter().all(|ts| window.contains(*ts)));

        let expected: Vec<i64> = open_times
            .iter()
            .copied()
            .filter(|ts| window.contains(*ts))
            .collect();
        prop_assert_eq!(fetched, expected);
    }

    #[test]
    fn normalization_preserves_row_count(
        open_times in prop::collection::vec(0i64..1_000_000, 0..64),
    ) {
        let rows: Vec<RawKline> = open_times.iter().copied().map(raw_row).collect();
        let klines = normalize(&rows, &Symbol::new("ETHUSDT")).expect("normalize");
        prop_assert_eq!(klines.len(), rows.len());
        prop_assert!(klines.iter().all(|k| k.symbol == "ETHUSDT"));
    }

    #[test]
    fn resolution_is_repeatable_for_same_snapshot(
        currencies in prop::collection::vec("[A-Z]{2,5}", 0..12),
        listed in prop::collection::btree_set("[A-Z]{2,5}USDT", 0..12),
    ) {
        let directory = StaticDirectory(listed.iter().cloned().collect());
        let quote = QuoteAsset::default();
        let first = resolve_symbols(&currencies, &quote, &directory).expect("resolve");
        let second = resolve_symbols(&currencies, &quote, &directory).expect("resolve");
        prop_assert_eq!(&first, &second);

        let listed: BTreeSet<String> = listed;
        prop_assert!(first.available.iter().all(|s| listed.contains(s.as_str())));
        prop_assert!(first.missing.iter().all(|s| !listed.contains(s.as_str())));
    }
}
