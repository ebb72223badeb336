use crate::errors::PipelineError;
use crate::repositories::exchange::SymbolDirectory;
use crate::value_objects::symbol::{QuoteAsset, Symbol};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolResolution {
    pub available: Vec<Symbol>,
    pub missing: Vec<Symbol>,
}

impl SymbolResolution {
    pub fn candidates(&self) -> usize {
        self.available.len() + self.missing.len()
    }
}

/// Pairs each currency with the quote asset, in input order, dropping the
/// self-pair and repeats.
pub fn candidate_symbols(currencies: &[String], quote: &QuoteAsset) -> Vec<Symbol> {
    let mut seen = HashSet::new();
    currencies
        .iter()
        .filter_map(|currency| Symbol::from_pair(currency, quote))
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}

/// Splits candidates into tradable and untradable using a single directory
/// lookup.
pub fn resolve_symbols(
    currencies: &[String],
    quote: &QuoteAsset,
    directory: &dyn SymbolDirectory,
) -> Result<SymbolResolution, PipelineError> {
    let candidates = candidate_symbols(currencies, quote);
    let listed: HashSet<String> = directory
        .list_symbols()
        .map_err(PipelineError::DirectoryUnavailable)?
        .into_iter()
        .collect();

    let (available, missing): (Vec<Symbol>, Vec<Symbol>) = candidates
        .into_iter()
        .partition(|symbol| listed.contains(symbol.as_str()));

    tracing::debug!(
        listed = listed.len(),
        available = available.len(),
        missing = missing.len(),
        "resolved symbols against exchange directory"
    );
    Ok(SymbolResolution { available, missing })
}
