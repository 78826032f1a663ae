use std::collections::BTreeSet;
use std::sync::RwLock;

/// Set of symbols with at least one stored record.
///
/// Seeded from storage when the engine is built and extended by ingestion.
/// Ordered, so iteration (and everything ranked from it) is deterministic.
pub struct SymbolRegistry {
    symbols: RwLock<BTreeSet<String>>,
}

impl std::fmt::Debug for SymbolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolRegistry")
            .field("symbols", &self.snapshot())
            .finish()
    }
}

impl SymbolRegistry {
    pub fn new(seed: BTreeSet<String>) -> Self {
        Self {
            symbols: RwLock::new(seed),
        }
    }

    /// Returns true if the symbol was not known before
    pub fn register(&self, symbol: &str) -> bool {
        match self.symbols.write() {
            Ok(mut guard) => guard.insert(symbol.to_string()),
            Err(poisoned) => {
                tracing::error!("SymbolRegistry: Lock poisoned during write, recovering");
                poisoned.into_inner().insert(symbol.to_string())
            }
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        match self.symbols.read() {
            Ok(guard) => guard.contains(symbol),
            Err(poisoned) => poisoned.into_inner().contains(symbol),
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        match self.symbols.read() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self.symbols.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        Self::new(BTreeSet::new())
    }
}
