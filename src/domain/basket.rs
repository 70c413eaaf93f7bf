//! The long basket staged by fine selection and consumed by a normal rebalance.

/// `Empty` until fine selection stages symbols; back to `Empty` once the scheduler
/// has allocated them, so repeated due ticks cannot allocate twice.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LongBasket {
    #[default]
    Empty,
    Staged(Vec<String>),
}

impl LongBasket {
    /// Replaces whatever was staged before. Staging no symbols empties the basket.
    pub fn stage(&mut self, symbols: Vec<String>) {
        *self = if symbols.is_empty() {
            LongBasket::Empty
        } else {
            LongBasket::Staged(symbols)
        };
    }

    /// Takes the staged symbols, leaving the basket empty.
    pub fn consume(&mut self) -> Vec<String> {
        match std::mem::take(self) {
            LongBasket::Staged(symbols) => symbols,
            LongBasket::Empty => Vec::new(),
        }
    }

    pub fn symbols(&self) -> &[String] {
        match self {
            LongBasket::Staged(symbols) => symbols,
            LongBasket::Empty => &[],
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols().iter().any(|s| s == symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
