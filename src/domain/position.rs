//! Whole-share long position held by the simulated portfolio.

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    /// Removes up to `quantity` shares; returns how many were actually removed.
    pub fn reduce(&mut self, quantity: i64) -> i64 {
        let removed = quantity.min(self.quantity).max(0);
        self.quantity -= removed;
        removed
    }
}
