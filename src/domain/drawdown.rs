//! Portfolio drawdown guard.
//!
//! Tracks the high-water mark of total portfolio value. A breach of the threshold resets
//! the mark to zero; the next observation re-establishes it from scratch.

use log::{debug, warn};

pub const DEFAULT_MAX_DRAWDOWN: f64 = -0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardMode {
    #[default]
    Armed,
    /// Breached on the most recent observation.
    Triggered,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuardSignal {
    Clear { drawdown: f64 },
    Breach { drawdown: f64, high_water_mark: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownGuard {
    threshold: f64,
    high_water_mark: f64,
    initialized: bool,
    mode: GuardMode,
}

impl DrawdownGuard {
    pub fn new(threshold: f64) -> Self {
        DrawdownGuard {
            threshold,
            high_water_mark: 0.0,
            initialized: false,
            mode: GuardMode::Armed,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn high_water_mark(&self) -> f64 {
        self.high_water_mark
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    pub fn observe(&mut self, value: f64) -> GuardSignal {
        if !self.initialized {
            self.high_water_mark = value;
            self.initialized = true;
        }
        if self.high_water_mark < value {
            self.high_water_mark = value;
        }
        if self.mode == GuardMode::Triggered {
            debug!("drawdown guard re-armed at {:.2}", self.high_water_mark);
            self.mode = GuardMode::Armed;
        }

        // A non-positive mark only happens with a worthless portfolio.
        let drawdown = if self.high_water_mark > 0.0 {
            value / self.high_water_mark - 1.0
        } else {
            0.0
        };

        if drawdown < self.threshold {
            let high_water_mark = self.high_water_mark;
            warn!(
                "drawdown {:.2}% breached {:.2}% (value {:.2}, high-water {:.2})",
                drawdown * 100.0,
                self.threshold * 100.0,
                value,
                high_water_mark
            );
            self.high_water_mark = 0.0;
            self.mode = GuardMode::Triggered;
            GuardSignal::Breach {
                drawdown,
                high_water_mark,
            }
        } else {
            GuardSignal::Clear { drawdown }
        }
    }
}

impl Default for DrawdownGuard {
    fn default() -> Self {
        DrawdownGuard::new(DEFAULT_MAX_DRAWDOWN)
    }
}
