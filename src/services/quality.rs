//! Quality Search
//!
//! Bounded walk down the encoder quality scale until an encoded image fits
//! its byte budget.
//!
//! The search knows nothing about pixels or codecs: the optimizer asks for
//! the quality to encode at, reports the encoded size back, and stops once
//! the state is terminal.

use serde::Serialize;

/// Lowest quality the search will encode at
pub const QUALITY_FLOOR: u8 = 45;
/// Quality reduction between attempts, in percentage points
pub const QUALITY_STEP: u8 = 10;
/// Hard cap on encodes per image (first encode included)
pub const MAX_ATTEMPTS: u32 = 6;

/// Search state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchState {
    /// Next encode should use `quality`
    Encoding { quality: u8 },
    /// Last encode fit the budget
    BudgetMet,
    /// Over budget at the floor quality
    FloorReached,
    /// Over budget with no attempts left
    AttemptsExhausted,
}

impl SearchState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Encoding { .. } => "encoding",
            Self::BudgetMet => "budget_met",
            Self::FloorReached => "floor_reached",
            Self::AttemptsExhausted => "attempts_exhausted",
        }
    }
}

/// Quality search over one image
#[derive(Debug, Clone)]
pub struct QualitySearch {
    budget: u64,
    quality: u8,
    attempts: u32,
    state: SearchState,
}

impl QualitySearch {
    /// Start at `initial_quality` (1-100) against a budget in bytes
    pub fn new(initial_quality: u8, budget: u64) -> Self {
        let quality = initial_quality.clamp(1, 100);
        Self {
            budget,
            quality,
            attempts: 0,
            state: SearchState::Encoding { quality },
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Quality of the most recent (or next) encode
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encodes recorded so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record the size produced at the current quality and advance.
    ///
    /// Calling this on a terminal search is a no-op.
    pub fn record(&mut self, encoded_size: u64) -> SearchState {
        let SearchState::Encoding { quality } = self.state else {
            return self.state;
        };

        self.attempts += 1;

        self.state = if encoded_size <= self.budget {
            SearchState::BudgetMet
        } else if quality <= QUALITY_FLOOR {
            SearchState::FloorReached
        } else if self.attempts >= MAX_ATTEMPTS {
            SearchState::AttemptsExhausted
        } else {
            let next = quality.saturating_sub(QUALITY_STEP).max(QUALITY_FLOOR);
            self.quality = next;
            SearchState::Encoding { quality: next }
        };

        self.state
    }
}
