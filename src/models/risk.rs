//! Per-resource failure-risk scores.
//!
//! Supplied by an external predictive subsystem as a read-only lookup
//! `resource_code → risk ∈ [0, 1]`. The repair objective uses these to
//! penalize placing work on resources likely to go down. An absent entry
//! means zero risk, so the table degrades gracefully to "no penalty".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read-only map of predicted down-risk per resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskTable {
    scores: HashMap<String, f64>,
}

impl RiskTable {
    /// Creates an empty table (every resource risk-free).
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a risk score, clamped to `[0, 1]`.
    pub fn with_risk(mut self, resource_code: impl Into<String>, risk: f64) -> Self {
        self.scores
            .insert(resource_code.into(), risk.clamp(0.0, 1.0));
        self
    }

    /// Risk for a resource; `0.0` when unknown.
    pub fn risk_for(&self, resource_code: &str) -> f64 {
        self.scores.get(resource_code).copied().unwrap_or(0.0)
    }

    /// Whether the table carries any scores.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl FromIterator<(String, f64)> for RiskTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let scores = iter
            .into_iter()
            .map(|(code, risk)| (code, risk.clamp(0.0, 1.0)))
            .collect();
        Self { scores }
    }
}
