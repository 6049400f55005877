//! Signal-count confidence heuristic.

use serde::{Deserialize, Serialize};

use super::rules::VendorHeuristic;
use crate::models::config::ConfidenceWeights;
use crate::models::validation::clamp_unit;

/// A field whose presence raises extraction confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Vendor,
    InvoiceNumber,
    InvoiceDate,
    DueDate,
    TotalAmount,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::Vendor,
        Signal::InvoiceNumber,
        Signal::InvoiceDate,
        Signal::DueDate,
        Signal::TotalAmount,
    ];
}

/// Which signals an extraction resolved, and the score they add up to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    pub found: Vec<Signal>,
    pub missing: Vec<Signal>,
    pub vendor_heuristic: Option<VendorHeuristic>,
    pub structured_line_items: bool,
    pub score: f64,
}

impl SignalReport {
    pub fn new(
        found: Vec<Signal>,
        vendor_heuristic: Option<VendorHeuristic>,
        structured_line_items: bool,
        weights: &ConfidenceWeights,
    ) -> Self {
        let mut found = found;
        found.sort();
        found.dedup();
        let missing = Signal::ALL
            .iter()
            .copied()
            .filter(|s| !found.contains(s))
            .collect();
        let score = score_signals(&found, structured_line_items, weights);

        Self {
            found,
            missing,
            vendor_heuristic,
            structured_line_items,
            score,
        }
    }
}

/// Score in [0, 1]: a fixed weight per resolved signal plus a bonus for a
/// parsed line item table.
pub fn score_signals(found: &[Signal], structured_line_items: bool, weights: &ConfidenceWeights) -> f64 {
    let mut score = found.len() as f64 * weights.signal_weight;
    if structured_line_items {
        score += weights.line_items_bonus;
    }
    clamp_unit(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_more_signals_more_confidence() {
        let weights = ConfidenceWeights::default();
        let none = score_signals(&[], false, &weights);
        let some = score_signals(&[Signal::Vendor, Signal::TotalAmount], false, &weights);
        let all = score_signals(&Signal::ALL, false, &weights);
        let all_with_table = score_signals(&Signal::ALL, true, &weights);

        assert_eq!(none, 0.0);
        assert!(none < some && some < all && all < all_with_table);
        assert!(all_with_table <= 1.0);
    }

    #[test]
    fn test_score_is_clamped() {
        let weights = ConfidenceWeights {
            signal_weight: 0.5,
            line_items_bonus: 0.5,
        };
        assert_eq!(score_signals(&Signal::ALL, true, &weights), 1.0);
    }

    #[test]
    fn test_report_lists_missing() {
        let report = SignalReport::new(
            vec![Signal::TotalAmount, Signal::Vendor, Signal::Vendor],
            None,
            false,
            &ConfidenceWeights::default(),
        );
        assert_eq!(report.found, vec![Signal::Vendor, Signal::TotalAmount]);
        assert_eq!(
            report.missing,
            vec![Signal::InvoiceNumber, Signal::InvoiceDate, Signal::DueDate]
        );
    }
}
