use serde::{Deserialize, Serialize};
use std::fmt;

/// One reconciled cruise: the fold of every source record sharing its
/// ship/date key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedCruiseRecord {
    pub cruise_id: String,
    pub ship: String,
    pub departure_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nights: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retail_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_paid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_play: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casino_spend: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_onboard: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_earned: Option<f64>,
    pub has_receipts: bool,
    pub receipt_count: u32,
    pub has_statements: bool,
    pub statement_count: u32,
    savings: f64,
    roi: f64,
    value_per_point: f64,
}

/// Whether a fold may reset ROI when nothing was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiPolicy {
    /// ROI is zero when paid is zero.
    Recompute,
    /// ROI keeps its previous value when paid is zero.
    KeepWhenUnpaid,
}

impl MergedCruiseRecord {
    #[must_use]
    pub fn new(cruise_id: &str, ship: &str, departure_date: &str) -> Self {
        Self {
            cruise_id: cruise_id.to_string(),
            ship: ship.to_string(),
            departure_date: departure_date.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn savings(&self) -> f64 {
        self.savings
    }

    #[must_use]
    pub const fn roi(&self) -> f64 {
        self.roi
    }

    #[must_use]
    pub const fn value_per_point(&self) -> f64 {
        self.value_per_point
    }

    /// Recompute `savings`, `roi`, and `value_per_point` from the stored
    /// amounts. This is the only writer of the derived fields.
    pub fn recompute_derived(&mut self, policy: RoiPolicy) {
        let retail = self.retail_price.unwrap_or(0.0);
        let paid = self.amount_paid.unwrap_or(0.0);
        let free_play = self.free_play.unwrap_or(0.0);
        let points = self.points_earned.unwrap_or(0.0);

        self.savings = (retail - paid).max(0.0);
        if paid > 0.0 {
            self.roi = (retail + free_play - paid) / paid * 100.0;
        } else if policy == RoiPolicy::Recompute {
            self.roi = 0.0;
        }
        self.value_per_point = if points > 0.0 { self.savings / points } else { 0.0 };
    }
}

/// Kinds of cross-source disagreement. Only duplicate receipt links are
/// detected today; the rest are reserved names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictKind {
    DuplicateReceiptLink,
    DuplicateStatementLink,
    DateMismatch,
    ShipMismatch,
}

impl ConflictKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateReceiptLink => "duplicate-receipt-link",
            Self::DuplicateStatementLink => "duplicate-statement-link",
            Self::DateMismatch => "date-mismatch",
            Self::ShipMismatch => "ship-mismatch",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory record of a collision seen while folding. Never blocks the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeConflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cruise_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(retail: f64, paid: f64) -> MergedCruiseRecord {
        let mut record = MergedCruiseRecord::new("c1", "Wonder", "2025-03-09");
        record.retail_price = Some(retail);
        record.amount_paid = Some(paid);
        record
    }

    #[test]
    fn derived_fields_follow_amounts() {
        let mut r = record(1000.0, 400.0);
        r.free_play = Some(100.0);
        r.points_earned = Some(300.0);
        r.recompute_derived(RoiPolicy::Recompute);
        assert!((r.savings() - 600.0).abs() < f64::EPSILON);
        assert!((r.roi() - 175.0).abs() < 1e-9);
        assert!((r.value_per_point() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn savings_never_negative() {
        let mut r = record(100.0, 400.0);
        r.recompute_derived(RoiPolicy::Recompute);
        assert!(r.savings().abs() < f64::EPSILON);
        assert!(r.roi() < 0.0);
    }

    #[test]
    fn unpaid_roi_depends_on_policy() {
        let mut r = record(1000.0, 400.0);
        r.recompute_derived(RoiPolicy::Recompute);
        let before = r.roi();
        r.amount_paid = Some(0.0);
        r.recompute_derived(RoiPolicy::KeepWhenUnpaid);
        assert!((r.roi() - before).abs() < f64::EPSILON);
        r.recompute_derived(RoiPolicy::Recompute);
        assert!(r.roi().abs() < f64::EPSILON);
    }

    #[test]
    fn conflict_serializes_type_name() {
        let conflict = MergeConflict {
            kind: ConflictKind::DuplicateReceiptLink,
            details: "Duplicate receipt match for wonder|2025-03-09".into(),
            ship: Some("Wonder".into()),
            departure_date: Some("2025-03-09".into()),
            cruise_id: None,
        };
        let value = serde_json::to_value(&conflict).expect("serializes");
        assert_eq!(value["type"], "duplicate-receipt-link");
        assert_eq!(value["departureDate"], "2025-03-09");
        assert!(value.get("cruiseId").is_none());
    }
}
