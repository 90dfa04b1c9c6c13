use super::record::MergedCruiseRecord;
use serde::Serialize;
use std::cmp::Ordering;

/// Aggregates over a set of merged records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LedgerTotals {
    pub records: usize,
    pub total_retail: f64,
    pub total_paid: f64,
    pub total_savings: f64,
    /// Payment-weighted ROI; zero when nothing was paid.
    pub weighted_roi: f64,
    pub total_points: f64,
}

impl LedgerTotals {
    #[must_use]
    pub fn of(records: &[MergedCruiseRecord]) -> Self {
        let mut totals = Self {
            records: records.len(),
            ..Self::default()
        };
        let mut roi_weight = 0.0;
        for record in records {
            let paid = record.amount_paid.unwrap_or(0.0);
            totals.total_retail += record.retail_price.unwrap_or(0.0);
            totals.total_paid += paid;
            totals.total_savings += record.savings();
            totals.total_points += record.points_earned.unwrap_or(0.0);
            roi_weight += record.roi() * paid;
        }
        if totals.total_paid > 0.0 {
            totals.weighted_roi = roi_weight / totals.total_paid;
        }
        totals
    }
}

/// The `limit` records with the highest ROI, best first. Ties keep input order.
#[must_use]
pub fn top_by_roi(records: &[MergedCruiseRecord], limit: usize) -> Vec<&MergedCruiseRecord> {
    let mut ranked: Vec<&MergedCruiseRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.roi().partial_cmp(&a.roi()).unwrap_or(Ordering::Equal));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::financial::record::RoiPolicy;

    fn record(id: &str, retail: f64, paid: f64, points: f64) -> MergedCruiseRecord {
        let mut record = MergedCruiseRecord::new(id, "Wonder", "2025-01-01");
        record.retail_price = Some(retail);
        record.amount_paid = Some(paid);
        record.points_earned = Some(points);
        record.recompute_derived(RoiPolicy::Recompute);
        record
    }

    #[test]
    fn totals_weight_roi_by_payment() {
        // roi 100% on 100 paid, 300% on 300 paid
        let records = vec![record("a", 200.0, 100.0, 10.0), record("b", 1200.0, 300.0, 20.0)];
        let totals = LedgerTotals::of(&records);
        assert_eq!(totals.records, 2);
        assert!((totals.total_retail - 1400.0).abs() < 1e-9);
        assert!((totals.total_paid - 400.0).abs() < 1e-9);
        assert!((totals.total_savings - 1000.0).abs() < 1e-9);
        assert!((totals.total_points - 30.0).abs() < 1e-9);
        assert!((totals.weighted_roi - 250.0).abs() < 1e-9);
    }

    #[test]
    fn totals_of_nothing_are_zero() {
        assert_eq!(LedgerTotals::of(&[]), LedgerTotals::default());
    }

    #[test]
    fn top_by_roi_ranks_and_truncates() {
        let records = vec![
            record("low", 110.0, 100.0, 0.0),
            record("high", 500.0, 100.0, 0.0),
            record("mid", 200.0, 100.0, 0.0),
        ];
        let top: Vec<_> = top_by_roi(&records, 2).iter().map(|r| r.cruise_id.as_str()).collect();
        assert_eq!(top, ["high", "mid"]);
        assert_eq!(top_by_roi(&records, 10).len(), 3);
    }
}
