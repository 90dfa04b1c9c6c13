//! Fold of the three analytics sources into one record per cruise.
//!
//! Sources are applied in a fixed order: receipt analytics establishes the
//! baseline, the cross reference fills gaps and owns statement fields, and
//! the financial summary overwrites amounts it supplies. A key first seen in
//! a later source starts a record seeded from that source alone.

use super::record::{ConflictKind, MergeConflict, MergedCruiseRecord, RoiPolicy};
use super::source::{CrossReferenceEntry, FinancialSources, ReceiptCruise, SummaryCruise};
use crate::normalize::{ShipDateKey, normalize_ship, parse_date, within_range};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

/// Date window and ship allow-list applied to every source record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeFilters {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub ships: Vec<String>,
}

impl MergeFilters {
    /// Whether a source record for `ship` departing `date` takes part.
    #[must_use]
    pub fn admits(&self, ship: &str, date: &str) -> bool {
        if !within_range(date, self.date_from.as_deref(), self.date_to.as_deref()) {
            return false;
        }
        if self.ships.is_empty() {
            return true;
        }
        let wanted = normalize_ship(ship);
        self.ships.iter().any(|allowed| normalize_ship(allowed) == wanted)
    }
}

/// Merged records (newest departure first) plus advisory conflicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub records: Vec<MergedCruiseRecord>,
    pub conflicts: Vec<MergeConflict>,
}

/// Insertion-ordered map from canonical key to the live record.
#[derive(Default)]
struct Ledger {
    index: HashMap<ShipDateKey, usize>,
    records: Vec<MergedCruiseRecord>,
}

impl Ledger {
    fn get_mut(&mut self, key: &ShipDateKey) -> Option<&mut MergedCruiseRecord> {
        self.index.get(key).map(|&slot| &mut self.records[slot])
    }

    fn contains(&self, key: &ShipDateKey) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or replace, keeping the original position on replace.
    fn put(&mut self, key: ShipDateKey, record: MergedCruiseRecord) {
        if let Some(&slot) = self.index.get(&key) {
            self.records[slot] = record;
        } else {
            self.index.insert(key, self.records.len());
            self.records.push(record);
        }
    }
}

/// Fold all three sources under `filters`.
#[must_use]
pub fn merge_financials(sources: &FinancialSources, filters: &MergeFilters) -> MergeOutcome {
    let mut ledger = Ledger::default();
    let mut conflicts = Vec::new();

    for receipt in &sources.receipts.cruise_breakdown {
        fold_receipt(&mut ledger, &mut conflicts, receipt, filters);
    }
    for entry in &sources.cross_reference.cruises {
        fold_cross_reference(&mut ledger, entry, filters);
    }
    for summary in &sources.summary.cruise_financials {
        fold_summary(&mut ledger, summary, filters);
    }

    let mut records = ledger.records;
    sort_newest_first(&mut records);

    info!(
        records = records.len(),
        conflicts = conflicts.len(),
        "financial merge complete"
    );
    MergeOutcome { records, conflicts }
}

fn fold_receipt(
    ledger: &mut Ledger,
    conflicts: &mut Vec<MergeConflict>,
    receipt: &ReceiptCruise,
    filters: &MergeFilters,
) {
    if !filters.admits(&receipt.ship, &receipt.departure_date) {
        return;
    }
    let key = ShipDateKey::new(&receipt.ship, &receipt.departure_date);

    let mut record = MergedCruiseRecord::new(&receipt.cruise_id, &receipt.ship, &receipt.departure_date);
    record.has_receipts = receipt.has_receipts.unwrap_or(true);
    record.receipt_count = receipt.receipt_count.unwrap_or(1);
    record.has_statements = receipt.has_statements.unwrap_or(false);
    record.statement_count = receipt.statement_count.unwrap_or(0);
    record.retail_price = Some(receipt.retail_price.unwrap_or(0.0));
    record.amount_paid = Some(receipt.amount_paid.unwrap_or(0.0));
    record.free_play = Some(receipt.free_play.unwrap_or(0.0));
    record.casino_spend = Some(receipt.club_royale_entertainment.unwrap_or(0.0));
    record.recompute_derived(RoiPolicy::Recompute);

    if ledger.contains(&key) {
        debug!(%key, "duplicate receipt link");
        conflicts.push(MergeConflict {
            kind: ConflictKind::DuplicateReceiptLink,
            details: format!("Duplicate receipt match for {key}"),
            ship: Some(receipt.ship.clone()),
            departure_date: Some(receipt.departure_date.clone()),
            cruise_id: Some(receipt.cruise_id.clone()).filter(|id| !id.is_empty()),
        });
    }
    ledger.put(key, record);
}

fn fold_cross_reference(ledger: &mut Ledger, entry: &CrossReferenceEntry, filters: &MergeFilters) {
    let Some(cruise) = entry.cruise.as_ref() else {
        return;
    };
    if cruise.ship.is_empty() || cruise.departure_date.is_empty() {
        return;
    }
    if !filters.admits(&cruise.ship, &cruise.departure_date) {
        return;
    }
    let key = ShipDateKey::new(&cruise.ship, &cruise.departure_date);
    let analytics = entry.analytics.clone().unwrap_or_default();
    let from_receipts = analytics.total_receipt_spending.unwrap_or(0.0);
    let from_statements = analytics.total_statement_spending.unwrap_or(0.0);

    if let Some(existing) = ledger.get_mut(&key) {
        if let Some(has) = analytics.has_statement_data {
            existing.has_statements = has;
        }
        if let Some(count) = analytics.statement_count {
            existing.statement_count = count;
        }
        existing.total_onboard = Some(from_statements);
        if is_blank(existing.retail_price) {
            existing.retail_price = Some(from_receipts);
        }
        if is_blank(existing.amount_paid) {
            existing.amount_paid = Some(from_receipts);
        }
        existing.recompute_derived(RoiPolicy::Recompute);
        debug!(%key, "cross reference folded into existing record");
        return;
    }

    let mut record = MergedCruiseRecord::new(&cruise.id, &cruise.ship, &cruise.departure_date);
    record.return_date = cruise.return_date.clone();
    record.nights = cruise.nights;
    record.has_receipts = analytics.has_receipt_data.unwrap_or(false);
    record.receipt_count = analytics.receipt_count.unwrap_or(0);
    record.has_statements = analytics.has_statement_data.unwrap_or(false);
    record.statement_count = analytics.statement_count.unwrap_or(0);
    record.retail_price = Some(from_receipts);
    record.amount_paid = Some(from_receipts);
    record.casino_spend = Some(from_statements);
    record.total_onboard = Some(from_statements);
    record.recompute_derived(RoiPolicy::Recompute);
    ledger.put(key, record);
}

fn fold_summary(ledger: &mut Ledger, summary: &SummaryCruise, filters: &MergeFilters) {
    if !filters.admits(&summary.ship, &summary.departure_date) {
        return;
    }
    let key = ShipDateKey::new(&summary.ship, &summary.departure_date);
    let financial = &summary.financial;
    let points = financial.points_earned.unwrap_or(0.0);

    if let Some(existing) = ledger.get_mut(&key) {
        existing.retail_price = Some(financial.total_retail_value.or(existing.retail_price).unwrap_or(0.0));
        existing.amount_paid = Some(financial.total_paid.or(existing.amount_paid).unwrap_or(0.0));
        if financial.casino_spend.is_some() {
            existing.casino_spend = financial.casino_spend;
        }
        existing.points_earned = Some(points);
        existing.recompute_derived(RoiPolicy::KeepWhenUnpaid);
        debug!(%key, "financial summary folded into existing record");
        return;
    }

    let mut record = MergedCruiseRecord::new(&summary.cruise_id, &summary.ship, &summary.departure_date);
    record.nights = summary.nights;
    record.has_receipts = summary.has_receipt_data;
    record.receipt_count = u32::from(summary.has_receipt_data);
    record.has_statements = summary.has_statement_data;
    record.statement_count = u32::from(summary.has_statement_data);
    record.retail_price = Some(financial.total_retail_value.unwrap_or(0.0));
    record.amount_paid = Some(financial.total_paid.unwrap_or(0.0));
    record.casino_spend = Some(financial.casino_spend.unwrap_or(0.0));
    record.total_onboard = Some(financial.total_spent.unwrap_or(0.0));
    record.points_earned = Some(points);
    record.recompute_derived(RoiPolicy::Recompute);
    ledger.put(key, record);
}

fn is_blank(amount: Option<f64>) -> bool {
    amount.is_none_or(|value| value == 0.0)
}

/// Newest departure first; records whose date does not parse go last in
/// their original order.
pub fn sort_newest_first(records: &mut [MergedCruiseRecord]) {
    records.sort_by(|a, b| match (parse_date(&a.departure_date), parse_date(&b.departure_date)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
