//! Cross-source financial reconciliation.

mod merge;
mod record;
mod source;
mod totals;

pub use merge::{MergeFilters, MergeOutcome, merge_financials, sort_newest_first};
pub use record::{ConflictKind, MergeConflict, MergedCruiseRecord, RoiPolicy};
pub use source::{
    CrossReference, CrossReferenceAnalytics, CrossReferenceCruise, CrossReferenceEntry, FinancialSources,
    FinancialSummary, ReceiptAnalytics, ReceiptCruise, SummaryCruise, SummaryFinancial,
};
pub use totals::{LedgerTotals, top_by_roi};
