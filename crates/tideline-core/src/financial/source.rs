//! Input shapes of the three analytics sources.
//!
//! Every field is optional on the wire; amounts may be numbers or currency
//! strings. Missing envelopes and `null` lists parse as empty.

use crate::model::lenient;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Receipt analytics (baseline)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptAnalytics {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub cruise_breakdown: Vec<ReceiptCruise>,
}

/// One cruise as seen from uploaded receipts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptCruise {
    #[serde(default, deserialize_with = "lenient::string")]
    pub cruise_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ship: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub departure_date: String,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub has_receipts: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub receipt_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub has_statements: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub statement_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub retail_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub amount_paid: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub free_play: Option<f64>,
    /// Casino spend as labelled by the loyalty program.
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub club_royale_entertainment: Option<f64>,
}

// ---------------------------------------------------------------------------
// Cross reference (receipts + statements)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossReference {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub cruises: Vec<CrossReferenceEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossReferenceEntry {
    #[serde(default)]
    pub cruise: Option<CrossReferenceCruise>,
    #[serde(default)]
    pub analytics: Option<CrossReferenceAnalytics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossReferenceCruise {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ship: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub departure_date: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub return_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub nights: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossReferenceAnalytics {
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub total_receipt_spending: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub total_statement_spending: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub has_statement_data: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub statement_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub has_receipt_data: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub receipt_count: Option<u32>,
}

// ---------------------------------------------------------------------------
// Financial summary (authoritative)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    #[serde(default, deserialize_with = "lenient::seq")]
    pub cruise_financials: Vec<SummaryCruise>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCruise {
    #[serde(default, deserialize_with = "lenient::string")]
    pub cruise_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ship: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub departure_date: String,
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub nights: Option<u32>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub has_receipt_data: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub has_statement_data: bool,
    #[serde(default)]
    pub financial: SummaryFinancial,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryFinancial {
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub total_retail_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub total_paid: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub casino_spend: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub total_spent: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub points_earned: Option<f64>,
}

/// The three result sets, any of which may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialSources {
    pub receipts: ReceiptAnalytics,
    pub cross_reference: CrossReference,
    pub summary: FinancialSummary,
}
