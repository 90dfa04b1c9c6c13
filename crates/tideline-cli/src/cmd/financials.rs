//! `tl financials merge`: fold receipts, statements, and the summary into
//! one record per cruise.

use super::read_json;
use crate::output::{OutputMode, money, pretty_kv, pretty_rule, pretty_section, render_mode};
use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tideline_core::financial::{
    FinancialSources, LedgerTotals, MergeConflict, MergeFilters, MergedCruiseRecord, merge_financials, top_by_roi,
};

#[derive(Args, Debug)]
pub struct FinancialsArgs {
    #[command(subcommand)]
    pub command: FinancialsCommand,
}

#[derive(Subcommand, Debug)]
pub enum FinancialsCommand {
    #[command(
        about = "Merge the analytics sources into one ledger",
        after_help = "EXAMPLES:\n    tl financials merge --receipts receipts.json --cross-ref xref.json --summary summary.json\n\n    # Only 2025 sailings on one ship\n    tl financials merge --summary summary.json --from 2025-01-01 --to 2025-12-31 --ship \"Wonder of the Seas\""
    )]
    Merge(MergeArgs),
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Receipt analytics (`{ cruiseBreakdown: [...] }`).
    #[arg(long, value_name = "PATH")]
    pub receipts: Option<PathBuf>,

    /// Receipt/statement cross reference (`{ cruises: [...] }`).
    #[arg(long, value_name = "PATH")]
    pub cross_ref: Option<PathBuf>,

    /// Financial summary (`{ cruiseFinancials: [...] }`).
    #[arg(long, value_name = "PATH")]
    pub summary: Option<PathBuf>,

    /// Earliest departure date to include.
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// Latest departure date to include.
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    /// Only include these ships (repeatable).
    #[arg(long = "ship", value_name = "NAME")]
    pub ships: Vec<String>,

    /// Also list the N records with the best ROI.
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,
}

#[derive(Debug, Serialize)]
struct MergeReport<'a> {
    records: &'a [MergedCruiseRecord],
    conflicts: &'a [MergeConflict],
    totals: LedgerTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    top: Option<Vec<&'a MergedCruiseRecord>>,
}

pub fn run_financials(args: &FinancialsArgs, output: OutputMode) -> Result<()> {
    match &args.command {
        FinancialsCommand::Merge(merge) => run_merge(merge, output),
    }
}

fn run_merge(args: &MergeArgs, output: OutputMode) -> Result<()> {
    let sources = FinancialSources {
        receipts: read_optional(args.receipts.as_deref())?,
        cross_reference: read_optional(args.cross_ref.as_deref())?,
        summary: read_optional(args.summary.as_deref())?,
    };
    let filters = MergeFilters {
        date_from: args.from.clone(),
        date_to: args.to.clone(),
        ships: args.ships.clone(),
    };

    let outcome = merge_financials(&sources, &filters);
    let report = MergeReport {
        records: &outcome.records,
        conflicts: &outcome.conflicts,
        totals: LedgerTotals::of(&outcome.records),
        top: args.top.map(|limit| top_by_roi(&outcome.records, limit)),
    };

    render_mode(
        output,
        &report,
        |report, w| {
            for record in report.records {
                write_record_line(w, record)?;
            }
            for conflict in report.conflicts {
                writeln!(w, "conflict\t{}\t{}", conflict.kind, conflict.details)?;
            }
            let t = &report.totals;
            writeln!(
                w,
                "totals\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.1}%",
                t.records, t.total_retail, t.total_paid, t.total_savings, t.weighted_roi
            )
        },
        |report, w| {
            pretty_section(w, "Cruise ledger")?;
            if report.records.is_empty() {
                writeln!(w, "(no cruises)")?;
            }
            for record in report.records {
                write_record_line(w, record)?;
            }
            if !report.conflicts.is_empty() {
                writeln!(w)?;
                pretty_section(w, "Conflicts")?;
                for conflict in report.conflicts {
                    writeln!(w, "{}: {}", conflict.kind, conflict.details)?;
                }
            }
            if let Some(top) = &report.top {
                writeln!(w)?;
                pretty_section(w, "Best ROI")?;
                for record in top {
                    write_record_line(w, record)?;
                }
            }
            writeln!(w)?;
            pretty_rule(w)?;
            let t = &report.totals;
            pretty_kv(w, "cruises", t.records.to_string())?;
            pretty_kv(w, "retail", format!("{:.2}", t.total_retail))?;
            pretty_kv(w, "paid", format!("{:.2}", t.total_paid))?;
            pretty_kv(w, "savings", format!("{:.2}", t.total_savings))?;
            pretty_kv(w, "weighted roi", format!("{:.1}%", t.weighted_roi))?;
            pretty_kv(w, "points", format!("{:.0}", t.total_points))
        },
    )
}

fn write_record_line(w: &mut dyn Write, record: &MergedCruiseRecord) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{}\t{:.2}\t{:.1}%",
        record.departure_date,
        record.ship,
        money(record.retail_price),
        money(record.amount_paid),
        money(record.casino_spend),
        record.savings(),
        record.roi()
    )
}

fn read_optional<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    path.map_or_else(|| Ok(T::default()), read_json)
}
