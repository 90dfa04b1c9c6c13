//! `tl favorites` ledger commands.

use super::offers::write_rows;
use super::{LogHooks, open_store};
use crate::output::{OutputMode, coded, render};
use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use tideline_core::config::EffectiveConfig;
use tideline_core::context::{ActiveView, ProfileContext};
use tideline_core::error::ErrorCode;
use tideline_core::favorites::{FavoriteLedger, LedgerOutcome};
use tideline_core::model::{Offer, Sailing};
use tideline_core::offers::{flatten_offers, load_offers};
use tideline_core::profiles::{ProfileIdManager, load_linked_accounts};
use tideline_core::store::FileStore;

#[derive(Args, Debug)]
pub struct FavoritesArgs {
    #[command(subcommand)]
    pub command: FavoritesCommand,
}

#[derive(Subcommand, Debug)]
pub enum FavoritesCommand {
    #[command(
        about = "Save a sailing as a favorite",
        after_help = "EXAMPLES:\n    tl favorites add --offer-code 25WAV103 --ship \"Wonder of the Seas\" --date 2025-03-09 --source gobo-alice"
    )]
    Add(EntryArgs),

    #[command(about = "Remove a saved sailing")]
    Remove(EntryArgs),

    #[command(about = "Flip whether a sailing is saved")]
    Toggle(EntryArgs),

    #[command(about = "Report whether a sailing is saved")]
    Check(EntryArgs),

    #[command(about = "List saved sailings")]
    List,
}

/// Which view the command acts from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ViewKind {
    #[default]
    Profile,
    Combined,
    Favorites,
}

#[derive(Args, Debug)]
pub struct EntryArgs {
    /// Offer code of the sailing.
    #[arg(long)]
    pub offer_code: String,

    /// Ship name as shown in the offer.
    #[arg(long)]
    pub ship: String,

    /// Sail date as shown in the offer.
    #[arg(long)]
    pub date: String,

    /// The sailing is a GOBO sailing.
    #[arg(long)]
    pub gobo: bool,

    /// Caller profile id (numeric, or joined linked ids).
    #[arg(long)]
    pub profile_id: Option<String>,

    /// View the command acts from.
    #[arg(long, value_enum, default_value_t = ViewKind::Profile)]
    pub view: ViewKind,

    /// Stored profile to copy the full offer and sailing from.
    #[arg(long, value_name = "KEY")]
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
struct EntryReport<'a> {
    offer_code: &'a str,
    ship: &'a str,
    date: &'a str,
    #[serde(flatten)]
    outcome: Option<LedgerOutcome>,
    favorite: bool,
}

pub fn run_favorites(args: &FavoritesArgs, output: OutputMode, config: &EffectiveConfig) -> Result<()> {
    let store = open_store(config)?;
    let ledger = FavoriteLedger::new(&store, &LogHooks);

    let entry = match &args.command {
        FavoritesCommand::List => {
            let rows = flatten_offers(&ledger.list());
            return render(output, &rows, |rows, w| write_rows(w, rows));
        }
        FavoritesCommand::Add(entry)
        | FavoritesCommand::Remove(entry)
        | FavoritesCommand::Toggle(entry)
        | FavoritesCommand::Check(entry) => entry,
    };

    let ids = ProfileIdManager::load(&store);
    let view = match entry.view {
        ViewKind::Profile => ActiveView::Profile(entry.source.clone().unwrap_or_default()),
        ViewKind::Combined => ActiveView::Combined,
        ViewKind::Favorites => ActiveView::Favorites,
    };
    let ctx = ProfileContext::new(view, &ids)
        .with_linked_accounts(load_linked_accounts(&store))
        .with_scope_policy(config.project.favorites.scope_policy);

    let (offer, sailing) = resolve_entry(&store, entry)?;
    let profile_id = entry.profile_id.as_deref();

    let outcome = match &args.command {
        FavoritesCommand::Add(_) => Some(ledger.add(&ctx, &offer, &sailing, profile_id)),
        FavoritesCommand::Remove(_) => Some(ledger.remove(&ctx, &offer, &sailing, profile_id)),
        FavoritesCommand::Toggle(_) => Some(ledger.toggle(&ctx, &offer, &sailing, profile_id)),
        FavoritesCommand::Check(_) | FavoritesCommand::List => None,
    };
    let favorite = match outcome.and_then(LedgerOutcome::is_favorite) {
        Some(favorite) => favorite,
        None if outcome == Some(LedgerOutcome::Skipped) => {
            return Err(coded(ErrorCode::StoreWriteFailed, "favorites could not be updated"));
        }
        None => ledger.is_favorite(&ctx, &offer, &sailing, profile_id),
    };

    let report = EntryReport {
        offer_code: &entry.offer_code,
        ship: &entry.ship,
        date: &entry.date,
        outcome,
        favorite,
    };
    render(output, &report, |report, w| {
        let state = if report.favorite { "saved" } else { "not saved" };
        match report.outcome {
            Some(outcome) => writeln!(
                w,
                "{} {} {}: {state} ({})",
                report.offer_code,
                report.ship,
                report.date,
                describe(outcome)
            ),
            None => writeln!(w, "{} {} {}: {state}", report.offer_code, report.ship, report.date),
        }
    })
}

const fn describe(outcome: LedgerOutcome) -> &'static str {
    match outcome {
        LedgerOutcome::Added => "added",
        LedgerOutcome::AlreadyPresent => "already present",
        LedgerOutcome::Removed(_) => "removed",
        LedgerOutcome::NotFound => "not found",
        LedgerOutcome::Skipped => "skipped",
    }
}

/// The (offer, sailing) pair named on the command line, copied from the
/// source profile when one is given.
fn resolve_entry(store: &FileStore, entry: &EntryArgs) -> Result<(Offer, Sailing)> {
    let bare_sailing = Sailing {
        ship_name: entry.ship.clone(),
        sail_date: entry.date.clone(),
        is_gobo: entry.gobo.then_some(true),
        ..Sailing::default()
    };

    let Some(source) = &entry.source else {
        let offer = Offer {
            offer_code: entry.offer_code.clone(),
            ..Offer::default()
        };
        return Ok((offer, bare_sailing));
    };

    let Some(offers) = load_offers(store, source)? else {
        return Err(coded(ErrorCode::ProfileNotFound, format!("profile '{source}' not found")));
    };
    let found = offers
        .iter()
        .filter(|offer| offer.offer_code == entry.offer_code)
        .find_map(|offer| {
            offer
                .sailings
                .iter()
                .find(|s| s.ship_name == entry.ship && s.sail_date == entry.date && s.gobo() == entry.gobo)
                .map(|sailing| (offer.without_sailings(), sailing.clone()))
        });
    found.ok_or_else(|| {
        coded(
            ErrorCode::OfferNotFound,
            format!(
                "no sailing {} {} in offer {} of profile '{source}'",
                entry.ship, entry.date, entry.offer_code
            ),
        )
    })
}
