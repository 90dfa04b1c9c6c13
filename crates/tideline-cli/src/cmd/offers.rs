//! `tl offers` intake and listing.

use super::{open_store, read_json};
use crate::output::{OutputMode, coded, pretty_kv, pretty_section, render, render_mode};
use anyhow::Result;
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tideline_core::config::EffectiveConfig;
use tideline_core::error::ErrorCode;
use tideline_core::model::{Brand, ExcludedSailing, Offer, ProfileBlob};
use tideline_core::offers::{
    Credentials, HttpOfferFetcher, OfferFetcher, SailingRow, SyncOptions, flatten_offers, load_offers,
    persist_offers, sync_offers,
};
use tideline_core::profiles::ProfileIdManager;

#[derive(Args, Debug)]
pub struct OffersArgs {
    #[command(subcommand)]
    pub command: OffersCommand,
}

#[derive(Subcommand, Debug)]
pub enum OffersCommand {
    #[command(
        about = "Prune an offers payload and optionally store it",
        after_help = "EXAMPLES:\n    # Prune a captured payload\n    tl offers sync --input offers.json\n\n    # Store the result under a profile\n    tl offers sync --input offers.json --profile gobo-alice\n\n    # Refetch offers that came back without sailings\n    tl offers sync --input offers.json --refetch --token T --account-id A"
    )]
    Sync(SyncArgs),

    #[command(
        about = "List the sailings stored for a profile",
        after_help = "EXAMPLES:\n    tl offers list --profile gobo-alice\n    tl offers list --profile gobo-alice --json"
    )]
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Offers payload: an array of offers, `{ "offers": [...] }`, or a stored profile blob.
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,

    /// JSON array of `{ shipCode, sailDate }` sailings to drop.
    #[arg(long, value_name = "PATH")]
    pub exclude: Option<PathBuf>,

    /// Store the pruned offers under this profile key.
    #[arg(long, value_name = "KEY")]
    pub profile: Option<String>,

    /// Refetch offers that have no sailings from the offer API.
    #[arg(long, requires_all = ["token", "account_id"])]
    pub refetch: bool,

    /// Session bearer token for refetch.
    #[arg(long)]
    pub token: Option<String>,

    /// Account id header for refetch.
    #[arg(long)]
    pub account_id: Option<String>,

    /// Brand whose API host to use (defaults to `offers.brand`).
    #[arg(long)]
    pub brand: Option<Brand>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Profile key to list.
    #[arg(long, value_name = "KEY")]
    pub profile: String,
}

/// Accepted shapes of an offers payload.
#[derive(Deserialize)]
#[serde(untagged)]
enum OffersPayload {
    Bare(Vec<Offer>),
    Wrapped { offers: Vec<Offer> },
    Blob(ProfileBlob),
}

impl OffersPayload {
    fn into_offers(self) -> Vec<Offer> {
        match self {
            Self::Bare(offers) | Self::Wrapped { offers } => offers,
            Self::Blob(blob) => blob.data.offers,
        }
    }
}

#[derive(Debug, Serialize)]
struct SyncReport {
    received: usize,
    kept: usize,
    sailings: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_id: Option<u32>,
    offers: Vec<Offer>,
}

pub fn run_offers(args: &OffersArgs, output: OutputMode, config: &EffectiveConfig, quiet: bool) -> Result<()> {
    match &args.command {
        OffersCommand::Sync(sync) => run_sync(sync, output, config, quiet),
        OffersCommand::List(list) => run_list(list, output, config),
    }
}

fn run_sync(args: &SyncArgs, output: OutputMode, config: &EffectiveConfig, quiet: bool) -> Result<()> {
    let raw = read_offers(&args.input)?;
    let excluded: Vec<ExcludedSailing> = match &args.exclude {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let offers_cfg = &config.project.offers;
    let fetcher = if args.refetch {
        let credentials = Credentials {
            token: args.token.clone().unwrap_or_default(),
            account_id: args.account_id.clone().unwrap_or_default(),
        };
        let timeout = offers_cfg.request_timeout();
        Some(match &offers_cfg.base_url {
            Some(url) => HttpOfferFetcher::with_base_url(url, credentials, timeout),
            None => HttpOfferFetcher::new(args.brand.unwrap_or(offers_cfg.brand), credentials, timeout),
        })
    } else {
        None
    };

    let options = SyncOptions {
        tier_max_nights: offers_cfg.tier_max_nights,
        normalize_display: offers_cfg.normalize_display,
    };
    let offers = sync_offers(
        &raw,
        &excluded,
        fetcher.as_ref().map(|f| f as &dyn OfferFetcher),
        options,
    );

    let mut profile_id = None;
    if let Some(key) = &args.profile {
        let store = open_store(config)?;
        persist_offers(&store, key, offers.clone())?;
        let mut ids = ProfileIdManager::load(&store);
        ids.ensure_ids(&[key.as_str()]);
        profile_id = ids.id(key);
        if !quiet && !output.is_json() {
            eprintln!("stored {} offers under {key}", offers.len());
        }
    }

    let report = SyncReport {
        received: raw.len(),
        kept: offers.len(),
        sailings: offers.iter().map(|o| o.sailings.len()).sum(),
        profile: args.profile.clone(),
        profile_id,
        offers,
    };

    render_mode(
        output,
        &report,
        |report, w| write_rows(w, &flatten_offers(&report.offers)),
        |report, w| {
            pretty_section(w, "Offer sync")?;
            pretty_kv(w, "received", report.received.to_string())?;
            pretty_kv(w, "kept", report.kept.to_string())?;
            pretty_kv(w, "sailings", report.sailings.to_string())?;
            if let Some(profile) = &report.profile {
                pretty_kv(w, "profile", profile)?;
            }
            writeln!(w)?;
            write_rows(w, &flatten_offers(&report.offers))
        },
    )
}

fn run_list(args: &ListArgs, output: OutputMode, config: &EffectiveConfig) -> Result<()> {
    let store = open_store(config)?;
    let Some(offers) = load_offers(&store, &args.profile)? else {
        return Err(coded(
            ErrorCode::ProfileNotFound,
            format!("profile '{}' not found", args.profile),
        ));
    };
    let rows = flatten_offers(&offers);
    render(output, &rows, |rows, w| write_rows(w, rows))
}

fn read_offers(path: &Path) -> Result<Vec<Offer>> {
    let payload: OffersPayload = read_json(path)?;
    Ok(payload.into_offers())
}

/// One tab-separated line per sailing.
pub fn write_rows(w: &mut dyn Write, rows: &[SailingRow]) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(w, "(no sailings)");
    }
    for row in rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}N\t{}\t{}{}",
            row.offer_code,
            row.ship,
            row.sail_date,
            row.nights,
            row.room_type.as_deref().unwrap_or("-"),
            row.ports.join(", "),
            if row.gobo { "\tGOBO" } else { "" }
        )?;
    }
    Ok(())
}
