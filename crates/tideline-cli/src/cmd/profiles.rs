//! `tl profiles`: numeric ids, linked accounts, and the combined profile.

use super::{LogHooks, open_store};
use crate::output::{OutputMode, coded, pretty_kv, pretty_section, render, render_mode};
use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tideline_core::config::EffectiveConfig;
use tideline_core::error::ErrorCode;
use tideline_core::profiles::{
    LinkedAccount, ProfileIdManager, load_linked_accounts, save_linked_accounts, update_combined_offers,
};
use tideline_core::store::{ProfileStore, load_blob};
use tracing::warn;

#[derive(Args, Debug)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    pub command: ProfilesCommand,
}

#[derive(Subcommand, Debug)]
pub enum ProfilesCommand {
    #[command(about = "Give profile keys stable numeric ids")]
    Assign(KeysArgs),

    #[command(about = "Delete profiles and release their ids")]
    Remove(KeysArgs),

    #[command(about = "Show the id map, free pool, and next id")]
    Ids,

    #[command(
        about = "Link profiles for the combined view",
        after_help = "EXAMPLES:\n    tl profiles link gobo-alice gobo-bob"
    )]
    Link(KeysArgs),

    #[command(about = "Rebuild the combined profile from linked accounts")]
    Combine,
}

#[derive(Args, Debug)]
pub struct KeysArgs {
    /// Profile storage keys.
    #[arg(required = true, value_name = "KEY")]
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize)]
struct IdChange {
    key: String,
    id: u32,
}

#[derive(Debug, Serialize)]
struct CombineReport {
    linked: Vec<LinkedAccount>,
    combined: bool,
    offers: usize,
    sailings: usize,
}

pub fn run_profiles(args: &ProfilesArgs, output: OutputMode, config: &EffectiveConfig) -> Result<()> {
    let store = open_store(config)?;
    match &args.command {
        ProfilesCommand::Assign(keys) => {
            let mut ids = ProfileIdManager::load(&store);
            let assigned = changes(ids.ensure_ids(&keys.keys));
            render_changes(output, "assigned", &assigned)
        }
        ProfilesCommand::Remove(keys) => {
            for key in &keys.keys {
                store.remove(key)?;
            }
            let mut ids = ProfileIdManager::load(&store);
            let released = changes(ids.remove_keys(&keys.keys));
            render_changes(output, "released", &released)
        }
        ProfilesCommand::Ids => {
            let ids = ProfileIdManager::load(&store);
            render_mode(
                output,
                ids.state(),
                |state, w| {
                    for (key, id) in &state.map {
                        writeln!(w, "{id}\t{key}")?;
                    }
                    Ok(())
                },
                |state, w| {
                    pretty_section(w, "Profile ids")?;
                    for (key, id) in &state.map {
                        pretty_kv(w, &id.to_string(), key)?;
                    }
                    let free: Vec<String> = state.free.iter().map(u32::to_string).collect();
                    pretty_kv(w, "free", free.join(", "))?;
                    pretty_kv(w, "next", state.next.to_string())
                },
            )
        }
        ProfilesCommand::Link(keys) => {
            let mut linked = Vec::with_capacity(keys.keys.len());
            for key in &keys.keys {
                let Some(blob) = load_blob(&store, key)? else {
                    return Err(coded(ErrorCode::ProfileNotFound, format!("profile '{key}' not found")));
                };
                linked.push(LinkedAccount {
                    key: key.clone(),
                    email: blob.data.email().map(str::to_string),
                });
            }
            save_linked_accounts(&store, &linked)?;
            combine(&store, output)
        }
        ProfilesCommand::Combine => combine(&store, output),
    }
}

fn combine(store: &dyn ProfileStore, output: OutputMode) -> Result<()> {
    let linked = load_linked_accounts(store);
    let combined = update_combined_offers(store, &LogHooks)?;
    if combined.is_none() {
        warn!(linked = linked.len(), "combined profile not rebuilt; link two stored profiles");
    }
    let report = CombineReport {
        combined: combined.is_some(),
        offers: combined.as_ref().map_or(0, |blob| blob.data.offers.len()),
        sailings: combined
            .as_ref()
            .map_or(0, |blob| blob.data.offers.iter().map(|o| o.sailings.len()).sum()),
        linked,
    };
    render(output, &report, |report, w| {
        let keys: Vec<&str> = report.linked.iter().map(|a| a.key.as_str()).collect();
        if report.combined {
            writeln!(
                w,
                "combined {} -> {} offers, {} sailings",
                keys.join(" + "),
                report.offers,
                report.sailings
            )
        } else {
            writeln!(w, "combined profile unchanged ({} linked)", keys.len())
        }
    })
}

fn changes(pairs: Vec<(String, u32)>) -> Vec<IdChange> {
    pairs.into_iter().map(|(key, id)| IdChange { key, id }).collect()
}

fn render_changes(output: OutputMode, verb: &'static str, changes: &[IdChange]) -> Result<()> {
    render(output, &changes, |changes, w| {
        if changes.is_empty() {
            return writeln!(w, "nothing {verb}");
        }
        for change in *changes {
            writeln!(w, "{verb} {} -> {}", change.key, change.id)?;
        }
        Ok(())
    })
}
