//! The `group` commands: search, create, and batch add/remove membership.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracing::info;

use fl_core::{
    actions, apply_mutation, resolve_identity, GroupSelector, ManagementApi, MutationAction,
    SearchSnapshot, TargetKind,
};

use crate::console;
use crate::render;
use crate::state::StateStore;
use crate::OutputFormat;

/// Searches directory groups and snapshots the results so later add/remove
/// invocations can reference them by name.
pub async fn search<A>(
    api: &A,
    store: &StateStore,
    query: &str,
    format: OutputFormat,
) -> Result<()>
where
    A: ManagementApi + ?Sized,
{
    let results = actions::search_groups(api, query)
        .await
        .context("Group search failed")?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        render::print_search_results(&results);
    }

    let mut state = store.load()?;
    state.view.last_search = Some(SearchSnapshot {
        query: query.to_string(),
        results,
    });
    store.save(state)?;
    Ok(())
}

/// Creates a security group.
pub async fn create<A>(api: &A, name: &str, format: OutputFormat) -> Result<()>
where
    A: ManagementApi + ?Sized,
{
    let group = actions::create_group(api, name)
        .await
        .context("Group creation failed")?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&group)?);
    } else {
        println!(
            "{} {} [{}]",
            "Created".green(),
            group.display_name.cyan(),
            group.id
        );
    }
    Ok(())
}

pub struct MutateArgs {
    pub target: String,
    pub groups: Vec<String>,
    pub as_user: bool,
}

/// Adds or removes the resolved identity across the selected groups.
pub async fn mutate<A>(
    api: &A,
    store: &StateStore,
    action: MutationAction,
    args: MutateArgs,
    format: OutputFormat,
) -> Result<()>
where
    A: ManagementApi + ?Sized,
{
    if args.groups.is_empty() {
        bail!("no groups selected (pass --group at least once)");
    }
    let mdm_id = console::extract_device_id(&args.target)?;
    let mut state = store.load()?;
    state.view.target_mode = if args.as_user {
        TargetKind::User
    } else {
        TargetKind::Device
    };

    let subject = resolve_identity(api, &mdm_id, state.view.target_mode)
        .await
        .context("Identity resolution failed")?;

    // Selections matching the last search go by id; dynamic groups are
    // rejected here, before any call is made.
    let snapshot = state.view.last_search.clone();
    let mut selectors = Vec::new();
    for wanted in &args.groups {
        let hit = snapshot.as_ref().and_then(|snap| {
            snap.results
                .iter()
                .find(|g| g.id == *wanted || g.display_name.eq_ignore_ascii_case(wanted))
        });
        match hit {
            Some(group) if group.is_dynamic => {
                bail!(
                    "'{}' is a dynamic group; membership is rule-managed and cannot be edited",
                    group.display_name
                );
            }
            Some(group) => selectors.push(GroupSelector::ById {
                id: group.id.clone(),
                name: group.display_name.clone(),
            }),
            None => selectors.push(GroupSelector::ByName(wanted.clone())),
        }
    }

    let report = apply_mutation(api, action, &subject, &selectors).await;
    info!(subject = %subject.display_name, status = ?report.status, "mutation finished");
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_mutation_report(&report);
    }

    state.view.selected_group_ids = report
        .outcomes
        .iter()
        .filter_map(|o| o.group_id.clone())
        .collect();
    store.save(state)?;
    Ok(())
}
