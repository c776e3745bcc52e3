//! The `assignments` and `memberships` commands: resolve identities,
//! aggregate memberships, cross-reference one assignment domain.

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::debug;

use fl_core::{
    build_membership_map, project, resolve_assignments, resolve_subjects, AssignmentDomain,
    ManagementApi, SortDirection,
};

use crate::console;
use crate::render;
use crate::state::StateStore;
use crate::OutputFormat;

pub struct AssignmentArgs {
    pub target: String,
    pub domain: Option<AssignmentDomain>,
    pub filter: Option<String>,
    pub descending: bool,
}

/// Resolves one domain's assignments for a device and renders them.
pub async fn run<A>(
    api: &A,
    store: &StateStore,
    args: AssignmentArgs,
    format: OutputFormat,
) -> Result<()>
where
    A: ManagementApi + ?Sized,
{
    let mdm_id = console::extract_device_id(&args.target)?;
    let mut state = store.load()?;

    // Flags override persisted view settings and are persisted in turn.
    if let Some(domain) = args.domain {
        state.view.domain = domain;
    }
    if let Some(filter) = args.filter {
        state.view.filter = filter;
    }
    if args.descending {
        state.view.sort = SortDirection::Desc;
    }
    let domain = state.view.domain;

    let subjects = resolve_subjects(api, &mdm_id)
        .await
        .context("Identity resolution failed")?;
    let membership = build_membership_map(
        api,
        &subjects.device.directory_id,
        subjects.user_directory_id(),
    )
    .await
    .context("Membership aggregation failed")?;

    let records = resolve_assignments(api, domain, &subjects, &membership)
        .await
        .with_context(|| format!("Failed to resolve {domain} assignments"))?;
    debug!(%domain, records = records.len(), groups = membership.len(), "resolution complete");

    let rows = project(&records, &state.view);
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        let user = subjects
            .user
            .as_ref()
            .map(|u| u.display_name.as_str())
            .unwrap_or("none");
        println!(
            "{} {} (user: {})",
            "Device:".bold(),
            subjects.device.display_name.cyan(),
            user
        );
        println!("{} {} ({} groups)", "Domain:".bold(), domain, membership.len());
        println!();
        render::print_assignment_rows(&rows);
    }

    state.records.insert(domain, records);
    store.save(state)?;
    Ok(())
}

/// Renders the aggregated membership map for a device.
pub async fn memberships<A>(api: &A, target: &str, format: OutputFormat) -> Result<()>
where
    A: ManagementApi + ?Sized,
{
    let mdm_id = console::extract_device_id(target)?;
    let subjects = resolve_subjects(api, &mdm_id)
        .await
        .context("Identity resolution failed")?;
    let membership = build_membership_map(
        api,
        &subjects.device.directory_id,
        subjects.user_directory_id(),
    )
    .await
    .context("Membership aggregation failed")?;

    let mut groups: Vec<_> = membership.iter().collect();
    groups.sort_by(|a, b| a.display_name.cmp(&b.display_name));

    if format == OutputFormat::Json {
        let entries: Vec<serde_json::Value> = groups
            .iter()
            .map(|g| {
                serde_json::json!({
                    "groupId": g.group_id,
                    "displayName": g.display_name,
                    "isDynamic": g.is_dynamic,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!(
            "{} {}",
            "Memberships for".bold(),
            subjects.device.display_name.cyan()
        );
        println!();
        render::print_membership(&groups);
    }
    Ok(())
}
