//! Group membership mutation: add or remove one directory object across a
//! batch of groups, with per-group outcomes.
//!
//! There is no rollback. Each group succeeds or fails on its own and the
//! report says which did which.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::ManagementApi;
use crate::error::LensError;
use crate::model::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationAction {
    Add,
    Remove,
}

impl MutationAction {
    fn verb(&self) -> &'static str {
        match self {
            MutationAction::Add => "added to",
            MutationAction::Remove => "removed from",
        }
    }
}

/// How the caller names a group to mutate.
///
/// Search results carry ids; table-row selections only carry display names,
/// which are resolved here right before the mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSelector {
    ById { id: String, name: String },
    ByName(String),
}

impl GroupSelector {
    fn display_name(&self) -> &str {
        match self {
            GroupSelector::ById { name, .. } => name,
            GroupSelector::ByName(name) => name,
        }
    }
}

/// One group's result within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub group_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl MutationOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchStatus {
    AllSucceeded,
    PartialFailure,
    AllFailed,
}

/// The whole batch's result. Never an `Err`: per-group failures are data,
/// not control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationReport {
    pub action: MutationAction,
    pub subject_name: String,
    pub outcomes: Vec<MutationOutcome>,
    pub status: BatchStatus,
    pub summary: String,
    pub completed_at: DateTime<Utc>,
}

/// Applies `action` for the subject across all selected groups concurrently.
#[instrument(skip(api, subject, selectors), fields(subject = %subject.display_name, groups = selectors.len()))]
pub async fn apply_mutation<A>(
    api: &A,
    action: MutationAction,
    subject: &Identity,
    selectors: &[GroupSelector],
) -> MutationReport
where
    A: ManagementApi + ?Sized,
{
    let outcomes = join_all(
        selectors
            .iter()
            .map(|selector| mutate_one(api, action, &subject.directory_id, selector)),
    )
    .await;

    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| !o.succeeded())
        .map(|o| o.group_name.as_str())
        .collect();
    let status = if failed.is_empty() {
        BatchStatus::AllSucceeded
    } else if failed.len() == outcomes.len() {
        BatchStatus::AllFailed
    } else {
        BatchStatus::PartialFailure
    };
    let summary = match status {
        BatchStatus::AllSucceeded => format!(
            "{} {} {} group(s)",
            subject.display_name,
            action.verb(),
            outcomes.len()
        ),
        _ => format!(
            "{} {} {} of {} group(s); failed: {}",
            subject.display_name,
            action.verb(),
            outcomes.len() - failed.len(),
            outcomes.len(),
            failed.join(", ")
        ),
    };
    info!(%summary, "mutation batch finished");

    MutationReport {
        action,
        subject_name: subject.display_name.clone(),
        outcomes,
        status,
        summary,
        completed_at: Utc::now(),
    }
}

async fn mutate_one<A>(
    api: &A,
    action: MutationAction,
    directory_id: &str,
    selector: &GroupSelector,
) -> MutationOutcome
where
    A: ManagementApi + ?Sized,
{
    let (group_id, group_name) = match resolve_selector(api, selector).await {
        Ok(resolved) => resolved,
        Err(err) => {
            warn!(group = selector.display_name(), error = %err, "selector resolution failed");
            return MutationOutcome {
                group_name: selector.display_name().to_string(),
                group_id: None,
                error: Some(err.to_string()),
            };
        }
    };
    let result = match action {
        MutationAction::Add => api.add_group_member(&group_id, directory_id).await,
        MutationAction::Remove => api.remove_group_member(&group_id, directory_id).await,
    };
    match result {
        Ok(()) => MutationOutcome {
            group_name,
            group_id: Some(group_id),
            error: None,
        },
        Err(err) => {
            warn!(group = %group_name, error = %err, "mutation failed");
            MutationOutcome {
                group_name,
                group_id: Some(group_id),
                error: Some(err.to_string()),
            }
        }
    }
}

/// Turns a selector into `(group_id, display_name)`, looking display names
/// up in the directory. An unmatched name is this group's failure, not the
/// batch's.
async fn resolve_selector<A>(
    api: &A,
    selector: &GroupSelector,
) -> Result<(String, String), LensError>
where
    A: ManagementApi + ?Sized,
{
    match selector {
        GroupSelector::ById { id, name } => Ok((id.clone(), name.clone())),
        GroupSelector::ByName(name) => {
            let mut matches = api.groups_by_display_name(name).await?;
            if matches.is_empty() {
                return Err(LensError::Mutation {
                    group: name.clone(),
                    reason: "Group not found".to_string(),
                });
            }
            let group = matches.remove(0);
            if group.is_dynamic {
                return Err(LensError::Mutation {
                    group: group.display_name,
                    reason: "dynamic group membership is rule-managed".to_string(),
                });
            }
            Ok((group.id, group.display_name))
        }
    }
}
