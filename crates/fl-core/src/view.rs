//! Pure presentation projection over resolver output, driven by an explicit
//! serializable [`ViewState`].
//!
//! Nothing here talks to the API; the CLI loads state, projects, renders,
//! and saves state back.

use serde::{Deserialize, Serialize};

use crate::model::{
    AssignmentDomain, AssignmentKind, AssignmentRecord, GroupInfo, MembershipKind, MembershipMap,
    TargetKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// The last group search, kept so selections survive across invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnapshot {
    pub query: String,
    pub results: Vec<GroupInfo>,
}

/// Everything the presentation layer remembers between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewState {
    pub domain: AssignmentDomain,
    pub sort: SortDirection,
    /// Case-insensitive substring match on subject names; empty shows all.
    pub filter: String,
    /// Which identity mutations apply to.
    pub target_mode: TargetKind,
    pub selected_group_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_search: Option<SearchSnapshot>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            domain: AssignmentDomain::Configuration,
            sort: SortDirection::Asc,
            filter: String::new(),
            target_mode: TargetKind::Device,
            selected_group_ids: Vec::new(),
            last_search: None,
        }
    }
}

/// One rendered table row: a record flattened to a single target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRow {
    pub subject_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
    pub group_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub membership_kind: Option<MembershipKind>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub audience: Option<TargetKind>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// A group eligible for membership mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupChoice {
    pub id: String,
    pub name: String,
}

/// Flattens records to display rows, applying the view's filter and sort.
///
/// A record that failed its fetch yields one row carrying the error. The
/// sort is stable, so a subject's targets keep their resolution order.
pub fn project(records: &[AssignmentRecord], view: &ViewState) -> Vec<DisplayRow> {
    let needle = view.filter.trim().to_lowercase();
    let mut rows: Vec<DisplayRow> = Vec::new();
    for record in records {
        if !needle.is_empty() && !record.subject_name.to_lowercase().contains(&needle) {
            continue;
        }
        if record.targets.is_empty() {
            rows.push(DisplayRow {
                subject_name: record.subject_name.clone(),
                detail: record.detail.clone(),
                group_name: "-".to_string(),
                membership_kind: None,
                audience: None,
                intent: None,
                error: record.error.clone(),
            });
            continue;
        }
        for target in &record.targets {
            rows.push(DisplayRow {
                subject_name: record.subject_name.clone(),
                detail: record.detail.clone(),
                group_name: target.group_name.clone(),
                membership_kind: target.membership_kind,
                audience: target.audience,
                intent: target.intent.clone(),
                error: None,
            });
        }
    }
    match view.sort {
        SortDirection::Asc => rows.sort_by(|a, b| {
            a.subject_name.to_lowercase().cmp(&b.subject_name.to_lowercase())
        }),
        SortDirection::Desc => rows.sort_by(|a, b| {
            b.subject_name.to_lowercase().cmp(&a.subject_name.to_lowercase())
        }),
    }
    rows
}

/// Groups from resolved records that a mutation may target: explicit groups
/// only, dynamic ones excluded. Dynamic targets still display; they are
/// just not selectable.
pub fn selectable_groups(
    records: &[AssignmentRecord],
    membership: &MembershipMap,
) -> Vec<GroupChoice> {
    let mut seen = std::collections::HashSet::new();
    let mut choices = Vec::new();
    for record in records {
        for target in &record.targets {
            if target.kind != AssignmentKind::ExplicitGroup {
                continue;
            }
            let Some(id) = target.group_id.as_deref() else {
                continue;
            };
            if membership.is_dynamic(id) || !seen.insert(id.to_string()) {
                continue;
            }
            choices.push(GroupChoice {
                id: id.to_string(),
                name: membership
                    .name_of(id)
                    .unwrap_or(target.group_name.as_str())
                    .to_string(),
            });
        }
    }
    choices
}

/// Search results a mutation may target, same eligibility rule.
pub fn selectable_from_search(results: &[GroupInfo]) -> Vec<GroupChoice> {
    results
        .iter()
        .filter(|g| !g.is_dynamic)
        .map(|g| GroupChoice {
            id: g.id.clone(),
            name: g.display_name.clone(),
        })
        .collect()
}
