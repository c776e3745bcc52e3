//! Assignment resolution: one shared target-resolution pass, four domain
//! drivers.
//!
//! The domains differ only in how they list items, how they fetch targets,
//! and in four policy axes captured by [`DomainPolicy`]. The classification
//! loop itself is written once.

pub mod applications;
pub mod compliance;
pub mod configuration;
pub mod scripts;

use tracing::instrument;

use crate::api::ManagementApi;
use crate::error::LensResult;
use crate::model::{
    AssignmentDomain, AssignmentKind, AssignmentRecord, AssignmentSpec, AssignmentTarget,
    MembershipKind, MembershipMap, ResolvedSubjects, TargetDescriptor, TargetKind,
};

/// Prefix of the placeholder name shown for groups the identity is not a
/// member of, in domains that keep them.
pub const UNRESOLVED_GROUP_PREFIX: &str = "Group ID: ";

/// How a domain handles explicit-group targets absent from the membership
/// map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedGroupPolicy {
    /// The identity is not a member; the target is irrelevant to this view.
    Drop,
    /// Keep a placeholder labeled with a truncated group id.
    Placeholder,
}

/// How a domain handles records whose targets all filtered away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyRecordPolicy {
    Drop,
    /// Synthesize a "No Assignments" target instead of dropping the record.
    Placeholder,
}

/// The per-domain divergence axes, passed into the shared resolution pass.
#[derive(Debug, Clone, Copy)]
pub struct DomainPolicy {
    pub keep_exclusions: bool,
    pub unresolved_groups: UnresolvedGroupPolicy,
    pub empty_records: EmptyRecordPolicy,
    /// Keep unrecognized target descriptors visible under their raw
    /// discriminator string.
    pub keep_unknown_targets: bool,
}

impl DomainPolicy {
    pub fn for_domain(domain: AssignmentDomain) -> Self {
        match domain {
            AssignmentDomain::Configuration => DomainPolicy {
                keep_exclusions: false,
                unresolved_groups: UnresolvedGroupPolicy::Drop,
                empty_records: EmptyRecordPolicy::Drop,
                keep_unknown_targets: false,
            },
            AssignmentDomain::Compliance => DomainPolicy {
                keep_exclusions: true,
                unresolved_groups: UnresolvedGroupPolicy::Placeholder,
                empty_records: EmptyRecordPolicy::Placeholder,
                keep_unknown_targets: false,
            },
            AssignmentDomain::Application => DomainPolicy {
                keep_exclusions: false,
                unresolved_groups: UnresolvedGroupPolicy::Drop,
                empty_records: EmptyRecordPolicy::Drop,
                keep_unknown_targets: true,
            },
            AssignmentDomain::Script => DomainPolicy {
                keep_exclusions: false,
                unresolved_groups: UnresolvedGroupPolicy::Drop,
                empty_records: EmptyRecordPolicy::Drop,
                keep_unknown_targets: false,
            },
        }
    }
}

/// Identity context shared by all items of one resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub membership: &'a MembershipMap,
    pub has_user: bool,
}

/// Resolves one domain's assignments for the given subjects.
///
/// Listing and membership failures are fatal; per-item failures surface as
/// records with zero targets and a recorded error.
#[instrument(skip(api, subjects, membership), fields(device = %subjects.device.mdm_id))]
pub async fn resolve_assignments<A>(
    api: &A,
    domain: AssignmentDomain,
    subjects: &ResolvedSubjects,
    membership: &MembershipMap,
) -> LensResult<Vec<AssignmentRecord>>
where
    A: ManagementApi + ?Sized,
{
    match domain {
        AssignmentDomain::Configuration => configuration::resolve(api, subjects, membership).await,
        AssignmentDomain::Compliance => compliance::resolve(api, subjects, membership).await,
        AssignmentDomain::Application => applications::resolve(api, subjects, membership).await,
        AssignmentDomain::Script => scripts::resolve(api, subjects, membership).await,
    }
}

/// Placeholder label for an unresolved group: the literal prefix plus the
/// first eight characters of the id.
pub(crate) fn unresolved_group_label(group_id: &str) -> String {
    let head: String = group_id.chars().take(8).collect();
    format!("{UNRESOLVED_GROUP_PREFIX}{head}...")
}

/// The shared classification pass: raw specs in, surviving display targets
/// out.
///
/// `allow_all_users` is the caller's gate for all-users targets; it is
/// always false for identities without a resolved user.
pub(crate) fn resolve_targets(
    specs: &[AssignmentSpec],
    ctx: &ResolveContext<'_>,
    policy: &DomainPolicy,
    allow_all_users: bool,
) -> Vec<AssignmentTarget> {
    let mut targets = Vec::new();
    for spec in specs {
        match &spec.descriptor {
            TargetDescriptor::Group { group_id, exclusion, audience } => {
                if *exclusion && !policy.keep_exclusions {
                    continue;
                }
                let membership_kind = if *exclusion {
                    MembershipKind::Exclude
                } else {
                    MembershipKind::Direct
                };
                let group_name = match ctx.membership.name_of(group_id) {
                    Some(name) => name.to_string(),
                    None => match policy.unresolved_groups {
                        UnresolvedGroupPolicy::Drop => continue,
                        UnresolvedGroupPolicy::Placeholder => unresolved_group_label(group_id),
                    },
                };
                targets.push(AssignmentTarget {
                    kind: AssignmentKind::ExplicitGroup,
                    group_id: Some(group_id.clone()),
                    group_name,
                    membership_kind: Some(membership_kind),
                    audience: Some(*audience),
                    intent: spec.intent.clone(),
                });
            }
            TargetDescriptor::AllDevices => {
                targets.push(AssignmentTarget {
                    kind: AssignmentKind::AllDevices,
                    group_id: None,
                    group_name: "All Devices".to_string(),
                    membership_kind: Some(MembershipKind::Virtual),
                    audience: Some(TargetKind::Device),
                    intent: spec.intent.clone(),
                });
            }
            TargetDescriptor::AllUsers => {
                if !allow_all_users {
                    continue;
                }
                targets.push(AssignmentTarget {
                    kind: AssignmentKind::AllUsers,
                    group_id: None,
                    group_name: "All Users".to_string(),
                    membership_kind: Some(MembershipKind::Virtual),
                    audience: Some(TargetKind::User),
                    intent: spec.intent.clone(),
                });
            }
            TargetDescriptor::Unknown { raw } => {
                if !policy.keep_unknown_targets {
                    continue;
                }
                targets.push(AssignmentTarget {
                    kind: AssignmentKind::Other,
                    group_id: None,
                    group_name: raw.clone(),
                    membership_kind: None,
                    audience: None,
                    intent: spec.intent.clone(),
                });
            }
        }
    }
    targets
}

/// Builds the item's record, applying the empty-record policy.
///
/// A per-item fetch failure always yields a kept record with zero targets,
/// regardless of the empty-record policy, so batch size stays stable under
/// partial failure.
pub(crate) fn assemble_record(
    subject_name: String,
    detail: Option<String>,
    targets: Vec<AssignmentTarget>,
    fetch_error: Option<String>,
    policy: &DomainPolicy,
) -> Option<AssignmentRecord> {
    if let Some(error) = fetch_error {
        return Some(AssignmentRecord {
            subject_name,
            detail,
            targets: Vec::new(),
            error: Some(error),
        });
    }
    if targets.is_empty() {
        return match policy.empty_records {
            EmptyRecordPolicy::Drop => None,
            EmptyRecordPolicy::Placeholder => Some(AssignmentRecord {
                subject_name,
                detail,
                targets: vec![AssignmentTarget::no_assignments()],
                error: None,
            }),
        };
    }
    Some(AssignmentRecord {
        subject_name,
        detail,
        targets,
        error: None,
    })
}
