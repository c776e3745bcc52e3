//! Configuration-profile assignments, fed by the per-device policy report.

use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::api::{ManagementApi, PolicyRow};
use crate::error::LensResult;
use crate::model::{AssignmentDomain, AssignmentRecord, MembershipMap, ResolvedSubjects};

use super::{assemble_record, resolve_targets, DomainPolicy, ResolveContext};

/// Resolves configuration-profile assignments.
///
/// The report listing is fatal on failure; each row's assignment fetch is
/// not, and degrades to an errored record.
#[instrument(skip(api, subjects, membership))]
pub async fn resolve<A>(
    api: &A,
    subjects: &ResolvedSubjects,
    membership: &MembershipMap,
) -> LensResult<Vec<AssignmentRecord>>
where
    A: ManagementApi + ?Sized,
{
    let rows = api.configuration_report(&subjects.device.mdm_id).await?;
    debug!(rows = rows.len(), "configuration report fetched");

    let ctx = ResolveContext {
        membership,
        has_user: subjects.has_user(),
    };
    let policy = DomainPolicy::for_domain(AssignmentDomain::Configuration);

    let resolved = join_all(
        rows.iter()
            .map(|row| resolve_row(api, row, &ctx, &policy)),
    )
    .await;
    Ok(resolved.into_iter().flatten().collect())
}

async fn resolve_row<A>(
    api: &A,
    row: &PolicyRow,
    ctx: &ResolveContext<'_>,
    policy: &DomainPolicy,
) -> Option<AssignmentRecord>
where
    A: ManagementApi + ?Sized,
{
    match api
        .configuration_assignments(&row.policy_id, &row.policy_type)
        .await
    {
        Ok(specs) => {
            let allow_all_users = ctx.has_user && upn_present(row);
            let targets = resolve_targets(&specs, ctx, policy, allow_all_users);
            assemble_record(row.policy_name.clone(), None, targets, None, policy)
        }
        Err(err) => {
            warn!(policy_id = %row.policy_id, error = %err, "assignment fetch failed");
            assemble_record(
                row.policy_name.clone(),
                None,
                Vec::new(),
                Some(err.to_string()),
                policy,
            )
        }
    }
}

/// Whether the report row carries a usable principal name. Rows without one
/// are device-scoped and never justify an all-users target.
fn upn_present(row: &PolicyRow) -> bool {
    matches!(
        row.user_principal_name.as_deref(),
        Some(upn) if !upn.is_empty() && upn != "Not Available"
    )
}
