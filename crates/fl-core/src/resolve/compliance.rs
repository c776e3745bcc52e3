//! Compliance-policy assignments, fed by the per-device compliance report.
//!
//! Compliance keeps more than the other domains: exclusions stay visible,
//! unresolved groups get a truncated-id placeholder, and policies whose
//! targets all filter away still show a "No Assignments" row.

use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::api::{ComplianceRow, ManagementApi};
use crate::error::LensResult;
use crate::model::{AssignmentDomain, AssignmentRecord, MembershipMap, ResolvedSubjects};

use super::{assemble_record, resolve_targets, DomainPolicy, ResolveContext};

#[instrument(skip(api, subjects, membership))]
pub async fn resolve<A>(
    api: &A,
    subjects: &ResolvedSubjects,
    membership: &MembershipMap,
) -> LensResult<Vec<AssignmentRecord>>
where
    A: ManagementApi + ?Sized,
{
    let rows = api.compliance_report(&subjects.device.mdm_id).await?;
    debug!(rows = rows.len(), "compliance report fetched");

    let ctx = ResolveContext {
        membership,
        has_user: subjects.has_user(),
    };
    let policy = DomainPolicy::for_domain(AssignmentDomain::Compliance);

    let resolved = join_all(
        rows.iter()
            .map(|row| resolve_row(api, row, &ctx, &policy)),
    )
    .await;
    Ok(resolved.into_iter().flatten().collect())
}

async fn resolve_row<A>(
    api: &A,
    row: &ComplianceRow,
    ctx: &ResolveContext<'_>,
    policy: &DomainPolicy,
) -> Option<AssignmentRecord>
where
    A: ManagementApi + ?Sized,
{
    let detail = Some(row.status.clone());
    // Built-in rows have no policy id and nothing to fetch; they fall
    // through to the placeholder row.
    let Some(policy_id) = row.policy_id.as_deref().filter(|id| !id.is_empty()) else {
        return assemble_record(row.policy_name.clone(), detail, Vec::new(), None, policy);
    };
    match api.compliance_assignments(policy_id).await {
        Ok(specs) => {
            let targets = resolve_targets(&specs, ctx, policy, ctx.has_user);
            assemble_record(row.policy_name.clone(), detail, targets, None, policy)
        }
        Err(err) => {
            warn!(policy_id, error = %err, "assignment fetch failed");
            assemble_record(
                row.policy_name.clone(),
                detail,
                Vec::new(),
                Some(err.to_string()),
                policy,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::api::ComplianceRow;
    use crate::error::LensError;
    use crate::identity::resolve_subjects;
    use crate::membership::build_membership_map;
    use crate::model::{AssignmentSpec, MembershipKind, TargetDescriptor, TargetKind};

    fn row(policy_id: Option<&str>, name: &str, status: &str) -> ComplianceRow {
        ComplianceRow {
            policy_id: policy_id.map(str::to_string),
            policy_name: name.to_string(),
            status: status.to_string(),
        }
    }

    async fn baseline_inputs(api: &MockApi) -> (ResolvedSubjects, MembershipMap) {
        let subjects = resolve_subjects(api, "D1").await.expect("subjects");
        let membership = build_membership_map(
            api,
            &subjects.device.directory_id,
            subjects.user_directory_id(),
        )
        .await
        .expect("membership");
        (subjects, membership)
    }

    #[tokio::test]
    async fn status_rides_along_as_detail() {
        let api = MockApi::with_baseline();
        api.set_compliance_rows(vec![row(Some("cmp-1"), "Bitlocker", "Compliant")])
            .await;
        api.set_compliance_assignments(
            "cmp-1",
            vec![AssignmentSpec::new(TargetDescriptor::Group {
                group_id: "grp1".to_string(),
                exclusion: false,
                audience: TargetKind::Device,
            })],
        )
        .await;
        let (subjects, membership) = baseline_inputs(&api).await;

        let records = resolve(&api, &subjects, &membership).await.expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].detail.as_deref(), Some("Compliant"));
        assert_eq!(records[0].targets[0].group_name, "Engineering");
    }

    #[tokio::test]
    async fn builtin_row_without_policy_id_becomes_placeholder() {
        let api = MockApi::with_baseline();
        api.set_compliance_rows(vec![row(None, "Default Device Compliance Policy", "Compliant")])
            .await;
        let (subjects, membership) = baseline_inputs(&api).await;

        let records = resolve(&api, &subjects, &membership).await.expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].targets.len(), 1);
        assert_eq!(records[0].targets[0].group_name, "No Assignments");
        assert!(records[0].error.is_none());
    }

    #[tokio::test]
    async fn unresolved_group_and_exclusion_stay_visible() {
        let api = MockApi::with_baseline();
        api.set_compliance_rows(vec![row(Some("cmp-2"), "Firewall", "Not Compliant")])
            .await;
        api.set_compliance_assignments(
            "cmp-2",
            vec![
                AssignmentSpec::new(TargetDescriptor::Group {
                    group_id: "feedfeed-cafe".to_string(),
                    exclusion: false,
                    audience: TargetKind::Device,
                }),
                AssignmentSpec::new(TargetDescriptor::Group {
                    group_id: "grp1".to_string(),
                    exclusion: true,
                    audience: TargetKind::Device,
                }),
            ],
        )
        .await;
        let (subjects, membership) = baseline_inputs(&api).await;

        let records = resolve(&api, &subjects, &membership).await.expect("records");
        let targets = &records[0].targets;
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].group_name, "Group ID: feedfeed...");
        assert_eq!(targets[1].membership_kind, Some(MembershipKind::Exclude));
    }

    #[tokio::test]
    async fn fetch_failure_keeps_record_with_error() {
        let api = MockApi::with_baseline();
        api.set_compliance_rows(vec![
            row(Some("cmp-3"), "Encryption", "Compliant"),
            row(Some("cmp-4"), "Password", "Compliant"),
        ])
        .await;
        api.fail_on("compliance_assignments:cmp-3", LensError::http(502, "gateway"))
            .await;
        let (subjects, membership) = baseline_inputs(&api).await;

        let records = resolve(&api, &subjects, &membership).await.expect("records");
        assert_eq!(records.len(), 2);
        let failed = records
            .iter()
            .find(|r| r.subject_name == "Encryption")
            .expect("failed record kept");
        assert!(failed.targets.is_empty());
        assert!(failed.error.as_deref().unwrap_or("").contains("502"));
        let healthy = records
            .iter()
            .find(|r| r.subject_name == "Password")
            .expect("healthy record");
        assert_eq!(healthy.targets[0].group_name, "No Assignments");
    }
}
