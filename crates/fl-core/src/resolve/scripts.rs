//! Script assignments. The listing carries its assignments inline, so this
//! is the only domain without per-item fetches.

use tracing::{debug, instrument};

use crate::api::ManagementApi;
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
    let listings = api.scripts_with_assignments().await?;
    debug!(scripts = listings.len(), "script listing fetched");

    let ctx = ResolveContext {
        membership,
        has_user: subjects.has_user(),
    };
    let policy = DomainPolicy::for_domain(AssignmentDomain::Script);

    Ok(listings
        .into_iter()
        .filter_map(|listing| {
            let targets = resolve_targets(&listing.assignments, &ctx, &policy, ctx.has_user);
            assemble_record(listing.display_name, listing.description, targets, None, &policy)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::api::ScriptListing;
    use crate::error::LensError;
    use crate::identity::resolve_subjects;
    use crate::membership::build_membership_map;
    use crate::model::{AssignmentSpec, TargetDescriptor, TargetKind};

    fn listing(id: &str, name: &str, assignments: Vec<AssignmentSpec>) -> ScriptListing {
        ScriptListing {
            script_id: id.to_string(),
            display_name: name.to_string(),
            description: Some("remediation".to_string()),
            assignments,
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
    async fn scripts_targeting_member_groups_are_reported() {
        let api = MockApi::with_baseline();
        api.add_script(listing(
            "scr-1",
            "Cleanup",
            vec![AssignmentSpec::new(TargetDescriptor::Group {
                group_id: "grp1".to_string(),
                exclusion: false,
                audience: TargetKind::Device,
            })],
        ))
        .await;
        api.add_script(listing(
            "scr-2",
            "Irrelevant",
            vec![AssignmentSpec::new(TargetDescriptor::Group {
                group_id: "someone-elses-group".to_string(),
                exclusion: false,
                audience: TargetKind::Device,
            })],
        ))
        .await;
        let (subjects, membership) = baseline_inputs(&api).await;

        let records = resolve(&api, &subjects, &membership).await.expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].subject_name, "Cleanup");
        assert_eq!(records[0].detail.as_deref(), Some("remediation"));
    }

    #[tokio::test]
    async fn all_devices_applies_without_membership() {
        let api = MockApi::with_baseline();
        api.add_script(listing(
            "scr-3",
            "Inventory",
            vec![AssignmentSpec::new(TargetDescriptor::AllDevices)],
        ))
        .await;
        let (subjects, membership) = baseline_inputs(&api).await;

        let records = resolve(&api, &subjects, &membership).await.expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].targets[0].group_name, "All Devices");
    }

    #[tokio::test]
    async fn listing_failure_is_fatal() {
        let api = MockApi::with_baseline();
        api.fail_on("scripts_with_assignments", LensError::http(503, "throttled"))
            .await;
        let (subjects, membership) = baseline_inputs(&api).await;

        let err = resolve(&api, &subjects, &membership).await.unwrap_err();
        assert!(matches!(err, LensError::Http { status: 503, .. }));
    }
}
