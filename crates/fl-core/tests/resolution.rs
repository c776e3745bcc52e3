//! End-to-end resolution scenarios over the in-memory API: identity
//! resolution through membership aggregation to per-domain assignment
//! records, plus mutation batches driven from resolved output.

use fl_core::api::mock::MockApi;
use fl_core::api::{AppInstall, ScriptListing};
use fl_core::{
    apply_mutation, build_membership_map, resolve_assignments, resolve_subjects, selectable_groups,
    AssignmentDomain, AssignmentRecord, AssignmentSpec, GroupSelector, LensError, MembershipMap,
    MutationAction, ResolvedSubjects, TargetDescriptor, TargetKind,
};

fn group_spec(id: &str) -> AssignmentSpec {
    AssignmentSpec::new(TargetDescriptor::Group {
        group_id: id.to_string(),
        exclusion: false,
        audience: TargetKind::Device,
    })
}

async fn pipeline(api: &MockApi, mdm_id: &str) -> (ResolvedSubjects, MembershipMap) {
    let subjects = resolve_subjects(api, mdm_id).await.expect("subjects resolve");
    let membership = build_membership_map(
        api,
        &subjects.device.directory_id,
        subjects.user_directory_id(),
    )
    .await
    .expect("membership builds");
    (subjects, membership)
}

/// Order-insensitive shape of a record set, for idempotence comparisons.
fn shape(records: &[AssignmentRecord]) -> Vec<(String, Vec<String>)> {
    let mut out: Vec<(String, Vec<String>)> = records
        .iter()
        .map(|r| {
            let mut targets: Vec<String> =
                r.targets.iter().map(|t| t.group_name.clone()).collect();
            targets.sort();
            (r.subject_name.clone(), targets)
        })
        .collect();
    out.sort();
    out
}

#[tokio::test]
async fn baseline_device_resolves_through_to_configuration_records() {
    let api = MockApi::with_baseline();
    let (subjects, membership) = pipeline(&api, "D1").await;

    assert_eq!(subjects.device.directory_id, "G1");
    assert_eq!(membership.len(), 2);
    assert!(membership.is_dynamic("grp2"));

    let records = resolve_assignments(&api, AssignmentDomain::Configuration, &subjects, &membership)
        .await
        .expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].subject_name, "Baseline");
    assert_eq!(records[0].targets.len(), 2);
}

#[tokio::test]
async fn resolving_twice_yields_the_same_set() {
    let api = MockApi::with_baseline();
    let (subjects, membership) = pipeline(&api, "D1").await;

    let first = resolve_assignments(&api, AssignmentDomain::Configuration, &subjects, &membership)
        .await
        .expect("first run");
    let second = resolve_assignments(&api, AssignmentDomain::Configuration, &subjects, &membership)
        .await
        .expect("second run");
    assert_eq!(shape(&first), shape(&second));
}

#[tokio::test]
async fn one_failing_item_leaves_the_rest_of_the_batch_intact() {
    let api = MockApi::with_baseline();
    api.set_app_inventory(
        TargetKind::Device,
        vec![
            AppInstall {
                application_id: "app-1".to_string(),
                display_name: "Alpha".to_string(),
                intent: None,
                version: None,
                install_state: Some("installed".to_string()),
                context: TargetKind::Device,
            },
            AppInstall {
                application_id: "app-2".to_string(),
                display_name: "Beta".to_string(),
                intent: None,
                version: None,
                install_state: Some("installed".to_string()),
                context: TargetKind::Device,
            },
            AppInstall {
                application_id: "app-3".to_string(),
                display_name: "Gamma".to_string(),
                intent: None,
                version: None,
                install_state: Some("failed".to_string()),
                context: TargetKind::Device,
            },
        ],
    )
    .await;
    for id in ["app-1", "app-2", "app-3"] {
        api.set_app_assignments(id, vec![group_spec("grp1")]).await;
    }
    api.fail_on("app_assignments:app-2", LensError::http(500, "boom"))
        .await;
    let (subjects, membership) = pipeline(&api, "D1").await;

    let records = resolve_assignments(&api, AssignmentDomain::Application, &subjects, &membership)
        .await
        .expect("records");
    assert_eq!(records.len(), 3);
    let failed = records.iter().find(|r| r.subject_name == "Beta").expect("kept");
    assert!(failed.targets.is_empty());
    assert!(failed.error.is_some());
    assert!(records
        .iter()
        .filter(|r| r.subject_name != "Beta")
        .all(|r| r.error.is_none() && !r.targets.is_empty()));
}

#[tokio::test]
async fn device_only_identity_never_sees_all_users() {
    let api = MockApi::new();
    api.add_managed_device(fl_core::ManagedDevice {
        mdm_id: "D9".to_string(),
        device_name: Some("KIOSK-9".to_string()),
        azure_ad_device_id: Some("A9".to_string()),
        user_principal_name: None,
    })
    .await;
    api.add_directory_device(
        "A9",
        fl_core::DirectoryObject {
            id: "G9".to_string(),
            display_name: Some("KIOSK-9".to_string()),
        },
    )
    .await;
    api.set_compliance_rows(vec![fl_core::ComplianceRow {
        policy_id: Some("cmp-9".to_string()),
        policy_name: "Baseline Compliance".to_string(),
        status: "Compliant".to_string(),
    }])
    .await;
    api.set_compliance_assignments(
        "cmp-9",
        vec![
            AssignmentSpec::new(TargetDescriptor::AllUsers),
            AssignmentSpec::new(TargetDescriptor::AllDevices),
        ],
    )
    .await;
    api.add_script(ScriptListing {
        script_id: "scr-9".to_string(),
        display_name: "Remediate".to_string(),
        description: None,
        assignments: vec![AssignmentSpec::new(TargetDescriptor::AllUsers)],
    })
    .await;
    let (subjects, membership) = pipeline(&api, "D9").await;
    assert!(!subjects.has_user());

    let compliance =
        resolve_assignments(&api, AssignmentDomain::Compliance, &subjects, &membership)
            .await
            .expect("compliance");
    let names: Vec<&str> = compliance
        .iter()
        .flat_map(|r| r.targets.iter().map(|t| t.group_name.as_str()))
        .collect();
    assert!(names.contains(&"All Devices"));
    assert!(!names.contains(&"All Users"));

    let scripts = resolve_assignments(&api, AssignmentDomain::Script, &subjects, &membership)
        .await
        .expect("scripts");
    assert!(scripts.is_empty());
}

#[tokio::test]
async fn unresolved_groups_surface_only_in_compliance() {
    let api = MockApi::with_baseline();
    let foreign = "f0e1d2c3-b4a5-6789-0123-456789abcdef";
    api.set_configuration_assignments("pol-1", vec![group_spec(foreign)])
        .await;
    api.set_compliance_rows(vec![fl_core::ComplianceRow {
        policy_id: Some("cmp-1".to_string()),
        policy_name: "Firewall".to_string(),
        status: "Compliant".to_string(),
    }])
    .await;
    api.set_compliance_assignments("cmp-1", vec![group_spec(foreign)])
        .await;
    let (subjects, membership) = pipeline(&api, "D1").await;

    let configuration =
        resolve_assignments(&api, AssignmentDomain::Configuration, &subjects, &membership)
            .await
            .expect("configuration");
    assert!(configuration.is_empty());

    let compliance =
        resolve_assignments(&api, AssignmentDomain::Compliance, &subjects, &membership)
            .await
            .expect("compliance");
    assert_eq!(compliance.len(), 1);
    assert_eq!(compliance[0].targets[0].group_name, "Group ID: f0e1d2c3...");
}

#[tokio::test]
async fn dynamic_groups_display_but_resist_selection() {
    let api = MockApi::with_baseline();
    let (subjects, membership) = pipeline(&api, "D1").await;

    let records = resolve_assignments(&api, AssignmentDomain::Configuration, &subjects, &membership)
        .await
        .expect("records");
    let names: Vec<&str> = records[0]
        .targets
        .iter()
        .map(|t| t.group_name.as_str())
        .collect();
    assert!(names.contains(&"AllInterns"));

    let choices = selectable_groups(&records, &membership);
    assert_eq!(choices.len(), 1);
    assert_eq!(choices[0].name, "Engineering");
}

#[tokio::test]
async fn mutation_batch_from_resolved_output_reports_partial_failure() {
    let api = MockApi::with_baseline();
    api.add_group(fl_core::GroupInfo {
        id: "grp3".to_string(),
        display_name: "Pilots".to_string(),
        is_dynamic: false,
    })
    .await;
    api.fail_on("add_group_member:grp3", LensError::http(403, "denied"))
        .await;
    let (subjects, _membership) = pipeline(&api, "D1").await;

    let selectors = vec![
        GroupSelector::ById { id: "grp1".to_string(), name: "Engineering".to_string() },
        GroupSelector::ByName("Pilots".to_string()),
        GroupSelector::ByName("Ghost Crew".to_string()),
    ];
    let report = apply_mutation(&api, MutationAction::Add, &subjects.device, &selectors).await;

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(
        report.outcomes.iter().filter(|o| o.succeeded()).count(),
        1
    );
    assert!(report.summary.contains("1 of 3"));
    assert!(report.summary.contains("Pilots"));
    assert!(report.summary.contains("Ghost Crew"));

    let calls = api.member_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].group_id, "grp1");
    assert_eq!(calls[0].directory_id, "G1");
}
