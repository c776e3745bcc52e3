//! In-memory [`ManagementApi`] used by unit and scenario tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::api::{
    AppInstall, AppScope, ComplianceRow, DirectoryObject, ManagedDevice, ManagementApi,
    MembershipScope, PolicyRow, ScriptContent, ScriptListing,
};
use crate::error::{LensError, LensResult};
use crate::model::{AssignmentSpec, GroupInfo, TargetDescriptor, TargetKind};

/// A recorded add/remove call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberCall {
    pub action: MemberAction,
    pub group_id: String,
    pub directory_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAction {
    Add,
    Remove,
}

/// A recorded log-collection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pub user_directory_id: String,
    pub mdm_id: String,
    pub app_id: String,
    pub folders: Vec<String>,
}

/// In-memory API double. Fixture state is loaded through the `add_*`/`set_*`
/// builders; failures are injected per operation with [`MockApi::fail_on`]
/// using the operation name (`"compliance_report"`) or an item-scoped key
/// (`"app_assignments:app-2"`).
#[derive(Default)]
pub struct MockApi {
    managed_devices: RwLock<HashMap<String, ManagedDevice>>,
    directory_devices: RwLock<HashMap<String, Vec<DirectoryObject>>>,
    directory_users: RwLock<HashMap<String, Vec<DirectoryObject>>>,
    memberships: RwLock<HashMap<(TargetKind, String, MembershipScope), Vec<GroupInfo>>>,
    groups: RwLock<Vec<GroupInfo>>,
    configuration_rows: RwLock<Vec<PolicyRow>>,
    configuration_assignments: RwLock<HashMap<String, Vec<AssignmentSpec>>>,
    compliance_rows: RwLock<Vec<ComplianceRow>>,
    compliance_assignments: RwLock<HashMap<String, Vec<AssignmentSpec>>>,
    app_inventories: RwLock<HashMap<TargetKind, Vec<AppInstall>>>,
    app_assignments: RwLock<HashMap<String, Vec<AssignmentSpec>>>,
    scripts: RwLock<Vec<ScriptListing>>,
    script_contents: RwLock<HashMap<String, ScriptContent>>,
    failures: RwLock<HashMap<String, LensError>>,
    member_calls: RwLock<Vec<MemberCall>>,
    log_requests: RwLock<Vec<LogRequest>>,
    created: RwLock<u32>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// A managed device `D1` whose directory device is `G1`, with a resolved
    /// user `U1`, memberships `grp1` (Engineering, direct) and `grp2`
    /// (AllInterns, transitive, dynamic), and one configuration policy
    /// `Baseline` assigned to both groups.
    pub fn with_baseline() -> Self {
        let device = ManagedDevice {
            mdm_id: "D1".to_string(),
            device_name: Some("LAPTOP-01".to_string()),
            azure_ad_device_id: Some("A1".to_string()),
            user_principal_name: Some("jdoe@contoso.com".to_string()),
        };
        let mut managed_devices = HashMap::new();
        managed_devices.insert("D1".to_string(), device);

        let mut directory_devices = HashMap::new();
        directory_devices.insert(
            "A1".to_string(),
            vec![DirectoryObject {
                id: "G1".to_string(),
                display_name: Some("LAPTOP-01".to_string()),
            }],
        );
        let mut directory_users = HashMap::new();
        directory_users.insert(
            "jdoe@contoso.com".to_string(),
            vec![DirectoryObject {
                id: "U1".to_string(),
                display_name: Some("Jane Doe".to_string()),
            }],
        );

        let engineering = GroupInfo {
            id: "grp1".to_string(),
            display_name: "Engineering".to_string(),
            is_dynamic: false,
        };
        let interns = GroupInfo {
            id: "grp2".to_string(),
            display_name: "AllInterns".to_string(),
            is_dynamic: true,
        };
        let mut memberships = HashMap::new();
        memberships.insert(
            (TargetKind::Device, "G1".to_string(), MembershipScope::Direct),
            vec![engineering.clone()],
        );
        memberships.insert(
            (TargetKind::Device, "G1".to_string(), MembershipScope::Transitive),
            vec![engineering.clone(), interns.clone()],
        );

        let configuration_rows = vec![PolicyRow {
            policy_id: "pol-1".to_string(),
            policy_name: "Baseline".to_string(),
            policy_type: "1".to_string(),
            user_principal_name: Some("jdoe@contoso.com".to_string()),
        }];
        let mut configuration_assignments = HashMap::new();
        configuration_assignments.insert(
            "pol-1".to_string(),
            vec![
                AssignmentSpec::new(TargetDescriptor::Group {
                    group_id: "grp1".to_string(),
                    exclusion: false,
                    audience: TargetKind::Device,
                }),
                AssignmentSpec::new(TargetDescriptor::Group {
                    group_id: "grp2".to_string(),
                    exclusion: false,
                    audience: TargetKind::Device,
                }),
            ],
        );

        Self {
            managed_devices: RwLock::new(managed_devices),
            directory_devices: RwLock::new(directory_devices),
            directory_users: RwLock::new(directory_users),
            memberships: RwLock::new(memberships),
            groups: RwLock::new(vec![engineering, interns]),
            configuration_rows: RwLock::new(configuration_rows),
            configuration_assignments: RwLock::new(configuration_assignments),
            ..Self::default()
        }
    }

    pub async fn add_managed_device(&self, device: ManagedDevice) {
        self.managed_devices
            .write()
            .await
            .insert(device.mdm_id.clone(), device);
    }

    pub async fn add_directory_device(&self, azure_ad_device_id: &str, object: DirectoryObject) {
        self.directory_devices
            .write()
            .await
            .entry(azure_ad_device_id.to_string())
            .or_default()
            .push(object);
    }

    pub async fn add_directory_user(&self, user_principal_name: &str, object: DirectoryObject) {
        self.directory_users
            .write()
            .await
            .entry(user_principal_name.to_string())
            .or_default()
            .push(object);
    }

    pub async fn set_memberships(
        &self,
        kind: TargetKind,
        directory_id: &str,
        scope: MembershipScope,
        feed: Vec<GroupInfo>,
    ) {
        self.memberships
            .write()
            .await
            .insert((kind, directory_id.to_string(), scope), feed);
    }

    pub async fn add_group(&self, group: GroupInfo) {
        self.groups.write().await.push(group);
    }

    pub async fn set_configuration_rows(&self, rows: Vec<PolicyRow>) {
        *self.configuration_rows.write().await = rows;
    }

    pub async fn set_configuration_assignments(&self, policy_id: &str, specs: Vec<AssignmentSpec>) {
        self.configuration_assignments
            .write()
            .await
            .insert(policy_id.to_string(), specs);
    }

    pub async fn set_compliance_rows(&self, rows: Vec<ComplianceRow>) {
        *self.compliance_rows.write().await = rows;
    }

    pub async fn set_compliance_assignments(&self, policy_id: &str, specs: Vec<AssignmentSpec>) {
        self.compliance_assignments
            .write()
            .await
            .insert(policy_id.to_string(), specs);
    }

    pub async fn set_app_inventory(&self, context: TargetKind, apps: Vec<AppInstall>) {
        self.app_inventories.write().await.insert(context, apps);
    }

    pub async fn set_app_assignments(&self, application_id: &str, specs: Vec<AssignmentSpec>) {
        self.app_assignments
            .write()
            .await
            .insert(application_id.to_string(), specs);
    }

    pub async fn add_script(&self, listing: ScriptListing) {
        self.scripts.write().await.push(listing);
    }

    pub async fn set_script_content(&self, script_id: &str, content: ScriptContent) {
        self.script_contents
            .write()
            .await
            .insert(script_id.to_string(), content);
    }

    /// Forces the keyed operation to fail with the given error.
    pub async fn fail_on(&self, key: impl Into<String>, error: LensError) {
        self.failures.write().await.insert(key.into(), error);
    }

    pub async fn member_calls(&self) -> Vec<MemberCall> {
        self.member_calls.read().await.clone()
    }

    pub async fn log_requests(&self) -> Vec<LogRequest> {
        self.log_requests.read().await.clone()
    }

    async fn check(&self, op: &str, item: Option<&str>) -> LensResult<()> {
        let failures = self.failures.read().await;
        if let Some(item) = item {
            if let Some(err) = failures.get(&format!("{op}:{item}")) {
                return Err(err.clone());
            }
        }
        if let Some(err) = failures.get(op) {
            return Err(err.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl ManagementApi for MockApi {
    async fn managed_device(&self, mdm_id: &str) -> LensResult<ManagedDevice> {
        self.check("managed_device", Some(mdm_id)).await?;
        self.managed_devices
            .read()
            .await
            .get(mdm_id)
            .cloned()
            .ok_or_else(|| LensError::http(404, "managed device not found"))
    }

    async fn directory_devices_by_device_id(
        &self,
        azure_ad_device_id: &str,
    ) -> LensResult<Vec<DirectoryObject>> {
        self.check("directory_devices_by_device_id", Some(azure_ad_device_id))
            .await?;
        Ok(self
            .directory_devices
            .read()
            .await
            .get(azure_ad_device_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn directory_users_by_upn(
        &self,
        user_principal_name: &str,
    ) -> LensResult<Vec<DirectoryObject>> {
        self.check("directory_users_by_upn", Some(user_principal_name))
            .await?;
        Ok(self
            .directory_users
            .read()
            .await
            .get(user_principal_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn member_groups(
        &self,
        kind: TargetKind,
        directory_id: &str,
        scope: MembershipScope,
    ) -> LensResult<Vec<GroupInfo>> {
        self.check("member_groups", Some(directory_id)).await?;
        Ok(self
            .memberships
            .read()
            .await
            .get(&(kind, directory_id.to_string(), scope))
            .cloned()
            .unwrap_or_default())
    }

    async fn search_groups(&self, query: &str) -> LensResult<Vec<GroupInfo>> {
        self.check("search_groups", None).await?;
        let needle = query.to_lowercase();
        Ok(self
            .groups
            .read()
            .await
            .iter()
            .filter(|g| g.display_name.to_lowercase().contains(&needle))
            .take(10)
            .cloned()
            .collect())
    }

    async fn groups_by_display_name(&self, display_name: &str) -> LensResult<Vec<GroupInfo>> {
        self.check("groups_by_display_name", Some(display_name)).await?;
        Ok(self
            .groups
            .read()
            .await
            .iter()
            .filter(|g| g.display_name == display_name)
            .cloned()
            .collect())
    }

    async fn create_group(&self, display_name: &str) -> LensResult<GroupInfo> {
        self.check("create_group", None).await?;
        let mut counter = self.created.write().await;
        *counter += 1;
        let group = GroupInfo {
            id: format!("created-{}", *counter),
            display_name: display_name.to_string(),
            is_dynamic: false,
        };
        self.groups.write().await.push(group.clone());
        Ok(group)
    }

    async fn add_group_member(&self, group_id: &str, directory_id: &str) -> LensResult<()> {
        self.check("add_group_member", Some(group_id)).await?;
        self.member_calls.write().await.push(MemberCall {
            action: MemberAction::Add,
            group_id: group_id.to_string(),
            directory_id: directory_id.to_string(),
        });
        Ok(())
    }

    async fn remove_group_member(&self, group_id: &str, directory_id: &str) -> LensResult<()> {
        self.check("remove_group_member", Some(group_id)).await?;
        self.member_calls.write().await.push(MemberCall {
            action: MemberAction::Remove,
            group_id: group_id.to_string(),
            directory_id: directory_id.to_string(),
        });
        Ok(())
    }

    async fn configuration_report(&self, mdm_id: &str) -> LensResult<Vec<PolicyRow>> {
        self.check("configuration_report", Some(mdm_id)).await?;
        Ok(self.configuration_rows.read().await.clone())
    }

    async fn configuration_assignments(
        &self,
        policy_id: &str,
        _policy_type: &str,
    ) -> LensResult<Vec<AssignmentSpec>> {
        self.check("configuration_assignments", Some(policy_id)).await?;
        Ok(self
            .configuration_assignments
            .read()
            .await
            .get(policy_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn compliance_report(&self, mdm_id: &str) -> LensResult<Vec<ComplianceRow>> {
        self.check("compliance_report", Some(mdm_id)).await?;
        Ok(self.compliance_rows.read().await.clone())
    }

    async fn compliance_assignments(&self, policy_id: &str) -> LensResult<Vec<AssignmentSpec>> {
        self.check("compliance_assignments", Some(policy_id)).await?;
        Ok(self
            .compliance_assignments
            .read()
            .await
            .get(policy_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn app_inventory(&self, scope: AppScope, mdm_id: &str) -> LensResult<Vec<AppInstall>> {
        self.check("app_inventory", Some(scope.kind().as_noun())).await?;
        self.check("app_inventory", Some(mdm_id)).await?;
        Ok(self
            .app_inventories
            .read()
            .await
            .get(&scope.kind())
            .cloned()
            .unwrap_or_default())
    }

    async fn app_assignments(&self, application_id: &str) -> LensResult<Vec<AssignmentSpec>> {
        self.check("app_assignments", Some(application_id)).await?;
        Ok(self
            .app_assignments
            .read()
            .await
            .get(application_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn scripts_with_assignments(&self) -> LensResult<Vec<ScriptListing>> {
        self.check("scripts_with_assignments", None).await?;
        Ok(self.scripts.read().await.clone())
    }

    async fn script(&self, script_id: &str) -> LensResult<ScriptContent> {
        self.check("script", Some(script_id)).await?;
        self.script_contents
            .read()
            .await
            .get(script_id)
            .cloned()
            .ok_or_else(|| LensError::http(404, "script not found"))
    }

    async fn request_log_collection(
        &self,
        user_directory_id: &str,
        mdm_id: &str,
        app_id: &str,
        folders: &[String],
    ) -> LensResult<()> {
        self.check("request_log_collection", Some(app_id)).await?;
        self.log_requests.write().await.push(LogRequest {
            user_directory_id: user_directory_id.to_string(),
            mdm_id: mdm_id.to_string(),
            app_id: app_id.to_string(),
            folders: folders.to_vec(),
        });
        Ok(())
    }
}
