//! The Graph connector: endpoint construction and the [`ManagementApi`]
//! implementation.
//!
//! Endpoint split: everything under `deviceManagement` and
//! `deviceAppManagement` lives on `beta` (the reporting endpoints and
//! script resources do not exist on `v1.0`); pure directory reads and
//! group mutations use `v1.0`.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use fl_core::{
    AppInstall, AppScope, AssignmentSpec, ComplianceRow, DirectoryObject, GroupInfo, LensResult,
    ManagedDevice, ManagementApi, MembershipScope, PolicyRow, ScriptContent, ScriptListing,
    TargetKind,
};

use crate::config::GraphConfig;
use crate::credentials::CredentialProvider;
use crate::http::HttpClient;
use crate::wire::{
    decode_assignments, ComplianceReportRequest, ComplianceReportResponse, ConfigReportRequest,
    ConfigReportResponse, CreateGroupRequest, LogCollectionRequest, ODataList, RawAssignment,
    RawAppInventory, RawCompliancePolicy, RawDirectoryObject, RawGroup, RawManagedDevice,
    RawScript, RawScriptContent, ReferenceBody,
};

/// Directory queries using `$search`/`$count` require this header.
const CONSISTENCY: [(&str, &str); 1] = [("ConsistencyLevel", "eventual")];

/// The "device context" pseudo-user of the app-inventory endpoint.
const DEVICE_CONTEXT_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Configuration policy types whose assignments live under the legacy
/// `deviceConfigurations` resource rather than `configurationPolicies`.
const LEGACY_CONFIG_TYPES: [&str; 11] = [
    "26", "20", "33", "55", "118", "75", "72", "25", "31", "107", "99999",
];

/// Microsoft Graph implementation of the management-API seam.
pub struct GraphClient {
    http: HttpClient,
}

impl GraphClient {
    pub fn new(config: &GraphConfig, credentials: CredentialProvider) -> LensResult<Self> {
        let http = HttpClient::new(config, credentials)?;
        info!(base_url = %config.base_url, "Graph connector initialized");
        Ok(Self { http })
    }

    /// Membership endpoint segment for a feed scope.
    fn membership_segment(scope: MembershipScope) -> &'static str {
        match scope {
            MembershipScope::Direct => "memberOf",
            MembershipScope::Transitive => "transitiveMemberOf",
        }
    }

    /// Resource collection for a directory object kind.
    fn directory_collection(kind: TargetKind) -> &'static str {
        match kind {
            TargetKind::Device => "devices",
            TargetKind::User => "users",
        }
    }

    async fn group_list(&self, path: &str) -> LensResult<Vec<GroupInfo>> {
        let feed: ODataList<RawGroup> = self.http.get_json(path, &CONSISTENCY).await?;
        Ok(feed
            .value
            .into_iter()
            .filter(RawGroup::is_group)
            .map(RawGroup::into_group_info)
            .collect())
    }
}

#[async_trait]
impl ManagementApi for GraphClient {
    #[instrument(skip(self))]
    async fn managed_device(&self, mdm_id: &str) -> LensResult<ManagedDevice> {
        let path = format!(
            "beta/deviceManagement/managedDevices('{}')?$select=deviceName,azureADDeviceId,userPrincipalName",
            urlencoding::encode(mdm_id)
        );
        let raw: RawManagedDevice = self.http.get_json(&path, &[]).await?;
        Ok(raw.into_model(mdm_id))
    }

    #[instrument(skip(self))]
    async fn directory_devices_by_device_id(
        &self,
        azure_ad_device_id: &str,
    ) -> LensResult<Vec<DirectoryObject>> {
        let filter = format!("deviceId eq '{azure_ad_device_id}'");
        let path = format!(
            "v1.0/devices?$filter={}&$select=id,displayName",
            urlencoding::encode(&filter)
        );
        let feed: ODataList<RawDirectoryObject> = self.http.get_json(&path, &[]).await?;
        Ok(feed.value.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn directory_users_by_upn(
        &self,
        user_principal_name: &str,
    ) -> LensResult<Vec<DirectoryObject>> {
        let filter = format!("userPrincipalName eq '{user_principal_name}'");
        let path = format!(
            "v1.0/users?$filter={}&$select=id,displayName",
            urlencoding::encode(&filter)
        );
        let feed: ODataList<RawDirectoryObject> = self.http.get_json(&path, &[]).await?;
        Ok(feed.value.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn member_groups(
        &self,
        kind: TargetKind,
        directory_id: &str,
        scope: MembershipScope,
    ) -> LensResult<Vec<GroupInfo>> {
        let path = format!(
            "v1.0/{}/{}/{}?$select=id,displayName,groupTypes&$orderBy=displayName%20asc&$count=true",
            Self::directory_collection(kind),
            urlencoding::encode(directory_id),
            Self::membership_segment(scope),
        );
        self.group_list(&path).await
    }

    #[instrument(skip(self))]
    async fn search_groups(&self, query: &str) -> LensResult<Vec<GroupInfo>> {
        let search = format!("\"displayName:{query}\"");
        let path = format!(
            "v1.0/groups?$search={}&$select=id,displayName,groupTypes&$top=10",
            urlencoding::encode(&search)
        );
        self.group_list(&path).await
    }

    #[instrument(skip(self))]
    async fn groups_by_display_name(&self, display_name: &str) -> LensResult<Vec<GroupInfo>> {
        let filter = format!("displayName eq '{display_name}'");
        let path = format!(
            "v1.0/groups?$filter={}&$select=id,displayName,groupTypes",
            urlencoding::encode(&filter)
        );
        self.group_list(&path).await
    }

    #[instrument(skip(self))]
    async fn create_group(&self, display_name: &str) -> LensResult<GroupInfo> {
        let body = CreateGroupRequest::security_group(display_name);
        let raw: RawGroup = self.http.post_json("v1.0/groups", &body).await?;
        Ok(raw.into_group_info())
    }

    #[instrument(skip(self))]
    async fn add_group_member(&self, group_id: &str, directory_id: &str) -> LensResult<()> {
        let path = format!("v1.0/groups/{}/members/$ref", urlencoding::encode(group_id));
        let body = ReferenceBody {
            odata_id: format!(
                "https://graph.microsoft.com/v1.0/directoryObjects/{directory_id}"
            ),
        };
        self.http.post_no_content(&path, &body).await
    }

    #[instrument(skip(self))]
    async fn remove_group_member(&self, group_id: &str, directory_id: &str) -> LensResult<()> {
        let path = format!(
            "v1.0/groups/{}/members/{}/$ref",
            urlencoding::encode(group_id),
            urlencoding::encode(directory_id),
        );
        self.http.delete(&path).await
    }

    #[instrument(skip(self))]
    async fn configuration_report(&self, mdm_id: &str) -> LensResult<Vec<PolicyRow>> {
        let body = ConfigReportRequest::for_device(mdm_id);
        let response: ConfigReportResponse = self
            .http
            .post_json(
                "beta/deviceManagement/reports/getConfigurationPoliciesReportForDevice",
                &body,
            )
            .await?;
        let rows = response.into_rows();
        debug!(rows = rows.len(), "configuration report fetched");
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn configuration_assignments(
        &self,
        policy_id: &str,
        policy_type: &str,
    ) -> LensResult<Vec<AssignmentSpec>> {
        let id = urlencoding::encode(policy_id);
        let path = if LEGACY_CONFIG_TYPES.contains(&policy_type) {
            format!("beta/deviceManagement/deviceConfigurations/{id}/assignments")
        } else {
            format!("beta/deviceManagement/configurationPolicies('{id}')/assignments")
        };
        let feed: ODataList<RawAssignment> = self.http.get_json(&path, &[]).await?;
        Ok(decode_assignments(feed.value))
    }

    #[instrument(skip(self))]
    async fn compliance_report(&self, mdm_id: &str) -> LensResult<Vec<ComplianceRow>> {
        let body = ComplianceReportRequest::for_device(mdm_id);
        let response: ComplianceReportResponse = self
            .http
            .post_json(
                "beta/deviceManagement/reports/getDevicePoliciesComplianceReport",
                &body,
            )
            .await?;
        response.into_rows()
    }

    #[instrument(skip(self))]
    async fn compliance_assignments(&self, policy_id: &str) -> LensResult<Vec<AssignmentSpec>> {
        let path = format!(
            "beta/deviceManagement/deviceCompliancePolicies/{}?$expand=assignments",
            urlencoding::encode(policy_id)
        );
        let raw: RawCompliancePolicy = self.http.get_json(&path, &[]).await?;
        Ok(decode_assignments(raw.assignments))
    }

    #[instrument(skip(self))]
    async fn app_inventory(&self, scope: AppScope, mdm_id: &str) -> LensResult<Vec<AppInstall>> {
        let context_id = match &scope {
            AppScope::Device => DEVICE_CONTEXT_ID,
            AppScope::User { directory_id } => directory_id.as_str(),
        };
        let path = format!(
            "beta/users('{}')/mobileAppIntentAndStates('{}')",
            urlencoding::encode(context_id),
            urlencoding::encode(mdm_id),
        );
        let kind = scope.kind();
        let inventory: RawAppInventory = self.http.get_json(&path, &[]).await?;
        Ok(inventory
            .mobile_app_list
            .into_iter()
            .map(|a| a.into_model(kind))
            .collect())
    }

    #[instrument(skip(self))]
    async fn app_assignments(&self, application_id: &str) -> LensResult<Vec<AssignmentSpec>> {
        let path = format!(
            "beta/deviceAppManagement/mobileApps/{}/assignments",
            urlencoding::encode(application_id)
        );
        let feed: ODataList<RawAssignment> = self.http.get_json(&path, &[]).await?;
        Ok(decode_assignments(feed.value))
    }

    #[instrument(skip(self))]
    async fn scripts_with_assignments(&self) -> LensResult<Vec<ScriptListing>> {
        let feed: ODataList<RawScript> = self
            .http
            .get_json(
                "beta/deviceManagement/deviceManagementScripts?$expand=assignments",
                &[],
            )
            .await?;
        if feed.value.is_empty() {
            warn!("script listing came back empty");
        }
        Ok(feed.value.into_iter().map(RawScript::into_listing).collect())
    }

    #[instrument(skip(self))]
    async fn script(&self, script_id: &str) -> LensResult<ScriptContent> {
        let path = format!(
            "beta/deviceManagement/deviceManagementScripts/{}",
            urlencoding::encode(script_id)
        );
        let raw: RawScriptContent = self.http.get_json(&path, &[]).await?;
        raw.decode()
    }

    #[instrument(skip(self, folders))]
    async fn request_log_collection(
        &self,
        user_directory_id: &str,
        mdm_id: &str,
        app_id: &str,
        folders: &[String],
    ) -> LensResult<()> {
        let path = format!(
            "beta/users/{}/mobileAppTroubleshootingEvents/{}_{}/appLogCollectionRequests",
            urlencoding::encode(user_directory_id),
            urlencoding::encode(mdm_id),
            urlencoding::encode(app_id),
        );
        let body = LogCollectionRequest {
            custom_log_folders: folders.to_vec(),
            id: format!("{user_directory_id}_{mdm_id}_{app_id}"),
        };
        self.http.post_no_content(&path, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_config_types_route_to_device_configurations() {
        assert!(LEGACY_CONFIG_TYPES.contains(&"26"));
        assert!(LEGACY_CONFIG_TYPES.contains(&"99999"));
        assert!(!LEGACY_CONFIG_TYPES.contains(&"1"));
    }

    #[test]
    fn membership_segments_and_collections() {
        assert_eq!(
            GraphClient::membership_segment(MembershipScope::Direct),
            "memberOf"
        );
        assert_eq!(
            GraphClient::membership_segment(MembershipScope::Transitive),
            "transitiveMemberOf"
        );
        assert_eq!(GraphClient::directory_collection(TargetKind::Device), "devices");
        assert_eq!(GraphClient::directory_collection(TargetKind::User), "users");
    }
}
