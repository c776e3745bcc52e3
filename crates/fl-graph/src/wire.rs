//! Raw Graph payload shapes and their conversion into core carriers.
//!
//! Everything stringly-typed stops here: `@odata.type` discriminators are
//! decoded into [`TargetDescriptor`]s, positional report rows into
//! [`PolicyRow`]s, and base64 script blobs into bytes.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use fl_core::{
    AppInstall, AssignmentSpec, ComplianceRow, DirectoryObject, GroupInfo, LensError, LensResult,
    ManagedDevice, PolicyRow, ScriptContent, ScriptListing, TargetDescriptor, TargetKind,
};

/// Standard OData collection envelope.
#[derive(Debug, Deserialize)]
pub struct ODataList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawManagedDevice {
    pub device_name: Option<String>,
    // Not the camelCase the rest of the API uses.
    #[serde(rename = "azureADDeviceId")]
    pub azure_ad_device_id: Option<String>,
    pub user_principal_name: Option<String>,
}

impl RawManagedDevice {
    pub fn into_model(self, mdm_id: &str) -> ManagedDevice {
        ManagedDevice {
            mdm_id: mdm_id.to_string(),
            device_name: self.device_name.filter(|s| !s.is_empty()),
            azure_ad_device_id: self.azure_ad_device_id.filter(|s| !s.is_empty()),
            user_principal_name: self.user_principal_name.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDirectoryObject {
    pub id: String,
    pub display_name: Option<String>,
}

impl From<RawDirectoryObject> for DirectoryObject {
    fn from(raw: RawDirectoryObject) -> Self {
        DirectoryObject {
            id: raw.id,
            display_name: raw.display_name,
        }
    }
}

/// A group row from membership, search, or creation responses. Membership
/// feeds interleave non-group directory objects, so the discriminator is
/// kept for filtering.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGroup {
    #[serde(rename = "@odata.type", default)]
    pub odata_type: String,
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub group_types: Vec<String>,
}

impl RawGroup {
    /// Membership feeds are filtered on this; direct group endpoints omit
    /// the discriminator and pass unconditionally.
    pub fn is_group(&self) -> bool {
        self.odata_type.is_empty() || self.odata_type == "#microsoft.graph.group"
    }

    pub fn into_group_info(self) -> GroupInfo {
        let is_dynamic = self
            .group_types
            .iter()
            .any(|t| t == "DynamicMembership");
        GroupInfo {
            id: self.id,
            display_name: self.display_name,
            is_dynamic,
        }
    }
}

/// One assignment as returned by `/assignments` and `$expand=assignments`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAssignment {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub target: Option<RawTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTarget {
    #[serde(rename = "@odata.type", default)]
    pub odata_type: String,
    #[serde(default)]
    pub group_id: Option<String>,
}

/// Decodes a batch of raw assignments; entries without a target are
/// malformed and skipped.
pub fn decode_assignments(raw: Vec<RawAssignment>) -> Vec<AssignmentSpec> {
    raw.into_iter()
        .filter_map(|assignment| {
            let target = assignment.target?;
            Some(AssignmentSpec {
                descriptor: TargetDescriptor::decode(&target.odata_type, target.group_id.as_deref()),
                intent: assignment.intent.filter(|i| !i.is_empty()),
            })
        })
        .collect()
}

/// Request body for the per-device configuration report.
#[derive(Debug, Serialize)]
pub struct ConfigReportRequest {
    pub top: &'static str,
    pub skip: &'static str,
    pub select: [&'static str; 4],
    pub filter: String,
}

impl ConfigReportRequest {
    pub fn for_device(mdm_id: &str) -> Self {
        let filter = format!(
            "((PolicyBaseTypeName eq 'Microsoft.Management.Services.Api.DeviceConfiguration') \
             or (PolicyBaseTypeName eq 'DeviceManagementConfigurationPolicy') \
             or (PolicyBaseTypeName eq 'DeviceConfigurationAdmxPolicy') \
             or (PolicyBaseTypeName eq 'Microsoft.Management.Services.Api.DeviceManagementIntent')) \
             and (IntuneDeviceId eq '{mdm_id}')"
        );
        Self {
            top: "500",
            skip: "0",
            select: ["PolicyId", "PolicyName", "PolicyType", "UPN"],
            filter,
        }
    }
}

/// Configuration report response: positional rows in `select` order.
#[derive(Debug, Deserialize)]
pub struct ConfigReportResponse {
    #[serde(rename = "Values", default)]
    pub values: Vec<Vec<Value>>,
}

impl ConfigReportResponse {
    pub fn into_rows(self) -> Vec<PolicyRow> {
        self.values
            .into_iter()
            .filter_map(|row| {
                let policy_id = cell_string(&row, 0)?;
                let policy_name = cell_string(&row, 1).unwrap_or_else(|| "Unknown Policy".to_string());
                let policy_type = cell_string(&row, 2)?;
                Some(PolicyRow {
                    policy_id,
                    policy_name,
                    policy_type,
                    user_principal_name: cell_string(&row, 3),
                })
            })
            .collect()
    }
}

/// Request body for the per-device compliance report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReportRequest {
    pub filter: String,
    pub order_by: [&'static str; 1],
}

impl ComplianceReportRequest {
    pub fn for_device(mdm_id: &str) -> Self {
        let filter = format!(
            "(DeviceId eq '{mdm_id}') and ((PolicyPlatformType eq '4') \
             or (PolicyPlatformType eq '5') or (PolicyPlatformType eq '6') \
             or (PolicyPlatformType eq '8') or (PolicyPlatformType eq '100'))"
        );
        Self {
            filter,
            order_by: ["PolicyName asc"],
        }
    }
}

/// Compliance report response: rows with a named-column schema.
#[derive(Debug, Deserialize)]
pub struct ComplianceReportResponse {
    #[serde(rename = "Schema", default)]
    pub schema: Vec<SchemaColumn>,
    #[serde(rename = "Values", default)]
    pub values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct SchemaColumn {
    #[serde(rename = "Column")]
    pub column: String,
}

impl ComplianceReportResponse {
    /// Locates the required columns by name and extracts the rows. A schema
    /// missing any required column is a decode failure.
    pub fn into_rows(self) -> LensResult<Vec<ComplianceRow>> {
        let index_of = |name: &str| self.schema.iter().position(|c| c.column == name);
        let required = ["PolicyId", "PolicyName", "PolicyStatus_loc"];
        let missing: Vec<&str> = required
            .iter()
            .filter(|name| index_of(name).is_none())
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(LensError::Decode(format!(
                "compliance report missing required columns: {}",
                missing.join(", ")
            )));
        }
        let id_idx = index_of("PolicyId").unwrap_or_default();
        let name_idx = index_of("PolicyName").unwrap_or_default();
        let status_idx = index_of("PolicyStatus_loc").unwrap_or_default();

        Ok(self
            .values
            .into_iter()
            .map(|row| ComplianceRow {
                policy_id: cell_string(&row, id_idx).filter(|id| !id.is_empty()),
                policy_name: cell_string(&row, name_idx)
                    .unwrap_or_else(|| "Unknown Policy".to_string()),
                status: cell_string(&row, status_idx).unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect())
    }
}

/// A compliance policy fetched with `$expand=assignments`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCompliancePolicy {
    #[serde(default)]
    pub assignments: Vec<RawAssignment>,
}

/// The install-inventory envelope; note the list key is not `value`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAppInventory {
    #[serde(default)]
    pub mobile_app_list: Vec<RawAppInstall>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAppInstall {
    pub application_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub mobile_app_intent: Option<String>,
    #[serde(default)]
    pub display_version: Option<String>,
    #[serde(default)]
    pub install_state: Option<String>,
}

impl RawAppInstall {
    pub fn into_model(self, context: TargetKind) -> AppInstall {
        AppInstall {
            application_id: self.application_id,
            display_name: self.display_name,
            intent: self.mobile_app_intent.filter(|i| !i.is_empty()),
            version: self.display_version.filter(|v| !v.is_empty()),
            install_state: self.install_state.filter(|s| !s.is_empty()),
            context,
        }
    }
}

/// A platform script row from the expanded listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScript {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignments: Vec<RawAssignment>,
}

impl RawScript {
    pub fn into_listing(self) -> ScriptListing {
        ScriptListing {
            script_id: self.id,
            display_name: self.display_name,
            description: self.description.filter(|d| !d.is_empty()),
            assignments: decode_assignments(self.assignments),
        }
    }
}

/// The script resource carrying base64 content.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScriptContent {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub script_content: Option<String>,
}

impl RawScriptContent {
    pub fn decode(self) -> LensResult<ScriptContent> {
        let encoded = self
            .script_content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LensError::Decode("no script content in response".to_string()))?;
        let content = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| LensError::Decode(format!("script content is not valid base64: {e}")))?;
        Ok(ScriptContent {
            file_name: self
                .file_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "IntuneScript.ps1".to_string()),
            content,
        })
    }
}

/// Body for group creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub display_name: String,
    pub mail_enabled: bool,
    pub mail_nickname: String,
    pub security_enabled: bool,
}

impl CreateGroupRequest {
    pub fn security_group(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            mail_enabled: false,
            mail_nickname: mail_nickname(display_name),
            security_enabled: true,
        }
    }
}

/// Mail nickname derived from a display name: the first ten characters,
/// with everything non-alphanumeric stripped from that prefix.
pub fn mail_nickname(display_name: &str) -> String {
    display_name
        .chars()
        .take(10)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Body for `members/$ref` additions.
#[derive(Debug, Serialize)]
pub struct ReferenceBody {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

/// Body for app-log-collection requests.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCollectionRequest {
    pub custom_log_folders: Vec<String>,
    pub id: String,
}

/// String coercion for positional report cells; numeric cells render as
/// their decimal form.
fn cell_string(row: &[Value], idx: usize) -> Option<String> {
    match row.get(idx)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => {
            warn!(cell = %other, "unexpected report cell shape");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_core::TargetDescriptor;

    #[test]
    fn membership_feed_filters_non_groups_and_flags_dynamic() {
        let feed: ODataList<RawGroup> = serde_json::from_str(
            r##"{"value": [
                {"@odata.type": "#microsoft.graph.group", "id": "g1",
                 "displayName": "Engineering", "groupTypes": []},
                {"@odata.type": "#microsoft.graph.group", "id": "g2",
                 "displayName": "AllInterns", "groupTypes": ["DynamicMembership"]},
                {"@odata.type": "#microsoft.graph.administrativeUnit", "id": "au1",
                 "displayName": "HQ"}
            ]}"##,
        )
        .expect("parse");
        let groups: Vec<GroupInfo> = feed
            .value
            .into_iter()
            .filter(RawGroup::is_group)
            .map(RawGroup::into_group_info)
            .collect();
        assert_eq!(groups.len(), 2);
        assert!(!groups[0].is_dynamic);
        assert!(groups[1].is_dynamic);
    }

    #[test]
    fn assignments_decode_targets_and_drop_malformed_entries() {
        let raw: ODataList<RawAssignment> = serde_json::from_str(
            r##"{"value": [
                {"intent": "required",
                 "target": {"@odata.type": "#microsoft.graph.groupAssignmentTarget",
                            "groupId": "g1"}},
                {"target": {"@odata.type": "#microsoft.graph.exclusionGroupAssignmentTarget",
                            "groupId": "g2"}},
                {"target": {"@odata.type": "#microsoft.graph.allLicensedUsersAssignmentTarget"}},
                {"id": "no-target"}
            ]}"##,
        )
        .expect("parse");
        let specs = decode_assignments(raw.value);
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].intent.as_deref(), Some("required"));
        assert!(matches!(
            specs[0].descriptor,
            TargetDescriptor::Group { ref group_id, exclusion: false, .. } if group_id == "g1"
        ));
        assert!(matches!(
            specs[1].descriptor,
            TargetDescriptor::Group { exclusion: true, .. }
        ));
        assert!(matches!(specs[2].descriptor, TargetDescriptor::AllUsers));
    }

    #[test]
    fn configuration_rows_parse_positionally_with_numeric_type() {
        let response: ConfigReportResponse = serde_json::from_str(
            r#"{"TotalRowCount": 2, "Values": [
                ["pol-1", "Baseline", 26, "jdoe@contoso.com"],
                ["pol-2", "Kiosk", "9007", null]
            ]}"#,
        )
        .expect("parse");
        let rows = response.into_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].policy_type, "26");
        assert_eq!(rows[0].user_principal_name.as_deref(), Some("jdoe@contoso.com"));
        assert_eq!(rows[1].policy_type, "9007");
        assert!(rows[1].user_principal_name.is_none());
    }

    #[test]
    fn compliance_rows_locate_columns_by_name() {
        let response: ComplianceReportResponse = serde_json::from_str(
            r#"{"Schema": [
                {"Column": "DeviceId"},
                {"Column": "PolicyName"},
                {"Column": "PolicyId"},
                {"Column": "PolicyStatus_loc"}
            ], "Values": [
                ["d1", "Bitlocker", "cmp-1", "Compliant"],
                ["d1", "Builtin", null, "Not applicable"]
            ]}"#,
        )
        .expect("parse");
        let rows = response.into_rows().expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].policy_id.as_deref(), Some("cmp-1"));
        assert_eq!(rows[0].policy_name, "Bitlocker");
        assert_eq!(rows[0].status, "Compliant");
        assert!(rows[1].policy_id.is_none());
    }

    #[test]
    fn compliance_schema_missing_columns_is_a_decode_error() {
        let response: ComplianceReportResponse = serde_json::from_str(
            r#"{"Schema": [{"Column": "PolicyName"}], "Values": []}"#,
        )
        .expect("parse");
        let err = response.into_rows().unwrap_err();
        assert!(matches!(err, LensError::Decode(ref msg)
            if msg.contains("PolicyId") && msg.contains("PolicyStatus_loc")));
    }

    #[test]
    fn app_inventory_reads_the_mobile_app_list_key() {
        let inventory: RawAppInventory = serde_json::from_str(
            r#"{"mobileAppList": [
                {"applicationId": "app-1", "displayName": "7-Zip",
                 "mobileAppIntent": "required", "displayVersion": "24.01",
                 "installState": "installed"}
            ]}"#,
        )
        .expect("parse");
        let apps: Vec<AppInstall> = inventory
            .mobile_app_list
            .into_iter()
            .map(|a| a.into_model(TargetKind::Device))
            .collect();
        assert_eq!(apps[0].display_name, "7-Zip");
        assert_eq!(apps[0].context, TargetKind::Device);
    }

    #[test]
    fn script_content_decodes_base64_with_fallback_name() {
        let raw = RawScriptContent {
            file_name: None,
            script_content: Some(BASE64.encode("Write-Host 'hi'")),
        };
        let script = raw.decode().expect("decode");
        assert_eq!(script.file_name, "IntuneScript.ps1");
        assert_eq!(script.content, b"Write-Host 'hi'");

        let missing = RawScriptContent { file_name: None, script_content: None };
        assert!(matches!(missing.decode().unwrap_err(), LensError::Decode(_)));

        let garbage = RawScriptContent {
            file_name: Some("x.ps1".to_string()),
            script_content: Some("not base64!!!".to_string()),
        };
        assert!(matches!(garbage.decode().unwrap_err(), LensError::Decode(_)));
    }

    #[test]
    fn mail_nickname_truncates_then_strips() {
        assert_eq!(mail_nickname("Pilot Ring 2"), "PilotRing");
        assert_eq!(mail_nickname("All-Interns-2026"), "AllIntern");
        assert_eq!(mail_nickname("short"), "short");
        assert_eq!(mail_nickname("!!!"), "");
    }

    #[test]
    fn create_group_body_shape() {
        let body = serde_json::to_value(CreateGroupRequest::security_group("Pilot Ring 2"))
            .expect("serialize");
        assert_eq!(body["displayName"], "Pilot Ring 2");
        assert_eq!(body["mailEnabled"], false);
        assert_eq!(body["mailNickname"], "PilotRing");
        assert_eq!(body["securityEnabled"], true);
    }

    #[test]
    fn log_collection_body_keeps_backslashes() {
        let body = serde_json::to_string(&LogCollectionRequest {
            custom_log_folders: vec!["C:\\Windows\\Logs".to_string()],
            id: "u1_d1_a1".to_string(),
        })
        .expect("serialize");
        assert!(body.contains(r#""customLogFolders":["C:\\Windows\\Logs"]"#));
        assert!(body.contains(r#""id":"u1_d1_a1""#));
    }
}
