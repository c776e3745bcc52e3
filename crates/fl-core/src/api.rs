//! The seam between the resolution logic and the remote management API.
//!
//! `fl-graph` implements [`ManagementApi`] against Microsoft Graph; tests use
//! the in-memory [`mock::MockApi`]. Implementations return carrier types that
//! are already decoded — raw wire shapes (OData envelopes, report
//! schema/value tables, `@odata.type` strings) never cross this boundary.

pub mod mock;

use async_trait::async_trait;

use crate::error::LensResult;
use crate::model::{AssignmentSpec, GroupInfo, TargetKind};

/// The managed-device record behind an opaque management id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedDevice {
    pub mdm_id: String,
    pub device_name: Option<String>,
    /// Hardware identifier linking the enrollment to its directory object.
    pub azure_ad_device_id: Option<String>,
    /// Principal name of the signed-in user, when the device has one.
    pub user_principal_name: Option<String>,
}

/// A directory device or user as returned by the lookup endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryObject {
    pub id: String,
    pub display_name: Option<String>,
}

/// Which membership feed to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipScope {
    Direct,
    Transitive,
}

/// Context for an app-inventory read: the device itself or a resolved user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AppScope {
    Device,
    User { directory_id: String },
}

impl AppScope {
    pub fn kind(&self) -> TargetKind {
        match self {
            AppScope::Device => TargetKind::Device,
            AppScope::User { .. } => TargetKind::User,
        }
    }
}

/// One row of the configuration-policies report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRow {
    pub policy_id: String,
    pub policy_name: String,
    /// Numeric type code as reported; selects which assignment endpoint
    /// applies.
    pub policy_type: String,
    /// Per-policy principal name, or `None` when the report said
    /// "Not Available". Gates all-users targets in this domain.
    pub user_principal_name: Option<String>,
}

/// One row of the compliance report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceRow {
    /// Absent when the report row carried no usable id; such policies skip
    /// the assignment fetch.
    pub policy_id: Option<String>,
    pub policy_name: String,
    pub status: String,
}

/// One entry of a device- or user-context app inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInstall {
    pub application_id: String,
    pub display_name: String,
    pub intent: Option<String>,
    pub version: Option<String>,
    pub install_state: Option<String>,
    /// Which inventory context produced the entry.
    pub context: TargetKind,
}

/// A platform script with its assignment targets already expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptListing {
    pub script_id: String,
    pub display_name: String,
    pub description: Option<String>,
    pub assignments: Vec<AssignmentSpec>,
}

/// A decoded script payload ready to write to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptContent {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Operations the resolution pipeline needs from the management API.
///
/// Every method is a single attempt against the remote API; callers own all
/// error handling and nothing here retries or caches.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Reads the managed-device record for an opaque management id.
    async fn managed_device(&self, mdm_id: &str) -> LensResult<ManagedDevice>;

    /// Directory devices whose hardware device id matches exactly.
    async fn directory_devices_by_device_id(
        &self,
        azure_ad_device_id: &str,
    ) -> LensResult<Vec<DirectoryObject>>;

    /// Directory users whose principal name matches exactly.
    async fn directory_users_by_upn(
        &self,
        user_principal_name: &str,
    ) -> LensResult<Vec<DirectoryObject>>;

    /// One membership feed for a device or user directory object.
    async fn member_groups(
        &self,
        kind: TargetKind,
        directory_id: &str,
        scope: MembershipScope,
    ) -> LensResult<Vec<GroupInfo>>;

    /// Display-name search over directory groups (server-side, first page).
    async fn search_groups(&self, query: &str) -> LensResult<Vec<GroupInfo>>;

    /// Groups whose display name matches exactly; used to resolve table
    /// selections back to ids.
    async fn groups_by_display_name(&self, display_name: &str) -> LensResult<Vec<GroupInfo>>;

    /// Creates a security group and returns it.
    async fn create_group(&self, display_name: &str) -> LensResult<GroupInfo>;

    /// Adds a directory object to a group.
    async fn add_group_member(&self, group_id: &str, directory_id: &str) -> LensResult<()>;

    /// Removes a directory object from a group.
    async fn remove_group_member(&self, group_id: &str, directory_id: &str) -> LensResult<()>;

    /// Configuration-policies report rows for a managed device.
    async fn configuration_report(&self, mdm_id: &str) -> LensResult<Vec<PolicyRow>>;

    /// Assignment targets of one configuration policy. The policy type
    /// selects between the two upstream assignment endpoints.
    async fn configuration_assignments(
        &self,
        policy_id: &str,
        policy_type: &str,
    ) -> LensResult<Vec<AssignmentSpec>>;

    /// Compliance report rows for a managed device.
    async fn compliance_report(&self, mdm_id: &str) -> LensResult<Vec<ComplianceRow>>;

    /// Assignment targets of one compliance policy.
    async fn compliance_assignments(&self, policy_id: &str) -> LensResult<Vec<AssignmentSpec>>;

    /// App inventory for one context (device, or a resolved user).
    async fn app_inventory(&self, scope: AppScope, mdm_id: &str) -> LensResult<Vec<AppInstall>>;

    /// Assignment targets of one application.
    async fn app_assignments(&self, application_id: &str) -> LensResult<Vec<AssignmentSpec>>;

    /// All platform scripts with their assignments expanded.
    async fn scripts_with_assignments(&self) -> LensResult<Vec<ScriptListing>>;

    /// One script's decoded payload.
    async fn script(&self, script_id: &str) -> LensResult<ScriptContent>;

    /// Requests diagnostic-log collection for an app on the device, on
    /// behalf of the resolved user.
    async fn request_log_collection(
        &self,
        user_directory_id: &str,
        mdm_id: &str,
        app_id: &str,
        folders: &[String],
    ) -> LensResult<()>;
}
