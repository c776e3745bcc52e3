//! One-shot directory and platform actions: group search and creation,
//! script retrieval, diagnostic log collection.

use tracing::{info, instrument};

use crate::api::{ManagementApi, ScriptContent};
use crate::error::{LensError, LensResult};
use crate::model::{GroupInfo, ResolvedSubjects};

/// Directory group search on a display-name prefix. The backend caps
/// results at ten.
#[instrument(skip(api))]
pub async fn search_groups<A>(api: &A, query: &str) -> LensResult<Vec<GroupInfo>>
where
    A: ManagementApi + ?Sized,
{
    let query = query.trim();
    if query.is_empty() {
        return Err(LensError::Config("search query must not be empty".to_string()));
    }
    api.search_groups(query).await
}

/// Creates an assignable security group named `display_name`.
#[instrument(skip(api))]
pub async fn create_group<A>(api: &A, display_name: &str) -> LensResult<GroupInfo>
where
    A: ManagementApi + ?Sized,
{
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(LensError::Config("group name must not be empty".to_string()));
    }
    let group = api.create_group(display_name).await?;
    info!(group_id = %group.id, "group created");
    Ok(group)
}

/// Fetches a platform script's decoded content for saving to disk.
#[instrument(skip(api))]
pub async fn fetch_script<A>(api: &A, script_id: &str) -> LensResult<ScriptContent>
where
    A: ManagementApi + ?Sized,
{
    let script_id = script_id.trim();
    if script_id.is_empty() {
        return Err(LensError::Config("script id must not be empty".to_string()));
    }
    api.script(script_id).await
}

/// Requests diagnostic log collection for an application on the device.
///
/// The request is keyed to the device's user, so a device-only identity
/// cannot collect logs. Folder paths are trimmed and empties dropped; at
/// least one must survive.
#[instrument(skip(api, subjects), fields(device = %subjects.device.mdm_id))]
pub async fn collect_logs<A>(
    api: &A,
    subjects: &ResolvedSubjects,
    app_id: &str,
    folders: &[String],
) -> LensResult<()>
where
    A: ManagementApi + ?Sized,
{
    let Some(user_directory_id) = subjects.user_directory_id() else {
        return Err(LensError::Resolution("no associated user".to_string()));
    };
    let app_id = app_id.trim();
    if app_id.is_empty() {
        return Err(LensError::Config("application id must not be empty".to_string()));
    }
    let folders: Vec<String> = folders
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    if folders.is_empty() {
        return Err(LensError::Config("no valid log folders provided".to_string()));
    }
    api.request_log_collection(user_directory_id, &subjects.device.mdm_id, app_id, &folders)
        .await?;
    info!(app_id, folders = folders.len(), "log collection requested");
    Ok(())
}
