//! Resolves a managed-device id to directory identities.

use tracing::{debug, instrument};

use crate::api::{DirectoryObject, ManagementApi};
use crate::error::{LensError, LensResult};
use crate::model::{Identity, ResolvedSubjects, TargetKind};

/// Principal-name value the management API reports for devices without a
/// signed-in user.
pub const UNKNOWN_USER_SENTINEL: &str = "Unknown user";

/// What to do when a directory lookup returns more than one match.
///
/// The lookups are expected to be unique in practice; the management API
/// does not enforce it. Taking the first match silently is inherited
/// behavior, kept explicit here rather than fixed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MultipleMatchPolicy {
    #[default]
    TakeFirst,
}

/// Resolver knobs. Only the multi-match policy exists today.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    pub on_multiple_matches: MultipleMatchPolicy,
}

/// Resolves the directory identity of the device or its associated user.
#[instrument(skip(api))]
pub async fn resolve_identity<A>(
    api: &A,
    mdm_id: &str,
    kind: TargetKind,
) -> LensResult<Identity>
where
    A: ManagementApi + ?Sized,
{
    resolve_identity_with(api, mdm_id, kind, ResolveOptions::default()).await
}

pub async fn resolve_identity_with<A>(
    api: &A,
    mdm_id: &str,
    kind: TargetKind,
    options: ResolveOptions,
) -> LensResult<Identity>
where
    A: ManagementApi + ?Sized,
{
    let device = api.managed_device(mdm_id).await?;
    match kind {
        TargetKind::Device => {
            let azure_ad_device_id = device
                .azure_ad_device_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| LensError::Resolution("missing device identifier".to_string()))?;
            let matches = api.directory_devices_by_device_id(azure_ad_device_id).await?;
            let chosen = pick(matches, options.on_multiple_matches)
                .ok_or_else(|| LensError::Resolution("device not found".to_string()))?;
            debug!(directory_id = %chosen.id, "device identity resolved");
            Ok(Identity {
                mdm_id: mdm_id.to_string(),
                directory_id: chosen.id,
                display_name: chosen
                    .display_name
                    .unwrap_or_else(|| "Unknown Device".to_string()),
                kind,
            })
        }
        TargetKind::User => {
            let principal = device
                .user_principal_name
                .as_deref()
                .filter(|upn| !upn.is_empty() && *upn != UNKNOWN_USER_SENTINEL)
                .ok_or_else(|| LensError::Resolution("no associated user".to_string()))?;
            let matches = api.directory_users_by_upn(principal).await?;
            let chosen = pick(matches, options.on_multiple_matches)
                .ok_or_else(|| LensError::Resolution("user not found".to_string()))?;
            debug!(directory_id = %chosen.id, "user identity resolved");
            Ok(Identity {
                mdm_id: mdm_id.to_string(),
                directory_id: chosen.id,
                display_name: chosen
                    .display_name
                    .unwrap_or_else(|| principal.to_string()),
                kind,
            })
        }
    }
}

/// Resolves the device identity (fatal on failure) and the user identity
/// (degrades to `None`). The assignment views run on this pair.
#[instrument(skip(api))]
pub async fn resolve_subjects<A>(api: &A, mdm_id: &str) -> LensResult<ResolvedSubjects>
where
    A: ManagementApi + ?Sized,
{
    let device = resolve_identity(api, mdm_id, TargetKind::Device).await?;
    let user = match resolve_identity(api, mdm_id, TargetKind::User).await {
        Ok(identity) => Some(identity),
        Err(err) => {
            debug!(error = %err, "device has no resolvable user");
            None
        }
    };
    Ok(ResolvedSubjects { device, user })
}

fn pick(mut matches: Vec<DirectoryObject>, policy: MultipleMatchPolicy) -> Option<DirectoryObject> {
    if matches.len() > 1 {
        debug!(count = matches.len(), "multiple directory matches, taking first");
    }
    match policy {
        MultipleMatchPolicy::TakeFirst => {
            if matches.is_empty() {
                None
            } else {
                Some(matches.remove(0))
            }
        }
    }
}
