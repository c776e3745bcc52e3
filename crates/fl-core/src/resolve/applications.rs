//! Application assignments, fed by the device- and user-context install
//! inventories.
//!
//! The same application can appear in both contexts and is reported twice;
//! the contexts answer different questions and are not merged.

use futures::future::{join_all, try_join_all};
use tracing::{debug, instrument, warn};

use crate::api::{AppInstall, AppScope, ManagementApi};
use crate::error::LensResult;
use crate::model::{
    AssignmentDomain, AssignmentRecord, AssignmentSpec, MembershipMap, ResolvedSubjects,
};

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
    let mut scopes = vec![AppScope::Device];
    if let Some(user_directory_id) = subjects.user_directory_id() {
        scopes.push(AppScope::User {
            directory_id: user_directory_id.to_string(),
        });
    }
    let inventories = try_join_all(
        scopes
            .into_iter()
            .map(|scope| api.app_inventory(scope, &subjects.device.mdm_id)),
    )
    .await?;
    let apps: Vec<AppInstall> = inventories.into_iter().flatten().collect();
    debug!(apps = apps.len(), "app inventories fetched");

    let ctx = ResolveContext {
        membership,
        has_user: subjects.has_user(),
    };
    let policy = DomainPolicy::for_domain(AssignmentDomain::Application);

    let resolved = join_all(
        apps.iter()
            .map(|app| resolve_app(api, app, &ctx, &policy)),
    )
    .await;
    Ok(resolved.into_iter().flatten().collect())
}

async fn resolve_app<A>(
    api: &A,
    app: &AppInstall,
    ctx: &ResolveContext<'_>,
    policy: &DomainPolicy,
) -> Option<AssignmentRecord>
where
    A: ManagementApi + ?Sized,
{
    match api.app_assignments(&app.application_id).await {
        Ok(specs) => {
            // Assignment-level intent wins; the inventory intent fills the
            // gaps.
            let specs: Vec<AssignmentSpec> = specs
                .into_iter()
                .map(|spec| AssignmentSpec {
                    intent: spec.intent.or_else(|| app.intent.clone()),
                    ..spec
                })
                .collect();
            let targets = resolve_targets(&specs, ctx, policy, ctx.has_user);
            assemble_record(app.display_name.clone(), app.install_state.clone(), targets, None, policy)
        }
        Err(err) => {
            warn!(application_id = %app.application_id, error = %err, "assignment fetch failed");
            assemble_record(
                app.display_name.clone(),
                app.install_state.clone(),
                Vec::new(),
                Some(err.to_string()),
                policy,
            )
        }
    }
}
