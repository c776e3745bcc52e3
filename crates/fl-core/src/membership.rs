//! Aggregates direct and transitive group memberships into one map.

use tracing::{debug, instrument};

use crate::api::{ManagementApi, MembershipScope};
use crate::error::LensResult;
use crate::model::{MembershipMap, TargetKind};

/// Fetches up to four membership feeds in parallel (device direct and
/// transitive, plus both user feeds when a user resolved) and merges them.
///
/// Any feed failing fails the whole build; the per-item isolation of the
/// assignment resolvers does not apply here. Each feed is first-page-only,
/// matching the upstream default page size.
#[instrument(skip(api), fields(has_user = user_directory_id.is_some()))]
pub async fn build_membership_map<A>(
    api: &A,
    device_directory_id: &str,
    user_directory_id: Option<&str>,
) -> LensResult<MembershipMap>
where
    A: ManagementApi + ?Sized,
{
    let mut queries = vec![
        (TargetKind::Device, device_directory_id, MembershipScope::Direct),
        (TargetKind::Device, device_directory_id, MembershipScope::Transitive),
    ];
    if let Some(user_id) = user_directory_id {
        queries.push((TargetKind::User, user_id, MembershipScope::Direct));
        queries.push((TargetKind::User, user_id, MembershipScope::Transitive));
    }

    let feeds = futures::future::try_join_all(
        queries
            .iter()
            .map(|(kind, id, scope)| api.member_groups(*kind, id, *scope)),
    )
    .await?;

    let mut map = MembershipMap::new();
    for feed in feeds {
        map.absorb(feed);
    }
    debug!(groups = map.len(), "membership map built");
    Ok(map)
}
