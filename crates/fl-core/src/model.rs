//! Core data model: identities, group memberships, and assignment records.
//!
//! Everything here is a value recomputed per query. The only structure built
//! incrementally is [`MembershipMap`], which is frozen for reading once the
//! aggregator returns it.

use std::collections::{hash_map::Entry, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether an operation addresses the managed device itself or its
/// associated user. Also used as the audience of an assignment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Device,
    User,
}

impl TargetKind {
    /// Lowercase noun for user-facing messages.
    pub fn as_noun(&self) -> &'static str {
        match self {
            TargetKind::Device => "device",
            TargetKind::User => "user",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Device => write!(f, "Device"),
            TargetKind::User => write!(f, "User"),
        }
    }
}

/// A resolved directory identity behind a managed-device id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// The opaque managed-device id the resolution started from.
    pub mdm_id: String,
    /// The identity provider's object id for the device or user.
    pub directory_id: String,
    pub display_name: String,
    pub kind: TargetKind,
}

/// The device identity plus the optional user identity the assignment views
/// operate on. Device resolution is fatal on failure; user resolution
/// degrades to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubjects {
    pub device: Identity,
    pub user: Option<Identity>,
}

impl ResolvedSubjects {
    pub fn has_user(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_directory_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.directory_id.as_str())
    }
}

/// A directory group as returned by membership, search, and creation calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub id: String,
    pub display_name: String,
    /// Membership computed by a rule engine; such groups cannot be modified
    /// manually.
    pub is_dynamic: bool,
}

/// One entry of the aggregated membership map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMembership {
    pub group_id: String,
    pub display_name: String,
    pub is_dynamic: bool,
}

/// Union of up to four membership feeds (device/user x direct/transitive),
/// keyed by group id.
///
/// Duplicates across feeds collapse: the display name is last-write-wins
/// (the source is consistent, so this is idempotent) and the dynamic flag is
/// sticky once any feed reported it.
#[derive(Debug, Clone, Default)]
pub struct MembershipMap {
    groups: HashMap<String, GroupMembership>,
}

impl MembershipMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one membership feed into the map.
    pub fn absorb(&mut self, feed: impl IntoIterator<Item = GroupInfo>) {
        for group in feed {
            match self.groups.entry(group.id.clone()) {
                Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    existing.display_name = group.display_name;
                    existing.is_dynamic |= group.is_dynamic;
                }
                Entry::Vacant(slot) => {
                    slot.insert(GroupMembership {
                        group_id: group.id,
                        display_name: group.display_name,
                        is_dynamic: group.is_dynamic,
                    });
                }
            }
        }
    }

    pub fn contains(&self, group_id: &str) -> bool {
        self.groups.contains_key(group_id)
    }

    pub fn name_of(&self, group_id: &str) -> Option<&str> {
        self.groups.get(group_id).map(|g| g.display_name.as_str())
    }

    pub fn is_dynamic(&self, group_id: &str) -> bool {
        self.groups.get(group_id).is_some_and(|g| g.is_dynamic)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupMembership> {
        self.groups.values()
    }
}

/// Closed decode of the `@odata.type` discriminator carried by a raw
/// assignment target. Decoded once at the API-client boundary so everything
/// downstream pattern-matches instead of re-scanning strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetDescriptor {
    Group {
        group_id: String,
        exclusion: bool,
        /// Audience hinted by the discriminator string itself.
        audience: TargetKind,
    },
    AllDevices,
    AllUsers,
    /// Anything the decoder does not recognize, carrying the raw
    /// discriminator for display and logging.
    Unknown { raw: String },
}

impl TargetDescriptor {
    /// Decodes a raw discriminator plus the optional group id that
    /// accompanies group targets on the wire.
    ///
    /// Matching is case-insensitive on the known substring markers. A group
    /// marker without a group id is malformed and decodes to `Unknown`.
    pub fn decode(odata_type: &str, group_id: Option<&str>) -> Self {
        let raw = odata_type.trim();
        let tag = raw.to_ascii_lowercase();
        if tag.contains("groupassignmenttarget") {
            if let Some(id) = group_id.filter(|id| !id.is_empty()) {
                return TargetDescriptor::Group {
                    group_id: id.to_string(),
                    exclusion: tag.contains("exclusion"),
                    audience: if tag.contains("user") {
                        TargetKind::User
                    } else {
                        TargetKind::Device
                    },
                };
            }
            return TargetDescriptor::Unknown { raw: raw.to_string() };
        }
        if tag.contains("alldevicesassignmenttarget") {
            return TargetDescriptor::AllDevices;
        }
        if tag.contains("allusersassignmenttarget") || tag.contains("alllicensedusersassignmenttarget")
        {
            return TargetDescriptor::AllUsers;
        }
        TargetDescriptor::Unknown { raw: raw.to_string() }
    }
}

/// One raw assignment target as returned by the API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentSpec {
    pub descriptor: TargetDescriptor,
    /// Assignment intent where the domain carries one (applications,
    /// configuration); falls back to the inventory intent for apps.
    pub intent: Option<String>,
}

impl AssignmentSpec {
    pub fn new(descriptor: TargetDescriptor) -> Self {
        Self { descriptor, intent: None }
    }
}

/// What a surviving assignment target points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssignmentKind {
    ExplicitGroup,
    AllDevices,
    AllUsers,
    /// Synthesized placeholder rows and unrecognized descriptors kept for
    /// display.
    Other,
}

/// How the identity relates to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MembershipKind {
    Direct,
    Virtual,
    Exclude,
}

impl fmt::Display for MembershipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipKind::Direct => write!(f, "Direct"),
            MembershipKind::Virtual => write!(f, "Virtual"),
            MembershipKind::Exclude => write!(f, "Exclude"),
        }
    }
}

/// A resolved, displayable assignment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentTarget {
    pub kind: AssignmentKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub group_id: Option<String>,
    pub group_name: String,
    /// `None` renders as "-" (placeholder and unknown rows).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub membership_kind: Option<MembershipKind>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub audience: Option<TargetKind>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub intent: Option<String>,
}

impl AssignmentTarget {
    /// The placeholder target synthesized for compliance policies that end
    /// up with no surviving assignments.
    pub fn no_assignments() -> Self {
        AssignmentTarget {
            kind: AssignmentKind::Other,
            group_id: None,
            group_name: "No Assignments".to_string(),
            membership_kind: None,
            audience: None,
            intent: None,
        }
    }
}

/// One policy/app/script with its surviving targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub subject_name: String,
    /// Domain-specific supplemental text: compliance status, app install
    /// state, script description.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
    pub targets: Vec<AssignmentTarget>,
    /// Set when this item's assignment fetch failed; such records carry zero
    /// targets and are always kept.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// The four independent assignment feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentDomain {
    Configuration,
    Compliance,
    Application,
    Script,
}

impl AssignmentDomain {
    pub const ALL: [AssignmentDomain; 4] = [
        AssignmentDomain::Configuration,
        AssignmentDomain::Compliance,
        AssignmentDomain::Application,
        AssignmentDomain::Script,
    ];
}

impl fmt::Display for AssignmentDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentDomain::Configuration => write!(f, "configuration"),
            AssignmentDomain::Compliance => write!(f, "compliance"),
            AssignmentDomain::Application => write!(f, "application"),
            AssignmentDomain::Script => write!(f, "script"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str, name: &str, dynamic: bool) -> GroupInfo {
        GroupInfo {
            id: id.to_string(),
            display_name: name.to_string(),
            is_dynamic: dynamic,
        }
    }

    #[test]
    fn membership_map_unions_feeds() {
        let mut map = MembershipMap::new();
        map.absorb(vec![group("g1", "Engineering", false)]);
        map.absorb(vec![group("g2", "AllInterns", true), group("g3", "VPN", false)]);
        assert_eq!(map.len(), 3);
        assert!(map.contains("g1"));
        assert_eq!(map.name_of("g2"), Some("AllInterns"));
        assert!(map.is_dynamic("g2"));
        assert!(!map.is_dynamic("g1"));
    }

    #[test]
    fn membership_map_dynamic_flag_is_sticky() {
        let mut map = MembershipMap::new();
        map.absorb(vec![group("g1", "Interns", true)]);
        // A later feed without the marker must not clear the flag.
        map.absorb(vec![group("g1", "Interns (renamed)", false)]);
        assert!(map.is_dynamic("g1"));
        assert_eq!(map.name_of("g1"), Some("Interns (renamed)"));
    }

    #[test]
    fn decode_group_target() {
        let descriptor =
            TargetDescriptor::decode("#microsoft.graph.groupAssignmentTarget", Some("g1"));
        assert_eq!(
            descriptor,
            TargetDescriptor::Group {
                group_id: "g1".to_string(),
                exclusion: false,
                audience: TargetKind::Device,
            }
        );
    }

    #[test]
    fn decode_exclusion_group_target() {
        let descriptor = TargetDescriptor::decode(
            "#microsoft.graph.exclusionGroupAssignmentTarget",
            Some("g9"),
        );
        match descriptor {
            TargetDescriptor::Group { exclusion, .. } => assert!(exclusion),
            other => panic!("unexpected descriptor: {other:?}"),
        }
    }

    #[test]
    fn decode_is_case_insensitive() {
        assert_eq!(
            TargetDescriptor::decode("#Microsoft.Graph.AllDevicesAssignmentTarget", None),
            TargetDescriptor::AllDevices
        );
        assert_eq!(
            TargetDescriptor::decode("#microsoft.graph.ALLUSERSASSIGNMENTTARGET", None),
            TargetDescriptor::AllUsers
        );
    }

    #[test]
    fn decode_licensed_users_variant() {
        assert_eq!(
            TargetDescriptor::decode("#microsoft.graph.allLicensedUsersAssignmentTarget", None),
            TargetDescriptor::AllUsers
        );
    }

    #[test]
    fn decode_unknown_keeps_raw() {
        let descriptor =
            TargetDescriptor::decode(" #microsoft.graph.configurationManagerCollection ", None);
        assert_eq!(
            descriptor,
            TargetDescriptor::Unknown {
                raw: "#microsoft.graph.configurationManagerCollection".to_string()
            }
        );
    }

    #[test]
    fn decode_group_marker_without_id_is_unknown() {
        let descriptor = TargetDescriptor::decode("#microsoft.graph.groupAssignmentTarget", None);
        assert!(matches!(descriptor, TargetDescriptor::Unknown { .. }));
    }

    #[test]
    fn assignment_record_serializes_camel_case() {
        let record = AssignmentRecord {
            subject_name: "Baseline".to_string(),
            detail: None,
            targets: vec![AssignmentTarget {
                kind: AssignmentKind::ExplicitGroup,
                group_id: Some("g1".to_string()),
                group_name: "Engineering".to_string(),
                membership_kind: Some(MembershipKind::Direct),
                audience: Some(TargetKind::Device),
                intent: None,
            }],
            error: None,
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["subjectName"], "Baseline");
        assert_eq!(json["targets"][0]["groupName"], "Engineering");
        assert_eq!(json["targets"][0]["membershipKind"], "direct");
    }
}
