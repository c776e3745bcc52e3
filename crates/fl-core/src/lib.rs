//! # fl-core
//!
//! Core models and resolution logic for FleetLens.
//!
//! This crate resolves a managed device to its directory identities,
//! aggregates group memberships, cross-references the four assignment
//! domains against them, and mutates group membership — all behind the
//! [`api::ManagementApi`] seam so connectors and tests plug in the same way.

pub mod actions;
pub mod api;
pub mod error;
pub mod identity;
pub mod membership;
pub mod model;
pub mod mutation;
pub mod resolve;
pub mod view;

pub use api::{
    AppInstall, AppScope, ComplianceRow, DirectoryObject, ManagedDevice, ManagementApi,
    MembershipScope, PolicyRow, ScriptContent, ScriptListing,
};
pub use error::{LensError, LensResult};
pub use identity::{resolve_identity, resolve_subjects, UNKNOWN_USER_SENTINEL};
pub use membership::build_membership_map;
pub use model::{
    AssignmentDomain, AssignmentKind, AssignmentRecord, AssignmentSpec, AssignmentTarget,
    GroupInfo, GroupMembership, Identity, MembershipKind, MembershipMap, ResolvedSubjects,
    TargetDescriptor, TargetKind,
};
pub use mutation::{
    apply_mutation, BatchStatus, GroupSelector, MutationAction, MutationOutcome, MutationReport,
};
pub use resolve::{resolve_assignments, DomainPolicy};
pub use view::{
    project, selectable_from_search, selectable_groups, DisplayRow, GroupChoice, SearchSnapshot,
    SortDirection, ViewState,
};
