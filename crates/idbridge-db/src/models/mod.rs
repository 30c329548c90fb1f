//! Row models for the directory tables.

pub mod app_config;
pub mod directory_member;
pub mod federated_group;
pub mod federated_group_member;
pub mod federated_user;
pub mod legacy_group;
pub mod legacy_group_member;

pub use app_config::AppConfigValue;
pub use directory_member::{DirectoryMember, GroupPresence};
pub use federated_group::FederatedGroup;
pub use federated_group_member::FederatedGroupMember;
pub use federated_user::FederatedUser;
pub use legacy_group::LegacyGroup;
pub use legacy_group_member::LegacyGroupMember;
