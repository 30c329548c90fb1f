//! Migration settings.

use serde::{Deserialize, Serialize};

/// Config namespace the candidate record is stored under. Also used as the
/// `app` field of log events.
pub const DEFAULT_CONFIG_NAMESPACE: &str = "sso_federation";

/// Config key of the candidate record.
pub const CANDIDATES_CONFIG_KEY: &str = "localGroupsCheckForMigration";

/// Backend name reported for groups and users held in the local tables.
pub const DEFAULT_LEGACY_BACKEND: &str = "Database";

/// Backend name reported for groups and users provisioned through SSO.
pub const DEFAULT_FEDERATED_BACKEND: &str = "federated";

/// Names and keys the migration works with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Namespace of the candidate record in the config store.
    pub config_namespace: String,

    /// Key of the candidate record in the config store.
    pub candidates_key: String,

    /// Backend a group must currently be served by to be migrated.
    pub legacy_backend: String,

    /// Backend every member must belong to, and the migration target.
    pub federated_backend: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            config_namespace: DEFAULT_CONFIG_NAMESPACE.to_string(),
            candidates_key: CANDIDATES_CONFIG_KEY.to_string(),
            legacy_backend: DEFAULT_LEGACY_BACKEND.to_string(),
            federated_backend: DEFAULT_FEDERATED_BACKEND.to_string(),
        }
    }
}
