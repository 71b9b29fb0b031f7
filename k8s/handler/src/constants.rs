use std::time::Duration;

/// Namespace used by namespaced handlers when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Page size used when listing every object through continue tokens.
pub const KUBE_API_PAGE_SIZE: u32 = 500;

/// Field manager for Patch param, required for [`kube::api::Patch::Apply`].
pub const FIELD_MANAGER: &str = "kube-handler";

/// The kube-apiserver rejects watch timeouts at or above 295 seconds.
pub(crate) const MAX_WATCH_TIMEOUT_SECS: u32 = 290;

/// Resource version which starts a watch from any cached state, with synthetic
/// ADDED events for the objects which already exist.
pub(crate) const WATCH_FROM_ANY_VERSION: &str = "0";

/// Time to wait before reopening a watch stream which failed.
pub(crate) const WATCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Label key prefix which carries a Node's roles.
pub(crate) const NODE_ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";

/// Storage key in PersistentVolume(Claim) capacity maps.
pub(crate) const STORAGE_RESOURCE: &str = "storage";
