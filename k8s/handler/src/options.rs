use crate::constants::{FIELD_MANAGER, MAX_WATCH_TIMEOUT_SECS};
use kube::api::{DeleteParams, ListParams, PatchParams, PostParams, PropagationPolicy, WatchParams};
use std::time::Duration;

/// Default request options of a handler.
///
/// This is a plain value: handlers own their copy, and deriving a handler copies it. There is
/// no shared state between a handler and the handlers derived from it.
#[derive(Debug, Clone, Default)]
pub struct HandlerOptions {
    /// Send every write as a server-side dry run.
    pub dry_run: bool,
    /// Server side timeout for list and watch requests.
    pub timeout: Option<Duration>,
    /// Maximum number of objects in a single list response.
    pub limit: Option<u32>,
    /// Label selector applied to list and watch requests.
    pub label_selector: Option<String>,
    /// Field selector applied to list and watch requests.
    pub field_selector: Option<String>,
    /// Delete immediately, with a zero grace period.
    pub force_delete: bool,
    /// Garbage collection policy for dependents of deleted objects.
    pub propagation_policy: Option<PropagationPolicy>,
    /// Field manager for writes. Server-side apply falls back to [`FIELD_MANAGER`].
    pub field_manager: Option<String>,
}

impl HandlerOptions {
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_labels<T: ToString>(mut self, selector: T) -> Self {
        self.label_selector = Some(selector.to_string());
        self
    }

    #[must_use]
    pub fn with_fields<T: ToString>(mut self, selector: T) -> Self {
        self.field_selector = Some(selector.to_string());
        self
    }

    #[must_use]
    pub fn with_force_delete(mut self, force: bool) -> Self {
        self.force_delete = force;
        self
    }

    #[must_use]
    pub fn with_propagation_policy(mut self, policy: PropagationPolicy) -> Self {
        self.propagation_policy = Some(policy);
        self
    }

    #[must_use]
    pub fn with_field_manager<T: ToString>(mut self, manager: T) -> Self {
        self.field_manager = Some(manager.to_string());
        self
    }

    fn timeout_secs(&self) -> Option<u32> {
        self.timeout
            .map(|timeout| u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX))
    }

    /// ListParams with the configured selectors, limit and timeout.
    pub fn list_params(&self) -> ListParams {
        let mut list_params = ListParams::default();
        if let Some(ref labels) = self.label_selector {
            list_params = list_params.labels(labels);
        }
        if let Some(ref fields) = self.field_selector {
            list_params = list_params.fields(fields);
        }
        if let Some(limit) = self.limit {
            list_params = list_params.limit(limit);
        }
        if let Some(timeout) = self.timeout_secs() {
            list_params = list_params.timeout(timeout);
        }
        list_params
    }

    /// WatchParams with the configured selectors. The timeout is capped below the
    /// kube-apiserver's limit for watches.
    pub fn watch_params(&self) -> WatchParams {
        let mut watch_params = WatchParams::default();
        if let Some(ref labels) = self.label_selector {
            watch_params = watch_params.labels(labels);
        }
        if let Some(ref fields) = self.field_selector {
            watch_params = watch_params.fields(fields);
        }
        if let Some(timeout) = self.timeout_secs() {
            watch_params = watch_params.timeout(timeout.min(MAX_WATCH_TIMEOUT_SECS));
        }
        watch_params
    }

    pub fn post_params(&self) -> PostParams {
        let mut post_params = PostParams::default();
        post_params.dry_run = self.dry_run;
        post_params.field_manager = self.field_manager.clone();
        post_params
    }

    pub fn patch_params(&self) -> PatchParams {
        let mut patch_params = PatchParams::default();
        patch_params.dry_run = self.dry_run;
        patch_params.field_manager = self.field_manager.clone();
        patch_params
    }

    /// PatchParams for a forced server-side apply.
    pub fn apply_params(&self) -> PatchParams {
        let mut patch_params =
            PatchParams::apply(self.field_manager.as_deref().unwrap_or(FIELD_MANAGER)).force();
        patch_params.dry_run = self.dry_run;
        patch_params
    }

    pub fn delete_params(&self) -> DeleteParams {
        let mut delete_params = DeleteParams::default();
        delete_params.dry_run = self.dry_run;
        delete_params.propagation_policy = self.propagation_policy.clone();
        if self.force_delete {
            delete_params.grace_period_seconds = Some(0);
        }
        delete_params
    }
}

#[cfg(test)]
mod tests {
    use super::HandlerOptions;
    use crate::constants::FIELD_MANAGER;
    use kube::api::PropagationPolicy;
    use std::time::Duration;

    #[test]
    fn test_list_params() {
        let options = HandlerOptions::default()
            .with_labels("app=web")
            .with_fields("metadata.name=web-0")
            .with_limit(20)
            .with_timeout(Duration::from_secs(30));
        let list_params = options.list_params();
        assert_eq!(list_params.label_selector.as_deref(), Some("app=web"));
        assert_eq!(
            list_params.field_selector.as_deref(),
            Some("metadata.name=web-0")
        );
        assert_eq!(list_params.limit, Some(20));
        assert_eq!(list_params.timeout, Some(30));
    }

    #[test]
    fn test_watch_timeout_is_capped() {
        let options = HandlerOptions::default().with_timeout(Duration::from_secs(3600));
        assert_eq!(options.watch_params().timeout, Some(290));
        assert_eq!(options.list_params().timeout, Some(3600));
    }

    #[test]
    fn test_write_params() {
        let options = HandlerOptions::default()
            .with_dry_run(true)
            .with_force_delete(true)
            .with_propagation_policy(PropagationPolicy::Foreground);

        assert!(options.post_params().dry_run);
        assert!(options.patch_params().dry_run);

        let delete_params = options.delete_params();
        assert!(delete_params.dry_run);
        assert_eq!(delete_params.grace_period_seconds, Some(0));
        assert!(matches!(
            delete_params.propagation_policy,
            Some(PropagationPolicy::Foreground)
        ));

        let apply_params = options.apply_params();
        assert!(apply_params.force);
        assert_eq!(apply_params.field_manager.as_deref(), Some(FIELD_MANAGER));

        let defaults = HandlerOptions::default();
        assert!(!defaults.post_params().dry_run);
        assert_eq!(defaults.delete_params().grace_period_seconds, None);
    }
}
