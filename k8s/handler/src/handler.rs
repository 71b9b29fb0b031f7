use crate::{
    client,
    constants::DEFAULT_NAMESPACE,
    dynamic::DynamicHandler,
    error::{ApiRequest, MissingName, Operation, Result},
    options::HandlerOptions,
    resource::KubeResource,
};
use kube::{Api, Client, ResourceExt};
use std::{fmt, marker::PhantomData, path::PathBuf, time::Duration};

/// Builder for [`Handler`]s.
#[derive(Debug, Default, Clone)]
pub struct HandlerBuilder {
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
    namespace: Option<String>,
    options: HandlerOptions,
}

impl HandlerBuilder {
    /// Read the client configuration from this kubeconfig file, instead of inferring it.
    #[must_use]
    pub fn with_kubeconfig<T>(mut self, path: T) -> Self
    where
        T: Into<PathBuf>,
    {
        self.kubeconfig = Some(path.into());
        self
    }

    /// Use this kubeconfig context instead of the current one.
    #[must_use]
    pub fn with_context<T>(mut self, context: T) -> Self
    where
        T: ToString,
    {
        self.context = Some(context.to_string());
        self
    }

    /// Build handlers for a specific namespace (for namespaced objects only).
    #[must_use]
    pub fn with_namespace<T>(mut self, namespace: T) -> Self
    where
        T: ToString,
    {
        self.namespace = Some(namespace.to_string());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }

    /// Generate the kube::Client and build the Handler.
    pub async fn build<K: KubeResource>(self) -> Result<Handler<K>> {
        let client = client::client(self.kubeconfig.as_deref(), self.context.as_deref()).await?;
        Ok(self.build_with_client(client))
    }

    /// Build the Handler over an existing kube::Client.
    pub fn build_with_client<K: KubeResource>(self, client: Client) -> Handler<K> {
        Handler::new(client, self.namespace.unwrap_or_default()).with_options(self.options)
    }
}

/// Create, read, update, delete, patch, watch and inform on objects of one kind.
///
/// Handlers are cheap to clone. Every derivation (`with_*`) returns a new handler which owns
/// its own options; changing a derived handler never affects the one it came from.
pub struct Handler<K> {
    pub(crate) client: Client,
    pub(crate) namespace: String,
    pub(crate) options: HandlerOptions,
    _resource: PhantomData<fn() -> K>,
}

impl<K> Clone for Handler<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            namespace: self.namespace.clone(),
            options: self.options.clone(),
            _resource: PhantomData,
        }
    }
}

impl<K: KubeResource> fmt::Debug for Handler<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("kind", &K::kind_name())
            .field("namespace", &self.namespace)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<K: KubeResource> Handler<K> {
    pub fn builder() -> HandlerBuilder {
        HandlerBuilder::default()
    }

    /// A handler over `client`. An empty namespace means "default".
    pub fn new<T>(client: Client, namespace: T) -> Self
    where
        T: ToString,
    {
        Self {
            client,
            namespace: non_empty_namespace(namespace.to_string()),
            options: HandlerOptions::default(),
            _resource: PhantomData,
        }
    }

    /// Get a clone of the kube::Client.
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// The namespace used for objects which don't carry one.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn options(&self) -> &HandlerOptions {
        &self.options
    }

    /// The Api client in the handler's namespace (cluster-wide for cluster scoped kinds).
    pub fn api(&self) -> Api<K> {
        K::api(self.client(), Some(self.namespace.as_str()))
    }

    /// The Api client in `namespace` (cluster-wide for cluster scoped kinds).
    pub fn api_in(&self, namespace: &str) -> Api<K> {
        K::api(self.client(), Some(namespace))
    }

    /// The Api client across all namespaces.
    pub fn api_all(&self) -> Api<K> {
        K::api(self.client(), None)
    }

    /// A handler for another kind, sharing this handler's client, namespace and options.
    pub fn for_kind<U: KubeResource>(&self) -> Handler<U> {
        Handler {
            client: self.client(),
            namespace: self.namespace.clone(),
            options: self.options.clone(),
            _resource: PhantomData,
        }
    }

    /// A handler for arbitrary manifests, sharing this handler's client, namespace and
    /// options.
    pub fn dynamic(&self) -> DynamicHandler {
        DynamicHandler::new(self.client(), self.namespace.clone()).with_options(self.options.clone())
    }

    #[must_use]
    pub fn with_namespace<T: ToString>(&self, namespace: T) -> Self {
        let mut handler = self.clone();
        handler.namespace = non_empty_namespace(namespace.to_string());
        handler
    }

    #[must_use]
    pub fn with_options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }

    /// A handler whose writes are server-side dry runs.
    #[must_use]
    pub fn with_dry_run(&self) -> Self {
        self.derive(|options| options.with_dry_run(true))
    }

    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.derive(|options| options.with_timeout(timeout))
    }

    #[must_use]
    pub fn with_limit(&self, limit: u32) -> Self {
        self.derive(|options| options.with_limit(limit))
    }

    #[must_use]
    pub fn with_labels<T: ToString>(&self, selector: T) -> Self {
        self.derive(|options| options.with_labels(selector))
    }

    #[must_use]
    pub fn with_fields<T: ToString>(&self, selector: T) -> Self {
        self.derive(|options| options.with_fields(selector))
    }

    #[must_use]
    pub fn with_force_delete(&self, force: bool) -> Self {
        self.derive(|options| options.with_force_delete(force))
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.options.timeout = Some(timeout);
    }

    pub fn set_limit(&mut self, limit: u32) {
        self.options.limit = Some(limit);
    }

    pub fn set_force_delete(&mut self, force: bool) {
        self.options.force_delete = force;
    }

    fn derive<F>(&self, change: F) -> Self
    where
        F: FnOnce(HandlerOptions) -> HandlerOptions,
    {
        let mut handler = self.clone();
        handler.options = change(handler.options);
        handler
    }

    /// The namespace to address: the object's own if it has one, else the handler's.
    /// Always empty for cluster scoped kinds.
    pub(crate) fn namespace_for(&self, object: &K) -> String {
        if !K::NAMESPACED {
            return String::new();
        }
        object
            .namespace()
            .filter(|namespace| !namespace.is_empty())
            .unwrap_or_else(|| self.namespace.clone())
    }

    /// The handler's namespace, or empty for cluster scoped kinds.
    pub(crate) fn scope_namespace(&self) -> &str {
        if K::NAMESPACED {
            &self.namespace
        } else {
            ""
        }
    }

    pub(crate) fn require_name(&self, object: &K, operation: Operation) -> Result<String> {
        object
            .meta()
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                MissingName {
                    operation,
                    kind: K::kind_name(),
                }
                .build()
            })
    }

    /// Error context for a request to the kube-apiserver.
    pub(crate) fn request(
        &self,
        operation: Operation,
        name: &str,
        namespace: &str,
    ) -> ApiRequest<Operation, String, String, String> {
        ApiRequest {
            operation,
            kind: K::kind_name(),
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

fn non_empty_namespace(namespace: String) -> String {
    if namespace.is_empty() {
        DEFAULT_NAMESPACE.to_string()
    } else {
        namespace
    }
}

#[cfg(test)]
mod tests {
    use super::Handler;
    use crate::test_utils::{config_map, mock_client};
    use k8s_openapi::api::{core::v1::ConfigMap, rbac::v1::ClusterRole};
    use kube::core::ObjectMeta;
    use std::time::Duration;

    #[tokio::test]
    async fn test_derived_handlers_own_their_options() {
        let (client, _server) = mock_client();
        let base: Handler<ConfigMap> = Handler::new(client, "");
        assert_eq!(base.namespace(), "default");

        let mut derived = base.with_namespace("apps");
        derived.set_limit(5);
        derived.set_timeout(Duration::from_secs(10));
        assert_eq!(derived.namespace(), "apps");
        assert_eq!(derived.options().limit, Some(5));
        assert_eq!(base.options().limit, None);
        assert_eq!(base.options().timeout, None);

        let dry = derived.with_dry_run();
        assert!(dry.options().dry_run);
        assert!(!derived.options().dry_run);
        assert_eq!(dry.options().limit, Some(5));

        let mut limited = base.with_limit(3);
        limited.set_force_delete(true);
        assert!(!base.options().force_delete);
        assert_eq!(base.with_namespace("").namespace(), "default");
    }

    #[tokio::test]
    async fn test_namespace_resolution() {
        let (client, _server) = mock_client();
        let handler: Handler<ConfigMap> = Handler::new(client.clone(), "apps");
        assert_eq!(
            handler.namespace_for(&config_map("a", Some("staging"), &[])),
            "staging"
        );
        assert_eq!(handler.namespace_for(&config_map("a", Some(""), &[])), "apps");
        assert_eq!(handler.namespace_for(&config_map("a", None, &[])), "apps");

        let roles: Handler<ClusterRole> = handler.for_kind();
        let role = ClusterRole {
            metadata: ObjectMeta {
                name: Some("reader".to_string()),
                namespace: Some("ignored".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(roles.namespace_for(&role), "");
        assert_eq!(roles.scope_namespace(), "");
    }
}
