use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::{Api, Client, Resource};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Creates `Api` clients for a resource according to its scope.
pub trait ScopeExt<K> {
    /// Whether objects under this scope live inside a namespace.
    const NAMESPACED: bool;

    /// A namespaced Api if a namespace is given and the resource is namespaced,
    /// otherwise a cluster-wide Api.
    fn api(client: Client, namespace: Option<&str>) -> Api<K>;
}

impl<K> ScopeExt<K> for NamespaceResourceScope
where
    K: Resource<Scope = Self>,
    K::DynamicType: Default,
{
    const NAMESPACED: bool = true;

    fn api(client: Client, namespace: Option<&str>) -> Api<K> {
        match namespace {
            Some(namespace) => Api::namespaced(client, namespace),
            None => Api::all(client),
        }
    }
}

impl<K> ScopeExt<K> for ClusterResourceScope
where
    K: Resource<Scope = Self>,
    K::DynamicType: Default,
{
    const NAMESPACED: bool = false;

    fn api(client: Client, _: Option<&str>) -> Api<K> {
        Api::all(client)
    }
}

/// A statically typed Kubernetes resource a [`crate::Handler`] can manage.
///
/// Implemented for every `k8s-openapi` type and every `CustomResource` whose scope is
/// namespaced or cluster-wide, so the handler needs no per-kind code.
pub trait KubeResource:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Whether objects of this kind live inside a namespace.
    const NAMESPACED: bool;

    /// The Api client for this kind, see [`ScopeExt::api`].
    fn api(client: Client, namespace: Option<&str>) -> Api<Self>;

    /// The kind, e.g. "ConfigMap".
    fn kind_name() -> String {
        Self::kind(&()).to_string()
    }
}

impl<K> KubeResource for K
where
    K: Resource<DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
    K::Scope: ScopeExt<K>,
{
    const NAMESPACED: bool = <K::Scope as ScopeExt<K>>::NAMESPACED;

    fn api(client: Client, namespace: Option<&str>) -> Api<Self> {
        <K::Scope as ScopeExt<K>>::api(client, namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::KubeResource;
    use k8s_openapi::api::{
        apps::v1::StatefulSet,
        core::v1::{ConfigMap, Namespace, Node},
        rbac::v1::ClusterRole,
    };

    #[test]
    fn test_scope() {
        assert!(<ConfigMap as KubeResource>::NAMESPACED);
        assert!(<StatefulSet as KubeResource>::NAMESPACED);
        assert!(!<Namespace as KubeResource>::NAMESPACED);
        assert!(!<Node as KubeResource>::NAMESPACED);
        assert!(!<ClusterRole as KubeResource>::NAMESPACED);
        assert_eq!(StatefulSet::kind_name(), "StatefulSet");
    }
}
