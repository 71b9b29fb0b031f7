use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const KIND_CLUSTER_ROLE: &str = "ClusterRole";
pub const KIND_CLUSTER_ROLE_BINDING: &str = "ClusterRoleBinding";
pub const KIND_CONFIG_MAP: &str = "ConfigMap";
pub const KIND_CRON_JOB: &str = "CronJob";
pub const KIND_CUSTOM_RESOURCE_DEFINITION: &str = "CustomResourceDefinition";
pub const KIND_DAEMON_SET: &str = "DaemonSet";
pub const KIND_DEPLOYMENT: &str = "Deployment";
pub const KIND_ENDPOINTS: &str = "Endpoints";
pub const KIND_EVENT: &str = "Event";
pub const KIND_HORIZONTAL_POD_AUTOSCALER: &str = "HorizontalPodAutoscaler";
pub const KIND_INGRESS: &str = "Ingress";
pub const KIND_INGRESS_CLASS: &str = "IngressClass";
pub const KIND_JOB: &str = "Job";
pub const KIND_LIMIT_RANGE: &str = "LimitRange";
pub const KIND_NAMESPACE: &str = "Namespace";
pub const KIND_NETWORK_POLICY: &str = "NetworkPolicy";
pub const KIND_NODE: &str = "Node";
pub const KIND_PERSISTENT_VOLUME: &str = "PersistentVolume";
pub const KIND_PERSISTENT_VOLUME_CLAIM: &str = "PersistentVolumeClaim";
pub const KIND_POD: &str = "Pod";
pub const KIND_POD_DISRUPTION_BUDGET: &str = "PodDisruptionBudget";
pub const KIND_REPLICA_SET: &str = "ReplicaSet";
pub const KIND_REPLICATION_CONTROLLER: &str = "ReplicationController";
pub const KIND_RESOURCE_QUOTA: &str = "ResourceQuota";
pub const KIND_ROLE: &str = "Role";
pub const KIND_ROLE_BINDING: &str = "RoleBinding";
pub const KIND_SECRET: &str = "Secret";
pub const KIND_SERVICE: &str = "Service";
pub const KIND_SERVICE_ACCOUNT: &str = "ServiceAccount";
pub const KIND_STATEFUL_SET: &str = "StatefulSet";
pub const KIND_STORAGE_CLASS: &str = "StorageClass";

pub const RESOURCE_CLUSTER_ROLE: &str = "clusterroles";
pub const RESOURCE_CLUSTER_ROLE_BINDING: &str = "clusterrolebindings";
pub const RESOURCE_CONFIG_MAP: &str = "configmaps";
pub const RESOURCE_CRON_JOB: &str = "cronjobs";
pub const RESOURCE_CUSTOM_RESOURCE_DEFINITION: &str = "customresourcedefinitions";
pub const RESOURCE_DAEMON_SET: &str = "daemonsets";
pub const RESOURCE_DEPLOYMENT: &str = "deployments";
pub const RESOURCE_ENDPOINTS: &str = "endpoints";
pub const RESOURCE_EVENT: &str = "events";
pub const RESOURCE_HORIZONTAL_POD_AUTOSCALER: &str = "horizontalpodautoscalers";
pub const RESOURCE_INGRESS: &str = "ingresses";
pub const RESOURCE_INGRESS_CLASS: &str = "ingressclasses";
pub const RESOURCE_JOB: &str = "jobs";
pub const RESOURCE_LIMIT_RANGE: &str = "limitranges";
pub const RESOURCE_NAMESPACE: &str = "namespaces";
pub const RESOURCE_NETWORK_POLICY: &str = "networkpolicies";
pub const RESOURCE_NODE: &str = "nodes";
pub const RESOURCE_PERSISTENT_VOLUME: &str = "persistentvolumes";
pub const RESOURCE_PERSISTENT_VOLUME_CLAIM: &str = "persistentvolumeclaims";
pub const RESOURCE_POD: &str = "pods";
pub const RESOURCE_POD_DISRUPTION_BUDGET: &str = "poddisruptionbudgets";
pub const RESOURCE_REPLICA_SET: &str = "replicasets";
pub const RESOURCE_REPLICATION_CONTROLLER: &str = "replicationcontrollers";
pub const RESOURCE_RESOURCE_QUOTA: &str = "resourcequotas";
pub const RESOURCE_ROLE: &str = "roles";
pub const RESOURCE_ROLE_BINDING: &str = "rolebindings";
pub const RESOURCE_SECRET: &str = "secrets";
pub const RESOURCE_SERVICE: &str = "services";
pub const RESOURCE_SERVICE_ACCOUNT: &str = "serviceaccounts";
pub const RESOURCE_STATEFUL_SET: &str = "statefulsets";
pub const RESOURCE_STORAGE_CLASS: &str = "storageclasses";

/// Every (Kind, resource) pair known to [`kind_to_resource`] and [`resource_to_kind`].
pub const KIND_RESOURCE_PAIRS: &[(&str, &str)] = &[
    (KIND_CLUSTER_ROLE, RESOURCE_CLUSTER_ROLE),
    (KIND_CLUSTER_ROLE_BINDING, RESOURCE_CLUSTER_ROLE_BINDING),
    (KIND_CONFIG_MAP, RESOURCE_CONFIG_MAP),
    (KIND_CRON_JOB, RESOURCE_CRON_JOB),
    (
        KIND_CUSTOM_RESOURCE_DEFINITION,
        RESOURCE_CUSTOM_RESOURCE_DEFINITION,
    ),
    (KIND_DAEMON_SET, RESOURCE_DAEMON_SET),
    (KIND_DEPLOYMENT, RESOURCE_DEPLOYMENT),
    (KIND_ENDPOINTS, RESOURCE_ENDPOINTS),
    (KIND_EVENT, RESOURCE_EVENT),
    (
        KIND_HORIZONTAL_POD_AUTOSCALER,
        RESOURCE_HORIZONTAL_POD_AUTOSCALER,
    ),
    (KIND_INGRESS, RESOURCE_INGRESS),
    (KIND_INGRESS_CLASS, RESOURCE_INGRESS_CLASS),
    (KIND_JOB, RESOURCE_JOB),
    (KIND_LIMIT_RANGE, RESOURCE_LIMIT_RANGE),
    (KIND_NAMESPACE, RESOURCE_NAMESPACE),
    (KIND_NETWORK_POLICY, RESOURCE_NETWORK_POLICY),
    (KIND_NODE, RESOURCE_NODE),
    (KIND_PERSISTENT_VOLUME, RESOURCE_PERSISTENT_VOLUME),
    (KIND_PERSISTENT_VOLUME_CLAIM, RESOURCE_PERSISTENT_VOLUME_CLAIM),
    (KIND_POD, RESOURCE_POD),
    (KIND_POD_DISRUPTION_BUDGET, RESOURCE_POD_DISRUPTION_BUDGET),
    (KIND_REPLICA_SET, RESOURCE_REPLICA_SET),
    (KIND_REPLICATION_CONTROLLER, RESOURCE_REPLICATION_CONTROLLER),
    (KIND_RESOURCE_QUOTA, RESOURCE_RESOURCE_QUOTA),
    (KIND_ROLE, RESOURCE_ROLE),
    (KIND_ROLE_BINDING, RESOURCE_ROLE_BINDING),
    (KIND_SECRET, RESOURCE_SECRET),
    (KIND_SERVICE, RESOURCE_SERVICE),
    (KIND_SERVICE_ACCOUNT, RESOURCE_SERVICE_ACCOUNT),
    (KIND_STATEFUL_SET, RESOURCE_STATEFUL_SET),
    (KIND_STORAGE_CLASS, RESOURCE_STORAGE_CLASS),
];

static KIND_TO_RESOURCE: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| KIND_RESOURCE_PAIRS.iter().copied().collect());

static RESOURCE_TO_KIND: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    KIND_RESOURCE_PAIRS
        .iter()
        .map(|(kind, resource)| (*resource, *kind))
        .collect()
});

/// The plural resource name of a Kind, e.g. "NetworkPolicy" -> "networkpolicies".
pub fn kind_to_resource(kind: &str) -> Option<&'static str> {
    KIND_TO_RESOURCE.get(kind).copied()
}

/// The Kind of a plural resource name, e.g. "pods" -> "Pod".
pub fn resource_to_kind(resource: &str) -> Option<&'static str> {
    RESOURCE_TO_KIND.get(resource).copied()
}

#[cfg(test)]
mod tests {
    use super::{kind_to_resource, resource_to_kind, KIND_RESOURCE_PAIRS};
    use std::collections::HashSet;

    #[test]
    fn test_known_pairs() {
        assert_eq!(kind_to_resource("Pod"), Some("pods"));
        assert_eq!(resource_to_kind("pods"), Some("Pod"));
        assert_eq!(kind_to_resource("NetworkPolicy"), Some("networkpolicies"));
        assert_eq!(kind_to_resource("Ingress"), Some("ingresses"));
        assert_eq!(resource_to_kind("endpoints"), Some("Endpoints"));
        assert_eq!(kind_to_resource("pods"), None);
        assert_eq!(resource_to_kind("Widget"), None);
    }

    #[test]
    fn test_maps_are_inverse() {
        let kinds: HashSet<_> = KIND_RESOURCE_PAIRS.iter().map(|(k, _)| k).collect();
        let resources: HashSet<_> = KIND_RESOURCE_PAIRS.iter().map(|(_, r)| r).collect();
        assert_eq!(kinds.len(), KIND_RESOURCE_PAIRS.len());
        assert_eq!(resources.len(), KIND_RESOURCE_PAIRS.len());

        for (kind, resource) in KIND_RESOURCE_PAIRS {
            assert_eq!(kind_to_resource(kind), Some(*resource));
            assert_eq!(resource_to_kind(resource), Some(*kind));
            assert_eq!(
                resource_to_kind(kind_to_resource(kind).unwrap()),
                Some(*kind)
            );
        }
    }

    #[test]
    fn test_matches_k8s_openapi_plurals() {
        use k8s_openapi::{
            api::{apps::v1::StatefulSet, core::v1::PersistentVolumeClaim},
            Resource,
        };
        assert_eq!(
            kind_to_resource(StatefulSet::KIND),
            Some(StatefulSet::URL_PATH_SEGMENT)
        );
        assert_eq!(
            kind_to_resource(PersistentVolumeClaim::KIND),
            Some(PersistentVolumeClaim::URL_PATH_SEGMENT)
        );
    }
}
