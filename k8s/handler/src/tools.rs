use crate::{
    constants::{NODE_ROLE_LABEL_PREFIX, STORAGE_RESOURCE},
    error::Result,
    handler::Handler,
    resource::KubeResource,
};
use chrono::Utc;
use k8s_openapi::{
    api::{
        apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet},
        batch::v1::Job,
        core::v1::{
            Node, PersistentVolume, PersistentVolumeClaim, Pod, ReplicationController, Service,
        },
    },
    apimachinery::pkg::apis::meta::v1::LabelSelector,
};
use kube::{Resource, ResourceExt};
use std::time::Duration;

/// Time since the object was created.
pub fn age<K: Resource>(object: &K) -> Option<Duration> {
    let created = object.meta().creation_timestamp.as_ref()?;
    (Utc::now() - created.0).to_std().ok()
}

/// A duration in its largest two units, like kubectl shows ages: "45s", "5m12s", "3h7m",
/// "12d4h".
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    let (days, hours, minutes) = (secs / 86_400, secs / 3_600 % 24, secs / 60 % 60);
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3_599 if secs % 60 == 0 => format!("{minutes}m"),
        60..=3_599 => format!("{minutes}m{}s", secs % 60),
        3_600..=86_399 if minutes == 0 => format!("{hours}h"),
        3_600..=86_399 => format!("{hours}h{minutes}m"),
        _ if hours == 0 => format!("{days}d"),
        _ => format!("{days}d{hours}h"),
    }
}

/// The age of the object, as an exact human readable duration, e.g. "2h 5m 1s".
pub fn age_string<K: Resource>(object: &K) -> Option<String> {
    age(object)
        .map(|age| humantime::format_duration(Duration::from_secs(age.as_secs())).to_string())
}

/// Every IP of the pod, primary first.
pub fn pod_ips(pod: &Pod) -> Vec<String> {
    let Some(status) = pod.status.as_ref() else {
        return Vec::new();
    };
    match status.pod_ips.as_ref() {
        Some(ips) if !ips.is_empty() => ips.iter().filter_map(|ip| ip.ip.clone()).collect(),
        _ => status.pod_ip.iter().cloned().collect(),
    }
}

pub fn pod_node(pod: &Pod) -> Option<&str> {
    pod.spec.as_ref()?.node_name.as_deref()
}

pub fn pod_phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref()?.phase.as_deref()
}

/// Names of the pod's containers, init containers excluded.
pub fn pod_containers(pod: &Pod) -> Vec<&str> {
    pod.spec
        .iter()
        .flat_map(|spec| spec.containers.iter())
        .map(|container| container.name.as_str())
        .collect()
}

/// Total restarts of the pod's containers.
pub fn pod_restarts(pod: &Pod) -> i32 {
    pod.status
        .iter()
        .flat_map(|status| status.container_statuses.iter().flatten())
        .map(|status| status.restart_count)
        .sum()
}

/// Ports of the service, as kubectl shows them: "80/TCP", or "80:30080/TCP" with a node port.
pub fn service_ports(service: &Service) -> Vec<String> {
    service
        .spec
        .iter()
        .flat_map(|spec| spec.ports.iter().flatten())
        .map(|port| {
            let protocol = port.protocol.as_deref().unwrap_or("TCP");
            match port.node_port {
                Some(node_port) => format!("{}:{node_port}/{protocol}", port.port),
                None => format!("{}/{protocol}", port.port),
            }
        })
        .collect()
}

pub fn service_type(service: &Service) -> &str {
    service
        .spec
        .as_ref()
        .and_then(|spec| spec.type_.as_deref())
        .unwrap_or("ClusterIP")
}

pub fn service_cluster_ip(service: &Service) -> Option<&str> {
    service.spec.as_ref()?.cluster_ip.as_deref()
}

/// The provisioned capacity of the claim, or the requested one while it's pending.
pub fn pvc_capacity(pvc: &PersistentVolumeClaim) -> Option<String> {
    let provisioned = pvc
        .status
        .as_ref()
        .and_then(|status| status.capacity.as_ref())
        .and_then(|capacity| capacity.get(STORAGE_RESOURCE));
    let requested = || {
        pvc.spec
            .as_ref()?
            .resources
            .as_ref()?
            .requests
            .as_ref()?
            .get(STORAGE_RESOURCE)
    };
    provisioned.or_else(requested).map(|quantity| quantity.0.clone())
}

pub fn pvc_storage_class(pvc: &PersistentVolumeClaim) -> Option<&str> {
    pvc.spec.as_ref()?.storage_class_name.as_deref()
}

/// Name of the volume bound to the claim.
pub fn pvc_volume(pvc: &PersistentVolumeClaim) -> Option<&str> {
    pvc.spec.as_ref()?.volume_name.as_deref()
}

pub fn pv_capacity(pv: &PersistentVolume) -> Option<String> {
    pv.spec
        .as_ref()?
        .capacity
        .as_ref()?
        .get(STORAGE_RESOURCE)
        .map(|quantity| quantity.0.clone())
}

/// The claim bound to the volume, as "namespace/name".
pub fn pv_claim(pv: &PersistentVolume) -> Option<String> {
    let claim = pv.spec.as_ref()?.claim_ref.as_ref()?;
    let name = claim.name.as_deref()?;
    Some(match claim.namespace.as_deref() {
        Some(namespace) => format!("{namespace}/{name}"),
        None => name.to_string(),
    })
}

/// Roles of the node, from its node-role.kubernetes.io/ labels.
pub fn node_roles(node: &Node) -> Vec<String> {
    node.labels()
        .keys()
        .filter_map(|key| key.strip_prefix(NODE_ROLE_LABEL_PREFIX))
        .filter(|role| !role.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub fn node_internal_ip(node: &Node) -> Option<&str> {
    node.status
        .as_ref()?
        .addresses
        .as_ref()?
        .iter()
        .find(|address| address.type_ == "InternalIP")
        .map(|address| address.address.as_str())
}

/// The selector in its query string form, e.g. "app=web,tier in (back,front),!canary".
pub fn label_selector_string(selector: &LabelSelector) -> String {
    let labels = selector
        .match_labels
        .iter()
        .flatten()
        .map(|(key, value)| format!("{key}={value}"));
    let expressions = selector
        .match_expressions
        .iter()
        .flatten()
        .map(|requirement| {
            let key = &requirement.key;
            let values = requirement.values.clone().unwrap_or_default().join(",");
            match requirement.operator.as_str() {
                "In" => format!("{key} in ({values})"),
                "NotIn" => format!("{key} notin ({values})"),
                "Exists" => key.to_string(),
                "DoesNotExist" => format!("!{key}"),
                operator => format!("{key} {operator} ({values})"),
            }
        });
    labels.chain(expressions).collect::<Vec<_>>().join(",")
}

/// Names of the PersistentVolumeClaims created from the StatefulSet's volume claim templates.
pub fn statefulset_pvc_names(statefulset: &StatefulSet) -> Vec<String> {
    let Some(spec) = statefulset.spec.as_ref() else {
        return Vec::new();
    };
    let name = statefulset.name_any();
    let replicas = spec.replicas.unwrap_or(1).max(0);

    spec.volume_claim_templates
        .iter()
        .flatten()
        .filter_map(|template| template.metadata.name.as_deref())
        .flat_map(|template| {
            let name = name.clone();
            (0..replicas).map(move |ordinal| format!("{template}-{name}-{ordinal}"))
        })
        .collect()
}

/// Objects which select pods.
pub trait Workload: KubeResource {
    /// The pod selector, in its query string form.
    fn pod_selector(&self) -> Option<String>;
}

macro_rules! impl_workload {
    ($($kind:ty),+ $(,)?) => {
        $(
            impl Workload for $kind {
                fn pod_selector(&self) -> Option<String> {
                    self.spec
                        .as_ref()
                        .map(|spec| label_selector_string(&spec.selector))
                        .filter(|selector| !selector.is_empty())
                }
            }
        )+
    };
}

impl_workload!(Deployment, StatefulSet, DaemonSet, ReplicaSet);

impl Workload for Job {
    fn pod_selector(&self) -> Option<String> {
        self.spec
            .as_ref()?
            .selector
            .as_ref()
            .map(label_selector_string)
            .filter(|selector| !selector.is_empty())
    }
}

impl Workload for ReplicationController {
    fn pod_selector(&self) -> Option<String> {
        let selector = self.spec.as_ref()?.selector.as_ref()?;
        let selector = selector
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        (!selector.is_empty()).then_some(selector)
    }
}

impl<K: Workload> Handler<K> {
    /// The pods selected by the named workload. A workload without a selector has none.
    pub async fn pods(&self, name: &str) -> Result<Vec<Pod>> {
        let workload = self.get(name).await?;
        let Some(selector) = workload.pod_selector() else {
            return Ok(Vec::new());
        };
        let namespace = workload
            .namespace()
            .unwrap_or_else(|| self.namespace().to_string());

        self.for_kind::<Pod>()
            .with_namespace(namespace)
            .list_by_label(selector)
            .await
    }
}
