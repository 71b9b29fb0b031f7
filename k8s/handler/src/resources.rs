//! Handlers for the built-in kinds.

use crate::handler::Handler;
use k8s_openapi::{
    api::{
        apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet},
        autoscaling::v2::HorizontalPodAutoscaler,
        batch::v1::{CronJob, Job},
        core::v1::{
            ConfigMap, Endpoints, Event, LimitRange, Namespace, Node, PersistentVolume,
            PersistentVolumeClaim, Pod, ReplicationController, ResourceQuota, Secret, Service,
            ServiceAccount,
        },
        networking::v1::{Ingress, IngressClass, NetworkPolicy},
        policy::v1::PodDisruptionBudget,
        rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding},
        storage::v1::StorageClass,
    },
    apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition,
};

pub type ClusterRoleHandler = Handler<ClusterRole>;
pub type ClusterRoleBindingHandler = Handler<ClusterRoleBinding>;
pub type ConfigMapHandler = Handler<ConfigMap>;
pub type CronJobHandler = Handler<CronJob>;
pub type CustomResourceDefinitionHandler = Handler<CustomResourceDefinition>;
pub type DaemonSetHandler = Handler<DaemonSet>;
pub type DeploymentHandler = Handler<Deployment>;
pub type EndpointsHandler = Handler<Endpoints>;
pub type EventHandler = Handler<Event>;
pub type HorizontalPodAutoscalerHandler = Handler<HorizontalPodAutoscaler>;
pub type IngressHandler = Handler<Ingress>;
pub type IngressClassHandler = Handler<IngressClass>;
pub type JobHandler = Handler<Job>;
pub type LimitRangeHandler = Handler<LimitRange>;
pub type NamespaceHandler = Handler<Namespace>;
pub type NetworkPolicyHandler = Handler<NetworkPolicy>;
pub type NodeHandler = Handler<Node>;
pub type PersistentVolumeHandler = Handler<PersistentVolume>;
pub type PersistentVolumeClaimHandler = Handler<PersistentVolumeClaim>;
pub type PodHandler = Handler<Pod>;
pub type PodDisruptionBudgetHandler = Handler<PodDisruptionBudget>;
pub type ReplicaSetHandler = Handler<ReplicaSet>;
pub type ReplicationControllerHandler = Handler<ReplicationController>;
pub type ResourceQuotaHandler = Handler<ResourceQuota>;
pub type RoleHandler = Handler<Role>;
pub type RoleBindingHandler = Handler<RoleBinding>;
pub type SecretHandler = Handler<Secret>;
pub type ServiceHandler = Handler<Service>;
pub type ServiceAccountHandler = Handler<ServiceAccount>;
pub type StatefulSetHandler = Handler<StatefulSet>;
pub type StorageClassHandler = Handler<StorageClass>;
