use crate::{
    constants::{WATCH_FROM_ANY_VERSION, WATCH_RETRY_DELAY},
    error::{Operation, Result, WaitReadyTimeout},
    handler::Handler,
    resource::KubeResource,
};
use futures::{pin_mut, StreamExt};
use k8s_openapi::api::{
    apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet},
    batch::v1::Job,
    core::v1::{Namespace, Node, PersistentVolumeClaim, Pod, ReplicationController},
};
use kube::{api::WatchEvent, ResourceExt};
use snafu::ResultExt;
use std::time::Duration;
use tracing::{debug, warn};

/// Objects which can tell whether they are ready.
pub trait Readiness: KubeResource {
    fn is_ready(&self) -> bool;
}

/// Whether the controller has observed the latest spec of the object.
fn observed_latest(generation: Option<i64>, observed_generation: Option<i64>) -> bool {
    match (generation, observed_generation) {
        (Some(generation), Some(observed)) => observed >= generation,
        (Some(_), None) => false,
        (None, _) => true,
    }
}

fn condition_is_true<'a, I>(conditions: I, wanted: &str) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    conditions
        .into_iter()
        .any(|(type_, status)| type_ == wanted && status == "True")
}

impl Readiness for Deployment {
    fn is_ready(&self) -> bool {
        let Some(status) = self.status.as_ref() else {
            return false;
        };
        let desired = self
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(1);
        let updated = status.updated_replicas.unwrap_or_default();

        observed_latest(self.metadata.generation, status.observed_generation)
            && updated >= desired
            && status.replicas.unwrap_or_default() <= updated
            && status.ready_replicas.unwrap_or_default() >= desired
            && status.available_replicas.unwrap_or_default() >= desired
    }
}

impl Readiness for StatefulSet {
    fn is_ready(&self) -> bool {
        let Some(status) = self.status.as_ref() else {
            return false;
        };
        let desired = self
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(1);

        observed_latest(self.metadata.generation, status.observed_generation)
            && status.updated_replicas.unwrap_or_default() >= desired
            && status.ready_replicas.unwrap_or_default() >= desired
    }
}

impl Readiness for DaemonSet {
    fn is_ready(&self) -> bool {
        let Some(status) = self.status.as_ref() else {
            return false;
        };
        let desired = status.desired_number_scheduled;

        observed_latest(self.metadata.generation, status.observed_generation)
            && status.updated_number_scheduled.unwrap_or_default() >= desired
            && status.number_ready >= desired
    }
}

impl Readiness for ReplicaSet {
    fn is_ready(&self) -> bool {
        let Some(status) = self.status.as_ref() else {
            return false;
        };
        let desired = self
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(1);

        observed_latest(self.metadata.generation, status.observed_generation)
            && status.ready_replicas.unwrap_or_default() >= desired
    }
}

impl Readiness for ReplicationController {
    fn is_ready(&self) -> bool {
        let Some(status) = self.status.as_ref() else {
            return false;
        };
        let desired = self
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(1);

        observed_latest(self.metadata.generation, status.observed_generation)
            && status.ready_replicas.unwrap_or_default() >= desired
    }
}

/// A Job is ready once it has completed.
impl Readiness for Job {
    fn is_ready(&self) -> bool {
        let Some(status) = self.status.as_ref() else {
            return false;
        };
        let completions = self
            .spec
            .as_ref()
            .and_then(|spec| spec.completions)
            .unwrap_or(1);

        let complete = status.conditions.iter().flatten().map(|condition| {
            (condition.type_.as_str(), condition.status.as_str())
        });
        condition_is_true(complete, "Complete")
            || status.succeeded.unwrap_or_default() >= completions
    }
}

impl Readiness for Pod {
    fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .map(|conditions| {
                condition_is_true(
                    conditions
                        .iter()
                        .map(|condition| (condition.type_.as_str(), condition.status.as_str())),
                    "Ready",
                )
            })
            .unwrap_or(false)
    }
}

impl Readiness for Node {
    fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .map(|conditions| {
                condition_is_true(
                    conditions
                        .iter()
                        .map(|condition| (condition.type_.as_str(), condition.status.as_str())),
                    "Ready",
                )
            })
            .unwrap_or(false)
    }
}

impl Readiness for PersistentVolumeClaim {
    fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|status| status.phase.as_deref())
            == Some("Bound")
    }
}

impl Readiness for Namespace {
    fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|status| status.phase.as_deref())
            == Some("Active")
    }
}

impl<K: Readiness> Handler<K> {
    /// Whether the named object exists and is ready.
    pub async fn is_ready(&self, name: &str) -> Result<bool> {
        let object = self
            .api()
            .get(name)
            .await
            .context(self.request(Operation::WaitReady, name, self.scope_namespace()))?;
        Ok(object.is_ready())
    }

    /// Wait until the named object is ready, and return it.
    ///
    /// The object doesn't have to exist yet. There is no deadline, see
    /// [`Self::wait_ready_timeout`].
    pub async fn wait_ready(&self, name: &str) -> Result<K> {
        let api = self.api();
        let namespace = self.scope_namespace();
        let watch_params = self
            .options
            .watch_params()
            .fields(&format!("metadata.name={name}"));

        loop {
            let current = api
                .get_opt(name)
                .await
                .context(self.request(Operation::WaitReady, name, namespace))?;

            let resource_version = match current {
                Some(object) if object.is_ready() => return Ok(object),
                Some(object) => object
                    .resource_version()
                    .unwrap_or_else(|| WATCH_FROM_ANY_VERSION.to_string()),
                None => WATCH_FROM_ANY_VERSION.to_string(),
            };
            debug!(kind = %K::kind_name(), %name, %namespace, "Waiting for readiness");

            let stream = api
                .watch(&watch_params, &resource_version)
                .await
                .context(self.request(Operation::WaitReady, name, namespace))?;
            pin_mut!(stream);

            while let Some(event) = stream.next().await {
                match event {
                    Ok(WatchEvent::Added(object) | WatchEvent::Modified(object))
                        if object.is_ready() =>
                    {
                        return Ok(object);
                    }
                    Ok(_) => {}
                    Err(error) => {
                        warn!(kind = %K::kind_name(), %name, %error, "Readiness watch failed");
                        tokio::time::sleep(WATCH_RETRY_DELAY).await;
                        break;
                    }
                }
            }
        }
    }

    /// Wait until the named object is ready, for at most `timeout`.
    pub async fn wait_ready_timeout(&self, name: &str, timeout: Duration) -> Result<K> {
        match tokio::time::timeout(timeout, self.wait_ready(name)).await {
            Ok(result) => result,
            Err(_) => WaitReadyTimeout {
                kind: K::kind_name(),
                name,
                timeout,
            }
            .fail(),
        }
    }
}
