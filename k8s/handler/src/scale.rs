use crate::{
    error::{Operation, Result},
    handler::Handler,
    manifest::Manifest,
    resource::KubeResource,
};
use k8s_openapi::api::{
    apps::v1::{Deployment, ReplicaSet, StatefulSet},
    core::v1::ReplicationController,
};
use serde_json::{Map, Value};
use snafu::ResultExt;
use std::path::Path;
use tracing::info;

/// Workloads with a desired number of replicas.
pub trait Scalable: KubeResource {
    /// The desired number of replicas, if set.
    fn replicas(&self) -> Option<i32>;

    fn set_replicas(&mut self, replicas: i32);
}

macro_rules! impl_scalable {
    ($($kind:ty),+ $(,)?) => {
        $(
            impl Scalable for $kind {
                fn replicas(&self) -> Option<i32> {
                    self.spec.as_ref().and_then(|spec| spec.replicas)
                }

                fn set_replicas(&mut self, replicas: i32) {
                    self.spec.get_or_insert_with(Default::default).replicas = Some(replicas);
                }
            }
        )+
    };
}

impl_scalable!(Deployment, StatefulSet, ReplicaSet, ReplicationController);

impl<K: Scalable> Handler<K> {
    /// Set the replicas of a workload in the handler's namespace.
    pub async fn scale(&self, name: &str, replicas: i32) -> Result<K> {
        let namespace = self.scope_namespace().to_string();
        self.scale_in(name, &namespace, replicas).await
    }

    /// Set the replicas of a workload, by its name and namespace.
    pub async fn scale_object(&self, object: &K, replicas: i32) -> Result<K> {
        let name = self.require_name(object, Operation::Scale)?;
        let namespace = self.namespace_for(object);
        self.scale_in(&name, &namespace, replicas).await
    }

    pub async fn scale_from(&self, manifest: &Manifest, replicas: i32) -> Result<K> {
        let object: K = manifest.decode(Operation::Scale)?;
        self.scale_object(&object, replicas).await
    }

    pub async fn scale_from_file(&self, path: impl AsRef<Path>, replicas: i32) -> Result<K> {
        self.scale_from(&Manifest::from_file(path)?, replicas).await
    }

    pub async fn scale_from_bytes(&self, bytes: &[u8], replicas: i32) -> Result<K> {
        self.scale_from(&Manifest::from_bytes(bytes)?, replicas).await
    }

    pub async fn scale_from_raw(&self, map: Map<String, Value>, replicas: i32) -> Result<K> {
        self.scale_from(&Manifest::from_raw(map), replicas).await
    }

    /// Fetch the current state and replace it with the new replica count. A concurrent
    /// change makes the replace fail with a conflict.
    async fn scale_in(&self, name: &str, namespace: &str, replicas: i32) -> Result<K> {
        let api = self.api_in(namespace);
        let current = api
            .get(name)
            .await
            .context(self.request(Operation::Scale, name, namespace))?;

        let mut scaled = current.clone();
        scaled.set_replicas(replicas);
        info!(
            kind = %K::kind_name(),
            %name,
            %namespace,
            from = current.replicas().unwrap_or_default(),
            to = replicas,
            "Scaling"
        );

        api.replace(name, &self.options.post_params(), &scaled)
            .await
            .context(self.request(Operation::Scale, name, namespace))
    }
}

#[cfg(test)]
mod tests {
    use super::Scalable;
    use crate::{
        handler::Handler,
        test_utils::{body_json, deployment, json_response, mock_client, status_response},
    };
    use http::Method;
    use k8s_openapi::api::{apps::v1::Deployment, core::v1::ReplicationController};

    #[test]
    fn test_set_replicas_without_spec() {
        let mut controller = ReplicationController::default();
        assert_eq!(controller.replicas(), None);
        controller.set_replicas(2);
        assert_eq!(controller.replicas(), Some(2));
    }

    #[tokio::test]
    async fn test_scale_replaces_replicas() {
        let (client, mut server) = mock_client();
        let handler: Handler<Deployment> = Handler::new(client, "default");
        let current = deployment("web", 1);

        let server = tokio::spawn(async move {
            let (request, send) = server.next().await;
            assert_eq!(request.method(), Method::GET);
            assert_eq!(
                request.uri().path(),
                "/apis/apps/v1/namespaces/default/deployments/web"
            );
            send.send_response(json_response(200, &current));

            let (request, send) = server.next().await;
            assert_eq!(request.method(), Method::PUT);
            let body = body_json(request).await;
            assert_eq!(body["spec"]["replicas"], 4);
            assert_eq!(body["metadata"]["resourceVersion"], "1");
            send.send_response(json_response(200, &body));
        });

        let scaled = handler.scale("web", 4).await.unwrap();
        assert_eq!(scaled.replicas(), Some(4));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_scale_missing_workload() {
        let (client, mut server) = mock_client();
        let handler: Handler<Deployment> = Handler::new(client, "default");

        let server = tokio::spawn(async move {
            let (_, send) = server.next().await;
            send.send_response(status_response(404, "NotFound", "not found"));
            server.assert_idle().await;
        });

        let error = handler.scale("web", 4).await.unwrap_err();
        assert!(error.is_not_found());
        server.await.unwrap();
    }
}
