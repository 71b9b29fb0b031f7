//! A mock kube-apiserver for tests, built on tower-test.

use http::{Request, Response};
use hyper::Body;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::ConfigMap};
use kube::{core::ObjectMeta, Client};
use serde::Serialize;
use serde_json::{json, Value};
use std::{collections::BTreeMap, time::Duration};
use tower_test::mock::{self, Handle, SendResponse};

const REQUEST_WAIT: Duration = Duration::from_secs(5);
const IDLE_WAIT: Duration = Duration::from_millis(200);

/// The server side of a mocked kube::Client.
pub(crate) struct ApiServer(Handle<Request<Body>, Response<Body>>);

impl ApiServer {
    /// The next request sent by the client.
    pub(crate) async fn next(&mut self) -> (Request<Body>, SendResponse<Response<Body>>) {
        tokio::time::timeout(REQUEST_WAIT, self.0.next_request())
            .await
            .expect("timed out waiting for a request")
            .expect("client was dropped")
    }

    /// Assert that the client sends no further request.
    pub(crate) async fn assert_idle(&mut self) {
        let next = tokio::time::timeout(IDLE_WAIT, self.0.next_request()).await;
        assert!(
            matches!(next, Err(_) | Ok(None)),
            "unexpected request: {:?}",
            next.ok().flatten().map(|(request, _)| request.uri().clone())
        );
    }
}

pub(crate) fn mock_client() -> (Client, ApiServer) {
    let (service, handle) = mock::pair::<Request<Body>, Response<Body>>();
    (Client::new(service, "default"), ApiServer(handle))
}

pub(crate) fn json_response<T: Serialize>(status: u16, body: &T) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// A failure Status, as returned by the kube-apiserver.
pub(crate) fn status_response(code: u16, reason: &str, message: &str) -> Response<Body> {
    json_response(
        code,
        &json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": message,
            "reason": reason,
            "code": code
        }),
    )
}

/// A watch response made of the given events, one JSON document per line.
pub(crate) fn watch_response(events: &[(&str, Value)]) -> Response<Body> {
    let lines: String = events
        .iter()
        .map(|(event_type, object)| format!("{}\n", json!({ "type": event_type, "object": object })))
        .collect();
    Response::builder()
        .status(200)
        .header("content-type", "application/json")
        .body(Body::from(lines))
        .unwrap()
}

pub(crate) async fn body_json(request: Request<Body>) -> Value {
    let bytes = hyper::body::to_bytes(request.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub(crate) fn config_map(name: &str, namespace: Option<&str>, data: &[(&str, &str)]) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: namespace.map(ToString::to_string),
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..Default::default()
    }
}

pub(crate) fn deployment(name: &str, replicas: i32) -> Deployment {
    serde_json::from_value(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": name, "namespace": "default", "resourceVersion": "1", "generation": 1 },
        "spec": {
            "replicas": replicas,
            "selector": { "matchLabels": { "app": name } },
            "template": {
                "metadata": { "labels": { "app": name } },
                "spec": { "containers": [{ "name": "app", "image": "nginx" }] }
            }
        }
    }))
    .unwrap()
}
