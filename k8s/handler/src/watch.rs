use crate::{
    constants::{WATCH_FROM_ANY_VERSION, WATCH_RETRY_DELAY},
    error::{Operation, Result},
    handler::Handler,
    resource::KubeResource,
};
use futures::{pin_mut, StreamExt};
use kube::{
    api::WatchEvent,
    runtime::reflector::ObjectRef,
};
use snafu::ResultExt;
use std::collections::HashSet;
use tracing::{debug, warn};

type Callback<K> = Box<dyn FnMut(&K) + Send>;

/// Functions called for the events of a watch.
pub struct WatchCallbacks<K> {
    added: Option<Callback<K>>,
    modified: Option<Callback<K>>,
    deleted: Option<Callback<K>>,
}

impl<K> Default for WatchCallbacks<K> {
    fn default() -> Self {
        Self {
            added: None,
            modified: None,
            deleted: None,
        }
    }
}

impl<K> WatchCallbacks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for objects created after the watch was established.
    #[must_use]
    pub fn on_added<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&K) + Send + 'static,
    {
        self.added = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_modified<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&K) + Send + 'static,
    {
        self.modified = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_deleted<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&K) + Send + 'static,
    {
        self.deleted = Some(Box::new(callback));
        self
    }
}

fn call<K>(callback: &mut Option<Callback<K>>, object: &K) {
    if let Some(callback) = callback.as_mut() {
        callback(object);
    }
}

/// What a watch loop is watching.
enum WatchTarget {
    /// One object, by name.
    Single(String),
    /// Every object matching the handler's selectors.
    Selected,
}

impl<K: KubeResource> Handler<K> {
    /// Watch a single object by name, until the returned future is dropped.
    ///
    /// The returned future only completes if the object's existence can't be checked or the
    /// watch can't be opened.
    pub async fn watch_single(&self, name: &str, callbacks: WatchCallbacks<K>) -> Result<()> {
        self.watch_loop(WatchTarget::Single(name.to_string()), callbacks)
            .await
    }

    /// Watch the objects matching a label selector.
    pub async fn watch_by_label<T: ToString>(
        &self,
        selector: T,
        callbacks: WatchCallbacks<K>,
    ) -> Result<()> {
        self.with_labels(selector).watch(callbacks).await
    }

    /// Watch the objects matching a field selector.
    pub async fn watch_by_field<T: ToString>(
        &self,
        selector: T,
        callbacks: WatchCallbacks<K>,
    ) -> Result<()> {
        self.with_fields(selector).watch(callbacks).await
    }

    /// Watch every object in the handler's namespace which matches the handler's selectors.
    pub async fn watch(&self, callbacks: WatchCallbacks<K>) -> Result<()> {
        self.watch_loop(WatchTarget::Selected, callbacks).await
    }

    /// The objects which exist right now.
    async fn existing_objects(&self, target: &WatchTarget) -> Result<HashSet<ObjectRef<K>>> {
        let existing = match target {
            WatchTarget::Single(name) => self
                .get_opt(name)
                .await?
                .iter()
                .map(ObjectRef::from_obj)
                .collect(),
            // Every page, or objects past the first one would be reported as added.
            WatchTarget::Selected => self
                .list_all()
                .await?
                .iter()
                .map(ObjectRef::from_obj)
                .collect(),
        };
        Ok(existing)
    }

    async fn watch_loop(&self, target: WatchTarget, mut callbacks: WatchCallbacks<K>) -> Result<()> {
        let api = self.api();
        let namespace = self.scope_namespace();
        let (name, watch_params) = match &target {
            WatchTarget::Single(name) => (
                name.as_str(),
                self.options
                    .watch_params()
                    .fields(&format!("metadata.name={name}")),
            ),
            WatchTarget::Selected => ("", self.options.watch_params()),
        };

        loop {
            let mut existing = self.existing_objects(&target).await?;

            let stream = api
                .watch(&watch_params, WATCH_FROM_ANY_VERSION)
                .await
                .context(self.request(Operation::Watch, name, namespace))?;
            pin_mut!(stream);

            let mut failed = false;
            while let Some(event) = stream.next().await {
                match event {
                    Ok(WatchEvent::Added(object)) => {
                        // The initial events of a watch replay the objects which already exist.
                        if !existing.remove(&ObjectRef::from_obj(&object)) {
                            call(&mut callbacks.added, &object);
                        }
                    }
                    Ok(WatchEvent::Modified(object)) => call(&mut callbacks.modified, &object),
                    Ok(WatchEvent::Deleted(object)) => {
                        existing.remove(&ObjectRef::from_obj(&object));
                        call(&mut callbacks.deleted, &object);
                    }
                    Ok(WatchEvent::Bookmark(bookmark)) => {
                        debug!(
                            kind = %K::kind_name(),
                            resource_version = %bookmark.metadata.resource_version,
                            "Watch bookmark"
                        );
                    }
                    Ok(WatchEvent::Error(error)) => {
                        warn!(
                            kind = %K::kind_name(),
                            code = error.code,
                            reason = %error.reason,
                            "Watch error event: {}",
                            error.message
                        );
                    }
                    Err(error) => {
                        warn!(kind = %K::kind_name(), %name, %namespace, %error, "Watch stream failed");
                        failed = true;
                        break;
                    }
                }
            }

            if failed {
                tokio::time::sleep(WATCH_RETRY_DELAY).await;
            }
            debug!(kind = %K::kind_name(), %name, %namespace, "Reopening watch");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WatchCallbacks;
    use crate::{
        handler::Handler,
        test_utils::{config_map, json_response, mock_client, status_response, watch_response},
    };
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::ResourceExt;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn object_key(cm: &ConfigMap) -> String {
        format!("{}/{}", cm.namespace().unwrap_or_default(), cm.name_any())
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, WatchCallbacks<ConfigMap>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (added, modified, deleted) = (events.clone(), events.clone(), events.clone());
        let callbacks = WatchCallbacks::new()
            .on_added(move |cm: &ConfigMap| {
                added.lock().unwrap().push(format!("added {}", object_key(cm)))
            })
            .on_modified(move |cm: &ConfigMap| {
                modified.lock().unwrap().push(format!("modified {}", object_key(cm)))
            })
            .on_deleted(move |cm: &ConfigMap| {
                deleted.lock().unwrap().push(format!("deleted {}", object_key(cm)))
            });
        (events, callbacks)
    }

    #[tokio::test]
    async fn test_no_added_for_existing_object() {
        let (client, mut server) = mock_client();
        let handler: Handler<ConfigMap> = Handler::new(client, "default");
        let (events, callbacks) = recorder();
        let existing = config_map("settings", Some("default"), &[("a", "1")]);
        let changed = config_map("settings", Some("default"), &[("a", "2")]);

        let server = tokio::spawn(async move {
            let (request, send) = server.next().await;
            assert_eq!(
                request.uri().path(),
                "/api/v1/namespaces/default/configmaps/settings"
            );
            send.send_response(json_response(200, &existing));

            let (request, send) = server.next().await;
            let query = request.uri().query().unwrap_or_default().to_string();
            assert!(query.contains("watch=true"));
            assert!(query.contains("metadata.name%3Dsettings"));
            send.send_response(watch_response(&[
                ("ADDED", serde_json::to_value(&existing).unwrap()),
                ("MODIFIED", serde_json::to_value(&changed).unwrap()),
                ("DELETED", serde_json::to_value(&changed).unwrap()),
                ("ADDED", serde_json::to_value(&existing).unwrap()),
            ]));
            // Dropping the server fails the next existence check, which ends the watch.
        });

        let result = handler.watch_single("settings", callbacks).await;
        assert!(result.is_err());
        server.await.unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "modified default/settings",
                "deleted default/settings",
                "added default/settings"
            ]
        );
    }

    fn config_map_list(items: &[&ConfigMap], continue_token: Option<&str>) -> serde_json::Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMapList",
            "metadata": { "continue": continue_token, "resourceVersion": "10" },
            "items": items
        })
    }

    #[tokio::test]
    async fn test_watch_by_label_skips_every_listed_page() {
        let (client, mut server) = mock_client();
        let handler: Handler<ConfigMap> = Handler::new(client, "default").with_limit(1);
        let (events, callbacks) = recorder();
        let first = config_map("first", Some("default"), &[]);
        let second = config_map("second", Some("default"), &[]);
        let created = config_map("created", Some("default"), &[]);

        let server = tokio::spawn(async move {
            let (request, send) = server.next().await;
            let query = request.uri().query().unwrap_or_default().to_string();
            assert!(query.contains("labelSelector=app%3Dweb"));
            assert!(query.contains("limit=1"));
            send.send_response(json_response(200, &config_map_list(&[&first], Some("page-2"))));

            let (request, send) = server.next().await;
            let query = request.uri().query().unwrap_or_default().to_string();
            assert!(query.contains("labelSelector=app%3Dweb"));
            assert!(query.contains("continue=page-2"));
            send.send_response(json_response(200, &config_map_list(&[&second], None)));

            let (request, send) = server.next().await;
            let query = request.uri().query().unwrap_or_default().to_string();
            assert!(query.contains("watch=true"));
            assert!(query.contains("resourceVersion=0"));
            assert!(query.contains("labelSelector=app%3Dweb"));
            send.send_response(watch_response(&[
                ("ADDED", serde_json::to_value(&first).unwrap()),
                ("ADDED", serde_json::to_value(&second).unwrap()),
                ("ADDED", serde_json::to_value(&created).unwrap()),
                ("MODIFIED", serde_json::to_value(&second).unwrap()),
            ]));
        });

        assert!(handler.watch_by_label("app=web", callbacks).await.is_err());
        server.await.unwrap();
        assert_eq!(
            *events.lock().unwrap(),
            vec!["added default/created", "modified default/second"]
        );
    }

    #[tokio::test]
    async fn test_added_for_new_object() {
        let (client, mut server) = mock_client();
        let handler: Handler<ConfigMap> = Handler::new(client, "default");
        let (events, callbacks) = recorder();
        let created = config_map("settings", Some("default"), &[]);

        let server = tokio::spawn(async move {
            let (_, send) = server.next().await;
            send.send_response(status_response(404, "NotFound", "not found"));

            let (_, send) = server.next().await;
            send.send_response(watch_response(&[(
                "ADDED",
                serde_json::to_value(&created).unwrap(),
            )]));
        });

        assert!(handler.watch_single("settings", callbacks).await.is_err());
        server.await.unwrap();
        assert_eq!(*events.lock().unwrap(), vec!["added default/settings"]);
    }
}
