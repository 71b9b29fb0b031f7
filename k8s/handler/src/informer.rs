use crate::{
    constants::MAX_WATCH_TIMEOUT_SECS, handler::Handler, options::HandlerOptions,
    resource::KubeResource,
};
use futures::{pin_mut, Future, StreamExt};
use kube::{
    runtime::{
        reflector::{store::Writer, ObjectRef, Store},
        watcher, WatchStreamExt,
    },
    Api, ResourceExt,
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::{debug, info, warn};

type ObjectCallback<K> = Box<dyn FnMut(&K) + Send>;
type UpdateCallback<K> = Box<dyn FnMut(&K, &K) + Send>;

/// Functions called for the changes an informer observes.
pub struct EventHandlers<K> {
    add: Option<ObjectCallback<K>>,
    update: Option<UpdateCallback<K>>,
    delete: Option<ObjectCallback<K>>,
}

impl<K> Default for EventHandlers<K> {
    fn default() -> Self {
        Self {
            add: None,
            update: None,
            delete: None,
        }
    }
}

impl<K> EventHandlers<K> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_add<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&K) + Send + 'static,
    {
        self.add = Some(Box::new(handler));
        self
    }

    /// Called with the old and the new state when an object's resourceVersion changes.
    #[must_use]
    pub fn on_update<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&K, &K) + Send + 'static,
    {
        self.update = Some(Box::new(handler));
        self
    }

    #[must_use]
    pub fn on_delete<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&K) + Send + 'static,
    {
        self.delete = Some(Box::new(handler));
        self
    }
}

/// A change to the informer's cache.
enum Notification<K> {
    Add(K),
    Update(Arc<K>, K),
    Delete(K),
}

/// Read access to an informer's local cache.
#[derive(Clone)]
pub struct Lister<K: KubeResource> {
    store: Store<K>,
    namespace: String,
    synced: Arc<AtomicBool>,
}

impl<K: KubeResource> Lister<K> {
    /// Get an object by name, from the informer's namespace.
    pub fn get(&self, name: &str) -> Option<Arc<K>> {
        self.get_in(&self.namespace, name)
    }

    /// Get an object by name, from `namespace`. Cluster scoped kinds ignore the namespace.
    pub fn get_in(&self, namespace: &str, name: &str) -> Option<Arc<K>> {
        let object_ref = if K::NAMESPACED {
            ObjectRef::new(name).within(namespace)
        } else {
            ObjectRef::new(name)
        };
        self.store.get(&object_ref)
    }

    /// Every cached object.
    pub fn list(&self) -> Vec<Arc<K>> {
        self.store.state()
    }

    /// Every cached object in `namespace`.
    pub fn list_in(&self, namespace: &str) -> Vec<Arc<K>> {
        self.store
            .state()
            .into_iter()
            .filter(|object| object.namespace().as_deref() == Some(namespace))
            .collect()
    }

    /// Whether the cache has been filled by a complete list.
    pub fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }
}

/// A watch-fed local cache of one kind, which notifies registered handlers of changes.
pub struct Informer<K: KubeResource> {
    api: Api<K>,
    config: watcher::Config,
    namespace: String,
    writer: Writer<K>,
    store: Store<K>,
    synced: Arc<AtomicBool>,
    handlers: Vec<EventHandlers<K>>,
}

impl<K: KubeResource> Informer<K> {
    pub(crate) fn new(api: Api<K>, namespace: String, options: &HandlerOptions) -> Self {
        let writer = Writer::default();
        let store = writer.as_reader();
        Self {
            api,
            config: watcher_config(options),
            namespace,
            writer,
            store,
            synced: Arc::new(AtomicBool::new(false)),
            handlers: Vec::new(),
        }
    }

    pub fn lister(&self) -> Lister<K> {
        Lister {
            store: self.store.clone(),
            namespace: self.namespace.clone(),
            synced: self.synced.clone(),
        }
    }

    pub fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    pub fn add_event_handler(&mut self, handlers: EventHandlers<K>) {
        self.handlers.push(handlers);
    }

    /// Keep the cache in sync and notify the event handlers, until `stop` completes.
    ///
    /// Watch failures are logged and retried with backoff.
    pub async fn run<F>(&mut self, stop: F)
    where
        F: Future<Output = ()>,
    {
        let stream = watcher(self.api.clone(), self.config.clone()).default_backoff();
        pin_mut!(stream);
        pin_mut!(stop);

        info!(kind = %K::kind_name(), namespace = %self.namespace, "Starting informer");
        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                event = stream.next() => match event {
                    Some(Ok(event)) => self.dispatch(event),
                    Some(Err(error)) => {
                        warn!(kind = %K::kind_name(), %error, "Informer watch failed");
                    }
                    None => break,
                },
            }
        }
        info!(kind = %K::kind_name(), namespace = %self.namespace, "Stopped informer");
    }

    /// Apply a watcher event to the cache, then notify the handlers of what changed.
    pub(crate) fn dispatch(&mut self, event: watcher::Event<K>) {
        let notifications = match &event {
            watcher::Event::Applied(object) => {
                match self.store.get(&ObjectRef::from_obj(object)) {
                    Some(old) if old.resource_version() == object.resource_version() => vec![],
                    Some(old) => vec![Notification::Update(old, object.clone())],
                    None => vec![Notification::Add(object.clone())],
                }
            }
            watcher::Event::Deleted(object) => vec![Notification::Delete(object.clone())],
            watcher::Event::Restarted(objects) => self.relist_changes(objects),
        };

        self.writer.apply_watcher_event(&event);
        if matches!(event, watcher::Event::Restarted(_)) && !self.has_synced() {
            debug!(kind = %K::kind_name(), "Informer synced");
            self.synced.store(true, Ordering::Release);
        }

        for notification in notifications {
            for handlers in &mut self.handlers {
                match &notification {
                    Notification::Add(object) => {
                        if let Some(add) = handlers.add.as_mut() {
                            add(object);
                        }
                    }
                    Notification::Update(old, new) => {
                        if let Some(update) = handlers.update.as_mut() {
                            update(old, new);
                        }
                    }
                    Notification::Delete(object) => {
                        if let Some(delete) = handlers.delete.as_mut() {
                            delete(object);
                        }
                    }
                }
            }
        }
    }

    /// The changes between the cache and a complete list.
    fn relist_changes(&self, objects: &[K]) -> Vec<Notification<K>> {
        let mut previous: HashMap<ObjectRef<K>, Arc<K>> = self
            .store
            .state()
            .into_iter()
            .map(|object| (ObjectRef::from_obj(object.as_ref()), object))
            .collect();

        let mut notifications = Vec::new();
        for object in objects {
            match previous.remove(&ObjectRef::from_obj(object)) {
                Some(old) if old.resource_version() == object.resource_version() => {}
                Some(old) => notifications.push(Notification::Update(old, object.clone())),
                None => notifications.push(Notification::Add(object.clone())),
            }
        }
        notifications.extend(
            previous
                .into_values()
                .map(|gone| Notification::Delete(gone.as_ref().clone())),
        );
        notifications
    }
}

fn watcher_config(options: &HandlerOptions) -> watcher::Config {
    let mut config = watcher::Config::default();
    if let Some(ref labels) = options.label_selector {
        config = config.labels(labels);
    }
    if let Some(ref fields) = options.field_selector {
        config = config.fields(fields);
    }
    if let Some(timeout) = options.timeout {
        let secs = u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX);
        config = config.timeout(secs.min(MAX_WATCH_TIMEOUT_SECS));
    }
    config
}

impl<K: KubeResource> Handler<K> {
    /// An informer over the handler's namespace, honouring the handler's selectors.
    pub fn informer(&self) -> Informer<K> {
        Informer::new(
            self.api(),
            self.scope_namespace().to_string(),
            &self.options,
        )
    }

    /// Run an informer with `handlers` until `stop` completes.
    pub async fn run_informer<F>(&self, handlers: EventHandlers<K>, stop: F)
    where
        F: Future<Output = ()>,
    {
        let mut informer = self.informer();
        informer.add_event_handler(handlers);
        informer.run(stop).await;
    }
}

#[cfg(test)]
mod tests {
    use super::EventHandlers;
    use crate::{
        handler::Handler,
        test_utils::{config_map, json_response, mock_client},
    };
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::{runtime::watcher::Event, ResourceExt};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn versioned(name: &str, resource_version: &str) -> ConfigMap {
        let mut object = config_map(name, Some("default"), &[]);
        object.metadata.resource_version = Some(resource_version.to_string());
        object
    }

    fn recording_handlers() -> (Arc<Mutex<Vec<String>>>, EventHandlers<ConfigMap>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (add, update, delete) = (seen.clone(), seen.clone(), seen.clone());
        let handlers = EventHandlers::new()
            .on_add(move |cm: &ConfigMap| add.lock().unwrap().push(format!("add {}", cm.name_any())))
            .on_update(move |old: &ConfigMap, new: &ConfigMap| {
                update.lock().unwrap().push(format!(
                    "update {} {}->{}",
                    new.name_any(),
                    old.resource_version().unwrap_or_default(),
                    new.resource_version().unwrap_or_default()
                ))
            })
            .on_delete(move |cm: &ConfigMap| {
                delete.lock().unwrap().push(format!("delete {}", cm.name_any()))
            });
        (seen, handlers)
    }

    #[tokio::test]
    async fn test_dispatch_tracks_cache_changes() {
        let (client, _server) = mock_client();
        let handler: Handler<ConfigMap> = Handler::new(client, "default");
        let mut informer = handler.informer();
        let (seen, handlers) = recording_handlers();
        informer.add_event_handler(handlers);
        let lister = informer.lister();

        assert!(!lister.has_synced());
        informer.dispatch(Event::Restarted(vec![versioned("a", "1"), versioned("b", "1")]));
        assert!(lister.has_synced());
        assert_eq!(lister.list().len(), 2);

        informer.dispatch(Event::Applied(versioned("a", "1")));
        informer.dispatch(Event::Applied(versioned("a", "2")));
        informer.dispatch(Event::Restarted(vec![versioned("a", "3")]));
        informer.dispatch(Event::Deleted(versioned("a", "3")));

        let mut seen = seen.lock().unwrap().clone();
        // Additions of a single relist are in no particular order.
        seen[..2].sort();
        assert_eq!(
            seen,
            vec![
                "add a",
                "add b",
                "update a 1->2",
                "update a 2->3",
                "delete b",
                "delete a"
            ]
        );
        assert!(lister.get("a").is_none());
        assert!(lister.list_in("default").is_empty());
    }

    #[tokio::test]
    async fn test_run_until_stopped() {
        let (client, mut server) = mock_client();
        let handler: Handler<ConfigMap> = Handler::new(client, "default");
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let stop_tx = Mutex::new(Some(stop_tx));

        let server = tokio::spawn(async move {
            let (request, send) = server.next().await;
            assert_eq!(request.uri().path(), "/api/v1/namespaces/default/configmaps");
            send.send_response(json_response(
                200,
                &json!({
                    "apiVersion": "v1",
                    "kind": "ConfigMapList",
                    "metadata": { "resourceVersion": "7" },
                    "items": [{ "metadata": { "name": "a", "namespace": "default", "resourceVersion": "7" } }]
                }),
            ));
        });

        let mut informer = handler.informer();
        let lister = informer.lister();
        informer.add_event_handler(EventHandlers::new().on_add(move |_: &ConfigMap| {
            if let Some(stop) = stop_tx.lock().unwrap().take() {
                let _ = stop.send(());
            }
        }));
        informer
            .run(async {
                let _ = stop_rx.await;
            })
            .await;

        server.await.unwrap();
        assert!(lister.has_synced());
        assert_eq!(
            lister.get("a").and_then(|cm| cm.resource_version()),
            Some("7".to_string())
        );
    }
}
