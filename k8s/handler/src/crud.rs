use crate::{
    constants::KUBE_API_PAGE_SIZE,
    error::{ApiRequest, Operation, Result},
    handler::Handler,
    manifest::Manifest,
    resource::KubeResource,
};
use kube::{
    api::{ListParams, Patch},
    Api, ResourceExt,
};
use serde_json::{Map, Value};
use snafu::ResultExt;
use std::path::Path;
use tracing::{debug, info};

/// Generates the Manifest, file, bytes and raw map variants of an operation which takes a
/// typed object.
macro_rules! manifest_variants {
    (
        $typed:ident -> $out:ty, $operation:expr,
        $from:ident, $from_file:ident, $from_bytes:ident, $from_raw:ident
    ) => {
        #[doc = concat!("[`Self::", stringify!($typed), "`] for an object decoded from a Manifest.")]
        pub async fn $from(&self, manifest: &Manifest) -> Result<$out> {
            let object: K = manifest.decode($operation)?;
            self.$typed(&object).await
        }

        #[doc = concat!("[`Self::", stringify!($typed), "`] for an object read from a YAML or JSON file.")]
        pub async fn $from_file(&self, path: impl AsRef<Path>) -> Result<$out> {
            self.$from(&Manifest::from_file(path)?).await
        }

        #[doc = concat!("[`Self::", stringify!($typed), "`] for an object parsed from YAML or JSON bytes.")]
        pub async fn $from_bytes(&self, bytes: &[u8]) -> Result<$out> {
            self.$from(&Manifest::from_bytes(bytes)?).await
        }

        #[doc = concat!("[`Self::", stringify!($typed), "`] for an unstructured object.")]
        pub async fn $from_raw(&self, map: Map<String, Value>) -> Result<$out> {
            self.$from(&Manifest::from_raw(map)).await
        }
    };
}

impl<K: KubeResource> Handler<K> {
    /// Create the object, in its own namespace or else the handler's.
    pub async fn create(&self, object: &K) -> Result<K> {
        let namespace = self.namespace_for(object);
        let name = object.meta().name.clone().unwrap_or_default();
        debug!(kind = %K::kind_name(), %name, %namespace, "Creating object");

        self.api_in(&namespace)
            .create(&self.options.post_params(), object)
            .await
            .context(self.request(Operation::Create, &name, &namespace))
    }

    /// Replace the object with the given one.
    pub async fn update(&self, object: &K) -> Result<K> {
        let name = self.require_name(object, Operation::Update)?;
        let namespace = self.namespace_for(object);
        debug!(kind = %K::kind_name(), %name, %namespace, "Replacing object");

        self.api_in(&namespace)
            .replace(&name, &self.options.post_params(), object)
            .await
            .context(self.request(Operation::Update, &name, &namespace))
    }

    /// Create the object, or replace it if it already exists.
    ///
    /// Only an AlreadyExists rejection of the create leads to the update; any other error is
    /// returned as is. The update replaces the stored object wholesale.
    pub async fn apply(&self, object: &K) -> Result<K> {
        match self.create(object).await {
            Ok(created) => Ok(created),
            Err(error) if error.is_already_exists() => {
                info!(
                    kind = %K::kind_name(),
                    name = %object.name_any(),
                    "Object already exists, updating"
                );
                self.update(object).await
            }
            Err(error) => Err(error),
        }
    }

    /// Server-side apply the object, taking ownership of every field it sets.
    pub async fn server_side_apply(&self, object: &K) -> Result<K> {
        let name = self.require_name(object, Operation::Apply)?;
        let namespace = self.namespace_for(object);
        debug!(kind = %K::kind_name(), %name, %namespace, "Server-side applying object");

        self.api_in(&namespace)
            .patch(
                &name,
                &self.options.apply_params(),
                &Patch::Apply(object),
            )
            .await
            .context(self.request(Operation::Apply, &name, &namespace))
    }

    /// Get an object by name from the handler's namespace.
    pub async fn get(&self, name: &str) -> Result<K> {
        self.api()
            .get(name)
            .await
            .context(self.request(Operation::Get, name, self.scope_namespace()))
    }

    /// Get an object by name, or None if it doesn't exist.
    pub async fn get_opt(&self, name: &str) -> Result<Option<K>> {
        self.api()
            .get_opt(name)
            .await
            .context(self.request(Operation::Get, name, self.scope_namespace()))
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.get_opt(name).await?.is_some())
    }

    /// Get the current state of the object, by its name and namespace.
    pub async fn get_object(&self, object: &K) -> Result<K> {
        let name = self.require_name(object, Operation::Get)?;
        let namespace = self.namespace_for(object);
        self.api_in(&namespace)
            .get(&name)
            .await
            .context(self.request(Operation::Get, &name, &namespace))
    }

    /// Delete an object by name from the handler's namespace.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let namespace = self.scope_namespace().to_string();
        self.delete_in(name, &namespace).await
    }

    /// Delete the object, by its name and namespace.
    pub async fn delete_object(&self, object: &K) -> Result<()> {
        let name = self.require_name(object, Operation::Delete)?;
        let namespace = self.namespace_for(object);
        self.delete_in(&name, &namespace).await
    }

    async fn delete_in(&self, name: &str, namespace: &str) -> Result<()> {
        debug!(kind = %K::kind_name(), %name, %namespace, "Deleting object");
        let deleted = self
            .api_in(namespace)
            .delete(name, &self.options.delete_params())
            .await
            .context(self.request(Operation::Delete, name, namespace))?;
        if deleted.is_left() {
            debug!(%name, "Deletion in progress");
        }
        Ok(())
    }

    manifest_variants!(create -> K, Operation::Create,
        create_from, create_from_file, create_from_bytes, create_from_raw);
    manifest_variants!(update -> K, Operation::Update,
        update_from, update_from_file, update_from_bytes, update_from_raw);
    manifest_variants!(apply -> K, Operation::Apply,
        apply_from, apply_from_file, apply_from_bytes, apply_from_raw);
    manifest_variants!(server_side_apply -> K, Operation::Apply,
        server_side_apply_from, server_side_apply_from_file, server_side_apply_from_bytes,
        server_side_apply_from_raw);
    manifest_variants!(get_object -> K, Operation::Get,
        get_from, get_from_file, get_from_bytes, get_from_raw);
    manifest_variants!(delete_object -> (), Operation::Delete,
        delete_from, delete_from_file, delete_from_bytes, delete_from_raw);

    /// List objects in the handler's namespace, as a single request honouring the handler's
    /// selectors, limit and timeout.
    pub async fn list(&self) -> Result<Vec<K>> {
        let namespace = self.scope_namespace().to_string();
        self.list_with(&self.api(), &namespace).await
    }

    /// List objects in `namespace`.
    pub async fn list_in(&self, namespace: &str) -> Result<Vec<K>> {
        self.list_with(&self.api_in(namespace), namespace).await
    }

    /// List objects across all namespaces.
    pub async fn list_all_namespaces(&self) -> Result<Vec<K>> {
        self.list_with(&self.api_all(), "").await
    }

    pub async fn list_by_label<T: ToString>(&self, selector: T) -> Result<Vec<K>> {
        self.with_labels(selector).list().await
    }

    pub async fn list_by_field<T: ToString>(&self, selector: T) -> Result<Vec<K>> {
        self.with_fields(selector).list().await
    }

    /// List every object in the handler's namespace, following continue tokens. The handler's
    /// limit, if any, is the page size.
    pub async fn list_all(&self) -> Result<Vec<K>> {
        let namespace = self.scope_namespace();
        let list_params = self
            .options
            .list_params()
            .limit(self.options.limit.unwrap_or(KUBE_API_PAGE_SIZE));
        paginated_list(
            &self.api(),
            list_params,
            self.request(Operation::List, "", namespace),
        )
        .await
    }

    async fn list_with(&self, api: &Api<K>, namespace: &str) -> Result<Vec<K>> {
        let list = api
            .list(&self.options.list_params())
            .await
            .context(self.request(Operation::List, "", namespace))?;
        Ok(list.items)
    }
}

/// List every page of a resource.
pub(crate) async fn paginated_list<K>(
    resource_api: &Api<K>,
    mut list_params: ListParams,
    list_err_ctx: ApiRequest<Operation, String, String, String>,
) -> Result<Vec<K>>
where
    K: KubeResource,
{
    let mut resources = Vec::new();

    loop {
        let resource_list = resource_api
            .list(&list_params)
            .await
            .context(list_err_ctx.clone())?;

        let maybe_token = resource_list.metadata.continue_.clone();

        resources.extend(resource_list);

        match maybe_token {
            Some(ref token) if !token.is_empty() => {
                list_params = list_params.continue_token(token);
            }
            _ => break,
        }
    }

    Ok(resources)
}
