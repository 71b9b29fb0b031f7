use crate::{
    constants::DEFAULT_NAMESPACE,
    error::{ApiRequest, Operation, ResolveResource, Result},
    manifest::Manifest,
    options::HandlerOptions,
};
use kube::{
    api::{DynamicObject, Patch},
    discovery::{pinned_kind, Scope},
    Api, Client, ResourceExt,
};
use snafu::ResultExt;
use std::{fmt, path::Path};
use tracing::{debug, info};

/// Create, update, apply, get and delete objects of any kind, resolved through API discovery.
#[derive(Clone)]
pub struct DynamicHandler {
    client: Client,
    namespace: String,
    options: HandlerOptions,
}

impl fmt::Debug for DynamicHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicHandler")
            .field("namespace", &self.namespace)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// An Api for one manifest, with the namespace it addresses.
struct Target {
    api: Api<DynamicObject>,
    kind: String,
    name: String,
    namespace: String,
}

impl Target {
    fn request(&self, operation: Operation) -> ApiRequest<Operation, String, String, String> {
        ApiRequest {
            operation,
            kind: self.kind.clone(),
            name: self.name.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

impl DynamicHandler {
    /// A dynamic handler over `client`. An empty namespace means "default".
    pub fn new<T: ToString>(client: Client, namespace: T) -> Self {
        let namespace = namespace.to_string();
        Self {
            client,
            namespace: if namespace.is_empty() {
                DEFAULT_NAMESPACE.to_string()
            } else {
                namespace
            },
            options: HandlerOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_namespace<T: ToString>(&self, namespace: T) -> Self {
        Self::new(self.client.clone(), namespace).with_options(self.options.clone())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resolve the manifest's group/version/kind and scope.
    async fn target(&self, manifest: &Manifest) -> Result<Target> {
        let gvk = manifest.gvk()?;
        let (resource, capabilities) =
            pinned_kind(&self.client, &gvk)
                .await
                .context(ResolveResource {
                    api_version: manifest.api_version().unwrap_or_default(),
                    kind: gvk.kind.as_str(),
                })?;

        let (api, namespace) = match capabilities.scope {
            Scope::Namespaced => {
                let namespace = manifest.namespace().unwrap_or(&self.namespace).to_string();
                (
                    Api::namespaced_with(self.client.clone(), &namespace, &resource),
                    namespace,
                )
            }
            Scope::Cluster => (Api::all_with(self.client.clone(), &resource), String::new()),
        };

        Ok(Target {
            api,
            kind: gvk.kind.clone(),
            name: manifest.name().unwrap_or_default().to_string(),
            namespace,
        })
    }

    pub async fn create(&self, manifest: &Manifest) -> Result<DynamicObject> {
        let target = self.target(manifest).await?;
        let object = manifest.to_dynamic()?;
        debug!(kind = %target.kind, name = %target.name, namespace = %target.namespace, "Creating object");

        target
            .api
            .create(&self.options.post_params(), &object)
            .await
            .context(target.request(Operation::Create))
    }

    /// Replace the object. Without a resourceVersion in the manifest, the current one is used.
    pub async fn update(&self, manifest: &Manifest) -> Result<DynamicObject> {
        let target = self.target(manifest).await?;
        self.update_target(&target, manifest).await
    }

    async fn update_target(&self, target: &Target, manifest: &Manifest) -> Result<DynamicObject> {
        let mut object = manifest.to_dynamic()?;
        if object.resource_version().is_none() {
            let current = target
                .api
                .get(&target.name)
                .await
                .context(target.request(Operation::Update))?;
            object.metadata.resource_version = current.resource_version();
        }
        debug!(kind = %target.kind, name = %target.name, namespace = %target.namespace, "Replacing object");

        target
            .api
            .replace(&target.name, &self.options.post_params(), &object)
            .await
            .context(target.request(Operation::Update))
    }

    /// Create the object, or replace it if it already exists.
    pub async fn apply(&self, manifest: &Manifest) -> Result<DynamicObject> {
        let target = self.target(manifest).await?;
        let object = manifest.to_dynamic()?;

        match target
            .api
            .create(&self.options.post_params(), &object)
            .await
            .context(target.request(Operation::Apply))
        {
            Ok(created) => Ok(created),
            Err(error) if error.is_already_exists() => {
                info!(kind = %target.kind, name = %target.name, "Object already exists, updating");
                self.update_target(&target, manifest).await
            }
            Err(error) => Err(error),
        }
    }

    /// Server-side apply the object with the handler's field manager.
    pub async fn server_side_apply(&self, manifest: &Manifest) -> Result<DynamicObject> {
        let target = self.target(manifest).await?;
        let object = manifest.to_dynamic()?;
        target
            .api
            .patch(&target.name, &self.options.apply_params(), &Patch::Apply(&object))
            .await
            .context(target.request(Operation::Apply))
    }

    pub async fn get(&self, manifest: &Manifest) -> Result<DynamicObject> {
        let target = self.target(manifest).await?;
        target
            .api
            .get(&target.name)
            .await
            .context(target.request(Operation::Get))
    }

    pub async fn delete(&self, manifest: &Manifest) -> Result<()> {
        let target = self.target(manifest).await?;
        debug!(kind = %target.kind, name = %target.name, namespace = %target.namespace, "Deleting object");
        target
            .api
            .delete(&target.name, &self.options.delete_params())
            .await
            .context(target.request(Operation::Delete))?;
        Ok(())
    }

    /// Apply every manifest in order, stopping at the first failure.
    pub async fn apply_all(&self, manifests: &[Manifest]) -> Result<Vec<DynamicObject>> {
        let mut applied = Vec::with_capacity(manifests.len());
        for manifest in manifests {
            applied.push(self.apply(manifest).await?);
        }
        Ok(applied)
    }

    /// Apply every document of a multi-document YAML file.
    pub async fn apply_file(&self, path: impl AsRef<Path>) -> Result<Vec<DynamicObject>> {
        self.apply_all(&Manifest::all_from_file(path)?).await
    }

    /// Apply every document of a multi-document YAML input.
    pub async fn apply_bytes(&self, bytes: &[u8]) -> Result<Vec<DynamicObject>> {
        self.apply_all(&Manifest::all_from_bytes(bytes)?).await
    }
}
