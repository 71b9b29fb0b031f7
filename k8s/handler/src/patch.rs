use crate::{
    error::{JsonPatchParse, JsonSerialize, Operation, ReadingFile, Result, YamlParse},
    handler::Handler,
    manifest::Manifest,
    resource::KubeResource,
};
use kube::api::{DynamicObject, Patch};
use serde_json::{Map, Value};
use snafu::ResultExt;
use std::{fs, path::Path};
use tracing::debug;

/// The encoding of a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchType {
    /// Kubernetes strategic merge patch.
    #[default]
    Strategic,
    /// RFC 7386 JSON merge patch.
    Merge,
    /// RFC 6902 JSON patch.
    Json,
}

/// What to patch an object with.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchSource {
    /// A patch body, sent as is for the chosen patch type.
    Raw(Value),
    /// The desired state of the object. The patch is computed against the original.
    Modified(Value),
}

impl PatchSource {
    /// A patch body from a YAML or JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).context(ReadingFile {
            filepath: path.to_path_buf(),
        })?;
        Self::from_bytes(&bytes)
    }

    /// A patch body from YAML or JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_yaml::from_slice(bytes).context(YamlParse)?;
        Ok(Self::Raw(value))
    }

    /// The desired state as a typed object.
    pub fn from_object<T>(object: &T) -> Result<Self>
    where
        T: KubeResource,
    {
        Ok(Self::Modified(Manifest::from_object(object)?.into_value()))
    }

    /// The desired state as an unstructured object.
    pub fn from_raw(map: Map<String, Value>) -> Self {
        Self::Modified(Value::Object(map))
    }

    /// The desired state as a dynamic object.
    pub fn from_dynamic(object: &DynamicObject) -> Result<Self> {
        Ok(Self::Modified(Manifest::from_dynamic(object)?.into_value()))
    }

    pub fn from_manifest(manifest: Manifest) -> Self {
        Self::Modified(manifest.into_value())
    }
}

/// A merge patch which turns `original` into `modified`.
///
/// Keys missing from `modified` are deleted with null, nested objects are diffed recursively,
/// and every other changed value (lists included) is replaced whole. The patch carries no
/// strategic merge directives, so it's valid both as a JSON merge patch and as a strategic
/// merge patch.
pub fn two_way_merge_patch(original: &Value, modified: &Value) -> Value {
    let (Value::Object(original), Value::Object(modified)) = (original, modified) else {
        return modified.clone();
    };

    let mut patch = Map::new();
    for key in original.keys() {
        if !modified.contains_key(key) {
            patch.insert(key.clone(), Value::Null);
        }
    }
    for (key, value) in modified {
        match original.get(key) {
            Some(current) if current == value => {}
            Some(current) if current.is_object() && value.is_object() => {
                let nested = two_way_merge_patch(current, value);
                if !is_empty_patch(&nested) {
                    patch.insert(key.clone(), nested);
                }
            }
            None if value.is_null() => {}
            _ => {
                patch.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(patch)
}

fn is_empty_patch(patch: &Value) -> bool {
    match patch {
        Value::Object(map) => map.is_empty(),
        Value::Array(operations) => operations.is_empty(),
        Value::Null => true,
        _ => false,
    }
}

/// The patch to send, or None if there is nothing to change.
pub(crate) fn build_patch(
    original: &Value,
    source: PatchSource,
    patch_type: PatchType,
) -> Result<Option<Patch<Value>>> {
    let patch = match (source, patch_type) {
        (PatchSource::Raw(body), _) if is_empty_patch(&body) => return Ok(None),
        (PatchSource::Raw(body), PatchType::Strategic) => Patch::Strategic(body),
        (PatchSource::Raw(body), PatchType::Merge) => Patch::Merge(body),
        (PatchSource::Raw(body), PatchType::Json) => {
            Patch::Json(serde_json::from_value(body).context(JsonPatchParse)?)
        }
        (PatchSource::Modified(modified), PatchType::Json) => {
            let operations = json_patch::diff(original, &modified);
            if operations.0.is_empty() {
                return Ok(None);
            }
            Patch::Json(operations)
        }
        (PatchSource::Modified(modified), patch_type) => {
            let body = two_way_merge_patch(original, &modified);
            if is_empty_patch(&body) {
                return Ok(None);
            }
            match patch_type {
                PatchType::Merge => Patch::Merge(body),
                _ => Patch::Strategic(body),
            }
        }
    };
    Ok(Some(patch))
}

impl<K: KubeResource> Handler<K> {
    /// Patch `original` with `source`, encoded as `patch_type`.
    ///
    /// If the patch turns out to be empty, `original` is returned as is and no request is
    /// sent.
    pub async fn patch(&self, original: &K, source: PatchSource, patch_type: PatchType) -> Result<K> {
        let name = self.require_name(original, Operation::Patch)?;
        let namespace = self.namespace_for(original);
        let original_json = serde_json::to_value(original).context(JsonSerialize {
            kind: K::kind_name(),
        })?;

        let Some(patch) = build_patch(&original_json, source, patch_type)? else {
            debug!(kind = %K::kind_name(), %name, %namespace, "Empty patch, skipping request");
            return Ok(original.clone());
        };

        debug!(kind = %K::kind_name(), %name, %namespace, ?patch_type, "Patching object");
        self.api_in(&namespace)
            .patch(&name, &self.options.patch_params(), &patch)
            .await
            .context(self.request(Operation::Patch, &name, &namespace))
    }

    /// Patch `original` with a patch body read from a file.
    pub async fn patch_from_file(
        &self,
        original: &K,
        path: impl AsRef<Path>,
        patch_type: PatchType,
    ) -> Result<K> {
        self.patch(original, PatchSource::from_file(path)?, patch_type)
            .await
    }

    /// Patch `original` with a YAML or JSON patch body.
    pub async fn patch_from_bytes(
        &self,
        original: &K,
        bytes: &[u8],
        patch_type: PatchType,
    ) -> Result<K> {
        self.patch(original, PatchSource::from_bytes(bytes)?, patch_type)
            .await
    }

    /// Patch `original` into `modified`.
    pub async fn patch_to(&self, original: &K, modified: &K, patch_type: PatchType) -> Result<K> {
        self.patch(original, PatchSource::from_object(modified)?, patch_type)
            .await
    }

    /// Patch `original` into an unstructured desired state.
    pub async fn patch_to_raw(
        &self,
        original: &K,
        modified: Map<String, Value>,
        patch_type: PatchType,
    ) -> Result<K> {
        self.patch(original, PatchSource::from_raw(modified), patch_type)
            .await
    }

    /// Patch `original` into a dynamic desired state.
    pub async fn patch_to_dynamic(
        &self,
        original: &K,
        modified: &DynamicObject,
        patch_type: PatchType,
    ) -> Result<K> {
        self.patch(original, PatchSource::from_dynamic(modified)?, patch_type)
            .await
    }
}
