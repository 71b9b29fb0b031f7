use crate::error::{
    DecodeObject, JsonSerialize, KindMismatch, MissingTypeMeta, NotAnObject, Operation,
    ReadingFile, Result, YamlParse,
};
use kube::{api::DynamicObject, core::GroupVersionKind, Resource};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::{ensure, OptionExt, ResultExt};
use std::{fs, path::Path};

/// An input object in its JSON form.
///
/// Every handler input (a file, YAML or JSON bytes, a raw map, a typed or dynamic object)
/// is turned into a Manifest first, and decoded into the handler's type from there.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest(Value);

impl Manifest {
    /// Read a single-document YAML or JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).context(ReadingFile {
            filepath: path.to_path_buf(),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse single-document YAML or JSON bytes. JSON is parsed as a subset of YAML.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_yaml::from_slice(bytes).context(YamlParse)?;
        Self::from_value(value)
    }

    /// Read every document of a multi-document YAML file. Empty documents are skipped.
    pub fn all_from_file(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let path = path.as_ref();
        let bytes = fs::read(path).context(ReadingFile {
            filepath: path.to_path_buf(),
        })?;
        Self::all_from_bytes(&bytes)
    }

    /// Parse every document of a multi-document YAML input. Empty documents are skipped.
    pub fn all_from_bytes(bytes: &[u8]) -> Result<Vec<Self>> {
        let mut manifests = Vec::new();
        for document in serde_yaml::Deserializer::from_slice(bytes) {
            let value = Value::deserialize(document).context(YamlParse)?;
            if value.is_null() {
                continue;
            }
            manifests.push(Self::from_value(value)?);
        }
        Ok(manifests)
    }

    /// Wrap an unstructured object.
    pub fn from_raw(map: Map<String, Value>) -> Self {
        Self(Value::Object(map))
    }

    /// Serialize a typed object.
    pub fn from_object<T>(object: &T) -> Result<Self>
    where
        T: Resource<DynamicType = ()> + Serialize,
    {
        let value = serde_json::to_value(object).context(JsonSerialize {
            kind: T::kind(&()),
        })?;
        Self::from_value(value)
    }

    /// Serialize a dynamic object.
    pub fn from_dynamic(object: &DynamicObject) -> Result<Self> {
        let kind = object
            .types
            .as_ref()
            .map(|types| types.kind.clone())
            .unwrap_or_default();
        let value = serde_json::to_value(object).context(JsonSerialize { kind })?;
        Self::from_value(value)
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        ensure!(
            value.is_object(),
            NotAnObject {
                found: value_type(&value)
            }
        );
        Ok(Self(value))
    }

    fn str_at(&self, pointer: &str) -> Option<&str> {
        self.0
            .pointer(pointer)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn api_version(&self) -> Option<&str> {
        self.str_at("/apiVersion")
    }

    pub fn kind(&self) -> Option<&str> {
        self.str_at("/kind")
    }

    pub fn name(&self) -> Option<&str> {
        self.str_at("/metadata/name")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.str_at("/metadata/namespace")
    }

    /// The group/version/kind named by apiVersion and kind.
    pub fn gvk(&self) -> Result<GroupVersionKind> {
        let api_version = self.api_version().context(MissingTypeMeta)?;
        let kind = self.kind().context(MissingTypeMeta)?;
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        Ok(GroupVersionKind::gvk(group, version, kind))
    }

    /// Decode into a typed object, on behalf of `operation`.
    ///
    /// A manifest which names a different kind is rejected. A manifest without a kind is
    /// decoded as is.
    pub fn decode<K>(&self, operation: Operation) -> Result<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let expected = K::kind(&());
        if let Some(found) = self.kind() {
            ensure!(
                found == expected,
                KindMismatch {
                    operation,
                    expected: expected.to_string(),
                    found,
                }
            );
        }
        serde_json::from_value(self.0.clone()).context(DecodeObject {
            kind: expected.to_string(),
        })
    }

    /// Decode into a dynamic object.
    pub fn to_dynamic(&self) -> Result<DynamicObject> {
        serde_json::from_value(self.0.clone()).context(DecodeObject {
            kind: self.kind().unwrap_or_default(),
        })
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Map<String, Value>> for Manifest {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_raw(map)
    }
}

fn value_type(value: &Value) -> String {
    match value {
        Value::Null => "an empty document",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
    .to_string()
}
