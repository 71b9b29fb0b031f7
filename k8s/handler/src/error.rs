use kube::{
    config::{InferConfigError, KubeconfigError},
    error::ErrorResponse,
};
use snafu::Snafu;
use std::{fmt, path::PathBuf, time::Duration};

/// The kind of operation a handler was performing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Apply,
    Delete,
    Get,
    List,
    Patch,
    Watch,
    Scale,
    WaitReady,
    Decode,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Apply => "apply",
            Self::Delete => "delete",
            Self::Get => "get",
            Self::List => "list",
            Self::Patch => "patch",
            Self::Watch => "watch",
            Self::Scale => "scale",
            Self::WaitReady => "wait for readiness of",
            Self::Decode => "decode",
        };
        f.write_str(op)
    }
}

/// For use with multiple fallible operations which may fail for different reasons, but are
/// defined within the same scope and must return to the outer scope (calling scope) using
/// the try operator -- '?'.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))]
pub enum Error {
    /// Error for when Kubernetes API client generation fails.
    #[snafu(display("Failed to generate kubernetes client: {}", source))]
    K8sClientGeneration { source: kube::Error },

    /// Error for when a kubeconfig file cannot be read or parsed.
    #[snafu(display("Failed to read kubeconfig at {}: {}", path.display(), source))]
    KubeconfigRead {
        source: KubeconfigError,
        path: PathBuf,
    },

    /// Error for when a parsed kubeconfig cannot be turned into a client configuration.
    #[snafu(display("Failed to load kubeconfig: {}", source))]
    KubeconfigLoad { source: KubeconfigError },

    /// Error for when neither a kubeconfig nor an in-cluster configuration is available.
    #[snafu(display("Failed to infer kubernetes client configuration: {}", source))]
    InferConfig { source: InferConfigError },

    /// Error when reading a manifest or patch file.
    #[snafu(display("Failed to read file {}: {}", filepath.display(), source))]
    ReadingFile {
        source: std::io::Error,
        filepath: PathBuf,
    },

    /// Error for when YAML (or JSON) input cannot be parsed.
    #[snafu(display("Failed to parse YAML input: {}", source))]
    YamlParse { source: serde_yaml::Error },

    /// Error for when the parsed input is not a JSON object.
    #[snafu(display("Input is not a Kubernetes object, found {}", found))]
    NotAnObject { found: String },

    /// Error for when an object cannot be serialized to JSON.
    #[snafu(display("Failed to serialize {} to JSON: {}", kind, source))]
    JsonSerialize {
        source: serde_json::Error,
        kind: String,
    },

    /// Error for when a manifest cannot be decoded into the typed object.
    #[snafu(display("Failed to decode {} from manifest: {}", kind, source))]
    DecodeObject {
        source: serde_json::Error,
        kind: String,
    },

    /// Error for when a manifest's kind doesn't match the handler's kind.
    #[snafu(display(
        "Failed to {} {}: input manifest is of kind {}",
        operation,
        expected,
        found
    ))]
    KindMismatch {
        operation: Operation,
        expected: String,
        found: String,
    },

    /// Error for when an object doesn't carry .metadata.name.
    #[snafu(display("Failed to {} {}: object has no .metadata.name", operation, kind))]
    MissingName { operation: Operation, kind: String },

    /// Error for when a manifest doesn't carry apiVersion and kind.
    #[snafu(display("Manifest is missing apiVersion or kind"))]
    MissingTypeMeta,

    /// Error for when a raw JSON patch body is not a list of RFC 6902 operations.
    #[snafu(display("Failed to parse JSON patch: {}", source))]
    JsonPatchParse { source: serde_json::Error },

    /// Error for when a request to the kube-apiserver fails.
    #[snafu(display(
        "Failed to {} {} '{}' (namespace: '{}'): {}",
        operation,
        kind,
        name,
        namespace,
        source
    ))]
    ApiRequest {
        source: kube::Error,
        operation: Operation,
        kind: String,
        name: String,
        namespace: String,
    },

    /// Error for when API discovery cannot resolve a group/version/kind.
    #[snafu(display("Failed to resolve API resource for {}/{}: {}", api_version, kind, source))]
    ResolveResource {
        source: kube::Error,
        api_version: String,
        kind: String,
    },

    /// Error for when an object doesn't become ready within the allotted time.
    #[snafu(display(
        "Timed out after {} waiting for {} '{}' to become ready",
        humantime::format_duration(*timeout),
        kind,
        name
    ))]
    WaitReadyTimeout {
        kind: String,
        name: String,
        timeout: Duration,
    },
}

impl Error {
    /// The operation that failed, for errors which are tied to one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::ApiRequest { operation, .. }
            | Self::KindMismatch { operation, .. }
            | Self::MissingName { operation, .. } => Some(*operation),
            Self::WaitReadyTimeout { .. } => Some(Operation::WaitReady),
            Self::DecodeObject { .. } => Some(Operation::Decode),
            _ => None,
        }
    }

    /// The kube-apiserver's error response, if this error carries one.
    pub fn api_response(&self) -> Option<&ErrorResponse> {
        match self {
            Self::ApiRequest {
                source: kube::Error::Api(response),
                ..
            }
            | Self::ResolveResource {
                source: kube::Error::Api(response),
                ..
            } => Some(response),
            _ => None,
        }
    }

    /// Ref: https://github.com/kubernetes/apimachinery/blob/v0.27.3/pkg/apis/meta/v1/types.go#L846
    fn has_reason(&self, reason: &str) -> bool {
        self.api_response()
            .map(|response| response.reason.eq(reason))
            .unwrap_or(false)
    }

    /// True if the kube-apiserver reported that the object doesn't exist.
    pub fn is_not_found(&self) -> bool {
        self.has_reason("NotFound")
    }

    /// True if the kube-apiserver rejected a create because the object exists.
    pub fn is_already_exists(&self) -> bool {
        self.has_reason("AlreadyExists")
    }

    /// True if the kube-apiserver rejected a write due to a resourceVersion conflict.
    pub fn is_conflict(&self) -> bool {
        self.has_reason("Conflict")
    }
}

/// Result type for all handler operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
