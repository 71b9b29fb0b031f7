/// Module for kube::Client generation.
pub mod client;
/// Module for handler related constants.
pub mod constants;
/// Create, update, apply, get, delete and list.
pub mod crud;
/// Module for handlers of arbitrary kinds, resolved through API discovery.
pub mod dynamic;
/// Module for handler errors.
pub mod error;
/// The generic per-kind handler and its builder.
pub mod handler;
/// Reflector-backed informers and listers.
pub mod informer;
/// Kind to resource name conversion.
pub mod kinds;
/// Module for input objects.
pub mod manifest;
/// Module for request options.
pub mod options;
/// Strategic merge, JSON merge and JSON patches.
pub mod patch;
/// Readiness of workloads and other objects.
pub mod ready;
/// Module for the resource descriptor trait.
pub mod resource;
/// Handler aliases for the built-in kinds.
pub mod resources;
/// Replica updates for workloads.
pub mod scale;
/// Getters for commonly displayed object fields.
pub mod tools;
/// Reconnecting watch loops.
pub mod watch;

#[cfg(test)]
pub(crate) mod test_utils;

pub use dynamic::DynamicHandler;
pub use error::{Error, Operation, Result};
pub use handler::{Handler, HandlerBuilder};
pub use informer::{EventHandlers, Informer, Lister};
pub use kinds::{kind_to_resource, resource_to_kind};
pub use manifest::Manifest;
pub use options::HandlerOptions;
pub use patch::{PatchSource, PatchType};
pub use ready::Readiness;
pub use resource::KubeResource;
pub use scale::Scalable;
pub use tools::Workload;
pub use watch::WatchCallbacks;
