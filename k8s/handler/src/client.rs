use crate::error::{InferConfig, K8sClientGeneration, KubeconfigLoad, KubeconfigRead, Result};
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use snafu::ResultExt;
use std::path::Path;
use tracing::debug;

/// Generate a new kube::Client.
///
/// With a kubeconfig path, the file is read and its current context (or `context`) is used.
/// Without one, the configuration is inferred: `KUBECONFIG`, then `$HOME/.kube/config`, then
/// the in-cluster service account. A context without a path selects that context from the
/// default kubeconfig.
pub async fn client(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Client> {
    let options = KubeConfigOptions {
        context: context.map(ToString::to_string),
        ..Default::default()
    };

    let config = match kubeconfig {
        Some(path) => {
            debug!(path = %path.display(), "Loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).context(KubeconfigRead { path })?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .context(KubeconfigLoad)?
        }
        None if context.is_some() => Config::from_kubeconfig(&options)
            .await
            .context(KubeconfigLoad)?,
        None => Config::infer().await.context(InferConfig)?,
    };

    Client::try_from(config).context(K8sClientGeneration)
}
