// ABOUTME: Command implementations for the CLI subcommands
// ABOUTME: Exports the sync and list-tables handlers

pub mod sync;
pub mod tables;

pub use sync::{sync, SyncCommandOptions};
pub use tables::list_tables;

use crate::config::EndpointConfig;
use crate::error::{ReconcileError, Side};
use crate::store::MysqlStore;
use crate::utils::sanitize_url;
use anyhow::{anyhow, Result};

/// The endpoint's URI, or an error telling the operator where to set it.
pub(crate) fn require_uri(side: Side, endpoint: &EndpointConfig) -> Result<&str> {
    endpoint.uri.as_deref().ok_or_else(|| {
        anyhow!(
            "No {side} database URI given. Use --{side} or set `uri` under [{side}] in the config file."
        )
    })
}

pub(crate) async fn connect(side: Side, endpoint: &EndpointConfig) -> Result<MysqlStore> {
    let uri = require_uri(side, endpoint)?;
    tracing::info!("Connecting to {} database {}", side, sanitize_url(uri));
    let store = MysqlStore::connect(uri, &endpoint.credential())
        .await
        .map_err(|source| ReconcileError::Connection {
            side,
            uri: sanitize_url(uri),
            source,
        })?;
    Ok(store)
}

/// Close a connection at the end of a command. Failures here only get logged.
pub(crate) async fn close(side: Side, store: MysqlStore) {
    if let Err(e) = store.disconnect().await {
        tracing::warn!("Failed to close {} connection: {}", side, e);
    }
}
