// ABOUTME: sync command - reconciles the selected tables from source into target
// ABOUTME: Connects both sides, runs the driver, reports run totals

use anyhow::{Context, Result};

use super::{close, connect, require_uri};
use crate::config::{EndpointConfig, SyncOptions};
use crate::error::Side;
use crate::reconcile::{Reconciler, RunStats};
use crate::tables::TableSelection;
use crate::utils::validate_source_target_different;

pub struct SyncCommandOptions {
    pub source: EndpointConfig,
    pub target: EndpointConfig,
    pub options: SyncOptions,
    /// Print the run totals as JSON on stdout.
    pub json: bool,
}

pub async fn sync(opts: SyncCommandOptions) -> Result<()> {
    let source_uri = require_uri(Side::Source, &opts.source)?;
    let target_uri = require_uri(Side::Target, &opts.target)?;
    validate_source_target_different(source_uri, target_uri)
        .context("Refusing to reconcile a database with itself")?;

    let options = &opts.options;
    if !options.apply {
        tracing::info!("Dry run: changes are counted but not written");
    }

    // Both connections must exist before any table is touched.
    let mut source = connect(Side::Source, &opts.source).await?;
    let mut target = match connect(Side::Target, &opts.target).await {
        Ok(target) => target,
        Err(e) => {
            close(Side::Source, source).await;
            return Err(e);
        }
    };

    let selection = TableSelection::new(options.tables.clone(), options.skip_tables.clone());
    let outcome = match selection.resolve(&mut source).await {
        Ok(tables) => {
            tracing::info!("Reconciling {} table(s)", tables.len());
            Reconciler::new(&mut source, &mut target, options)
                .run(&tables)
                .await
        }
        Err(e) => Err(e),
    };

    // Closing the source also drops any READ lock still held on it.
    close(Side::Source, source).await;
    close(Side::Target, target).await;

    let stats = outcome?;
    report(&stats, options.apply, opts.json)
}

fn report(stats: &RunStats, live: bool, json: bool) -> Result<()> {
    tracing::info!(
        "{}Run finished in {}ms: tables={} abandoned={} scanned={} skipped={} added={} updated={} updated_source={} deleted={} dropped={}",
        if live { "" } else { "(dry run) " },
        stats.duration_ms,
        stats.tables_processed,
        stats.tables_abandoned,
        stats.scanned,
        stats.skipped,
        stats.added,
        stats.updated,
        stats.updated_source,
        stats.deleted,
        stats.dropped
    );
    if stats.dropped > 0 {
        tracing::warn!(
            "{} row(s) had no usable key and were left out of the comparison",
            stats.dropped
        );
    }
    if !stats.is_clean() {
        tracing::warn!(
            "Run finished with {} warning(s) and {} error(s)",
            stats.warnings,
            stats.errors
        );
    }

    if json {
        let rendered =
            serde_json::to_string_pretty(stats).context("Failed to serialize run summary")?;
        println!("{}", rendered);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sync_requires_source_uri() {
        let opts = SyncCommandOptions {
            source: EndpointConfig::default(),
            target: EndpointConfig {
                uri: Some("mysql://user@target-host/db".to_string()),
                ..EndpointConfig::default()
            },
            options: SyncOptions::default(),
            json: false,
        };
        let err = sync(opts).await.unwrap_err();
        assert!(err.to_string().contains("No source database URI"));
    }

    #[tokio::test]
    async fn test_sync_refuses_same_database() {
        let uri = "mysql://user@db-host:3306/app".to_string();
        let opts = SyncCommandOptions {
            source: EndpointConfig {
                uri: Some(uri.clone()),
                ..EndpointConfig::default()
            },
            target: EndpointConfig {
                uri: Some(uri),
                ..EndpointConfig::default()
            },
            options: SyncOptions::default(),
            json: false,
        };
        let err = sync(opts).await.unwrap_err();
        assert!(err.to_string().contains("Refusing"));
    }

    #[test]
    fn test_report_json_ok() {
        let stats = RunStats::default();
        assert!(report(&stats, true, true).is_ok());
    }
}
