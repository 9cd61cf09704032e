// ABOUTME: list-tables command - shows which tables a sync would visit
// ABOUTME: Connects to the source only and never reads or writes row data

use anyhow::Result;

use super::{close, connect};
use crate::config::EndpointConfig;
use crate::error::Side;
use crate::tables::TableSelection;

pub async fn list_tables(source: &EndpointConfig, selection: &TableSelection) -> Result<()> {
    let mut store = connect(Side::Source, source).await?;
    let resolved = selection.resolve(&mut store).await;
    close(Side::Source, store).await;

    let tables = resolved?;
    if tables.is_empty() {
        tracing::warn!("No tables selected");
    }
    for table in tables {
        println!("{}", table);
    }
    Ok(())
}
