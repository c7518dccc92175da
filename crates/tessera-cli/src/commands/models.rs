//! Model listing command

use super::open_existing;
use crate::config::CliConfig;

pub fn execute(config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let adapter = open_existing(config)?;
    let models = adapter.list_models()?;
    tracing::debug!(count = models.len(), "models listed");

    for summary in models {
        println!("{}\t{}", summary.model, summary.rows);
    }
    Ok(())
}
