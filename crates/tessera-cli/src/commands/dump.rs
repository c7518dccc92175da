//! Row dump command

use clap::Args;

use super::open_existing;
use crate::config::CliConfig;
use tessera_store::repo::codec::to_plain_json;

#[derive(Debug, Args)]
pub struct DumpArgs {
    /// Model name as stored
    pub model: String,

    /// Stop after this many rows
    #[arg(long)]
    pub limit: Option<usize>,
}

pub fn execute(config: &CliConfig, args: DumpArgs) -> Result<(), Box<dyn std::error::Error>> {
    let adapter = open_existing(config)?;
    let rows = adapter.dump_rows(&args.model)?;
    let limit = args.limit.unwrap_or(rows.len());

    for row in rows.into_iter().take(limit) {
        let object: serde_json::Map<String, serde_json::Value> = row
            .iter()
            .map(|(column, value)| (column.clone(), to_plain_json(value)))
            .collect();
        println!("{}", serde_json::Value::Object(object));
    }
    Ok(())
}
