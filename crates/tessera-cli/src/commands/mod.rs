pub mod dump;
pub mod init;
pub mod models;

use crate::config::CliConfig;
use tessera_store::SqliteAdapter;

/// Open an existing store; read commands never create one
fn open_existing(config: &CliConfig) -> Result<SqliteAdapter, Box<dyn std::error::Error>> {
    if !config.db_path.exists() {
        return Err(format!(
            "no store at {}; run `tessera init` first",
            config.db_path.display()
        )
        .into());
    }
    Ok(SqliteAdapter::open(&config.db_path)?)
}
