//! Store initialisation command

use crate::config::CliConfig;
use tessera_store::{db, migrations};

pub fn execute(config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = db::open(&config.db_path)?;
    db::configure(&conn)?;
    migrations::apply_migrations(&mut conn)?;
    let applied = migrations::applied_migrations(&conn)?;

    println!("Store ready: {}", config.db_path.display());
    for migration_id in applied {
        println!("  {}", migration_id);
    }
    Ok(())
}
