use crate::{Connection, Error, Result};
use std::io;
use tracing::info;

#[cfg(feature = "postgres")]
embed_migrations!("../migrations/postgres");

#[cfg(feature = "sqlite")]
embed_migrations!("../migrations/sqlite");

/// Applies every embedded migration that was not run on this database yet.
pub fn run_pending_migrations(conn: &Connection) -> Result<()> {
    info!("Running pending migrations");
    embedded_migrations::run(conn).map_err(Error::from)
}

/// Same as `run_pending_migrations`, but reports each applied migration on stdout.
pub fn run_pending_migrations_verbose(conn: &Connection) -> Result<()> {
    embedded_migrations::run_with_output(conn, &mut io::stdout()).map_err(Error::from)
}
