use clap::{App, ArgMatches, SubCommand};

use microblog_models::{migrations, Connection};
use std::process::exit;
use tracing::{error, info};

pub fn command<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("migration")
        .about("Manage migrations")
        .subcommand(SubCommand::with_name("run").about("Run pending migrations"))
}

pub fn run<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    match args.subcommand() {
        ("run", Some(_)) => run_(conn),
        ("", None) => command().print_help().unwrap(),
        _ => println!("Unknown subcommand"),
    }
}

fn run_(conn: &Connection) {
    match migrations::run_pending_migrations_verbose(conn) {
        Ok(()) => info!("database is up to date"),
        Err(e) => {
            error!("failed to run migrations: {:?}", e);
            exit(1);
        }
    }
}
