use clap::App;
use diesel::Connection;
use microblog_models::{Connection as Conn, CONFIG};
use std::io::{self, prelude::*};
use tracing_subscriber::{fmt, EnvFilter};

mod migration;
mod search;
mod users;

fn main() {
    let mut app = App::new("Microblog CLI")
        .bin_name("mbl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Collection of tools to manage your Microblog server.")
        .subcommand(migration::command())
        .subcommand(search::command())
        .subcommand(users::command());
    let matches = app.clone().get_matches();

    match dotenv::dotenv() {
        Ok(path) => println!("Configuration read from {}", path.display()),
        Err(ref e) if e.not_found() => eprintln!("no .env was found"),
        e => e.map(|_| ()).unwrap(),
    }
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let conn = Conn::establish(CONFIG.database_url.as_str());

    match matches.subcommand() {
        ("migration", Some(args)) => {
            migration::run(args, &conn.expect("Couldn't connect to the database."))
        }
        ("search", Some(args)) => {
            search::run(args, &conn.expect("Couldn't connect to the database."))
        }
        ("users", Some(args)) => {
            users::run(args, &conn.expect("Couldn't connect to the database."))
        }
        _ => app.print_help().expect("Couldn't print help"),
    };
}

pub fn ask_for(something: &str) -> String {
    print!("{}: ", something);
    io::stdout().flush().expect("Couldn't flush STDOUT");
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .expect("Unable to read line");
    input.retain(|c| c != '\n' && c != '\r');
    input
}
