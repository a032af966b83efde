#![allow(clippy::too_many_arguments)]
#![feature(decl_macro, proc_macro_hygiene)]

#[macro_use]
extern crate rocket;
#[macro_use]
extern crate shrinkwraprs;

use clap::App;
use microblog_models::{
    db_conn::{init_pool, DbPool},
    migrations,
    search::{Searcher, SearcherError},
    Error, CONFIG,
};
use scheduled_thread_pool::ScheduledThreadPool;
use std::process::exit;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

include!(concat!(env!("OUT_DIR"), "/templates.rs"));

#[macro_use]
mod template_utils;
mod routes;
mod utils;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}

fn open_searcher(pool: &DbPool) -> Arc<Searcher> {
    let conn = pool
        .get()
        .expect("Couldn't get a database connection to open the search index");
    match Searcher::open_or_recreate(&CONFIG.search_index, &*conn) {
        Ok(searcher) => Arc::new(searcher),
        Err(Error::Search(e)) => match e {
            SearcherError::WriteLockAcquisitionError => panic!(
                r#"
Your search index is locked. Microblog can't start.
If no other instance is using it, run:

    mbl search unlock

Then try to restart Microblog.
"#
            ),
            SearcherError::IndexOpeningError => panic!(
                r#"
The search index could not be opened, and its directory isn't empty.
You can create a fresh one with:

    mbl search init -f

Then try to restart Microblog.
"#
            ),
            e => panic!("Unexpected error while opening the search index: {:?}", e),
        },
        Err(e) => panic!("Couldn't open the search index: {:?}", e),
    }
}

fn main() {
    App::new("Microblog")
        .bin_name("microblog")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A small social microblogging server")
        .after_help(
            r#"
The database and the search index are set up on first start.
Use the `mbl` command to create users or rebuild the search index.
"#,
        )
        .get_matches();

    match dotenv::dotenv() {
        Ok(path) => eprintln!("Configuration read from {}", path.display()),
        Err(ref e) if e.not_found() => eprintln!("no .env was found"),
        e => e.map(|_| ()).unwrap(),
    }
    init_logging();

    let dbpool = init_pool().expect("main: database pool initialization error");
    {
        let conn = dbpool
            .get()
            .expect("main: couldn't get a connection to run the migrations");
        if let Err(e) = migrations::run_pending_migrations(&*conn) {
            error!("couldn't run the database migrations: {:?}", e);
            exit(1);
        }
    }
    info!("database is ready");
    info!("starting Microblog on {}", CONFIG.base_url);

    let searcher = open_searcher(&dbpool);
    let workpool = Arc::new(ScheduledThreadPool::new(4));

    let commiter = searcher.clone();
    workpool.execute_with_fixed_delay(
        std::time::Duration::from_secs(5),
        std::time::Duration::from_secs(60 * 30),
        move || {
            if let Err(e) = commiter.commit() {
                warn!("periodic search index commit failed: {:?}", e);
            }
        },
    );

    let search_unlocker = searcher.clone();
    ctrlc::set_handler(move || {
        info!("shutting down, committing the search index");
        if let Err(e) = search_unlocker.commit() {
            error!("couldn't commit the search index: {:?}", e);
        }
        search_unlocker.drop_writer();
        exit(0);
    })
    .expect("Error setting Ctrl-c handler");

    let rocket_config = match CONFIG.rocket.clone() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid Rocket configuration: {:?}", e);
            eprintln!("Please check your ROCKET_* variables and FORM_SIZE, then restart Microblog.");
            exit(1);
        }
    };

    init_rocket(rocket_config, dbpool, searcher, workpool).launch();
}

fn init_rocket(
    config: rocket::Config,
    dbpool: DbPool,
    searcher: Arc<Searcher>,
    workpool: Arc<ScheduledThreadPool>,
) -> rocket::Rocket {
    rocket::custom(config)
        .mount(
            "/",
            routes![
                routes::posts::index,
                routes::posts::index_alias,
                routes::posts::create,
                routes::posts::create_alias,
                routes::posts::explore,
                routes::session::new,
                routes::session::create,
                routes::session::delete,
                routes::user::register,
                routes::user::create,
                routes::user::details,
                routes::user::followers,
                routes::user::following,
                routes::user::edit_profile,
                routes::user::update_profile,
                routes::user::follow,
                routes::user::unfollow,
                routes::search::index,
                routes::search::query,
                routes::search::results,
                routes::static_files,
            ],
        )
        .register(catchers![
            routes::errors::unauthorized,
            routes::errors::not_found,
            routes::errors::unprocessable_entity,
            routes::errors::server_error,
        ])
        .manage(dbpool)
        .manage(workpool)
        .manage(searcher)
}

#[cfg(test)]
mod tests;
