use clap::{App, Arg, ArgMatches, SubCommand};

use microblog_models::{search::Searcher, Connection, CONFIG};
use std::fs::{read_dir, remove_file};
use std::io::ErrorKind;
use std::path::Path;
use std::process::exit;
use tracing::{error, info};

pub fn command<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("search")
        .about("Manage search index")
        .subcommand(
            SubCommand::with_name("init")
                .arg(
                    Arg::with_name("path")
                        .short("p")
                        .long("path")
                        .takes_value(true)
                        .required(false)
                        .help("Path to Microblog's working directory"),
                )
                .arg(
                    Arg::with_name("force")
                        .short("f")
                        .long("force")
                        .help("Ignore already using directory"),
                )
                .about("Initialize Microblog's internal search engine"),
        )
        .subcommand(
            SubCommand::with_name("refill")
                .arg(
                    Arg::with_name("path")
                        .short("p")
                        .long("path")
                        .takes_value(true)
                        .required(false)
                        .help("Path to Microblog's working directory"),
                )
                .about("Regenerate Microblog's search index"),
        )
        .subcommand(
            SubCommand::with_name("unlock")
                .arg(
                    Arg::with_name("path")
                        .short("p")
                        .long("path")
                        .takes_value(true)
                        .required(false)
                        .help("Path to Microblog's working directory"),
                )
                .about("Release lock on search directory"),
        )
}

pub fn run<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    match args.subcommand() {
        ("init", Some(x)) => init(x, conn),
        ("refill", Some(x)) => refill(x, conn, None),
        ("unlock", Some(x)) => unlock(x),
        ("", None) => command().print_help().unwrap(),
        _ => println!("Unknown subcommand"),
    }
}

fn index_path<'a>(args: &ArgMatches<'a>) -> std::path::PathBuf {
    let path = args.value_of("path").unwrap_or(".");
    Path::new(path).join(&CONFIG.search_index)
}

fn init<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    let force = args.is_present("force");
    let path = index_path(args);

    let can_do = match read_dir(&path) {
        // try to read the directory specified
        Ok(mut contents) => contents.next().is_none(),
        Err(e) => {
            if e.kind() == ErrorKind::NotFound {
                true
            } else {
                panic!("Error while initialising search index : {}", e);
            }
        }
    };
    if can_do || force {
        match Searcher::create(&path) {
            Ok(searcher) => refill(args, conn, Some(searcher)),
            Err(e) => {
                error!("couldn't create the search index in {}: {:?}", path.display(), e);
                exit(1);
            }
        }
    } else {
        error!(
            "can't create a new index, {} exists and is not empty",
            path.display()
        );
        exit(1);
    }
}

fn refill<'a>(args: &ArgMatches<'a>, conn: &Connection, searcher: Option<Searcher>) {
    let path = index_path(args);
    let searcher = match searcher.map(Ok).unwrap_or_else(|| Searcher::open(&path)) {
        Ok(searcher) => searcher,
        Err(e) => {
            error!("couldn't open the search index in {}: {:?}", path.display(), e);
            exit(1);
        }
    };

    info!("importing posts");
    if let Err(e) = searcher.fill(conn) {
        error!("couldn't import posts: {:?}", e);
        exit(1);
    }
    info!("committing the search index");
    if let Err(e) = searcher.commit() {
        error!("couldn't commit the search index: {:?}", e);
        exit(1);
    }
    searcher.drop_writer();
}

fn unlock<'a>(args: &ArgMatches<'a>) {
    let path = index_path(args).join(".tantivy-writer.lock");

    match remove_file(&path) {
        Ok(_) => info!("removed {}", path.display()),
        Err(ref e) if e.kind() == ErrorKind::NotFound => info!("search index is not locked"),
        Err(e) => {
            error!("couldn't remove {}: {}", path.display(), e);
            exit(1);
        }
    }
}
