use clap::{App, Arg, ArgMatches, SubCommand};

use microblog_models::{users::*, Connection, Error};
use std::{
    io::{self, Write},
    process::exit,
};
use tracing::{error, info};

pub fn command<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("users")
        .about("Manage users")
        .subcommand(
            SubCommand::with_name("new")
                .arg(
                    Arg::with_name("name")
                        .short("n")
                        .long("name")
                        .alias("username")
                        .takes_value(true)
                        .help("The username of the new user"),
                )
                .arg(
                    Arg::with_name("biography")
                        .short("b")
                        .long("bio")
                        .alias("biography")
                        .takes_value(true)
                        .help("The biography of the new user"),
                )
                .arg(
                    Arg::with_name("email")
                        .short("e")
                        .long("email")
                        .takes_value(true)
                        .help("Email address of the new user"),
                )
                .arg(
                    Arg::with_name("password")
                        .short("p")
                        .long("password")
                        .takes_value(true)
                        .help("The password of the new user"),
                )
                .about("Create a new user"),
        )
        .subcommand(
            SubCommand::with_name("reset-password")
                .arg(
                    Arg::with_name("name")
                        .short("u")
                        .long("user")
                        .alias("username")
                        .takes_value(true)
                        .help("The username of the user to reset password to"),
                )
                .arg(
                    Arg::with_name("password")
                        .short("p")
                        .long("password")
                        .takes_value(true)
                        .help("The password new for the user"),
                )
                .about("Reset user password"),
        )
}

pub fn run<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    match args.subcommand() {
        ("new", Some(x)) => new(x, conn),
        ("reset-password", Some(x)) => reset_password(x, conn),
        ("", None) => command().print_help().unwrap(),
        _ => println!("Unknown subcommand"),
    }
}

fn read_password() -> String {
    print!("Password: ");
    io::stdout().flush().expect("Couldn't flush STDOUT");
    rpassword::read_password().expect("Couldn't read your password.")
}

fn new<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    let username = args
        .value_of("name")
        .map(String::from)
        .unwrap_or_else(|| super::ask_for("Username"));
    let bio = args.value_of("biography").unwrap_or("");
    let email = args
        .value_of("email")
        .map(String::from)
        .unwrap_or_else(|| super::ask_for("Email address"));
    let password = args
        .value_of("password")
        .map(String::from)
        .unwrap_or_else(read_password);

    match NewUser::new_local(conn, username.clone(), email, bio, &password) {
        Ok(user) => info!("user {} created", user.username),
        Err(Error::UserAlreadyExists) => {
            error!("the username or the email of {} is already taken", username);
            exit(1);
        }
        Err(e) => {
            error!("couldn't save new user {}: {:?}", username, e);
            exit(1);
        }
    }
}

fn reset_password<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    let username = args
        .value_of("name")
        .map(String::from)
        .unwrap_or_else(|| super::ask_for("Username"));
    let user = match User::find_by_name(conn, &username) {
        Ok(user) => user,
        Err(e) => {
            error!("couldn't find user {}: {:?}", username, e);
            exit(1);
        }
    };
    let password = args
        .value_of("password")
        .map(String::from)
        .unwrap_or_else(read_password);
    if let Err(e) = user.reset_password(conn, &password) {
        error!("couldn't reset the password of {}: {:?}", user.username, e);
        exit(1);
    }
    info!("password of {} updated", user.username);
}
