use super::init_rocket;
use diesel::r2d2::ConnectionManager;
use microblog_models::{
    db_conn::{DbPool, PragmaForeignKey},
    migrations,
    search::Searcher,
    users::{NewUser, User},
    Connection,
};
use rocket::{
    http::{ContentType, Status},
    local::{Client, LocalResponse},
};
use scheduled_thread_pool::ScheduledThreadPool;
use std::{sync::Arc, thread, time::Duration};

const PASSWORD: &str = "a_long_password";

#[cfg(feature = "sqlite")]
fn database_url() -> &'static str {
    ":memory:"
}

#[cfg(feature = "postgres")]
fn database_url() -> &'static str {
    microblog_models::CONFIG.database_url.as_str()
}

/// A server backed by a single pooled connection, so that every request and
/// every fixture sees the same database. On PostgreSQL nothing is committed.
fn server() -> (Client, DbPool) {
    let pool = DbPool::builder()
        .max_size(1)
        .connection_customizer(Box::new(PragmaForeignKey))
        .build(ConnectionManager::<Connection>::new(database_url()))
        .expect("Couldn't build the database pool");
    {
        let conn = pool.get().expect("Couldn't get a connection");
        migrations::run_pending_migrations(&*conn).expect("Couldn't run migrations");
        #[cfg(feature = "postgres")]
        {
            use diesel::Connection as _;
            conn.begin_test_transaction()
                .expect("Couldn't start the test transaction");
        }
    }
    let rocket = init_rocket(
        rocket::Config::development(),
        pool.clone(),
        Arc::new(Searcher::create_in_ram().expect("Couldn't create the search index")),
        Arc::new(ScheduledThreadPool::new(1)),
    );
    (Client::new(rocket).expect("valid rocket instance"), pool)
}

fn new_user(pool: &DbPool, name: &str) -> User {
    let conn = pool.get().expect("Couldn't get a connection");
    NewUser::new_local(
        &*conn,
        name.to_owned(),
        format!("{}@example.com", name),
        "",
        PASSWORD,
    )
    .expect("Couldn't create the user")
}

fn log_in(client: &Client, name: &str) {
    let response = client
        .post("/login")
        .header(ContentType::Form)
        .body(format!("username={}&password={}", name, PASSWORD))
        .dispatch();
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(location(&response).as_deref(), Some("/"));
}

fn location(response: &LocalResponse<'_>) -> Option<String> {
    response.headers().get_one("Location").map(String::from)
}

/// Loads the page a redirect points to, and returns its HTML.
fn follow_redirect(client: &Client, response: LocalResponse<'_>) -> String {
    assert_eq!(response.status(), Status::SeeOther);
    let target = location(&response).expect("redirect without a Location header");
    client.get(target).dispatch().body_string().unwrap_or_default()
}

#[test]
fn anonymous_visitors_are_sent_to_login() {
    let (client, _pool) = server();

    for protected in &["/", "/explore", "/search", "/edit_profile", "/follow/alice"] {
        let response = client.get(*protected).dispatch();
        assert_eq!(response.status(), Status::SeeOther, "{} is not protected", protected);
    }

    let response = client.get("/explore?page=2").dispatch();
    assert_eq!(
        location(&response).as_deref(),
        Some("/login?next=%2Fexplore%3Fpage%3D2")
    );
    let page = follow_redirect(&client, response);
    assert!(page.contains("Please log in to access this page."));
}

#[test]
fn requests_refresh_last_seen() {
    let (client, pool) = server();
    let alice = new_user(&pool, "alice");
    log_in(&client, "alice");

    thread::sleep(Duration::from_millis(10));
    assert_eq!(client.get("/explore").dispatch().status(), Status::Ok);

    let conn = pool.get().expect("Couldn't get a connection");
    let seen = User::get(&*conn, alice.id).unwrap().last_seen;
    assert!(seen > alice.last_seen);
}

#[test]
fn logged_in_users_skip_login_and_register() {
    let (client, pool) = server();
    new_user(&pool, "alice");
    log_in(&client, "alice");

    for page in &["/login", "/register"] {
        let response = client.get(*page).dispatch();
        assert_eq!(response.status(), Status::SeeOther);
        assert_eq!(location(&response).as_deref(), Some("/"));
    }
}

#[test]
fn follow_and_unfollow_notices() {
    let (client, pool) = server();
    new_user(&pool, "alice");
    new_user(&pool, "bob");
    log_in(&client, "alice");

    let cases = [
        ("/follow/nobody", "/", "User nobody not found"),
        ("/follow/alice", "/user/alice", "You cannot follow yourself!"),
        ("/follow/bob", "/user/bob", "You are following bob!"),
        ("/follow/bob", "/user/bob", "You are following bob!"),
        ("/unfollow/nobody", "/", "User nobody not found"),
        ("/unfollow/alice", "/user/alice", "You cannot unfollow yourself!"),
        ("/unfollow/bob", "/user/bob", "You are no longer following bob!"),
    ];
    for (uri, target, notice) in cases.iter() {
        let response = client.get(*uri).dispatch();
        assert_eq!(location(&response).as_deref(), Some(*target), "{}", uri);
        let page = follow_redirect(&client, response);
        assert!(page.contains(notice), "{} didn't show {:?}", uri, notice);
    }
}

/// Where a login with the given (already encoded) `next` ends up.
fn after_login(next: &str, password: &str) -> Option<String> {
    let (client, pool) = server();
    new_user(&pool, "alice");
    let response = client
        .post(format!("/login?next={}", next))
        .header(ContentType::Form)
        .body(format!("username=alice&password={}", password))
        .dispatch();
    location(&response)
}

#[test]
fn login_only_returns_to_local_pages() {
    assert_eq!(
        after_login("%2Fexplore%3Fpage%3D2", PASSWORD).as_deref(),
        Some("/explore?page=2")
    );
    assert_eq!(after_login("https%3A%2F%2Fevil.example%2F", PASSWORD).as_deref(), Some("/"));
    assert_eq!(after_login("%2F%2Fevil.example%2F", PASSWORD).as_deref(), Some("/"));
    assert_eq!(
        after_login("%2Fexplore", "not_the_password").as_deref(),
        Some("/login?next=%2Fexplore")
    );
}

#[test]
fn far_search_pages_are_empty() {
    let (client, pool) = server();
    new_user(&pool, "alice");
    log_in(&client, "alice");

    let mut response = client
        .get("/search_results/kitten?page=100000000")
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert!(response
        .body_string()
        .unwrap_or_default()
        .contains("No post matches your query."));
}
