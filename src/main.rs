use rusqlite::Connection;
use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::serde::json::{json, Value};
use rocket::{Build, Request, Rocket};
use tracing_subscriber::EnvFilter;

use std::error::Error;
use std::sync::{Arc, Mutex};

mod config;
mod data;
mod internal_error;
mod store;
mod todo;
mod users;

use config::AppConfig;
use data::DBConnection;
use internal_error::InternalResult;
use todo::reconciler::Board;
use todo::sync::SyncHandle;

#[macro_use]
extern crate rocket;

fn open_store(config: &AppConfig) -> InternalResult<(DBConnection, Board)> {
    let connection = Connection::open(&config.database)?;

    store::create_tables(&connection)?;
    let seeded = store::seed_categories(&config.default_categories, &connection)?;
    if seeded > 0 {
        tracing::info!(seeded, "seeded default categories");
    }
    let board = store::load_board(&connection)?;
    tracing::info!(
        database = %config.database,
        categories = board.registry().len(),
        todos = board.index().len(),
        "board loaded"
    );

    Ok((Arc::new(Mutex::new(connection)), board))
}

#[catch(401)]
fn unauthorized() -> Value {
    json!({ "error": "not authorized" })
}

#[catch(403)]
fn forbidden() -> Value {
    json!({ "error": "admin role required" })
}

#[catch(default)]
fn default_catcher(status: rocket::http::Status, _request: &Request) -> Value {
    json!({ "error": status.reason_lossy() })
}

fn build_rocket(figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(AdHoc::config::<AppConfig>())
        .attach(AdHoc::try_on_ignite("Board store", |rocket| async move {
            let config = match rocket.state::<AppConfig>() {
                Some(config) => config.clone(),
                None => return Err(rocket),
            };

            match open_store(&config) {
                Ok((db_connection, board)) => {
                    let sync = SyncHandle::spawn(store::StoreGateway::new(db_connection.clone()));
                    Ok(rocket
                        .manage(db_connection)
                        .manage(Arc::new(Mutex::new(board)))
                        .manage(sync))
                }
                Err(e) => {
                    tracing::error!(error = %e, database = %config.database, "could not open store");
                    Err(rocket)
                }
            }
        }))
        .mount(
            "/api",
            routes![
                todo::endpoints::get_board,
                todo::endpoints::add_category,
                todo::endpoints::rename_category,
                todo::endpoints::delete_category,
                todo::endpoints::reorder_categories,
                todo::endpoints::add_todo,
                todo::endpoints::update_todo,
                todo::endpoints::delete_todo,
                users::endpoints::get_users,
                users::endpoints::add_user,
                users::endpoints::update_user_role,
                users::endpoints::delete_user,
            ],
        )
        .register("/", catchers![unauthorized, forbidden, default_catcher])
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rplanner=info")),
        )
        .init();

    build_rocket(rocket::Config::figment()).launch().await?;

    Ok(())
}
