//! Keyed collection store over a single SQLite table.
//!
//! Bodies are JSON documents; the store stamps `created_at` on the first write
//! of an id and `updated_at` on every write. Stamps are fixed-width RFC 3339
//! (nanoseconds, `Z`) so they also compare correctly as text.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::data::DBConnection;
use crate::internal_error::{InternalError, InternalResult};
use crate::todo::data::*;
use crate::todo::index::TodoIndex;
use crate::todo::reconciler::Board;
use crate::todo::registry::CategoryRegistry;
use crate::todo::sync::{Ack, Collection, Mutation, SyncError, SyncGateway, SyncResult};

pub const USERS: &str = "users";

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> InternalResult<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

pub fn create_tables(db_connection: &Connection) -> InternalResult<()> {
    db_connection.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        )",
        params![],
    )?;

    Ok(())
}

fn get_document_from_row(row: &Row) -> rusqlite::Result<(String, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn parse_time(value: &str) -> InternalResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| InternalError::Corrupt(format!("bad timestamp {:?}: {}", value, e)))
}

fn into_document((id, body, created_at, updated_at): (String, String, String, String)) -> InternalResult<Document> {
    Ok(Document {
        id,
        body: serde_json::from_str(&body)?,
        created_at: parse_time(&created_at)?,
        updated_at: parse_time(&updated_at)?,
    })
}

pub fn store_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn validate_sort_key(sort_key: &str) -> InternalResult<()> {
    let valid = !sort_key.is_empty()
        && sort_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(InternalError::from(SyncError::Validation(format!(
            "invalid sort key {:?}",
            sort_key
        ))))
    }
}

pub fn get_document(
    collection: &str,
    id: &str,
    db_connection: &Connection,
) -> InternalResult<Option<Document>> {
    let row = db_connection
        .query_row(
            "SELECT id, body, created_at, updated_at FROM documents WHERE collection = (?1) AND id = (?2)",
            params![collection, id],
            get_document_from_row,
        )
        .optional()?;

    row.map(into_document).transpose()
}

/// Lists a collection ordered by the body field `sort_key`, ties broken by id.
pub fn list_documents(
    collection: &str,
    sort_key: &str,
    db_connection: &Connection,
) -> InternalResult<Vec<Document>> {
    validate_sort_key(sort_key)?;

    let mut statement = db_connection.prepare(
        "SELECT id, body, created_at, updated_at FROM documents
         WHERE collection = (?1)
         ORDER BY json_extract(body, (?2)), id",
    )?;
    let rows = statement.query_map(params![collection, format!("$.{}", sort_key)], get_document_from_row)?;

    let mut documents = vec![];
    for row_result in rows {
        documents.push(into_document(row_result?)?);
    }

    Ok(documents)
}

/// Upserts a document and returns it with the store's timestamps.
pub fn set_document(
    collection: &str,
    id: &str,
    body: &impl Serialize,
    db_connection: &Connection,
) -> InternalResult<Document> {
    let body = serde_json::to_string(body)?;
    let now = store_time(Utc::now());

    db_connection.execute(
        "INSERT INTO documents (collection, id, body, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT (collection, id) DO UPDATE SET
            body = excluded.body,
            updated_at = max(excluded.updated_at, documents.created_at)",
        params![collection, id, body, now],
    )?;

    get_document(collection, id, db_connection)?
        .ok_or_else(|| InternalError::Corrupt(format!("document {}/{} vanished", collection, id)))
}

pub fn delete_document(collection: &str, id: &str, db_connection: &Connection) -> InternalResult<bool> {
    let deleted = db_connection.execute(
        "DELETE FROM documents WHERE collection = (?1) AND id = (?2)",
        params![collection, id],
    )?;

    Ok(deleted > 0)
}

fn document_to_todo(document: &Document) -> InternalResult<Todo> {
    let mut todo: Todo = document.decode()?;
    todo.created_at = document.created_at;
    todo.updated_at = document.updated_at;

    Ok(todo)
}

fn stored_categories(db_connection: &Connection) -> InternalResult<Vec<Category>> {
    list_documents(Collection::Categories.as_str(), "order", db_connection)?
        .iter()
        .map(Document::decode)
        .collect()
}

fn stored_todos(db_connection: &Connection) -> InternalResult<Vec<Todo>> {
    list_documents(Collection::Todos.as_str(), "id", db_connection)?
        .iter()
        .map(document_to_todo)
        .collect()
}

fn rejected(message: String) -> InternalError {
    InternalError::from(SyncError::Validation(message))
}

fn check_category_named(name: &str, db_connection: &Connection) -> InternalResult<()> {
    if stored_categories(db_connection)?
        .iter()
        .any(|category| category.name == name)
    {
        Ok(())
    } else {
        Err(rejected(format!("no stored category named {:?}", name)))
    }
}

fn check_name_unused(name: &str, except_id: &str, db_connection: &Connection) -> InternalResult<()> {
    if stored_categories(db_connection)?
        .iter()
        .any(|category| category.name == name && category.id != except_id)
    {
        Err(rejected(format!("stored category named {:?} already exists", name)))
    } else {
        Ok(())
    }
}

pub fn load_board(db_connection: &Connection) -> InternalResult<Board> {
    let categories = stored_categories(db_connection)?;
    let mut todos = stored_todos(db_connection)?;
    todos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    let registry = CategoryRegistry::from_categories(categories)?;
    Ok(Board::new(registry, TodoIndex::from_todos(todos))?)
}

/// Writes the default categories into a store that has none yet.
pub fn seed_categories(names: &[String], db_connection: &Connection) -> InternalResult<usize> {
    let collection = Collection::Categories.as_str();
    if !list_documents(collection, "order", db_connection)?.is_empty() {
        return Ok(0);
    }

    let mut registry = CategoryRegistry::new();
    for name in names {
        let category = registry.add_with_next_order(name)?;
        set_document(collection, &category.id, &category, db_connection)?;
    }

    Ok(registry.len())
}

fn update_category(
    id: &str,
    db_connection: &Connection,
    change: impl FnOnce(&mut Category),
) -> InternalResult<()> {
    let collection = Collection::Categories.as_str();
    let document = get_document(collection, id, db_connection)?.ok_or_else(|| {
        InternalError::from(SyncError::Validation(format!("no stored category {:?}", id)))
    })?;

    let mut category: Category = document.decode()?;
    change(&mut category);
    set_document(collection, id, &category, db_connection)?;

    Ok(())
}

pub fn apply_mutation(mutation: &Mutation, db_connection: &Connection) -> InternalResult<()> {
    let transaction = db_connection.unchecked_transaction()?;
    let categories = Collection::Categories.as_str();
    let todos = Collection::Todos.as_str();

    match mutation {
        Mutation::CreateCategory(category) => {
            check_name_unused(&category.name, &category.id, &transaction)?;
            set_document(categories, &category.id, category, &transaction)?;
        }
        Mutation::RenameCategory { id, old_name, new_name } => {
            check_name_unused(new_name, id, &transaction)?;
            update_category(id, &transaction, |category| category.name = new_name.clone())?;

            for mut todo in stored_todos(&transaction)? {
                if &todo.category_name == old_name {
                    todo.category_name = new_name.clone();
                    set_document(todos, &todo.id, &todo, &transaction)?;
                }
            }
        }
        Mutation::DeleteCategory { id } => {
            if let Some(document) = get_document(categories, id, &transaction)? {
                let category: Category = document.decode()?;
                let count = stored_todos(&transaction)?
                    .iter()
                    .filter(|todo| todo.category_name == category.name)
                    .count();
                if count > 0 {
                    return Err(rejected(format!(
                        "stored category {:?} is still referenced by {} todo(s)",
                        category.name, count
                    )));
                }
            }
            delete_document(categories, id, &transaction)?;
        }
        Mutation::ReorderCategories(orders) => {
            for category_order in orders {
                update_category(&category_order.id, &transaction, |category| {
                    category.order = category_order.order
                })?;
            }
        }
        Mutation::CreateTodo(todo) | Mutation::UpdateTodo(todo) => {
            check_category_named(&todo.category_name, &transaction)?;
            set_document(todos, &todo.id, todo, &transaction)?;
        }
        Mutation::DeleteTodo { id } => {
            delete_document(todos, id, &transaction)?;
        }
    }

    transaction.commit()?;
    Ok(())
}

/// Sync gateway that writes mutations straight into the SQLite store.
pub struct StoreGateway {
    db_connection: DBConnection,
}

impl StoreGateway {
    pub fn new(db_connection: DBConnection) -> StoreGateway {
        StoreGateway { db_connection }
    }
}

impl SyncGateway for StoreGateway {
    fn send(&self, mutation: &Mutation) -> SyncResult {
        let db_connection = self
            .db_connection
            .lock()
            .map_err(|e| SyncError::Server(e.to_string()))?;

        match apply_mutation(mutation, &db_connection) {
            Ok(()) => Ok(Ack::for_mutation(mutation)),
            Err(InternalError::Sync(e)) => Err(e),
            Err(e) => Err(SyncError::Server(e.to_string())),
        }
    }

    fn load_board(&self) -> Result<Board, SyncError> {
        let db_connection = self
            .db_connection
            .lock()
            .map_err(|e| SyncError::Server(e.to_string()))?;

        load_board(&db_connection).map_err(|e| SyncError::Server(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) fn memory_connection() -> Connection {
    let connection = Connection::open_in_memory().unwrap();
    create_tables(&connection).unwrap();
    connection
}
