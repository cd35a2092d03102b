use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TodoID = String;
pub type CategoryID = String;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryID,
    pub name: String,
    pub order: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    pub id: TodoID,
    pub text: String,
    pub category_name: String,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a todo. Fields left as `None` keep their current value.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub done: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CategoryOrder {
    pub id: CategoryID,
    pub order: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BoardSnapshot {
    pub categories: Vec<Category>,
    pub todos: Vec<Todo>,
}

#[derive(Deserialize, Debug)]
pub struct AddCategoryRequest {
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct RenameCategoryRequest {
    pub id: CategoryID,
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct DeleteCategoryRequest {
    pub id: CategoryID,
}

#[derive(Deserialize, Debug)]
pub struct ReorderCategoriesRequest {
    pub ids: Vec<CategoryID>,
}

#[derive(Deserialize, Debug)]
pub struct AddTodoRequest {
    pub text: String,
    pub category_name: String,
}

#[derive(Deserialize, Debug)]
pub struct UpdateTodoRequest {
    pub id: TodoID,
    pub patch: TodoPatch,
}

#[derive(Deserialize, Debug)]
pub struct DeleteTodoRequest {
    pub id: TodoID,
}

#[derive(Serialize, Debug)]
pub struct RenameCategoryResult {
    pub category: Category,
    pub relabelled: usize,
}
