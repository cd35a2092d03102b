use chrono::Utc;

use super::data::*;
use super::error::{ReconcileError, ReconcileResult};

/// In-memory list of todos, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoIndex {
    todos: Vec<Todo>,
}

impl TodoIndex {
    pub fn new() -> TodoIndex {
        TodoIndex::default()
    }

    pub fn from_todos(todos: Vec<Todo>) -> TodoIndex {
        TodoIndex { todos }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    pub fn count_in(&self, category_name: &str) -> usize {
        self.todos
            .iter()
            .filter(|todo| todo.category_name == category_name)
            .count()
    }

    pub fn add(&mut self, text: &str, category_name: &str) -> Todo {
        let now = Utc::now();
        let todo = Todo {
            id: new_id(),
            text: text.to_string(),
            category_name: category_name.to_string(),
            done: false,
            created_at: now,
            updated_at: now,
        };
        self.todos.push(todo.clone());

        todo
    }

    pub fn update(&mut self, id: &str, patch: &TodoPatch) -> ReconcileResult<Todo> {
        let todo = match self.todos.iter_mut().find(|todo| todo.id == id) {
            Some(todo) => todo,
            None => return Err(ReconcileError::todo_not_found(id)),
        };

        if let Some(text) = &patch.text {
            todo.text = text.clone();
        }
        if let Some(category_name) = &patch.category_name {
            todo.category_name = category_name.clone();
        }
        if let Some(done) = patch.done {
            todo.done = done;
        }
        todo.updated_at = Utc::now().max(todo.created_at);

        Ok(todo.clone())
    }

    pub fn remove(&mut self, id: &str) -> ReconcileResult<Todo> {
        match self.todos.iter().position(|todo| todo.id == id) {
            Some(position) => Ok(self.todos.remove(position)),
            None => Err(ReconcileError::todo_not_found(id)),
        }
    }

    /// Moves every todo filed under `old_name` to `new_name`, returning how
    /// many changed.
    pub fn relabel_all(&mut self, old_name: &str, new_name: &str) -> usize {
        if old_name == new_name {
            return 0;
        }

        let now = Utc::now();
        let mut relabelled = 0;
        for todo in self
            .todos
            .iter_mut()
            .filter(|todo| todo.category_name == old_name)
        {
            todo.category_name = new_name.to_string();
            todo.updated_at = now.max(todo.created_at);
            relabelled += 1;
        }

        relabelled
    }
}

#[cfg(test)]
pub(crate) fn todo(id: &str, category_name: &str) -> Todo {
    let now = Utc::now();
    Todo {
        id: id.to_string(),
        text: format!("todo {}", id),
        category_name: category_name.to_string(),
        done: false,
        created_at: now,
        updated_at: now,
    }
}
