//! Cross-collection updates of a board.
//!
//! Every todo refers to its category by name. A [`Board`] pairs the
//! [`CategoryRegistry`] with the [`TodoIndex`] so that, between calls, each
//! todo's `category_name` names exactly one live category. Operations that
//! touch both collections go through a [`Reconciler`]; they validate first and
//! then write both collections inside a single `&mut Board` borrow, so a
//! failed call leaves the board exactly as it was.
//!
//! Successful calls return the [`Mutation`] that should be forwarded to the
//! sync gateway.

use super::data::*;
use super::error::{ReconcileError, ReconcileResult};
use super::index::TodoIndex;
use super::registry::CategoryRegistry;
use super::sync::Mutation;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    registry: CategoryRegistry,
    index: TodoIndex,
}

impl Board {
    pub fn new(registry: CategoryRegistry, index: TodoIndex) -> ReconcileResult<Board> {
        if let Some(orphan) = index
            .todos()
            .iter()
            .find(|todo| !registry.contains_name(&todo.category_name))
        {
            return Err(ReconcileError::InvalidSet(format!(
                "todo {:?} references unknown category {:?}",
                orphan.id, orphan.category_name
            )));
        }

        Ok(Board { registry, index })
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn index(&self) -> &TodoIndex {
        &self.index
    }

    pub fn reconciler(&mut self) -> Reconciler<'_> {
        Reconciler { board: self }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            categories: self.registry.categories().to_vec(),
            todos: self.index.todos().to_vec(),
        }
    }

    pub fn add_category(&mut self, name: &str) -> ReconcileResult<(Category, Mutation)> {
        let category = self.registry.add_with_next_order(name)?;
        let mutation = Mutation::CreateCategory(category.clone());

        Ok((category, mutation))
    }

    pub fn add_todo(&mut self, text: &str, category_name: &str) -> ReconcileResult<(Todo, Mutation)> {
        self.check_category_exists(category_name)?;

        let todo = self.index.add(text, category_name);
        let mutation = Mutation::CreateTodo(todo.clone());

        Ok((todo, mutation))
    }

    pub fn update_todo(&mut self, id: &str, patch: &TodoPatch) -> ReconcileResult<(Todo, Mutation)> {
        if let Some(category_name) = &patch.category_name {
            self.check_category_exists(category_name)?;
        }

        let todo = self.index.update(id, patch)?;
        let mutation = Mutation::UpdateTodo(todo.clone());

        Ok((todo, mutation))
    }

    pub fn remove_todo(&mut self, id: &str) -> ReconcileResult<(Todo, Mutation)> {
        let todo = self.index.remove(id)?;
        let mutation = Mutation::DeleteTodo { id: todo.id.clone() };

        Ok((todo, mutation))
    }

    fn check_category_exists(&self, name: &str) -> ReconcileResult<()> {
        if self.registry.contains_name(name) {
            Ok(())
        } else {
            Err(ReconcileError::NotFound {
                kind: "category named",
                id: name.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub category: Category,
    pub old_name: String,
    pub relabelled: usize,
}

pub struct Reconciler<'a> {
    board: &'a mut Board,
}

impl<'a> Reconciler<'a> {
    pub fn rename_category(self, id: &str, new_name: &str) -> ReconcileResult<(Renamed, Mutation)> {
        let old_name = match self.board.registry.get(id) {
            Some(category) => category.name.clone(),
            None => return Err(ReconcileError::category_not_found(id)),
        };

        if let Some(other) = self.board.registry.find_by_name(new_name) {
            if other.id != id {
                return Err(ReconcileError::DuplicateName(new_name.to_string()));
            }
        }

        self.board.registry.rename(id, new_name)?;
        let relabelled = self.board.index.relabel_all(&old_name, new_name);

        tracing::debug!(id, %old_name, new_name, relabelled, "category renamed");

        let category = match self.board.registry.get(id) {
            Some(category) => category.clone(),
            None => return Err(ReconcileError::category_not_found(id)),
        };
        let mutation = Mutation::RenameCategory {
            id: id.to_string(),
            old_name: old_name.clone(),
            new_name: new_name.to_string(),
        };

        Ok((
            Renamed {
                category,
                old_name,
                relabelled,
            },
            mutation,
        ))
    }

    /// Deletes a category nothing refers to. A category that still has todos
    /// is rejected with `Conflict`.
    pub fn delete_category(self, id: &str) -> ReconcileResult<(Category, Mutation)> {
        let name = match self.board.registry.get(id) {
            Some(category) => category.name.clone(),
            None => return Err(ReconcileError::category_not_found(id)),
        };

        let count = self.board.index.count_in(&name);
        if count > 0 {
            return Err(ReconcileError::Conflict { name, count });
        }

        let category = self.board.registry.remove(id)?;
        let mutation = Mutation::DeleteCategory { id: category.id.clone() };

        Ok((category, mutation))
    }

    pub fn reorder_categories(self, ids: &[CategoryID]) -> ReconcileResult<Mutation> {
        let orders = self.board.registry.reorder(ids)?;

        Ok(Mutation::ReorderCategories(orders))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::index::todo;
    use crate::todo::registry::category;
    use proptest::prelude::*;

    fn sample() -> Board {
        Board::new(
            CategoryRegistry::from_categories(vec![category("1", "todo", 1), category("2", "done", 2)])
                .unwrap(),
            TodoIndex::from_todos(vec![todo("a", "todo"), todo("b", "todo")]),
        )
        .unwrap()
    }

    #[test]
    fn rename_relabels_every_todo() {
        let mut board = sample();
        let (renamed, mutation) = board
            .reconciler()
            .rename_category("1", "in-progress")
            .unwrap();

        assert_eq!(renamed.old_name, "todo");
        assert_eq!(renamed.relabelled, 2);
        assert_eq!(
            board.registry().categories(),
            &[category("1", "in-progress", 1), category("2", "done", 2)]
        );
        assert!(board
            .index()
            .todos()
            .iter()
            .all(|todo| todo.category_name == "in-progress"));
        assert_eq!(
            mutation,
            Mutation::RenameCategory {
                id: "1".to_string(),
                old_name: "todo".to_string(),
                new_name: "in-progress".to_string(),
            }
        );
    }

    #[test]
    fn rename_onto_existing_name_changes_nothing() {
        let mut board = sample();
        let before = board.clone();

        assert_eq!(
            board.reconciler().rename_category("1", "done"),
            Err(ReconcileError::DuplicateName("done".to_string()))
        );
        assert_eq!(board, before);
    }

    #[test]
    fn rename_unknown_category_is_not_found() {
        let mut board = sample();
        let before = board.clone();

        assert_eq!(
            board.reconciler().rename_category("9", "x"),
            Err(ReconcileError::category_not_found("9"))
        );
        assert_eq!(board, before);
    }

    #[test]
    fn rename_to_same_name_succeeds_without_relabel() {
        let mut board = sample();
        let (renamed, _) = board.reconciler().rename_category("1", "todo").unwrap();

        assert_eq!(renamed.relabelled, 0);
        assert_eq!(board.index().count_in("todo"), 2);
    }

    #[test]
    fn delete_referenced_category_conflicts() {
        let mut board = sample();
        let before = board.clone();

        assert_eq!(
            board.reconciler().delete_category("1"),
            Err(ReconcileError::Conflict {
                name: "todo".to_string(),
                count: 2
            })
        );
        assert_eq!(board, before);
    }

    #[test]
    fn delete_unreferenced_category() {
        let mut board = sample();
        let (removed, mutation) = board.reconciler().delete_category("2").unwrap();

        assert_eq!(removed, category("2", "done", 2));
        assert!(board.registry().get("2").is_none());
        assert_eq!(mutation, Mutation::DeleteCategory { id: "2".to_string() });
    }

    #[test]
    fn reorder_leaves_todos_alone() {
        let mut board = sample();
        let todos_before = board.index().clone();

        board
            .reconciler()
            .reorder_categories(&["2".to_string(), "1".to_string()])
            .unwrap();

        assert_eq!(board.registry().categories()[0].name, "done");
        assert_eq!(board.index(), &todos_before);
    }

    #[test]
    fn todos_must_name_a_live_category() {
        let mut board = sample();

        assert!(board.add_todo("x", "missing").is_err());
        assert!(board
            .update_todo(
                "a",
                &TodoPatch {
                    category_name: Some("missing".to_string()),
                    ..TodoPatch::default()
                }
            )
            .is_err());
        assert_eq!(board.index().get("a").unwrap().category_name, "todo");

        let (added, _) = board.add_todo("x", "done").unwrap();
        assert_eq!(board.index().get(&added.id), Some(&added));
    }

    #[test]
    fn new_rejects_orphaned_todos() {
        let registry = CategoryRegistry::from_categories(vec![category("1", "todo", 1)]).unwrap();
        let index = TodoIndex::from_todos(vec![todo("a", "gone")]);

        assert!(matches!(Board::new(registry, index), Err(ReconcileError::InvalidSet(_))));
    }

    proptest! {
        #[test]
        fn rename_moves_exactly_the_old_names_todos(
            labels in prop::collection::vec(0usize..3, 0..20),
            target in 0usize..3,
            new_name in "[a-e]{1,3}",
        ) {
            let names = ["todo", "doing", "done"];
            let registry = CategoryRegistry::from_categories(
                names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| category(&i.to_string(), name, i as i64))
                    .collect(),
            )
            .unwrap();
            let index = TodoIndex::from_todos(
                labels
                    .iter()
                    .enumerate()
                    .map(|(i, label)| todo(&i.to_string(), names[*label]))
                    .collect(),
            );
            let mut board = Board::new(registry, index).unwrap();
            let before = board.clone();
            let old_name = names[target];

            match board.reconciler().rename_category(&target.to_string(), &new_name) {
                Ok(_) => {
                    for (old, new) in before.index().todos().iter().zip(board.index().todos()) {
                        if old.category_name == old_name {
                            prop_assert_eq!(&new.category_name, &new_name);
                        } else {
                            prop_assert_eq!(&new.category_name, &old.category_name);
                        }
                    }
                }
                Err(_) => {
                    prop_assert_eq!(&board, &before);
                }
            }
        }
    }
}
