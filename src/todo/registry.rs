use std::collections::HashSet;

use super::data::*;
use super::error::{ReconcileError, ReconcileResult};

/// In-memory list of the categories on a board, kept sorted by `order`.
///
/// Names are unique (case-sensitive) and so are orders. The registry never
/// looks at todos; cross-collection updates go through the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
}

impl CategoryRegistry {
    pub fn new() -> CategoryRegistry {
        CategoryRegistry::default()
    }

    pub fn from_categories(categories: Vec<Category>) -> ReconcileResult<CategoryRegistry> {
        let mut registry = CategoryRegistry::new();

        for category in categories {
            if registry.get(&category.id).is_some() {
                return Err(ReconcileError::InvalidSet(format!(
                    "category id {:?} appears twice",
                    category.id
                )));
            }
            registry.check_name_free(&category.name, None)?;
            registry.check_order_free(category.order)?;
            registry.categories.push(category);
        }

        registry.sort();
        Ok(registry)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.name == name)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    pub fn next_order(&self) -> i64 {
        self.categories
            .iter()
            .map(|category| category.order)
            .max()
            .map_or(1, |order| order + 1)
    }

    pub fn add(&mut self, name: &str, order: i64) -> ReconcileResult<Category> {
        self.check_name_free(name, None)?;
        self.check_order_free(order)?;

        let category = Category {
            id: new_id(),
            name: name.to_string(),
            order,
        };
        self.categories.push(category.clone());
        self.sort();

        Ok(category)
    }

    pub fn add_with_next_order(&mut self, name: &str) -> ReconcileResult<Category> {
        let order = self.next_order();
        self.add(name, order)
    }

    /// Renames a category in place. Renaming to the current name succeeds
    /// without changing anything.
    pub fn rename(&mut self, id: &str, new_name: &str) -> ReconcileResult<()> {
        let current_name = match self.get(id) {
            Some(category) => category.name.clone(),
            None => return Err(ReconcileError::category_not_found(id)),
        };

        if current_name == new_name {
            return Ok(());
        }
        self.check_name_free(new_name, Some(id))?;

        if let Some(category) = self.categories.iter_mut().find(|c| c.id == id) {
            category.name = new_name.to_string();
        }

        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> ReconcileResult<Category> {
        match self.categories.iter().position(|category| category.id == id) {
            Some(position) => Ok(self.categories.remove(position)),
            None => Err(ReconcileError::category_not_found(id)),
        }
    }

    /// Reassigns orders `1..=n` following `ids`, which must be a permutation of
    /// exactly the live id set.
    pub fn reorder(&mut self, ids: &[CategoryID]) -> ReconcileResult<Vec<CategoryOrder>> {
        if ids.len() != self.categories.len() {
            return Err(ReconcileError::InvalidSet(format!(
                "expected {} ids, got {}",
                self.categories.len(),
                ids.len()
            )));
        }

        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id.as_str()) {
                return Err(ReconcileError::InvalidSet(format!("id {:?} repeated", id)));
            }
            if self.get(id).is_none() {
                return Err(ReconcileError::InvalidSet(format!("unknown id {:?}", id)));
            }
        }

        let orders: Vec<CategoryOrder> = ids
            .iter()
            .enumerate()
            .map(|(position, id)| CategoryOrder {
                id: id.clone(),
                order: position as i64 + 1,
            })
            .collect();

        for category_order in orders.iter() {
            if let Some(category) = self
                .categories
                .iter_mut()
                .find(|category| category.id == category_order.id)
            {
                category.order = category_order.order;
            }
        }
        self.sort();

        Ok(orders)
    }

    fn check_name_free(&self, name: &str, except_id: Option<&str>) -> ReconcileResult<()> {
        let taken = self
            .categories
            .iter()
            .any(|category| category.name == name && Some(category.id.as_str()) != except_id);

        if taken {
            Err(ReconcileError::DuplicateName(name.to_string()))
        } else {
            Ok(())
        }
    }

    fn check_order_free(&self, order: i64) -> ReconcileResult<()> {
        if self.categories.iter().any(|category| category.order == order) {
            Err(ReconcileError::InvalidSet(format!("order {} already taken", order)))
        } else {
            Ok(())
        }
    }

    fn sort(&mut self) {
        self.categories.sort_by_key(|category| category.order);
    }
}

#[cfg(test)]
pub(crate) fn category(id: &str, name: &str, order: i64) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> CategoryRegistry {
        CategoryRegistry::from_categories(vec![category("1", "todo", 1), category("2", "done", 2)])
            .unwrap()
    }

    fn assert_names_unique(registry: &CategoryRegistry) {
        let names: HashSet<&str> = registry
            .categories()
            .iter()
            .map(|category| category.name.as_str())
            .collect();
        assert_eq!(names.len(), registry.len());
    }

    #[test]
    fn add_rejects_duplicate_name() {
        let mut registry = sample();
        let before = registry.clone();

        assert_eq!(
            registry.add("done", 3),
            Err(ReconcileError::DuplicateName("done".to_string()))
        );
        assert_eq!(registry, before);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut registry = sample();
        let added = registry.add("Done", 3).unwrap();

        assert_eq!(registry.find_by_name("Done"), Some(&added));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn add_rejects_tied_order() {
        let mut registry = sample();
        assert!(matches!(registry.add("later", 2), Err(ReconcileError::InvalidSet(_))));
    }

    #[test]
    fn add_with_next_order_appends() {
        let mut registry = sample();
        let added = registry.add_with_next_order("later").unwrap();

        assert_eq!(added.order, 3);
        assert_eq!(registry.categories().last(), Some(&added));
    }

    #[test]
    fn rename_to_own_name_is_noop() {
        let mut registry = sample();
        let before = registry.clone();

        assert_eq!(registry.rename("1", "todo"), Ok(()));
        assert_eq!(registry, before);
    }

    #[test]
    fn rename_rejects_taken_name() {
        let mut registry = sample();
        assert_eq!(
            registry.rename("1", "done"),
            Err(ReconcileError::DuplicateName("done".to_string()))
        );
        assert_eq!(registry.get("1").unwrap().name, "todo");
    }

    #[test]
    fn rename_keeps_id_and_order() {
        let mut registry = sample();
        registry.rename("1", "in-progress").unwrap();

        assert_eq!(registry.get("1"), Some(&category("1", "in-progress", 1)));
    }

    #[test]
    fn remove_unknown_id_is_not_found() {
        let mut registry = sample();
        assert_eq!(
            registry.remove("9"),
            Err(ReconcileError::category_not_found("9"))
        );
    }

    #[test]
    fn reorder_assigns_sequential_orders() {
        let mut registry = sample();
        registry
            .reorder(&["2".to_string(), "1".to_string()])
            .unwrap();

        assert_eq!(
            registry.categories(),
            &[category("2", "done", 1), category("1", "todo", 2)]
        );
    }

    #[test]
    fn reorder_rejects_non_permutations() {
        let mut registry = sample();
        let before = registry.clone();

        for ids in [
            vec!["1".to_string()],
            vec!["1".to_string(), "1".to_string()],
            vec!["1".to_string(), "3".to_string()],
            vec!["1".to_string(), "2".to_string(), "3".to_string()],
        ] {
            assert!(matches!(registry.reorder(&ids), Err(ReconcileError::InvalidSet(_))));
            assert_eq!(registry, before);
        }
    }

    #[test]
    fn from_categories_rejects_duplicates() {
        assert!(matches!(
            CategoryRegistry::from_categories(vec![category("1", "a", 1), category("2", "a", 2)]),
            Err(ReconcileError::DuplicateName(_))
        ));
        assert!(matches!(
            CategoryRegistry::from_categories(vec![category("1", "a", 1), category("1", "b", 2)]),
            Err(ReconcileError::InvalidSet(_))
        ));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(String, i64),
        Rename(usize, String),
        Remove(usize),
        Reorder(Vec<usize>),
    }

    fn op() -> impl Strategy<Value = Op> {
        let name = "[a-c]{1,2}";
        prop_oneof![
            (name, 0i64..6).prop_map(|(name, order)| Op::Add(name, order)),
            (0usize..8, name).prop_map(|(slot, name)| Op::Rename(slot, name)),
            (0usize..8).prop_map(Op::Remove),
            prop::collection::vec(0usize..8, 0..6).prop_map(Op::Reorder),
        ]
    }

    fn id_at(registry: &CategoryRegistry, slot: usize) -> String {
        registry
            .categories()
            .get(slot)
            .map_or_else(|| "missing".to_string(), |category| category.id.clone())
    }

    proptest! {
        #[test]
        fn names_stay_unique(ops in prop::collection::vec(op(), 1..40)) {
            let mut registry = CategoryRegistry::new();

            for op in ops {
                let before = registry.clone();
                let result = match op {
                    Op::Add(name, order) => registry.add(&name, order).map(|_| ()),
                    Op::Rename(slot, name) => {
                        let id = id_at(&registry, slot);
                        registry.rename(&id, &name)
                    }
                    Op::Remove(slot) => {
                        let id = id_at(&registry, slot);
                        registry.remove(&id).map(|_| ())
                    }
                    Op::Reorder(slots) => {
                        let ids: Vec<String> = slots.iter().map(|slot| id_at(&registry, *slot)).collect();
                        registry.reorder(&ids).map(|_| ())
                    }
                };

                if result.is_err() {
                    prop_assert_eq!(&registry, &before);
                }
                assert_names_unique(&registry);

                let orders: HashSet<i64> = registry.categories().iter().map(|c| c.order).collect();
                prop_assert_eq!(orders.len(), registry.len());
            }
        }
    }
}
