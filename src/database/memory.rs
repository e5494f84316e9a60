use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::database::models::drink::{encode_recipe, Drink, DrinkRow, NewDrink};
use crate::database::store::{DrinkStore, StoreError};

/// In-process drink store for local development and tests.
///
/// Rows are kept in their stored form (recipe as JSON text) so reads go
/// through the same decoding path as the PostgreSQL store. Ids are never
/// reused, matching a `SERIAL` column.
#[derive(Default)]
pub struct MemoryDrinkStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: BTreeMap<i32, DrinkRow>,
    last_id: i32,
}

impl Inner {
    fn title_taken(&self, title: &str, except: Option<i32>) -> bool {
        self.rows
            .values()
            .any(|row| row.title == title && Some(row.id) != except)
    }
}

impl MemoryDrinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DrinkStore for MemoryDrinkStore {
    async fn all(&self) -> Result<Vec<Drink>, StoreError> {
        let inner = self.inner.read().await;
        inner.rows.values().cloned().map(DrinkRow::into_drink).collect()
    }

    async fn find(&self, id: i32) -> Result<Option<Drink>, StoreError> {
        let inner = self.inner.read().await;
        inner.rows.get(&id).cloned().map(DrinkRow::into_drink).transpose()
    }

    async fn insert(&self, drink: NewDrink) -> Result<Drink, StoreError> {
        let recipe = encode_recipe(&drink.recipe)?;
        let mut inner = self.inner.write().await;
        if inner.title_taken(&drink.title, None) {
            return Err(StoreError::DuplicateTitle(drink.title));
        }

        inner.last_id += 1;
        let row = DrinkRow {
            id: inner.last_id,
            title: drink.title,
            recipe,
        };
        inner.rows.insert(row.id, row.clone());
        row.into_drink()
    }

    async fn update(&self, drink: &Drink) -> Result<Option<Drink>, StoreError> {
        let recipe = encode_recipe(&drink.recipe)?;
        let mut inner = self.inner.write().await;
        if !inner.rows.contains_key(&drink.id) {
            return Ok(None);
        }
        if inner.title_taken(&drink.title, Some(drink.id)) {
            return Err(StoreError::DuplicateTitle(drink.title.clone()));
        }

        let row = DrinkRow {
            id: drink.id,
            title: drink.title.clone(),
            recipe,
        };
        inner.rows.insert(row.id, row.clone());
        row.into_drink().map(Some)
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.rows.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::drink::Ingredient;
    use serde_json::Number;

    fn new_drink(title: &str) -> NewDrink {
        NewDrink {
            title: title.to_string(),
            recipe: vec![Ingredient {
                name: "water".to_string(),
                color: "blue".to_string(),
                parts: Number::from(1),
            }],
        }
    }

    #[tokio::test]
    async fn assigns_increasing_ids() {
        let store = MemoryDrinkStore::new();
        let a = store.insert(new_drink("a")).await.unwrap();
        let b = store.insert(new_drink("b")).await.unwrap();
        assert!(b.id > a.id);
        assert_eq!(store.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejects_duplicate_title_without_writing() {
        let store = MemoryDrinkStore::new();
        store.insert(new_drink("water")).await.unwrap();
        let err = store.insert(new_drink("water")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTitle(t) if t == "water"));
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_may_keep_its_own_title() {
        let store = MemoryDrinkStore::new();
        let mut drink = store.insert(new_drink("water")).await.unwrap();
        drink.recipe.clear();
        let updated = store.update(&drink).await.unwrap().unwrap();
        assert!(updated.recipe.is_empty());
    }

    #[tokio::test]
    async fn update_cannot_steal_another_title() {
        let store = MemoryDrinkStore::new();
        store.insert(new_drink("water")).await.unwrap();
        let mut tea = store.insert(new_drink("tea")).await.unwrap();
        tea.title = "water".to_string();
        assert!(store.update(&tea).await.is_err());
        assert_eq!(store.find(tea.id).await.unwrap().unwrap().title, "tea");
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = MemoryDrinkStore::new();
        let first = store.insert(new_drink("a")).await.unwrap();
        assert!(store.delete(first.id).await.unwrap());
        assert!(!store.delete(first.id).await.unwrap());
        let second = store.insert(new_drink("b")).await.unwrap();
        assert_ne!(first.id, second.id);
    }
}
