use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::database::models::drink::{encode_recipe, Drink, DrinkRow, NewDrink};

/// Errors from a drink store. None of these reach API callers verbatim.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a drink titled '{0}' already exists")]
    DuplicateTitle(String),

    #[error("stored recipe for drink {id} is unreadable: {reason}")]
    CorruptRecipe { id: i32, reason: String },

    #[error("failed to encode recipe: {0}")]
    Encode(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistent row storage for drinks.
///
/// Every mutating call is atomic: it either fully applies or leaves the store
/// untouched. Lookups by id return `None` rather than an error when the row
/// does not exist.
#[async_trait]
pub trait DrinkStore: Send + Sync {
    /// All drinks ordered by id.
    async fn all(&self) -> Result<Vec<Drink>, StoreError>;

    async fn find(&self, id: i32) -> Result<Option<Drink>, StoreError>;

    async fn insert(&self, drink: NewDrink) -> Result<Drink, StoreError>;

    /// Overwrites title and recipe of `drink.id`. `None` if the row vanished.
    async fn update(&self, drink: &Drink) -> Result<Option<Drink>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: i32) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// PostgreSQL-backed store over the `drinks` table.
#[derive(Clone)]
pub struct PgDrinkStore {
    pool: PgPool,
}

impl PgDrinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DrinkStore for PgDrinkStore {
    async fn all(&self) -> Result<Vec<Drink>, StoreError> {
        let rows = sqlx::query_as::<_, DrinkRow>("SELECT id, title, recipe FROM drinks ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(DrinkRow::into_drink).collect()
    }

    async fn find(&self, id: i32) -> Result<Option<Drink>, StoreError> {
        let row = sqlx::query_as::<_, DrinkRow>("SELECT id, title, recipe FROM drinks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(DrinkRow::into_drink).transpose()
    }

    async fn insert(&self, drink: NewDrink) -> Result<Drink, StoreError> {
        let recipe = encode_recipe(&drink.recipe)?;
        let row = sqlx::query_as::<_, DrinkRow>(
            "INSERT INTO drinks (title, recipe) VALUES ($1, $2) RETURNING id, title, recipe",
        )
        .bind(&drink.title)
        .bind(&recipe)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation_as_duplicate(e, &drink.title))?;

        row.into_drink()
    }

    async fn update(&self, drink: &Drink) -> Result<Option<Drink>, StoreError> {
        let recipe = encode_recipe(&drink.recipe)?;
        let row = sqlx::query_as::<_, DrinkRow>(
            "UPDATE drinks SET title = $2, recipe = $3 WHERE id = $1 RETURNING id, title, recipe",
        )
        .bind(drink.id)
        .bind(&drink.title)
        .bind(&recipe)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation_as_duplicate(e, &drink.title))?;

        row.map(DrinkRow::into_drink).transpose()
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM drinks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn unique_violation_as_duplicate(err: sqlx::Error, title: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::DuplicateTitle(title.to_string())
        }
        _ => StoreError::Sqlx(err),
    }
}
