use serde::{Deserialize, Serialize};
use serde_json::Number;
use sqlx::FromRow;

use crate::database::store::StoreError;

/// A single recipe line: how many parts of which ingredient, and the color
/// the frontend paints it with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: Number,
}

/// Ingredient without its name, as shown on the public menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefIngredient {
    pub color: String,
    pub parts: Number,
}

impl From<&Ingredient> for BriefIngredient {
    fn from(ingredient: &Ingredient) -> Self {
        Self {
            color: ingredient.color.clone(),
            parts: ingredient.parts.clone(),
        }
    }
}

/// Recipe as accepted in request bodies: either a list of ingredients or a
/// lone ingredient object, which is treated as a one-entry list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipeInput {
    Many(Vec<Ingredient>),
    One(Ingredient),
}

impl From<RecipeInput> for Vec<Ingredient> {
    fn from(input: RecipeInput) -> Self {
        match input {
            RecipeInput::Many(list) => list,
            RecipeInput::One(single) => vec![single],
        }
    }
}

/// Upper bound on title length in characters; matches the `VARCHAR(80)` column.
pub const TITLE_MAX_CHARS: usize = 80;

/// Stored drink. Serializes as the detailed projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drink {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Public projection of a drink: ingredient names are withheld.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrinkBrief {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<BriefIngredient>,
}

impl Drink {
    pub fn brief(&self) -> DrinkBrief {
        DrinkBrief {
            id: self.id,
            title: self.title.clone(),
            recipe: self.recipe.iter().map(BriefIngredient::from).collect(),
        }
    }
}

/// Values for a drink that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Row shape of the `drinks` table; the recipe column holds JSON text.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DrinkRow {
    pub id: i32,
    pub title: String,
    pub recipe: String,
}

impl DrinkRow {
    pub fn into_drink(self) -> Result<Drink, StoreError> {
        let recipe = decode_recipe(&self.recipe)
            .map_err(|e| StoreError::CorruptRecipe { id: self.id, reason: e.to_string() })?;

        Ok(Drink {
            id: self.id,
            title: self.title,
            recipe,
        })
    }
}

pub fn encode_recipe(recipe: &[Ingredient]) -> Result<String, StoreError> {
    serde_json::to_string(recipe).map_err(|e| StoreError::Encode(e.to_string()))
}

/// Stored `null` and lone objects both come back as a list.
fn decode_recipe(text: &str) -> Result<Vec<Ingredient>, serde_json::Error> {
    let input: Option<RecipeInput> = serde_json::from_str(text)?;
    Ok(input.map(Vec::from).unwrap_or_default())
}
