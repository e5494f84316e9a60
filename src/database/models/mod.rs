pub mod drink;

pub use drink::{
    BriefIngredient, Drink, DrinkBrief, DrinkRow, Ingredient, NewDrink, RecipeInput,
    TITLE_MAX_CHARS,
};
