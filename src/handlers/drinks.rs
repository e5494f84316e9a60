// handlers/drinks.rs - the drinks menu resource
//
// GET    /drinks          public       brief projection
// GET    /drinks-detail   get:drinks-detail
// POST   /drinks          post:drinks
// PATCH  /drinks/:id      patch:drinks
// DELETE /drinks/:id      delete:drinks

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::auth::ClaimsContext;
use crate::database::models::{
    Drink, DrinkBrief, Ingredient, NewDrink, RecipeInput, TITLE_MAX_CHARS,
};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// Body accepted by create and update.
#[derive(Debug, Deserialize)]
pub struct DrinkPayload {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

#[derive(Debug, Serialize)]
pub struct DrinkList<T> {
    pub drinks: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub delete: i32,
}

/// GET /drinks
pub async fn list(State(state): State<AppState>) -> ApiResult<DrinkList<DrinkBrief>> {
    let drinks = state.store.all().await?;

    Ok(ApiResponse::success(DrinkList {
        drinks: drinks.iter().map(Drink::brief).collect(),
    }))
}

/// GET /drinks-detail
pub async fn list_detail(
    State(state): State<AppState>,
    Extension(_claims): Extension<ClaimsContext>,
) -> ApiResult<DrinkList<Drink>> {
    all_detailed(&state).await
}

/// POST /drinks
///
/// Answers with the whole menu rather than just the new drink so clients
/// can redraw without a second request.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<ClaimsContext>,
    payload: Result<Json<DrinkPayload>, JsonRejection>,
) -> ApiResult<DrinkList<Drink>> {
    let Json(payload) = payload?;

    let title = required_title(payload.title)?;
    let recipe = payload.recipe.map(Vec::<Ingredient>::from).unwrap_or_default();

    let drink = state.store.insert(NewDrink { title, recipe }).await?;
    info!("{} created drink {} ({})", claims.subject(), drink.id, drink.title);

    all_detailed(&state).await
}

/// PATCH /drinks/:id
///
/// Fields left out of the body keep their stored values. Like create, the
/// response carries the whole menu.
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<ClaimsContext>,
    Path(id): Path<String>,
    payload: Result<Json<DrinkPayload>, JsonRejection>,
) -> ApiResult<DrinkList<Drink>> {
    let mut drink = find_existing(&state, &id).await?;
    let Json(payload) = payload?;

    if let Some(title) = payload.title {
        drink.title = required_title(Some(title))?;
    }
    if let Some(recipe) = payload.recipe {
        drink.recipe = recipe.into();
    }

    let drink = state
        .store
        .update(&drink)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("drink {} vanished during update", id)))?;
    info!("{} updated drink {} ({})", claims.subject(), drink.id, drink.title);

    all_detailed(&state).await
}

/// DELETE /drinks/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<ClaimsContext>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    let drink = find_existing(&state, &id).await?;

    if !state.store.delete(drink.id).await? {
        return Err(ApiError::not_found(format!("drink {} vanished during delete", drink.id)));
    }
    info!("{} deleted drink {} ({})", claims.subject(), drink.id, drink.title);

    Ok(ApiResponse::success(Deleted { delete: drink.id }))
}

async fn all_detailed(state: &AppState) -> ApiResult<DrinkList<Drink>> {
    let drinks = state.store.all().await?;
    Ok(ApiResponse::success(DrinkList { drinks }))
}

/// Ids that are not integers cannot name a drink, so they are a 404 too.
async fn find_existing(state: &AppState, id: &str) -> Result<Drink, ApiError> {
    let parsed: i32 = id
        .parse()
        .map_err(|_| ApiError::not_found(format!("invalid drink id '{}'", id)))?;

    state
        .store
        .find(parsed)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("drink {} not found", parsed)))
}

fn required_title(title: Option<String>) -> Result<String, ApiError> {
    match title.map(|t| t.trim().to_string()) {
        Some(t) if t.chars().count() > TITLE_MAX_CHARS => Err(ApiError::unprocessable(format!(
            "drink title longer than {} characters",
            TITLE_MAX_CHARS
        ))),
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(ApiError::unprocessable("drink title is required")),
    }
}
