//! Recipe business logic - Handles publishing, editing, deleting and listing recipes.
//!
//! A recipe and its ingredient/tag join rows are always written in one
//! transaction, so a reader never sees a recipe without its ingredients.
//! Listings are newest first; [`filtered_recipes`] builds the query and leaves
//! pagination to the caller.

use crate::{
    core::{
        membership::{self, RecipeMembership},
        require_text, subscription,
    },
    entities::{
        Favorite, Ingredient, IngredientRecipe, Recipe, RecipeTag, ShoppingCart, ShortenedUrl,
        Tag, User, ingredient, ingredient_recipe, recipe, recipe_tag, shortened_url, tag, user,
    },
    errors::{Error, Result},
};
use sea_orm::{
    ConnectionTrait, QueryOrder, QuerySelect, Select, Set, TransactionTrait, prelude::*,
};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Maximum length of a recipe name.
pub const MAX_RECIPE_NAME_LENGTH: usize = 256;
/// Smallest accepted cooking time in minutes.
pub const MIN_COOKING_TIME: i32 = 1;
/// Smallest accepted ingredient amount.
pub const MIN_AMOUNT: i32 = 1;

/// One ingredient line as submitted by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    /// Ingredient id.
    pub id: i64,
    pub amount: i32,
}

/// Everything needed to publish a recipe. `image` is a media path that has
/// already been stored.
#[derive(Debug, Clone)]
pub struct RecipeInput {
    pub name: String,
    /// Free-form description.
    pub text: String,
    /// Minutes, at least [`MIN_COOKING_TIME`].
    pub cooking_time: i32,
    pub image: String,
    /// Lines in the order they should be shown.
    pub ingredients: Vec<IngredientAmount>,
    /// Tag ids.
    pub tags: Vec<i64>,
}

/// A partial update. `ingredients` and `tags` are optional in the type only so
/// that their absence can be reported as a field error.
#[derive(Debug, Clone, Default)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    /// New media path; the old image is left for the caller to release.
    pub image: Option<String>,
    /// Required; replaces every existing line.
    pub ingredients: Option<Vec<IngredientAmount>>,
    /// Required; replaces every existing tag.
    pub tags: Option<Vec<i64>>,
}

/// Listing filters. `tags` matches any of the given slugs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Tag slugs. Every slug must name an existing tag.
    pub tags: Vec<String>,
    /// Author user id.
    pub author: Option<i64>,
    /// Only the viewer's favorites.
    pub is_favorited: bool,
    /// Only recipes in the viewer's shopping cart.
    pub is_in_shopping_cart: bool,
}

/// A recipe with everything its full representation needs, as seen by `viewer`.
#[derive(Debug, Clone)]
pub struct RecipeDetails {
    pub recipe: recipe::Model,
    pub author: user::Model,
    /// Whether the viewer follows the author.
    pub author_is_subscribed: bool,
    /// Ingredient with its amount, in submission order.
    pub ingredients: Vec<(ingredient::Model, i32)>,
    pub tags: Vec<tag::Model>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

pub async fn get_recipe_by_id(
    db: &DatabaseConnection,
    recipe_id: i64,
) -> Result<Option<recipe::Model>> {
    Recipe::find_by_id(recipe_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_recipe_by_id`], but a missing recipe is an error.
pub async fn get_recipe(db: &DatabaseConnection, recipe_id: i64) -> Result<recipe::Model> {
    get_recipe_by_id(db, recipe_id)
        .await?
        .ok_or_else(|| Error::not_found("Recipe", recipe_id))
}

fn validate_cooking_time(cooking_time: i32) -> Result<()> {
    if cooking_time < MIN_COOKING_TIME {
        return Err(Error::validation(
            "cooking_time",
            format!("Ensure this value is greater than or equal to {MIN_COOKING_TIME}."),
        ));
    }
    Ok(())
}

/// Checks that the ingredient list is non-empty, free of duplicates, has
/// positive amounts and references existing ingredients only.
async fn validate_ingredients<C: ConnectionTrait>(
    db: &C,
    ingredients: &[IngredientAmount],
) -> Result<()> {
    if ingredients.is_empty() {
        return Err(Error::validation(
            "ingredients",
            "At least one ingredient is required.",
        ));
    }
    let mut seen = HashSet::new();
    for item in ingredients {
        if !seen.insert(item.id) {
            return Err(Error::validation(
                "ingredients",
                format!("Ingredient {} is listed more than once.", item.id),
            ));
        }
        if item.amount < MIN_AMOUNT {
            return Err(Error::validation(
                "ingredients",
                format!("Amount must be at least {MIN_AMOUNT}."),
            ));
        }
    }
    let existing = Ingredient::find()
        .filter(ingredient::Column::Id.is_in(seen.iter().copied()))
        .count(db)
        .await?;
    if existing != seen.len() as u64 {
        return Err(Error::validation(
            "ingredients",
            "One or more ingredients do not exist.",
        ));
    }
    Ok(())
}

async fn validate_tags<C: ConnectionTrait>(db: &C, tags: &[i64]) -> Result<()> {
    if tags.is_empty() {
        return Err(Error::validation("tags", "At least one tag is required."));
    }
    let unique: HashSet<i64> = tags.iter().copied().collect();
    if unique.len() != tags.len() {
        return Err(Error::validation("tags", "Tags must not repeat."));
    }
    let existing = Tag::find()
        .filter(tag::Column::Id.is_in(unique))
        .count(db)
        .await?;
    if existing != tags.len() as u64 {
        return Err(Error::validation("tags", "One or more tags do not exist."));
    }
    Ok(())
}

async fn write_relations<C: ConnectionTrait>(
    db: &C,
    recipe_id: i64,
    ingredients: &[IngredientAmount],
    tags: &[i64],
) -> Result<()> {
    IngredientRecipe::insert_many(ingredients.iter().map(|item| ingredient_recipe::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(item.id),
        amount: Set(item.amount),
        ..Default::default()
    }))
    .exec(db)
    .await?;

    RecipeTag::insert_many(tags.iter().map(|tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(*tag_id),
        ..Default::default()
    }))
    .exec(db)
    .await?;
    Ok(())
}

async fn clear_relations<C: ConnectionTrait>(db: &C, recipe_id: i64) -> Result<()> {
    IngredientRecipe::delete_many()
        .filter(ingredient_recipe::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    RecipeTag::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Only the author or a staff user may change a recipe.
fn ensure_can_edit(actor: &user::Model, recipe: &recipe::Model) -> Result<()> {
    if actor.is_staff || actor.id == recipe.author_id {
        Ok(())
    } else {
        warn!("User {} may not modify recipe {}", actor.id, recipe.id);
        Err(Error::Forbidden {
            message: "You do not have permission to perform this action.".to_string(),
        })
    }
}

/// Publishes a recipe with its ingredients and tags.
///
/// # Errors
/// Returns a validation error naming the first invalid field, or a database
/// error if the transaction fails.
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_recipe(
    db: &DatabaseConnection,
    author_id: i64,
    input: RecipeInput,
) -> Result<recipe::Model> {
    validate_ingredients(db, &input.ingredients).await?;
    validate_tags(db, &input.tags).await?;
    require_text("image", &input.image, usize::MAX)?;
    require_text("name", &input.name, MAX_RECIPE_NAME_LENGTH)?;
    require_text("text", &input.text, usize::MAX)?;
    validate_cooking_time(input.cooking_time)?;

    let txn = db.begin().await?;
    let recipe = recipe::ActiveModel {
        author_id: Set(author_id),
        name: Set(input.name.trim().to_string()),
        image: Set(input.image),
        text: Set(input.text),
        cooking_time: Set(input.cooking_time),
        pub_date: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    write_relations(&txn, recipe.id, &input.ingredients, &input.tags).await?;
    txn.commit().await?;

    info!("Created recipe '{}' (ID: {}) by user {}", recipe.name, recipe.id, author_id);
    Ok(recipe)
}

/// Applies a partial update. Ingredients and tags must be supplied and replace
/// the existing sets.
///
/// # Errors
/// - [`Error::NotFound`] if the recipe does not exist
/// - [`Error::Forbidden`] if `actor` is neither the author nor staff
/// - [`Error::Validation`] for missing or invalid fields
#[instrument(skip(db, actor, update), fields(actor_id = actor.id))]
pub async fn update_recipe(
    db: &DatabaseConnection,
    actor: &user::Model,
    recipe_id: i64,
    update: RecipeUpdate,
) -> Result<recipe::Model> {
    let existing = get_recipe(db, recipe_id).await?;
    ensure_can_edit(actor, &existing)?;

    let ingredients = update
        .ingredients
        .ok_or_else(|| Error::validation("ingredients", "This field is required."))?;
    let tags = update
        .tags
        .ok_or_else(|| Error::validation("tags", "This field is required."))?;
    validate_ingredients(db, &ingredients).await?;
    validate_tags(db, &tags).await?;

    let mut active: recipe::ActiveModel = existing.into();
    if let Some(name) = update.name {
        require_text("name", &name, MAX_RECIPE_NAME_LENGTH)?;
        active.name = Set(name.trim().to_string());
    }
    if let Some(text) = update.text {
        require_text("text", &text, usize::MAX)?;
        active.text = Set(text);
    }
    if let Some(cooking_time) = update.cooking_time {
        validate_cooking_time(cooking_time)?;
        active.cooking_time = Set(cooking_time);
    }
    if let Some(image) = update.image {
        require_text("image", &image, usize::MAX)?;
        active.image = Set(image);
    }

    let txn = db.begin().await?;
    let recipe = active.update(&txn).await?;
    clear_relations(&txn, recipe.id).await?;
    write_relations(&txn, recipe.id, &ingredients, &tags).await?;
    txn.commit().await?;

    info!("Updated recipe {}", recipe.id);
    Ok(recipe)
}

/// Deletes a recipe with its join rows and short link, returning the deleted
/// row so the caller can release its image.
///
/// # Errors
/// - [`Error::NotFound`] if the recipe does not exist
/// - [`Error::Forbidden`] if `actor` is neither the author nor staff
#[instrument(skip(db, actor), fields(actor_id = actor.id))]
pub async fn delete_recipe(
    db: &DatabaseConnection,
    actor: &user::Model,
    recipe_id: i64,
) -> Result<recipe::Model> {
    let existing = get_recipe(db, recipe_id).await?;
    ensure_can_edit(actor, &existing)?;

    let txn = db.begin().await?;
    clear_relations(&txn, recipe_id).await?;
    Favorite::delete_many()
        .filter(<Favorite as RecipeMembership>::recipe_column().eq(recipe_id))
        .exec(&txn)
        .await?;
    ShoppingCart::delete_many()
        .filter(<ShoppingCart as RecipeMembership>::recipe_column().eq(recipe_id))
        .exec(&txn)
        .await?;
    ShortenedUrl::delete_many()
        .filter(shortened_url::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    Recipe::delete_by_id(recipe_id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted recipe {}", recipe_id);
    Ok(existing)
}

/// Builds the listing query for `filter`, newest first.
///
/// # Errors
/// - [`Error::Validation`] on `tags` if a slug names no tag
///
/// The favorite and cart filters only apply when `viewer` is set; anonymous
/// callers get the unfiltered list for those flags.
pub async fn filtered_recipes(
    db: &DatabaseConnection,
    filter: &RecipeFilter,
    viewer: Option<i64>,
) -> Result<Select<Recipe>> {
    let mut query = Recipe::find();

    if let Some(author_id) = filter.author {
        query = query.filter(recipe::Column::AuthorId.eq(author_id));
    }

    if !filter.tags.is_empty() {
        let known: HashSet<String> = Tag::find()
            .select_only()
            .column(tag::Column::Slug)
            .filter(tag::Column::Slug.is_in(filter.tags.iter().map(String::as_str)))
            .into_tuple::<String>()
            .all(db)
            .await?
            .into_iter()
            .collect();
        if let Some(unknown) = filter.tags.iter().find(|slug| !known.contains(*slug)) {
            return Err(Error::validation(
                "tags",
                format!("Select a valid choice. {unknown} is not one of the available choices."),
            ));
        }

        let tagged: Vec<i64> = RecipeTag::find()
            .select_only()
            .column(recipe_tag::Column::RecipeId)
            .inner_join(Tag)
            .filter(tag::Column::Slug.is_in(filter.tags.iter().map(String::as_str)))
            .distinct()
            .into_tuple()
            .all(db)
            .await?;
        query = query.filter(recipe::Column::Id.is_in(tagged));
    }

    if let Some(user_id) = viewer {
        if filter.is_favorited {
            let ids = membership::recipe_ids_for_user::<Favorite>(db, user_id).await?;
            query = query.filter(recipe::Column::Id.is_in(ids));
        }
        if filter.is_in_shopping_cart {
            let ids = membership::recipe_ids_for_user::<ShoppingCart>(db, user_id).await?;
            query = query.filter(recipe::Column::Id.is_in(ids));
        }
    }

    debug!("Recipe listing with {:?} for viewer {:?}", filter, viewer);
    Ok(query
        .order_by_desc(recipe::Column::PubDate)
        .order_by_desc(recipe::Column::Id))
}

/// Ingredient lines of a recipe in the order they were written.
pub async fn recipe_ingredients(
    db: &DatabaseConnection,
    recipe_id: i64,
) -> Result<Vec<(ingredient::Model, i32)>> {
    let rows = IngredientRecipe::find()
        .filter(ingredient_recipe::Column::RecipeId.eq(recipe_id))
        .find_also_related(Ingredient)
        .order_by_asc(ingredient_recipe::Column::Id)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(line, ingredient)| ingredient.map(|i| (i, line.amount)))
        .collect())
}

pub async fn recipe_tags(db: &DatabaseConnection, recipe_id: i64) -> Result<Vec<tag::Model>> {
    Tag::find()
        .inner_join(RecipeTag)
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads author, ingredients, tags and the viewer's flags for `recipe`.
pub async fn load_details(
    db: &DatabaseConnection,
    recipe: recipe::Model,
    viewer: Option<i64>,
) -> Result<RecipeDetails> {
    let author = User::find_by_id(recipe.author_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", recipe.author_id))?;
    let ingredients = recipe_ingredients(db, recipe.id).await?;
    let tags = recipe_tags(db, recipe.id).await?;

    let (author_is_subscribed, is_favorited, is_in_shopping_cart) = match viewer {
        Some(user_id) => (
            subscription::is_subscribed(db, user_id, author.id).await?,
            membership::contains::<Favorite>(db, user_id, recipe.id).await?,
            membership::contains::<ShoppingCart>(db, user_id, recipe.id).await?,
        ),
        None => (false, false, false),
    };

    Ok(RecipeDetails {
        recipe,
        author,
        author_is_subscribed,
        ingredients,
        tags,
        is_favorited,
        is_in_shopping_cart,
    })
}
