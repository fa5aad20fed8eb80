//! JSON shapes of requests and responses.
//!
//! Responses are built from models plus the viewer's perspective
//! (`is_subscribed`, `is_favorited`, ...). Media paths are turned into absolute
//! URLs here and nowhere else.

use crate::{
    core::{
        recipe::{IngredientAmount, RecipeDetails, RecipeInput, RecipeUpdate},
        subscription,
        user::NewUser,
    },
    entities::{recipe, tag, user},
    errors::Result,
    media::MediaStore,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

// ---- requests ----

/// Body of `POST /api/users/`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Must be unique.
    pub email: String,
    /// Must be unique and match the allowed pattern.
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Plain text; hashed before storage.
    pub password: String,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            email: req.email,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            password: req.password,
        }
    }
}

/// Body of `POST /api/users/set_password/`.
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    /// Replacement password.
    pub new_password: String,
    /// Must match the stored hash.
    pub current_password: String,
}

/// Body of `POST /api/auth/token/login/`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Plain text password.
    pub password: String,
}

/// `avatar` is optional here so that a missing field is a field error.
#[derive(Debug, Deserialize)]
pub struct AvatarRequest {
    /// Base64 data URL.
    pub avatar: Option<String>,
}

/// One `{id, amount}` ingredient line.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IngredientAmountRequest {
    /// Ingredient id.
    pub id: i64,
    /// Quantity in the ingredient's unit.
    pub amount: i32,
}

impl From<IngredientAmountRequest> for IngredientAmount {
    fn from(req: IngredientAmountRequest) -> Self {
        Self {
            id: req.id,
            amount: req.amount,
        }
    }
}

/// Body of `POST /api/recipes/`. `image` is a base64 data URL.
#[derive(Debug, Deserialize)]
pub struct RecipeRequest {
    /// Lines in display order.
    pub ingredients: Vec<IngredientAmountRequest>,
    /// Tag ids.
    pub tags: Vec<i64>,
    pub image: String,
    pub name: String,
    pub text: String,
    /// Minutes.
    pub cooking_time: i32,
}

impl RecipeRequest {
    /// Converts into core input once the image has been stored at `image_path`.
    #[must_use]
    pub fn into_input(self, image_path: String) -> RecipeInput {
        RecipeInput {
            name: self.name,
            text: self.text,
            cooking_time: self.cooking_time,
            image: image_path,
            ingredients: self.ingredients.into_iter().map(Into::into).collect(),
            tags: self.tags,
        }
    }
}

/// Body of `PATCH /api/recipes/{id}/`.
#[derive(Debug, Deserialize)]
pub struct RecipeUpdateRequest {
    /// Required on update despite the `Option`.
    pub ingredients: Option<Vec<IngredientAmountRequest>>,
    /// Required on update despite the `Option`.
    pub tags: Option<Vec<i64>>,
    /// Base64 data URL; the stored image is kept when absent.
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

impl RecipeUpdateRequest {
    #[must_use]
    pub fn into_update(self, image_path: Option<String>) -> RecipeUpdate {
        RecipeUpdate {
            name: self.name,
            text: self.text,
            cooking_time: self.cooking_time,
            image: image_path,
            ingredients: self
                .ingredients
                .map(|items| items.into_iter().map(Into::into).collect()),
            tags: self.tags,
        }
    }
}

// ---- responses ----

#[derive(Debug, Serialize)]
pub struct UserCreatedResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<user::Model> for UserCreatedResponse {
    fn from(model: user::Model) -> Self {
        Self {
            email: model.email,
            id: model.id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
        }
    }
}

/// Public profile of a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the viewer follows this user.
    pub is_subscribed: bool,
    /// Absolute URL, if an avatar is set.
    pub avatar: Option<String>,
}

impl UserResponse {
    /// Builds the response when the subscription flag is already known.
    #[must_use]
    pub fn new(model: user::Model, is_subscribed: bool, media: &dyn MediaStore) -> Self {
        let avatar = model.avatar.as_deref().map(|path| media.url(path));
        Self {
            email: model.email,
            id: model.id,
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            is_subscribed,
            avatar,
        }
    }

    /// Builds the response as seen by `viewer`.
    pub async fn for_viewer(
        db: &DatabaseConnection,
        model: user::Model,
        viewer: Option<i64>,
        media: &dyn MediaStore,
    ) -> Result<Self> {
        let is_subscribed = match viewer {
            Some(viewer_id) => subscription::is_subscribed(db, viewer_id, model.id).await?,
            None => false,
        };
        Ok(Self::new(model, is_subscribed, media))
    }
}

/// Returned by `PUT /api/users/me/avatar/`.
#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    /// Absolute URL of the stored avatar.
    pub avatar: String,
}

/// Returned by login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Key for the `Authorization: Token` header.
    pub auth_token: String,
}

/// An ingredient line of a full recipe.
#[derive(Debug, Serialize)]
pub struct RecipeIngredientResponse {
    /// Ingredient id.
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    /// Quantity in `measurement_unit`.
    pub amount: i32,
}

/// Full recipe representation.
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub tags: Vec<tag::Model>,
    /// Author as seen by the viewer.
    pub author: UserResponse,
    /// In the order they were submitted.
    pub ingredients: Vec<RecipeIngredientResponse>,
    /// Always false for anonymous viewers.
    pub is_favorited: bool,
    /// Always false for anonymous viewers.
    pub is_in_shopping_cart: bool,
    pub name: String,
    /// Absolute URL.
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeResponse {
    #[must_use]
    pub fn new(details: RecipeDetails, media: &dyn MediaStore) -> Self {
        let RecipeDetails {
            recipe,
            author,
            author_is_subscribed,
            ingredients,
            tags,
            is_favorited,
            is_in_shopping_cart,
        } = details;
        Self {
            id: recipe.id,
            tags,
            author: UserResponse::new(author, author_is_subscribed, media),
            ingredients: ingredients
                .into_iter()
                .map(|(ingredient, amount)| RecipeIngredientResponse {
                    id: ingredient.id,
                    name: ingredient.name,
                    measurement_unit: ingredient.measurement_unit,
                    amount,
                })
                .collect(),
            is_favorited,
            is_in_shopping_cart,
            image: media.url(&recipe.image),
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Compact recipe used by favorites, the cart and subscriptions.
#[derive(Debug, Serialize)]
pub struct RecipeShortResponse {
    pub id: i64,
    pub name: String,
    /// Absolute URL.
    pub image: String,
    pub cooking_time: i32,
}

/// The one place the compact recipe shape is produced.
#[must_use]
pub fn recipe_short(recipe: &recipe::Model, media: &dyn MediaStore) -> RecipeShortResponse {
    RecipeShortResponse {
        id: recipe.id,
        name: recipe.name.clone(),
        image: media.url(&recipe.image),
        cooking_time: recipe.cooking_time,
    }
}

/// A followed author with a preview of their recipes.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    /// The author, always with `is_subscribed` set.
    #[serde(flatten)]
    pub user: UserResponse,
    /// Newest first, cut to `recipes_limit`.
    pub recipes: Vec<RecipeShortResponse>,
    /// Total before the cut.
    pub recipes_count: u64,
}

impl SubscriptionResponse {
    /// Builds the entry for an author the viewer follows.
    pub async fn load(
        db: &DatabaseConnection,
        author: user::Model,
        recipes_limit: Option<u64>,
        media: &dyn MediaStore,
    ) -> Result<Self> {
        let (recipes, recipes_count) =
            subscription::author_recipes(db, author.id, recipes_limit).await?;
        Ok(Self {
            user: UserResponse::new(author, true, media),
            recipes: recipes.iter().map(|r| recipe_short(r, media)).collect(),
            recipes_count,
        })
    }
}

/// Returned by `GET /api/recipes/{id}/get-link/`.
#[derive(Debug, Serialize)]
pub struct ShortLinkResponse {
    /// Absolute URL of the redirect.
    #[serde(rename = "short-link")]
    pub short_link: String,
}
