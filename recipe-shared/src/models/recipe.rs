/// Recipe model and owner-scoped queries
///
/// Every function takes the owner's id and never touches another user's
/// rows. A recipe owned by someone else is indistinguishable from one that
/// does not exist.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE recipes (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL CHECK (title <> ''),
///     price NUMERIC(5, 2) NOT NULL CHECK (price >= 0),
///     time_minutes INTEGER NOT NULL CHECK (time_minutes >= 0),
///     link VARCHAR(255) NOT NULL DEFAULT '',
///     image VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use recipe_shared::models::recipe::{CreateRecipe, Recipe, RecipeFilter};
/// use rust_decimal::Decimal;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, owner_id: i64, tag_id: i64) -> Result<(), sqlx::Error> {
/// let created = Recipe::create(&pool, owner_id, CreateRecipe {
///     title: "Carbonara".to_string(),
///     price: Decimal::new(2000, 2),
///     time_minutes: 25,
///     link: String::new(),
///     tag_ids: vec![tag_id],
///     ingredient_ids: vec![],
/// }).await?;
///
/// let mine = Recipe::list(&pool, owner_id, &RecipeFilter::default()).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use crate::models::attribute::{Attribute, AttributeKind};

const RECIPE_COLUMNS: &str =
    "id, user_id, title, price, time_minutes, link, image, created_at, updated_at";

/// Recipe row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub title: String,

    /// NUMERIC(5, 2)
    pub price: Decimal,

    pub time_minutes: i32,

    /// External link, empty when unset
    pub link: String,

    /// Path of the stored image relative to the media root
    pub image: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Recipe with the ids of its tags and ingredients
#[derive(Debug, Clone)]
pub struct RecipeSummary {
    pub recipe: Recipe,
    pub tag_ids: Vec<i64>,
    pub ingredient_ids: Vec<i64>,
}

/// Recipe with its tags and ingredients expanded
#[derive(Debug, Clone)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub tags: Vec<Attribute>,
    pub ingredients: Vec<Attribute>,
}

/// Input for creating a recipe
#[derive(Debug, Clone)]
pub struct CreateRecipe {
    pub title: String,
    pub price: Decimal,
    pub time_minutes: i32,
    pub link: String,
    pub tag_ids: Vec<i64>,
    pub ingredient_ids: Vec<i64>,
}

/// Input for updating a recipe
///
/// `None` leaves a field untouched. For the relation lists, `Some(vec![])`
/// detaches everything; a full update passes `Some` for both lists.
#[derive(Debug, Clone, Default)]
pub struct UpdateRecipe {
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub time_minutes: Option<i32>,
    pub link: Option<String>,
    pub tag_ids: Option<Vec<i64>>,
    pub ingredient_ids: Option<Vec<i64>>,
}

/// List filter; a recipe matches when it carries any of the given ids
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub tag_ids: Option<Vec<i64>>,
    pub ingredient_ids: Option<Vec<i64>>,
}

/// Result of attaching an image to a recipe
#[derive(Debug, Clone)]
pub struct ImageSwap {
    pub recipe: Recipe,

    /// Image that was replaced, if any; the caller removes the file
    pub previous: Option<String>,
}

impl Recipe {
    /// Creates a recipe and its relations in one transaction
    pub async fn create(
        pool: &PgPool,
        owner_id: i64,
        data: CreateRecipe,
    ) -> Result<RecipeSummary, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO recipes (user_id, title, price, time_minutes, link)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {RECIPE_COLUMNS}"
        );

        let recipe = sqlx::query_as::<_, Recipe>(&query)
            .bind(owner_id)
            .bind(&data.title)
            .bind(data.price)
            .bind(data.time_minutes)
            .bind(&data.link)
            .fetch_one(&mut *tx)
            .await?;

        Attribute::replace_links(&mut tx, AttributeKind::Tag, owner_id, recipe.id, &data.tag_ids)
            .await?;
        Attribute::replace_links(
            &mut tx,
            AttributeKind::Ingredient,
            owner_id,
            recipe.id,
            &data.ingredient_ids,
        )
        .await?;

        let summary = summarize(&mut tx, recipe).await?;
        tx.commit().await?;

        debug!(recipe_id = summary.recipe.id, owner_id, "Created recipe");
        Ok(summary)
    }

    /// Lists the owner's recipes, newest id first
    pub async fn list(
        pool: &PgPool,
        owner_id: i64,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r
             WHERE r.user_id = $1
               AND ($2::BIGINT[] IS NULL OR EXISTS (
                    SELECT 1 FROM recipe_tags rt
                    WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
               AND ($3::BIGINT[] IS NULL OR EXISTS (
                    SELECT 1 FROM recipe_ingredients ri
                    WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
             ORDER BY r.id DESC"
        );

        let recipes = sqlx::query_as::<_, Recipe>(&query)
            .bind(owner_id)
            .bind(filter.tag_ids.as_deref())
            .bind(filter.ingredient_ids.as_deref())
            .fetch_all(pool)
            .await?;

        let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();
        let mut tags = Attribute::ids_for_recipes(pool, AttributeKind::Tag, &ids).await?;
        let mut ingredients =
            Attribute::ids_for_recipes(pool, AttributeKind::Ingredient, &ids).await?;

        Ok(recipes
            .into_iter()
            .map(|recipe| RecipeSummary {
                tag_ids: tags.remove(&recipe.id).unwrap_or_default(),
                ingredient_ids: ingredients.remove(&recipe.id).unwrap_or_default(),
                recipe,
            })
            .collect())
    }

    /// Finds one of the owner's recipes
    pub async fn find(pool: &PgPool, owner_id: i64, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2");

        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Finds one of the owner's recipes with tags and ingredients expanded
    pub async fn find_detail(
        pool: &PgPool,
        owner_id: i64,
        id: i64,
    ) -> Result<Option<RecipeDetail>, sqlx::Error> {
        let Some(recipe) = Self::find(pool, owner_id, id).await? else {
            return Ok(None);
        };

        let mut tags = Attribute::for_recipes(pool, AttributeKind::Tag, &[recipe.id]).await?;
        let mut ingredients =
            Attribute::for_recipes(pool, AttributeKind::Ingredient, &[recipe.id]).await?;

        Ok(Some(RecipeDetail {
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
            recipe,
        }))
    }

    /// Updates one of the owner's recipes
    ///
    /// Scalar fields and relation lists are written in one transaction.
    ///
    /// # Returns
    ///
    /// The updated recipe, or `None` if the owner has no recipe with this id
    pub async fn update(
        pool: &PgPool,
        owner_id: i64,
        id: i64,
        data: UpdateRecipe,
    ) -> Result<Option<RecipeSummary>, sqlx::Error> {
        let mut query = String::from("UPDATE recipes SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.price.is_some() {
            bind_count += 1;
            query.push_str(&format!(", price = ${}", bind_count));
        }
        if data.time_minutes.is_some() {
            bind_count += 1;
            query.push_str(&format!(", time_minutes = ${}", bind_count));
        }
        if data.link.is_some() {
            bind_count += 1;
            query.push_str(&format!(", link = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND user_id = $2 RETURNING {RECIPE_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Recipe>(&query).bind(id).bind(owner_id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(price) = data.price {
            q = q.bind(price);
        }
        if let Some(time_minutes) = data.time_minutes {
            q = q.bind(time_minutes);
        }
        if let Some(link) = data.link {
            q = q.bind(link);
        }

        let mut tx = pool.begin().await?;

        let Some(recipe) = q.fetch_optional(&mut *tx).await? else {
            return Ok(None);
        };

        if let Some(tag_ids) = data.tag_ids {
            Attribute::replace_links(&mut tx, AttributeKind::Tag, owner_id, recipe.id, &tag_ids)
                .await?;
        }
        if let Some(ingredient_ids) = data.ingredient_ids {
            Attribute::replace_links(
                &mut tx,
                AttributeKind::Ingredient,
                owner_id,
                recipe.id,
                &ingredient_ids,
            )
            .await?;
        }

        let summary = summarize(&mut tx, recipe).await?;
        tx.commit().await?;

        debug!(recipe_id = id, owner_id, "Updated recipe");
        Ok(Some(summary))
    }

    /// Deletes one of the owner's recipes
    ///
    /// # Returns
    ///
    /// The deleted row, so the caller can remove its image file
    pub async fn delete(pool: &PgPool, owner_id: i64, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "DELETE FROM recipes WHERE id = $1 AND user_id = $2 RETURNING {RECIPE_COLUMNS}"
        );

        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Points one of the owner's recipes at a new image
    ///
    /// The row is locked while swapping so concurrent uploads each see the
    /// image they replaced.
    pub async fn replace_image(
        pool: &PgPool,
        owner_id: i64,
        id: i64,
        image: &str,
    ) -> Result<Option<ImageSwap>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let previous: Option<Option<String>> = sqlx::query_scalar(
            "SELECT image FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(previous) = previous else {
            return Ok(None);
        };

        let query = format!(
            "UPDATE recipes SET image = $3, updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {RECIPE_COLUMNS}"
        );

        let recipe = sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .bind(owner_id)
            .bind(image)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(ImageSwap { recipe, previous }))
    }
}

/// Loads relation ids for a single recipe inside a transaction
async fn summarize(conn: &mut PgConnection, recipe: Recipe) -> Result<RecipeSummary, sqlx::Error> {
    let tag_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT tag_id FROM recipe_tags WHERE recipe_id = $1 ORDER BY tag_id",
    )
    .bind(recipe.id)
    .fetch_all(&mut *conn)
    .await?;

    let ingredient_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT ingredient_id FROM recipe_ingredients WHERE recipe_id = $1 ORDER BY ingredient_id",
    )
    .bind(recipe.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(RecipeSummary {
        recipe,
        tag_ids,
        ingredient_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_recipe_default_touches_nothing() {
        let update = UpdateRecipe::default();
        assert!(update.title.is_none());
        assert!(update.price.is_none());
        assert!(update.time_minutes.is_none());
        assert!(update.link.is_none());
        assert!(update.tag_ids.is_none());
        assert!(update.ingredient_ids.is_none());
    }

    #[test]
    fn test_price_serializes_as_string() {
        let recipe = Recipe {
            id: 1,
            user_id: 1,
            title: "patates".to_string(),
            price: Decimal::new(1000, 2),
            time_minutes: 5,
            link: String::new(),
            image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(json["price"], "10.00");
    }
}
