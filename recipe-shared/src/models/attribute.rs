/// Tags and ingredients
///
/// Both are `{id, name}` records owned by a user and attached to recipes
/// through a join table. They share every query here; [`AttributeKind`]
/// says which tables a call operates on, so no query has a default table.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tags (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL CHECK (name <> ''),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE recipe_tags (
///     recipe_id BIGINT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
///     tag_id BIGINT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
///     PRIMARY KEY (recipe_id, tag_id)
/// );
/// ```
///
/// `ingredients` / `recipe_ingredients` have the same shape.
///
/// # Example
///
/// ```no_run
/// use recipe_shared::models::attribute::{Attribute, AttributeKind};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, owner_id: i64) -> Result<(), sqlx::Error> {
/// Attribute::create(&pool, AttributeKind::Tag, owner_id, "Vegan").await?;
///
/// // Only tags used by at least one of the owner's recipes
/// let used = Attribute::list(&pool, AttributeKind::Tag, owner_id, true).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Which attribute table a query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Tag,
    Ingredient,
}

impl AttributeKind {
    /// Entity table
    pub fn table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }

    /// Recipe join table
    pub fn link_table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "recipe_tags",
            AttributeKind::Ingredient => "recipe_ingredients",
        }
    }

    /// Foreign key column in the join table
    pub fn link_column(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag_id",
            AttributeKind::Ingredient => "ingredient_id",
        }
    }

    /// Field name used in recipe payloads
    pub fn field(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKind::Tag => write!(f, "tag"),
            AttributeKind::Ingredient => write!(f, "ingredient"),
        }
    }
}

/// A tag or an ingredient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attribute {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Attribute row joined with the recipe it is attached to
#[derive(Debug, sqlx::FromRow)]
struct LinkedAttribute {
    recipe_id: i64,
    #[sqlx(flatten)]
    attribute: Attribute,
}

impl Attribute {
    /// Lists the owner's attributes, name descending
    ///
    /// With `assigned_only`, only attributes attached to at least one of the
    /// owner's recipes are returned. Each appears once however many recipes
    /// use it.
    pub async fn list(
        pool: &PgPool,
        kind: AttributeKind,
        owner_id: i64,
        assigned_only: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!(
            "SELECT a.id, a.user_id, a.name, a.created_at FROM {table} a WHERE a.user_id = $1",
            table = kind.table(),
        );

        if assigned_only {
            query.push_str(&format!(
                " AND EXISTS (
                    SELECT 1 FROM {link} l
                    JOIN recipes r ON r.id = l.recipe_id
                    WHERE l.{column} = a.id AND r.user_id = $1
                )",
                link = kind.link_table(),
                column = kind.link_column(),
            ));
        }

        query.push_str(" ORDER BY a.name DESC, a.id DESC");

        sqlx::query_as::<_, Attribute>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// Creates an attribute owned by `owner_id`
    pub async fn create(
        pool: &PgPool,
        kind: AttributeKind,
        owner_id: i64,
        name: &str,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO {table} (user_id, name) VALUES ($1, $2)
             RETURNING id, user_id, name, created_at",
            table = kind.table(),
        );

        sqlx::query_as::<_, Attribute>(&query)
            .bind(owner_id)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    /// Finds one of the owner's attributes
    ///
    /// Another user's record is reported as `None`.
    pub async fn find(
        pool: &PgPool,
        kind: AttributeKind,
        owner_id: i64,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT id, user_id, name, created_at FROM {table} WHERE id = $1 AND user_id = $2",
            table = kind.table(),
        );

        sqlx::query_as::<_, Attribute>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Renames one of the owner's attributes
    pub async fn rename(
        pool: &PgPool,
        kind: AttributeKind,
        owner_id: i64,
        id: i64,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE {table} SET name = $3 WHERE id = $1 AND user_id = $2
             RETURNING id, user_id, name, created_at",
            table = kind.table(),
        );

        sqlx::query_as::<_, Attribute>(&query)
            .bind(id)
            .bind(owner_id)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Deletes one of the owner's attributes, detaching it from recipes
    ///
    /// # Returns
    ///
    /// True if a row was deleted
    pub async fn delete(
        pool: &PgPool,
        kind: AttributeKind,
        owner_id: i64,
        id: i64,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "DELETE FROM {table} WHERE id = $1 AND user_id = $2",
            table = kind.table(),
        );

        let result = sqlx::query(&query)
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns the ids in `ids` that the owner does not have
    ///
    /// Order follows `ids`; duplicates are reported once.
    pub async fn missing_ids(
        pool: &PgPool,
        kind: AttributeKind,
        owner_id: i64,
        ids: &[i64],
    ) -> Result<Vec<i64>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT id FROM {table} WHERE user_id = $1 AND id = ANY($2)",
            table = kind.table(),
        );

        let found: HashSet<i64> = sqlx::query_scalar::<_, i64>(&query)
            .bind(owner_id)
            .bind(ids)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

        let mut seen = HashSet::new();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id) && seen.insert(*id))
            .collect())
    }

    /// Loads the attributes attached to each of `recipe_ids`
    ///
    /// Attributes come back in id order within each recipe.
    pub async fn for_recipes(
        pool: &PgPool,
        kind: AttributeKind,
        recipe_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Self>>, sqlx::Error> {
        if recipe_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = format!(
            "SELECT l.recipe_id, a.id, a.user_id, a.name, a.created_at
             FROM {link} l
             JOIN {table} a ON a.id = l.{column}
             WHERE l.recipe_id = ANY($1)
             ORDER BY l.recipe_id, a.id",
            link = kind.link_table(),
            table = kind.table(),
            column = kind.link_column(),
        );

        let rows = sqlx::query_as::<_, LinkedAttribute>(&query)
            .bind(recipe_ids)
            .fetch_all(pool)
            .await?;

        let mut grouped: HashMap<i64, Vec<Self>> = HashMap::new();
        for row in rows {
            grouped.entry(row.recipe_id).or_default().push(row.attribute);
        }

        Ok(grouped)
    }

    /// Loads the attribute ids attached to each of `recipe_ids`
    pub async fn ids_for_recipes(
        pool: &PgPool,
        kind: AttributeKind,
        recipe_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<i64>>, sqlx::Error> {
        if recipe_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = format!(
            "SELECT recipe_id, {column} FROM {link}
             WHERE recipe_id = ANY($1)
             ORDER BY recipe_id, {column}",
            link = kind.link_table(),
            column = kind.link_column(),
        );

        let rows: Vec<(i64, i64)> = sqlx::query_as(&query)
            .bind(recipe_ids)
            .fetch_all(pool)
            .await?;

        let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
        for (recipe_id, id) in rows {
            grouped.entry(recipe_id).or_default().push(id);
        }

        Ok(grouped)
    }

    /// Replaces the attributes attached to a recipe
    ///
    /// Runs on the caller's transaction. Ids the owner does not have are
    /// skipped; callers validate them beforehand with [`Attribute::missing_ids`].
    pub async fn replace_links(
        conn: &mut PgConnection,
        kind: AttributeKind,
        owner_id: i64,
        recipe_id: i64,
        ids: &[i64],
    ) -> Result<(), sqlx::Error> {
        let delete = format!(
            "DELETE FROM {link} WHERE recipe_id = $1",
            link = kind.link_table(),
        );
        sqlx::query(&delete).bind(recipe_id).execute(&mut *conn).await?;

        if ids.is_empty() {
            return Ok(());
        }

        let insert = format!(
            "INSERT INTO {link} (recipe_id, {column})
             SELECT $1, a.id FROM {table} a
             WHERE a.user_id = $2 AND a.id = ANY($3)
             ON CONFLICT DO NOTHING",
            link = kind.link_table(),
            column = kind.link_column(),
            table = kind.table(),
        );
        sqlx::query(&insert)
            .bind(recipe_id)
            .bind(owner_id)
            .bind(ids)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
