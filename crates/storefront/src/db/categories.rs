//! Category repository. Product counts are derived on every read.

use sqlx::PgPool;

use pawfect_core::CategoryId;
use pawfect_core::catalog::Category;

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
    description: Option<String>,
    image: Option<String>,
    product_count: i64,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            image: row.image,
            product_count: row.product_count,
        }
    }
}

const CATEGORY_SELECT: &str = r"
    SELECT c.id, c.name, c.slug, c.description, c.image,
           COUNT(p.id) AS product_count
    FROM categories c
    LEFT JOIN products p ON p.category_id = c.id
";

pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories with their product counts, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as(&format!("{CATEGORY_SELECT} GROUP BY c.id ORDER BY c.name"))
                .fetch_all(self.pool)
                .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "{CATEGORY_SELECT} WHERE c.slug = $1 GROUP BY c.id"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    /// Insert a category, or update it when the slug exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        name: &str,
        slug: &str,
        description: Option<&str>,
        image: Option<&str>,
    ) -> Result<CategoryId, RepositoryError> {
        let id: CategoryId = sqlx::query_scalar(
            r"
            INSERT INTO categories (name, slug, description, image)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (slug) DO UPDATE
                SET name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    image = EXCLUDED.image
            RETURNING id
            ",
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(image)
        .fetch_one(self.pool)
        .await?;
        Ok(id)
    }
}
