use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::{categories, prelude::*, titles};

pub struct CategoryRepository {
    conn: DatabaseConnection,
}

impl CategoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<categories::Model>> {
        Categories::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list categories")
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<categories::Model>> {
        Categories::find()
            .filter(categories::Column::Slug.eq(slug))
            .one(&self.conn)
            .await
            .context("Failed to query category by slug")
    }

    pub async fn create(&self, name: &str, slug: &str) -> Result<categories::Model> {
        categories::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to create category")
    }

    /// Deletes the category and clears the reference on its titles. Titles
    /// themselves are left intact.
    pub async fn delete_by_slug(&self, slug: &str) -> Result<bool> {
        let Some(category) = self.get_by_slug(slug).await? else {
            return Ok(false);
        };

        let txn = self.conn.begin().await?;

        Titles::update_many()
            .col_expr(titles::Column::CategoryId, sea_orm::sea_query::Expr::value(None::<i32>))
            .filter(titles::Column::CategoryId.eq(category.id))
            .exec(&txn)
            .await?;

        Categories::delete_by_id(category.id).exec(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }
}
