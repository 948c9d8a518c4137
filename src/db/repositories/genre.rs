use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::{genres, prelude::*, title_genres};

pub struct GenreRepository {
    conn: DatabaseConnection,
}

impl GenreRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<genres::Model>> {
        Genres::find()
            .order_by_asc(genres::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list genres")
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<genres::Model>> {
        Genres::find()
            .filter(genres::Column::Slug.eq(slug))
            .one(&self.conn)
            .await
            .context("Failed to query genre by slug")
    }

    pub async fn get_by_slugs(&self, slugs: &[String]) -> Result<Vec<genres::Model>> {
        Genres::find()
            .filter(genres::Column::Slug.is_in(slugs.iter().cloned()))
            .all(&self.conn)
            .await
            .context("Failed to query genres by slug")
    }

    pub async fn create(&self, name: &str, slug: &str) -> Result<genres::Model> {
        genres::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to create genre")
    }

    /// Deletes the genre and its join rows. Titles keep their other genres.
    pub async fn delete_by_slug(&self, slug: &str) -> Result<bool> {
        let Some(genre) = self.get_by_slug(slug).await? else {
            return Ok(false);
        };

        let txn = self.conn.begin().await?;

        TitleGenres::delete_many()
            .filter(title_genres::Column::GenreId.eq(genre.id))
            .exec(&txn)
            .await?;

        Genres::delete_by_id(genre.id).exec(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }
}
