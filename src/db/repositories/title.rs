use std::collections::HashMap;

use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

use crate::entities::{categories, comments, genres, prelude::*, reviews, title_genres, titles};

/// A title joined with everything its representation needs: the nullable
/// category, the genre set, and the review-score mean (`None` when the
/// title has no reviews, never zero).
#[derive(Debug, Clone)]
pub struct TitleRecord {
    pub title: titles::Model,
    pub category: Option<categories::Model>,
    pub genres: Vec<genres::Model>,
    pub rating: Option<f64>,
}

/// Exact-match filters except `name`, which is a case-insensitive
/// substring match.
#[derive(Debug, Default, Clone)]
pub struct TitleFilter {
    pub category_slug: Option<String>,
    pub genre_slug: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
}

pub struct TitleRepository {
    conn: DatabaseConnection,
}

impl TitleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, filter: &TitleFilter) -> Result<Vec<TitleRecord>> {
        let mut query = Titles::find().order_by_asc(titles::Column::Name);

        if let Some(slug) = &filter.category_slug {
            let Some(category) = Categories::find()
                .filter(categories::Column::Slug.eq(slug))
                .one(&self.conn)
                .await?
            else {
                return Ok(vec![]);
            };
            query = query.filter(titles::Column::CategoryId.eq(category.id));
        }

        if let Some(slug) = &filter.genre_slug {
            let Some(genre) = Genres::find()
                .filter(genres::Column::Slug.eq(slug))
                .one(&self.conn)
                .await?
            else {
                return Ok(vec![]);
            };
            let title_ids: Vec<i32> = TitleGenres::find()
                .filter(title_genres::Column::GenreId.eq(genre.id))
                .all(&self.conn)
                .await?
                .into_iter()
                .map(|tg| tg.title_id)
                .collect();
            query = query.filter(titles::Column::Id.is_in(title_ids));
        }

        if let Some(name) = &filter.name {
            // SQLite LIKE is already case-insensitive for ASCII.
            query = query.filter(titles::Column::Name.contains(name));
        }

        if let Some(year) = filter.year {
            query = query.filter(titles::Column::Year.eq(year));
        }

        let models = query.all(&self.conn).await.context("Failed to list titles")?;
        self.assemble(models).await
    }

    pub async fn get(&self, id: i32) -> Result<Option<TitleRecord>> {
        let Some(model) = Titles::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };
        Ok(self.assemble(vec![model]).await?.into_iter().next())
    }

    pub async fn exists(&self, id: i32) -> Result<bool> {
        Ok(Titles::find_by_id(id).one(&self.conn).await?.is_some())
    }

    pub async fn create(
        &self,
        name: &str,
        year: Option<i32>,
        description: Option<String>,
        category_id: i32,
        genre_ids: &[i32],
    ) -> Result<i32> {
        let txn = self.conn.begin().await?;

        let inserted = Titles::insert(titles::ActiveModel {
            name: Set(name.to_string()),
            year: Set(year),
            description: Set(description),
            category_id: Set(Some(category_id)),
            ..Default::default()
        })
        .exec(&txn)
        .await?;

        let title_id = inserted.last_insert_id;
        Self::link_genres(&txn, title_id, genre_ids).await?;

        txn.commit().await?;
        Ok(title_id)
    }

    pub async fn update(
        &self,
        title: titles::Model,
        name: Option<String>,
        year: Option<Option<i32>>,
        description: Option<Option<String>>,
        category_id: Option<i32>,
        genre_ids: Option<&[i32]>,
    ) -> Result<()> {
        let txn = self.conn.begin().await?;
        let title_id = title.id;

        let mut active: titles::ActiveModel = title.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(year) = year {
            active.year = Set(year);
        }
        if let Some(description) = description {
            active.description = Set(description);
        }
        if let Some(category_id) = category_id {
            active.category_id = Set(Some(category_id));
        }
        active.update(&txn).await?;

        if let Some(genre_ids) = genre_ids {
            TitleGenres::delete_many()
                .filter(title_genres::Column::TitleId.eq(title_id))
                .exec(&txn)
                .await?;
            Self::link_genres(&txn, title_id, genre_ids).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// Deletes a title and, transitively, its reviews and their comments in
    /// one transaction.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        if !self.exists(id).await? {
            return Ok(false);
        }

        let txn = self.conn.begin().await?;

        let review_ids: Vec<i32> = Reviews::find()
            .filter(reviews::Column::TitleId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();

        if !review_ids.is_empty() {
            Comments::delete_many()
                .filter(comments::Column::ReviewId.is_in(review_ids))
                .exec(&txn)
                .await?;
        }

        Reviews::delete_many()
            .filter(reviews::Column::TitleId.eq(id))
            .exec(&txn)
            .await?;

        TitleGenres::delete_many()
            .filter(title_genres::Column::TitleId.eq(id))
            .exec(&txn)
            .await?;

        Titles::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }

    async fn link_genres(
        txn: &sea_orm::DatabaseTransaction,
        title_id: i32,
        genre_ids: &[i32],
    ) -> Result<()> {
        if genre_ids.is_empty() {
            return Ok(());
        }

        let links: Vec<title_genres::ActiveModel> = genre_ids
            .iter()
            .map(|genre_id| title_genres::ActiveModel {
                title_id: Set(title_id),
                genre_id: Set(*genre_id),
                ..Default::default()
            })
            .collect();

        TitleGenres::insert_many(links).exec(txn).await?;
        Ok(())
    }

    /// Batch-resolves categories, genres, and ratings for a page of titles.
    async fn assemble(&self, models: Vec<titles::Model>) -> Result<Vec<TitleRecord>> {
        if models.is_empty() {
            return Ok(vec![]);
        }

        let title_ids: Vec<i32> = models.iter().map(|t| t.id).collect();

        let category_ids: Vec<i32> = models.iter().filter_map(|t| t.category_id).collect();
        let categories_by_id: HashMap<i32, categories::Model> = Categories::find()
            .filter(categories::Column::Id.is_in(category_ids))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let links = TitleGenres::find()
            .filter(title_genres::Column::TitleId.is_in(title_ids.clone()))
            .all(&self.conn)
            .await?;
        let genre_ids: Vec<i32> = links.iter().map(|l| l.genre_id).collect();
        let genres_by_id: HashMap<i32, genres::Model> = Genres::find()
            .filter(genres::Column::Id.is_in(genre_ids))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect();

        let mut genres_by_title: HashMap<i32, Vec<genres::Model>> = HashMap::new();
        for link in links {
            if let Some(genre) = genres_by_id.get(&link.genre_id) {
                genres_by_title
                    .entry(link.title_id)
                    .or_default()
                    .push(genre.clone());
            }
        }

        let ratings: HashMap<i32, f64> = Reviews::find()
            .select_only()
            .column(reviews::Column::TitleId)
            .expr_as(
                Func::avg(Expr::col((reviews::Entity, reviews::Column::Score))),
                "rating",
            )
            .filter(reviews::Column::TitleId.is_in(title_ids))
            .group_by(reviews::Column::TitleId)
            .into_tuple::<(i32, Option<f64>)>()
            .all(&self.conn)
            .await?
            .into_iter()
            .filter_map(|(title_id, rating)| rating.map(|r| (title_id, r)))
            .collect();

        Ok(models
            .into_iter()
            .map(|title| {
                let category = title
                    .category_id
                    .and_then(|id| categories_by_id.get(&id).cloned());
                let mut genres = genres_by_title.remove(&title.id).unwrap_or_default();
                genres.sort_by(|a, b| a.name.cmp(&b.name));
                let rating = ratings.get(&title.id).copied();

                TitleRecord {
                    title,
                    category,
                    genres,
                    rating,
                }
            })
            .collect())
    }
}
