use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};

use crate::entities::{comments, prelude::*, reviews, users};

/// Outcome of a review insert. The (title, author) pair is guarded twice:
/// a pre-check inside the transaction gives the friendly error, and the
/// unique index is the authoritative guard against concurrent inserts.
#[derive(Debug)]
pub enum ReviewInsert {
    Created(reviews::Model),
    Duplicate,
}

pub struct ReviewRepository {
    conn: DatabaseConnection,
}

impl ReviewRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Reviews of a title, newest first, with their authors.
    pub async fn list_for_title(
        &self,
        title_id: i32,
    ) -> Result<Vec<(reviews::Model, Option<users::Model>)>> {
        Reviews::find()
            .filter(reviews::Column::TitleId.eq(title_id))
            .order_by_desc(reviews::Column::PubDate)
            .find_also_related(Users)
            .all(&self.conn)
            .await
            .context("Failed to list reviews")
    }

    /// A review is only addressable under its own title; a matching id under
    /// a different title is treated as absent.
    pub async fn get_scoped(
        &self,
        title_id: i32,
        review_id: i32,
    ) -> Result<Option<(reviews::Model, Option<users::Model>)>> {
        Reviews::find_by_id(review_id)
            .filter(reviews::Column::TitleId.eq(title_id))
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query review")
    }

    pub async fn create(
        &self,
        title_id: i32,
        author_id: i32,
        text: &str,
        score: i32,
    ) -> Result<ReviewInsert> {
        let txn = self.conn.begin().await?;

        let existing = Reviews::find()
            .filter(reviews::Column::TitleId.eq(title_id))
            .filter(reviews::Column::AuthorId.eq(author_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            txn.rollback().await?;
            return Ok(ReviewInsert::Duplicate);
        }

        let result = reviews::ActiveModel {
            title_id: Set(title_id),
            author_id: Set(author_id),
            text: Set(text.to_string()),
            score: Set(score),
            pub_date: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        match result {
            Ok(review) => {
                txn.commit().await?;
                Ok(ReviewInsert::Created(review))
            }
            // A concurrent request won the race between our pre-check and
            // the insert; the unique index caught it.
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                txn.rollback().await?;
                Ok(ReviewInsert::Duplicate)
            }
            Err(err) => {
                txn.rollback().await?;
                Err(err).context("Failed to create review")
            }
        }
    }

    /// Only text and score are mutable; `pub_date` is set once at creation.
    pub async fn update(
        &self,
        review: reviews::Model,
        text: Option<String>,
        score: Option<i32>,
    ) -> Result<reviews::Model> {
        let mut active: reviews::ActiveModel = review.into();
        if let Some(text) = text {
            active.text = Set(text);
        }
        if let Some(score) = score {
            active.score = Set(score);
        }
        active
            .update(&self.conn)
            .await
            .context("Failed to update review")
    }

    /// Deletes a review and its comments in one transaction.
    pub async fn delete(&self, review_id: i32) -> Result<()> {
        let txn = self.conn.begin().await?;

        Comments::delete_many()
            .filter(comments::Column::ReviewId.eq(review_id))
            .exec(&txn)
            .await?;

        Reviews::delete_by_id(review_id).exec(&txn).await?;

        txn.commit().await?;
        Ok(())
    }
}
