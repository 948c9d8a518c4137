use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{comments, prelude::*, users};

pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_review(
        &self,
        review_id: i32,
    ) -> Result<Vec<(comments::Model, Option<users::Model>)>> {
        Comments::find()
            .filter(comments::Column::ReviewId.eq(review_id))
            .order_by_desc(comments::Column::PubDate)
            .find_also_related(Users)
            .all(&self.conn)
            .await
            .context("Failed to list comments")
    }

    pub async fn get_scoped(
        &self,
        review_id: i32,
        comment_id: i32,
    ) -> Result<Option<(comments::Model, Option<users::Model>)>> {
        Comments::find_by_id(comment_id)
            .filter(comments::Column::ReviewId.eq(review_id))
            .find_also_related(Users)
            .one(&self.conn)
            .await
            .context("Failed to query comment")
    }

    pub async fn create(
        &self,
        review_id: i32,
        author_id: i32,
        text: &str,
    ) -> Result<comments::Model> {
        comments::ActiveModel {
            review_id: Set(review_id),
            author_id: Set(author_id),
            text: Set(text.to_string()),
            pub_date: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to create comment")
    }

    pub async fn update(&self, comment: comments::Model, text: String) -> Result<comments::Model> {
        let mut active: comments::ActiveModel = comment.into();
        active.text = Set(text);
        active
            .update(&self.conn)
            .await
            .context("Failed to update comment")
    }

    pub async fn delete(&self, comment_id: i32) -> Result<()> {
        Comments::delete_by_id(comment_id)
            .exec(&self.conn)
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }
}
