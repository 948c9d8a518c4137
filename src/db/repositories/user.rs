use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::{comments, prelude::*, reviews, users};
use crate::models::user::Role;

/// Field updates applied to an existing user. `None` leaves the column
/// untouched; `role` is already stripped for non-admin actors by the time a
/// patch reaches the repository.
#[derive(Debug, Default, Clone)]
pub struct UserPatch {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub bio: Option<Option<String>>,
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        Users::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by id")
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")
    }

    /// List users ordered by username, optionally filtered by a username
    /// substring.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<users::Model>> {
        let mut query = Users::find().order_by_asc(users::Column::Username);

        if let Some(term) = search {
            query = query.filter(users::Column::Username.contains(term));
        }

        query.all(&self.conn).await.context("Failed to list users")
    }

    pub async fn create(
        &self,
        username: &str,
        email: &str,
        role: Role,
        is_superuser: bool,
    ) -> Result<users::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let user = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            role: Set(role.as_str().to_string()),
            is_superuser: Set(is_superuser),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to create user")?;

        Ok(user)
    }

    /// Idempotent signup primitive: returns the existing user for this
    /// (username, email) pair or creates one. Binding conflicts are checked
    /// by the signup service before this runs.
    pub async fn get_or_create(&self, username: &str, email: &str) -> Result<users::Model> {
        if let Some(user) = self.get_by_username(username).await? {
            return Ok(user);
        }
        self.create(username, email, Role::User, false).await
    }

    pub async fn apply_patch(&self, user: users::Model, patch: UserPatch) -> Result<users::Model> {
        let mut active: users::ActiveModel = user.into();

        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(role) = patch.role {
            active.role = Set(role.as_str().to_string());
        }
        if let Some(bio) = patch.bio {
            active.bio = Set(bio);
        }
        if let Some(first_name) = patch.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = patch.last_name {
            active.last_name = Set(last_name);
        }

        active
            .update(&self.conn)
            .await
            .context("Failed to update user")
    }

    /// Records a successful token exchange. Confirmation codes are bound to
    /// `last_login`, so this also retires the code that was just used.
    pub async fn touch_last_login(&self, user: users::Model) -> Result<users::Model> {
        let mut active: users::ActiveModel = user.into();
        active.last_login = Set(Some(chrono::Utc::now().to_rfc3339()));
        active
            .update(&self.conn)
            .await
            .context("Failed to record login time")
    }

    /// Removes a user together with everything they authored: their
    /// comments, their reviews, and the comments under those reviews. Runs
    /// in one transaction so a half-deleted author is never observable.
    pub async fn delete(&self, username: &str) -> Result<bool> {
        let Some(user) = self.get_by_username(username).await? else {
            return Ok(false);
        };

        let txn = self.conn.begin().await?;

        let review_ids: Vec<i32> = Reviews::find()
            .filter(reviews::Column::AuthorId.eq(user.id))
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

        Comments::delete_many()
            .filter(comments::Column::AuthorId.eq(user.id))
            .exec(&txn)
            .await?;

        Reviews::delete_many()
            .filter(reviews::Column::AuthorId.eq(user.id))
            .exec(&txn)
            .await?;

        Users::delete_by_id(user.id).exec(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }
}
