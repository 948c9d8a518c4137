use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{categories, comments, genres, reviews, users};
use crate::models::user::Role;

pub mod migrator;
pub mod repositories;

pub use repositories::review::ReviewInsert;
pub use repositories::title::{TitleFilter, TitleRecord};
pub use repositories::user::UserPatch;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn category_repo(&self) -> repositories::category::CategoryRepository {
        repositories::category::CategoryRepository::new(self.conn.clone())
    }

    fn genre_repo(&self) -> repositories::genre::GenreRepository {
        repositories::genre::GenreRepository::new(self.conn.clone())
    }

    fn title_repo(&self) -> repositories::title::TitleRepository {
        repositories::title::TitleRepository::new(self.conn.clone())
    }

    fn review_repo(&self) -> repositories::review::ReviewRepository {
        repositories::review::ReviewRepository::new(self.conn.clone())
    }

    fn comment_repo(&self) -> repositories::comment::CommentRepository {
        repositories::comment::CommentRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn list_users(&self, search: Option<&str>) -> Result<Vec<users::Model>> {
        self.user_repo().list(search).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        role: Role,
        is_superuser: bool,
    ) -> Result<users::Model> {
        self.user_repo()
            .create(username, email, role, is_superuser)
            .await
    }

    pub async fn get_or_create_user(&self, username: &str, email: &str) -> Result<users::Model> {
        self.user_repo().get_or_create(username, email).await
    }

    pub async fn update_user(&self, user: users::Model, patch: UserPatch) -> Result<users::Model> {
        self.user_repo().apply_patch(user, patch).await
    }

    pub async fn touch_last_login(&self, user: users::Model) -> Result<users::Model> {
        self.user_repo().touch_last_login(user).await
    }

    pub async fn delete_user(&self, username: &str) -> Result<bool> {
        self.user_repo().delete(username).await
    }

    // ========== Categories / Genres ==========

    pub async fn list_categories(&self) -> Result<Vec<categories::Model>> {
        self.category_repo().list().await
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<categories::Model>> {
        self.category_repo().get_by_slug(slug).await
    }

    pub async fn create_category(&self, name: &str, slug: &str) -> Result<categories::Model> {
        self.category_repo().create(name, slug).await
    }

    pub async fn delete_category(&self, slug: &str) -> Result<bool> {
        self.category_repo().delete_by_slug(slug).await
    }

    pub async fn list_genres(&self) -> Result<Vec<genres::Model>> {
        self.genre_repo().list().await
    }

    pub async fn get_genre_by_slug(&self, slug: &str) -> Result<Option<genres::Model>> {
        self.genre_repo().get_by_slug(slug).await
    }

    pub async fn get_genres_by_slugs(&self, slugs: &[String]) -> Result<Vec<genres::Model>> {
        self.genre_repo().get_by_slugs(slugs).await
    }

    pub async fn create_genre(&self, name: &str, slug: &str) -> Result<genres::Model> {
        self.genre_repo().create(name, slug).await
    }

    pub async fn delete_genre(&self, slug: &str) -> Result<bool> {
        self.genre_repo().delete_by_slug(slug).await
    }

    // ========== Titles ==========

    pub async fn list_titles(&self, filter: &TitleFilter) -> Result<Vec<TitleRecord>> {
        self.title_repo().list(filter).await
    }

    pub async fn get_title(&self, id: i32) -> Result<Option<TitleRecord>> {
        self.title_repo().get(id).await
    }

    pub async fn title_exists(&self, id: i32) -> Result<bool> {
        self.title_repo().exists(id).await
    }

    pub async fn create_title(
        &self,
        name: &str,
        year: Option<i32>,
        description: Option<String>,
        category_id: i32,
        genre_ids: &[i32],
    ) -> Result<i32> {
        self.title_repo()
            .create(name, year, description, category_id, genre_ids)
            .await
    }

    pub async fn update_title(
        &self,
        title: crate::entities::titles::Model,
        name: Option<String>,
        year: Option<Option<i32>>,
        description: Option<Option<String>>,
        category_id: Option<i32>,
        genre_ids: Option<&[i32]>,
    ) -> Result<()> {
        self.title_repo()
            .update(title, name, year, description, category_id, genre_ids)
            .await
    }

    pub async fn delete_title(&self, id: i32) -> Result<bool> {
        self.title_repo().delete(id).await
    }

    // ========== Reviews ==========

    pub async fn list_reviews(
        &self,
        title_id: i32,
    ) -> Result<Vec<(reviews::Model, Option<users::Model>)>> {
        self.review_repo().list_for_title(title_id).await
    }

    pub async fn get_review(
        &self,
        title_id: i32,
        review_id: i32,
    ) -> Result<Option<(reviews::Model, Option<users::Model>)>> {
        self.review_repo().get_scoped(title_id, review_id).await
    }

    pub async fn create_review(
        &self,
        title_id: i32,
        author_id: i32,
        text: &str,
        score: i32,
    ) -> Result<ReviewInsert> {
        self.review_repo()
            .create(title_id, author_id, text, score)
            .await
    }

    pub async fn update_review(
        &self,
        review: reviews::Model,
        text: Option<String>,
        score: Option<i32>,
    ) -> Result<reviews::Model> {
        self.review_repo().update(review, text, score).await
    }

    pub async fn delete_review(&self, review_id: i32) -> Result<()> {
        self.review_repo().delete(review_id).await
    }

    // ========== Comments ==========

    pub async fn list_comments(
        &self,
        review_id: i32,
    ) -> Result<Vec<(comments::Model, Option<users::Model>)>> {
        self.comment_repo().list_for_review(review_id).await
    }

    pub async fn get_comment(
        &self,
        review_id: i32,
        comment_id: i32,
    ) -> Result<Option<(comments::Model, Option<users::Model>)>> {
        self.comment_repo().get_scoped(review_id, comment_id).await
    }

    pub async fn create_comment(
        &self,
        review_id: i32,
        author_id: i32,
        text: &str,
    ) -> Result<comments::Model> {
        self.comment_repo().create(review_id, author_id, text).await
    }

    pub async fn update_comment(
        &self,
        comment: comments::Model,
        text: String,
    ) -> Result<comments::Model> {
        self.comment_repo().update(comment, text).await
    }

    pub async fn delete_comment(&self, comment_id: i32) -> Result<()> {
        self.comment_repo().delete(comment_id).await
    }
}
