use serde::Serialize;

use crate::db::TitleRecord;
use crate::entities::{categories, comments, genres, reviews, users};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Request field the error is attributed to, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            field: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            field: None,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct CategoryDto {
    pub name: String,
    pub slug: String,
}

impl From<categories::Model> for CategoryDto {
    fn from(model: categories::Model) -> Self {
        Self {
            name: model.name,
            slug: model.slug,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct GenreDto {
    pub name: String,
    pub slug: String,
}

impl From<genres::Model> for GenreDto {
    fn from(model: genres::Model) -> Self {
        Self {
            name: model.name,
            slug: model.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TitleDto {
    pub id: i32,
    pub name: String,
    pub year: Option<i32>,
    /// Mean review score, absent until the first review lands.
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<GenreDto>,
    pub category: Option<CategoryDto>,
}

impl From<TitleRecord> for TitleDto {
    fn from(record: TitleRecord) -> Self {
        Self {
            id: record.title.id,
            name: record.title.name,
            year: record.title.year,
            rating: record.rating,
            description: record.title.description,
            genre: record.genres.into_iter().map(GenreDto::from).collect(),
            category: record.category.map(CategoryDto::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewDto {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub score: i32,
    pub pub_date: String,
}

impl ReviewDto {
    #[must_use]
    pub fn from_row(review: reviews::Model, author: Option<users::Model>) -> Self {
        Self {
            id: review.id,
            text: review.text,
            author: author.map_or_else(|| "unknown".to_string(), |u| u.username),
            score: review.score,
            pub_date: review.pub_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentDto {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub pub_date: String,
}

impl CommentDto {
    #[must_use]
    pub fn from_row(comment: comments::Model, author: Option<users::Model>) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            author: author.map_or_else(|| "unknown".to_string(), |u| u.username),
            pub_date: comment.pub_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: String,
}

impl From<users::Model> for UserDto {
    fn from(model: users::Model) -> Self {
        Self {
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            bio: model.bio,
            role: model.role,
        }
    }
}
