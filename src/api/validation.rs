use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;

use crate::constants::auth::RESERVED_USERNAME;
use crate::constants::limits;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    if username.len() > limits::USERNAME_MAX_LENGTH {
        return Err(format!(
            "Username must be {} characters or less",
            limits::USERNAME_MAX_LENGTH
        ));
    }
    if username.eq_ignore_ascii_case(RESERVED_USERNAME) {
        return Err(format!("Username '{RESERVED_USERNAME}' is reserved"));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(
            "Username may only contain letters, digits, and @/./+/-/_ characters".to_string(),
        );
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if email.len() > limits::EMAIL_MAX_LENGTH {
        return Err(format!(
            "Email must be {} characters or less",
            limits::EMAIL_MAX_LENGTH
        ));
    }
    if !EMAIL_RE.is_match(email) {
        return Err("Enter a valid email address".to_string());
    }
    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.is_empty() {
        return Err("Slug cannot be empty".to_string());
    }
    if slug.len() > limits::SLUG_MAX_LENGTH {
        return Err(format!(
            "Slug must be {} characters or less",
            limits::SLUG_MAX_LENGTH
        ));
    }
    if !SLUG_RE.is_match(slug) {
        return Err("Slug may only contain letters, digits, hyphens, and underscores".to_string());
    }
    Ok(())
}

pub fn validate_score(score: i32) -> Result<(), String> {
    if !(limits::SCORE_MIN..=limits::SCORE_MAX).contains(&score) {
        return Err(format!(
            "Score must be between {} and {}",
            limits::SCORE_MIN,
            limits::SCORE_MAX
        ));
    }
    Ok(())
}

/// Publication years in the future are rejected.
pub fn validate_year(year: i32) -> Result<(), String> {
    let current = chrono::Utc::now().year();
    if year > current {
        return Err(format!("Year cannot be later than {current}"));
    }
    Ok(())
}
