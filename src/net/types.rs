//! Wire DTOs for the EditorialHub REST API.
//!
//! DESIGN
//! ======
//! Field names mirror the server's JSON. The API is not consistent about
//! whether foreign ids are numbers or strings, so those fields accept both
//! and normalize to one Rust type.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// USERS
// =============================================================================

/// The authenticated account as returned by `users/me`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "deserialize_i64_from_any")]
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SignUpRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Plain acknowledgement body, e.g. from `users/logout`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// BLOGS & CATEGORIES
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    #[serde(deserialize_with = "deserialize_i64_from_any")]
    pub id: i64,
    pub blog_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub main_image_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_string_from_any")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_string_from_any")]
    pub default_category_id: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewBlog {
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BlogUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BlogUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// Body of `PATCH blogs/update/`, applied to the signed-in user's blog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BlogSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog_name: Option<String>,
    /// The server spells this key with an upper-case `URL`.
    #[serde(rename = "main_image_URL", skip_serializing_if = "Option::is_none")]
    pub main_image_url: Option<String>,
}

impl BlogSettings {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blog_name.is_none() && self.main_image_url.is_none()
    }
}

/// Response of `POST images/upload/`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ImageUpload {
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "deserialize_i64_from_any")]
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CategoryName {
    pub name: String,
}

// =============================================================================
// POSTS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(deserialize_with = "deserialize_i64_from_any")]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub article_likes: i64,
    #[serde(default)]
    pub article_comments: i64,
    /// Non-zero when the post requires a password.
    #[serde(default)]
    pub protected: i64,
    #[serde(default)]
    pub comments_enabled: i64,
    #[serde(default)]
    pub secret: i64,
    #[serde(default)]
    pub problem_numbers: Vec<i64>,
    #[serde(default, deserialize_with = "deserialize_opt_i64_from_any")]
    pub blog_id: Option<i64>,
    #[serde(default)]
    pub blog_name: String,
    #[serde(default, deserialize_with = "deserialize_opt_i64_from_any")]
    pub category_id: Option<i64>,
}

impl Post {
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.protected != 0
    }
}

/// Body of `POST blogs/{id}/posts/`. Flags go over the wire as 0/1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub description: String,
    pub category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_image_url: Option<String>,
    #[serde(serialize_with = "serialize_flag")]
    pub secret: bool,
    #[serde(serialize_with = "serialize_flag")]
    pub protected: bool,
    #[serde(serialize_with = "serialize_flag")]
    pub comments_enabled: bool,
    pub problem_numbers: Vec<i64>,
}

impl NewPost {
    /// Public post with comments enabled and no problem numbers.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>, category_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            description: String::new(),
            category_id: category_id.into(),
            main_image_url: None,
            secret: false,
            protected: false,
            comments_enabled: true,
            problem_numbers: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_opt_flag")]
    pub secret: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_opt_flag")]
    pub protected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_opt_flag")]
    pub comments_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem_numbers: Option<Vec<i64>>,
}

impl PostUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parse a comma-separated list such as `"1000, 1920,,x"`, skipping blanks
/// and anything that is not a number.
#[must_use]
pub fn parse_problem_numbers(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect()
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_flag<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*flag))
}

#[allow(clippy::ref_option)]
fn serialize_opt_flag<S: Serializer>(flag: &Option<bool>, serializer: S) -> Result<S::Ok, S::Error> {
    match flag {
        Some(flag) => serialize_flag(flag, serializer),
        None => serializer.serialize_none(),
    }
}

/// One page of a paginated article listing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PostPage {
    pub page: u32,
    pub per_page: u32,
    pub total_count: u64,
    pub articles: Vec<Post>,
}

impl PostPage {
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.per_page))
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

/// Whether the current user likes a post.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LikeStatus {
    Flag(bool),
    Object { liked: bool },
}

impl LikeStatus {
    #[must_use]
    pub fn liked(self) -> bool {
        match self {
            Self::Flag(liked) | Self::Object { liked } => liked,
        }
    }
}

// =============================================================================
// LISTING QUERY
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order '{other}' (expected 'asc' or 'desc')")),
        }
    }
}

/// Filters for `blogs/{id}/posts/`. Only set fields reach the query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub problem_number: Option<u32>,
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
}

impl PostQuery {
    /// Query for a 1-based page of `per_page` posts.
    #[must_use]
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            skip: Some(page.max(1).saturating_sub(1).saturating_mul(per_page)),
            limit: Some(per_page),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(skip) = self.skip {
            pairs.push(("skip".to_owned(), skip.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_owned(), limit.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search".to_owned(), search.to_owned()));
        }
        if let Some(category_id) = self.category_id.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("category_id".to_owned(), category_id.to_owned()));
        }
        if let Some(problem_number) = self.problem_number {
            pairs.push(("problem_number".to_owned(), problem_number.to_string()));
        }
        if let Some(sort_by) = self.sort_by.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("sort_by".to_owned(), sort_by.to_owned()));
        }
        if let Some(order) = self.order {
            pairs.push(("order".to_owned(), order.as_str().to_owned()));
        }
        pairs
    }
}

// =============================================================================
// ID DESERIALIZERS
// =============================================================================

fn value_to_i64<E: serde::de::Error>(value: &serde_json::Value) -> Result<i64, E> {
    match value {
        serde_json::Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| E::custom("expected integer id")),
        serde_json::Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| E::custom(format!("expected numeric id, got '{text}'"))),
        _ => Err(E::custom("expected number or numeric string")),
    }
}

fn deserialize_i64_from_any<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    value_to_i64(&value)
}

fn deserialize_opt_i64_from_any<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(ref text) if text.trim().is_empty() => Ok(None),
        other => value_to_i64(&other).map(Some),
    }
}

fn deserialize_opt_string_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(text) => Ok(Some(text)),
        serde_json::Value::Number(number) => Ok(Some(number.to_string())),
        _ => Err(D::Error::custom("expected string or number")),
    }
}
