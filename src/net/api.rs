//! Typed EditorialHub endpoints on top of [`SessionClient`].
//!
//! SYSTEM CONTEXT
//! ==============
//! Account endpoints that run before a session exists (sign-up, sign-in,
//! refresh) go out anonymously so a 401 there is reported with the server's
//! message instead of being treated as an expired session. Everything else
//! rides the session client's refresh-and-replay path.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use super::client::{ApiCall, SessionClient};
use serde_json::Value;

use super::transport::FileUpload;
use super::types::{
    Blog, BlogSettings, BlogUpdate, Category, CategoryName, ImageUpload, LikeStatus, Message, NewBlog, NewPost, Post,
    PostPage, PostQuery, PostUpdate, RefreshRequest, SignInRequest, SignUpRequest, User,
};
use crate::error::ApiError;
use crate::state::tokens::TokenPair;

pub const SIGNUP_PATH: &str = "users/signup";
pub const SIGNIN_PATH: &str = "users/signin";
pub const LOGOUT_PATH: &str = "users/logout";
pub const CURRENT_USER_PATH: &str = "users/me";
pub const BLOGS_PATH: &str = "blogs/";
pub const MY_BLOG_PATH: &str = "blogs/me";
pub const BLOG_SETTINGS_PATH: &str = "blogs/update/";
pub const IMAGE_UPLOAD_PATH: &str = "images/upload/";

fn blog_endpoint(blog_id: i64) -> String {
    format!("blogs/{blog_id}")
}

fn categories_endpoint(blog_id: i64) -> String {
    format!("blogs/{blog_id}/categories/")
}

fn category_endpoint(blog_id: i64, category_id: i64) -> String {
    format!("blogs/{blog_id}/categories/{category_id}")
}

fn posts_endpoint(blog_id: i64) -> String {
    format!("blogs/{blog_id}/posts/")
}

fn post_endpoint(blog_id: i64, post_id: i64) -> String {
    format!("blogs/{blog_id}/posts/{post_id}")
}

fn post_action_endpoint(blog_id: i64, post_id: i64, action: &str) -> String {
    format!("blogs/{blog_id}/posts/{post_id}/{action}")
}

// =============================================================================
// USERS
// =============================================================================

/// Register a new account via `POST users/signup`.
///
/// # Errors
///
/// Returns the server's message (e.g. duplicate email) as [`ApiError::Server`].
pub async fn sign_up(client: &SessionClient, request: &SignUpRequest) -> Result<User, ApiError> {
    client
        .send(ApiCall::post(SIGNUP_PATH).json(request)?.anonymous())
        .await
}

/// Exchange credentials for a token pair via `POST users/signin` and persist it.
///
/// # Errors
///
/// Returns the server's message on rejected credentials, or
/// [`ApiError::Storage`] if the pair cannot be persisted.
pub async fn sign_in(client: &SessionClient, request: &SignInRequest) -> Result<TokenPair, ApiError> {
    let tokens: TokenPair = client
        .send(ApiCall::post(SIGNIN_PATH).json(request)?.anonymous())
        .await?;
    client.session().store_tokens(&tokens)?;
    tracing::info!(email = %request.email, "signed in");
    Ok(tokens)
}

/// Exchange a refresh token for a new pair via `POST users/refresh`.
/// The result is not persisted; see [`SessionClient::refresh_session`] for that.
///
/// # Errors
///
/// Returns the normalized server error when the refresh token is rejected.
pub async fn refresh(client: &SessionClient, request: &RefreshRequest) -> Result<TokenPair, ApiError> {
    client.request_refresh(&request.refresh_token).await
}

/// Revoke the stored refresh token via `POST users/logout`.
///
/// Stored tokens are left alone; dropping them is the caller's job so it
/// happens whatever this call returns.
///
/// # Errors
///
/// Returns [`ApiError::SessionExpired`] without a network call when no
/// session is stored, or the normalized server error.
pub async fn log_out(client: &SessionClient) -> Result<Message, ApiError> {
    let Some(tokens) = client.session().tokens()? else {
        return Err(ApiError::SessionExpired);
    };
    let call = ApiCall::post(LOGOUT_PATH)
        .json(&RefreshRequest { refresh_token: tokens.refresh_token })?
        .bearer(tokens.access_token)
        .anonymous();
    client.send(call).await
}

/// Fetch the authenticated account via `GET users/me`.
///
/// # Errors
///
/// Returns [`ApiError::SessionExpired`] once refresh-and-replay is exhausted.
pub async fn current_user(client: &SessionClient) -> Result<User, ApiError> {
    client.send(ApiCall::get(CURRENT_USER_PATH)).await
}

// =============================================================================
// BLOGS
// =============================================================================

/// # Errors
///
/// Returns the normalized server error.
pub async fn create_blog(client: &SessionClient, blog: &NewBlog) -> Result<Blog, ApiError> {
    client.send(ApiCall::post(BLOGS_PATH).json(blog)?).await
}

/// # Errors
///
/// Returns the normalized server error.
pub async fn list_blogs(client: &SessionClient) -> Result<Vec<Blog>, ApiError> {
    client.send(ApiCall::get(BLOGS_PATH)).await
}

/// # Errors
///
/// Returns the normalized server error.
pub async fn fetch_blog(client: &SessionClient, blog_id: i64) -> Result<Blog, ApiError> {
    client.send(ApiCall::get(blog_endpoint(blog_id))).await
}

/// The signed-in user's own blog.
///
/// # Errors
///
/// Returns the normalized server error.
pub async fn fetch_my_blog(client: &SessionClient) -> Result<Blog, ApiError> {
    client.send(ApiCall::get(MY_BLOG_PATH)).await
}

/// # Errors
///
/// Returns [`ApiError::Encode`] for an empty update, otherwise the normalized
/// server error.
pub async fn update_blog(client: &SessionClient, blog_id: i64, update: &BlogUpdate) -> Result<Blog, ApiError> {
    if update.is_empty() {
        return Err(ApiError::Encode("blog update has no fields".to_owned()));
    }
    client.send(ApiCall::put(blog_endpoint(blog_id)).json(update)?).await
}

/// # Errors
///
/// Returns the normalized server error.
pub async fn delete_blog(client: &SessionClient, blog_id: i64) -> Result<(), ApiError> {
    client
        .execute(ApiCall::delete(blog_endpoint(blog_id)))
        .await
        .map(|_| ())
}

/// Rename the signed-in user's blog or change its main image via
/// `PATCH blogs/update/`. Returns the server's acknowledgement as-is.
///
/// # Errors
///
/// Returns [`ApiError::Encode`] when no setting is given, otherwise the
/// normalized server error.
pub async fn update_blog_settings(client: &SessionClient, settings: &BlogSettings) -> Result<Value, ApiError> {
    if settings.is_empty() {
        return Err(ApiError::Encode("blog settings update has no fields".to_owned()));
    }
    client
        .execute(ApiCall::patch(BLOG_SETTINGS_PATH).json(settings)?)
        .await
}

// =============================================================================
// IMAGES
// =============================================================================

/// Upload an image via `POST images/upload/` and return its public URL.
///
/// # Errors
///
/// Returns the normalized server error, or [`ApiError::Decode`] when the
/// response carries no `url`.
pub async fn upload_image(client: &SessionClient, upload: FileUpload) -> Result<String, ApiError> {
    let file_name = upload.file_name.clone();
    let uploaded: ImageUpload = client.send(ApiCall::post(IMAGE_UPLOAD_PATH).file(upload)).await?;
    tracing::info!(%file_name, url = %uploaded.url, "image uploaded");
    Ok(uploaded.url)
}

// =============================================================================
// CATEGORIES
// =============================================================================

/// # Errors
///
/// Returns the normalized server error.
pub async fn create_category(client: &SessionClient, blog_id: i64, name: &str) -> Result<Category, ApiError> {
    let body = CategoryName { name: name.to_owned() };
    client.send(ApiCall::post(categories_endpoint(blog_id)).json(&body)?).await
}

/// # Errors
///
/// Returns the normalized server error.
pub async fn list_categories(client: &SessionClient, blog_id: i64) -> Result<Vec<Category>, ApiError> {
    client.send(ApiCall::get(categories_endpoint(blog_id))).await
}

/// # Errors
///
/// Returns the normalized server error.
pub async fn update_category(
    client: &SessionClient,
    blog_id: i64,
    category_id: i64,
    name: &str,
) -> Result<Category, ApiError> {
    let body = CategoryName { name: name.to_owned() };
    client
        .send(ApiCall::put(category_endpoint(blog_id, category_id)).json(&body)?)
        .await
}

/// # Errors
///
/// Returns the normalized server error.
pub async fn delete_category(client: &SessionClient, blog_id: i64, category_id: i64) -> Result<(), ApiError> {
    client
        .execute(ApiCall::delete(category_endpoint(blog_id, category_id)))
        .await
        .map(|_| ())
}

// =============================================================================
// POSTS
// =============================================================================

/// # Errors
///
/// Returns the normalized server error.
pub async fn create_post(client: &SessionClient, blog_id: i64, post: &NewPost) -> Result<Post, ApiError> {
    client.send(ApiCall::post(posts_endpoint(blog_id)).json(post)?).await
}

/// List posts of a blog; only the fields set on `query` are sent.
///
/// # Errors
///
/// Returns the normalized server error.
pub async fn list_posts(client: &SessionClient, blog_id: i64, query: &PostQuery) -> Result<Vec<Post>, ApiError> {
    client
        .send(ApiCall::get(posts_endpoint(blog_id)).query(query.to_pairs()))
        .await
}

/// Paginated variant of [`list_posts`] for servers that wrap results.
///
/// # Errors
///
/// Returns the normalized server error.
pub async fn list_posts_page(client: &SessionClient, blog_id: i64, query: &PostQuery) -> Result<PostPage, ApiError> {
    client
        .send(ApiCall::get(posts_endpoint(blog_id)).query(query.to_pairs()))
        .await
}

/// # Errors
///
/// Returns the normalized server error.
pub async fn fetch_post(client: &SessionClient, blog_id: i64, post_id: i64) -> Result<Post, ApiError> {
    client.send(ApiCall::get(post_endpoint(blog_id, post_id))).await
}

/// # Errors
///
/// Returns [`ApiError::Encode`] for an empty update, otherwise the normalized
/// server error.
pub async fn update_post(
    client: &SessionClient,
    blog_id: i64,
    post_id: i64,
    update: &PostUpdate,
) -> Result<Post, ApiError> {
    if update.is_empty() {
        return Err(ApiError::Encode("post update has no fields".to_owned()));
    }
    client
        .send(ApiCall::put(post_endpoint(blog_id, post_id)).json(update)?)
        .await
}

/// # Errors
///
/// Returns the normalized server error.
pub async fn delete_post(client: &SessionClient, blog_id: i64, post_id: i64) -> Result<(), ApiError> {
    client
        .execute(ApiCall::delete(post_endpoint(blog_id, post_id)))
        .await
        .map(|_| ())
}

/// # Errors
///
/// Returns the normalized server error.
pub async fn like_post(client: &SessionClient, blog_id: i64, post_id: i64) -> Result<(), ApiError> {
    client
        .execute(ApiCall::post(post_action_endpoint(blog_id, post_id, "like")))
        .await
        .map(|_| ())
}

/// # Errors
///
/// Returns the normalized server error.
pub async fn unlike_post(client: &SessionClient, blog_id: i64, post_id: i64) -> Result<(), ApiError> {
    client
        .execute(ApiCall::post(post_action_endpoint(blog_id, post_id, "unlike")))
        .await
        .map(|_| ())
}

/// Whether the signed-in user likes the post.
///
/// # Errors
///
/// Returns the normalized server error.
pub async fn like_status(client: &SessionClient, blog_id: i64, post_id: i64) -> Result<bool, ApiError> {
    let status: LikeStatus = client
        .send(ApiCall::get(post_action_endpoint(blog_id, post_id, "like")))
        .await?;
    Ok(status.liked())
}
