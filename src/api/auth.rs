//! Session authentication: login, logout, registration and the admin gate.
//!
//! A session token is 32 random bytes (hex). The client holds it in an
//! HttpOnly cookie (or sends it as a bearer token); the database only stores
//! its SHA-256 hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_password_strength, validate_username};
use crate::config::AuthConfig;
use crate::db::{LoginRequest, RegisterRequest, Session, User, UserResponse, ROLE_ADMIN};
use crate::{AppState, DbPool};

pub const SESSION_COOKIE: &str = "storefront_session";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Pull the session token from the cookie, falling back to a bearer header
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

fn session_cookie(token: String, config: &AuthConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .build()
}

/// Create a session for `user` and attach its cookie to `jar`
async fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> Result<CookieJar, ApiError> {
    let token = generate_token();
    Session::create(
        &state.db,
        user.id,
        &hash_token(&token),
        state.config.auth.session_ttl(),
    )
    .await?;

    Ok(jar.add(session_cookie(token, &state.config.auth)))
}

/// Resolve the user behind the request's session token
pub async fn get_current_user(db: &DbPool, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = extract_token(headers)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let session = Session::find_active(db, &hash_token(&token))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))?;

    User::find_by_id(db, session.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))
}

/// Validate and insert a new admin user.
///
/// With `first_only` the insert only happens while no user exists; `None`
/// means registration was closed by the time the row was written.
async fn register_user(
    db: &DbPool,
    request: &RegisterRequest,
    first_only: bool,
) -> Result<Option<User>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors.check("username", validate_username(&request.username));
    errors.check("email", validate_email(&request.email));
    errors.check("password", validate_password_strength(&request.password));
    errors.finish()?;

    if User::find_by_username(db, &request.username).await?.is_some() {
        return Err(ApiError::bad_request("Username already exists"));
    }
    if User::find_by_email(db, &request.email).await?.is_some() {
        return Err(ApiError::bad_request("Email already exists"));
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let user = if first_only {
        User::create_first(db, &request.username, &request.email, &password_hash, ROLE_ADMIN)
            .await?
    } else {
        Some(User::create(db, &request.username, &request.email, &password_hash, ROLE_ADMIN).await?)
    };

    if let Some(ref user) = user {
        tracing::info!(user = %user.username, "Created admin user");
    }
    Ok(user)
}

/// Validate and insert a new admin user
pub async fn create_user(db: &DbPool, request: &RegisterRequest) -> Result<User, ApiError> {
    register_user(db, request, false)
        .await?
        .ok_or_else(|| ApiError::internal("User was not created"))
}

/// Create the configured bootstrap admin unless that username already exists
pub async fn ensure_admin_user(db: &DbPool, config: &AuthConfig) -> anyhow::Result<()> {
    let (Some(username), Some(email), Some(password)) = (
        config.admin_username.as_ref(),
        config.admin_email.as_ref(),
        config.admin_password.as_ref(),
    ) else {
        return Ok(());
    };

    if User::find_by_username(db, username).await?.is_some() {
        tracing::debug!(user = %username, "Bootstrap admin already exists");
        return Ok(());
    }

    let request = RegisterRequest {
        username: username.clone(),
        email: email.clone(),
        password: password.clone(),
    };
    create_user(db, &request)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create bootstrap admin: {}", e))?;
    Ok(())
}

/// POST /api/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<UserResponse>), ApiError> {
    let user = User::find_by_username(&state.db, &request.username)
        .await?
        .filter(|user| verify_password(&request.password, &user.password_hash))
        .ok_or_else(|| {
            tracing::warn!(user = %request.username, "Failed login attempt");
            ApiError::unauthorized("Invalid username or password")
        })?;

    let jar = start_session(&state, jar, &user).await?;
    tracing::info!(user = %user.username, "User logged in");

    Ok((jar, Json(UserResponse::from(user))))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar), ApiError> {
    if let Some(token) = extract_token(&headers) {
        Session::delete_by_token_hash(&state.db, &hash_token(&token)).await?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((StatusCode::OK, jar))
}

/// POST /api/register
///
/// Open while no user exists (first-run setup) or when registration is enabled.
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<UserResponse>), ApiError> {
    let first_only = !state.config.auth.allow_registration;
    if first_only && User::count(&state.db).await? > 0 {
        return Err(ApiError::forbidden("Registration is disabled"));
    }

    // The count above is only a fast path; create_first re-checks atomically
    let user = register_user(&state.db, &request, first_only)
        .await?
        .ok_or_else(|| ApiError::forbidden("Registration is disabled"))?;
    let jar = start_session(&state, jar, &user).await?;

    Ok((StatusCode::CREATED, jar, Json(UserResponse::from(user))))
}

/// GET /api/user
pub async fn current_user(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Gate for admin routes: rejects anonymous requests and stores the
/// resolved `User` in the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = get_current_user(&state.db, request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for the authenticated user
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(user.clone());
        }
        get_current_user(&state.db, &parts.headers)
            .await
            .map_err(IntoResponse::into_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("shop-admin-2024").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("shop-admin-2024", &hash));
        assert!(!verify_password("wrong-password-1", &hash));
        assert!(!verify_password("shop-admin-2024", "not-a-phc-string"));
    }

    #[test]
    fn test_tokens_are_random_and_hashed() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), a);
    }

    #[test]
    fn test_extract_token_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));

        headers.insert(
            "Cookie",
            HeaderValue::from_static("theme=dark; storefront_session=from-cookie"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_extract_token_requires_bearer_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_token(&headers).is_none());
        assert!(extract_token(&HeaderMap::new()).is_none());
    }

    fn registration(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "shop-admin-2024".to_string(),
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_registrations_create_one_user() {
        let db = crate::db::init_memory().await.unwrap();
        let first = registration("first");
        let second = registration("second");

        let (a, b) = tokio::join!(
            register_user(&db, &first, true),
            register_user(&db, &second, true),
        );
        let created = [a.unwrap(), b.unwrap()]
            .into_iter()
            .filter(Option::is_some)
            .count();
        assert_eq!(created, 1);
        assert_eq!(User::count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_open_registration_creates_every_user() {
        let db = crate::db::init_memory().await.unwrap();
        create_user(&db, &registration("first")).await.unwrap();
        create_user(&db, &registration("second")).await.unwrap();
        assert_eq!(User::count(&db).await.unwrap(), 2);
    }

    #[test]
    fn test_session_cookie_flags() {
        let config = AuthConfig {
            secure_cookies: true,
            ..AuthConfig::default()
        };
        let cookie = session_cookie("abc".to_string(), &config);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
