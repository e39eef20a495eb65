use tracing::{info, warn};

use crate::{
    auth::{
        dto::{normalize_email, LoginRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking, MIN_PASSWORD_LEN},
        repo::UserRepo,
    },
    error::{AppError, AppResult},
};

const MISSING_TOKEN: &str = "Authentication required";
const BAD_TOKEN: &str = "Invalid or expired token";

/// Trimmed value, or `None` when absent or blank.
fn present(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Validates, creates the account and issues its first token.
pub async fn register(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> AppResult<(PublicUser, String)> {
    let (Some(name), Some(email), Some(password)) = (
        present(req.name),
        present(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("All fields are required"));
    };

    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let email = normalize_email(&email);
    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let hash = hash_password_blocking(password).await?;
    let user = users.create(&name, &email, &hash).await?;
    let token = keys.issue(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((user.into(), token))
}

/// Unknown email and wrong password fail identically.
pub async fn login(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    req: LoginRequest,
) -> AppResult<(PublicUser, String)> {
    let (Some(email), Some(password)) = (present(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(AppError::validation("Email and password are required"));
    };
    let email = normalize_email(&email);

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys.issue(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok((user.into(), token))
}

/// Resolves the caller behind an `Authorization` header value.
pub async fn authenticate(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    authorization: Option<&str>,
) -> AppResult<PublicUser> {
    let header = authorization
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(AppError::Unauthenticated(MISSING_TOKEN))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthenticated(MISSING_TOKEN))?;

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = ?e, "invalid or expired token");
        AppError::Unauthenticated(BAD_TOKEN)
    })?;

    match users.find_by_id(claims.sub).await? {
        Some(user) => Ok(user.into()),
        None => {
            warn!(user_id = %claims.sub, "token for unknown user");
            Err(AppError::Unauthenticated(BAD_TOKEN))
        }
    }
}
