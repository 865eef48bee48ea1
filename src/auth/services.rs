use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::TokenKind,
        dto::{LoginOutcome, LoginRequest, PublicUser, RefreshResponse, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::UserRepository,
    },
    error::{AppError, AppResult},
    validation::validate,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const EMAIL_TAKEN: &str = "Email already exists";

#[instrument(skip_all)]
pub async fn register(users: &dyn UserRepository, request: RegisterRequest) -> AppResult<PublicUser> {
    let new_user = validate(request)?;

    if users.count_by_email(&new_user.email).await? != 0 {
        warn!(email = %new_user.email, "email already registered");
        return Err(AppError::conflict(EMAIL_TAKEN));
    }

    let hash = hash_password(new_user.password.clone()).await?;

    let user = users
        .create(&new_user, &hash)
        .await
        .map_err(|e| AppError::unique_or_internal(e, EMAIL_TAKEN))?;
    info!(user_id = %user.id, email = %user.email, "user registered");

    Ok(PublicUser {
        name: user.name,
        email: user.email,
    })
}

/// Unknown email and wrong password fail identically.
#[instrument(skip_all)]
pub async fn login(
    users: &dyn UserRepository,
    keys: &JwtKeys,
    request: LoginRequest,
) -> AppResult<LoginOutcome> {
    let credentials = validate(request)?;

    let Some(user) = users.find_by_email(&credentials.email).await? else {
        warn!(email = %credentials.email, "login unknown email");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };

    if !verify_password(credentials.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    let access_token = keys.sign_access(user.id, &user.email)?;
    let refresh_token = keys.sign_refresh(user.id, &user.email)?;
    users.set_token(user.id, &refresh_token).await?;

    info!(user_id = %user.id, "user logged in");
    Ok(LoginOutcome {
        user: PublicUser {
            name: user.name,
            email: user.email,
        },
        access_token,
        refresh_token,
    })
}

/// Exchanges the stored refresh token for a new access token. The refresh token itself is
/// not rotated. Lookup happens before decoding: an unknown token is 401, a known but
/// expired or broken one is 403.
#[instrument(skip_all)]
pub async fn refresh_access_token(
    users: &dyn UserRepository,
    keys: &JwtKeys,
    refresh_token: Option<&str>,
) -> AppResult<RefreshResponse> {
    let token = refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("No refresh token provided"))?;

    let Some(user) = users.find_by_token(token).await? else {
        warn!("refresh token not held by any user");
        return Err(AppError::unauthorized("Invalid refresh token"));
    };

    let claims = keys.verify(token, TokenKind::Refresh).map_err(|e| {
        warn!(user_id = %user.id, error = %e, "stored refresh token rejected");
        AppError::forbidden("Refresh token expired")
    })?;

    let access_token = keys.sign_access(claims.sub, &claims.email)?;
    info!(user_id = %claims.sub, "access token refreshed");
    Ok(RefreshResponse { access_token })
}
