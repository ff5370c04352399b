use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, SignupRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::UserStore,
        repo_types::NewUser,
    },
    error::AppError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Creates the user and returns a token for it. Email and username are
/// checked up front; the store's unique constraint still has the last word.
pub async fn signup(
    users: &dyn UserStore,
    keys: &JwtKeys,
    mut req: SignupRequest,
) -> Result<String, AppError> {
    req.fullname = req.fullname.trim().to_string();
    req.username = req.username.trim().to_string();
    req.email = req.email.trim().to_lowercase();

    if req.fullname.is_empty() || req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "fullname, username, email and password are required".into(),
        ));
    }
    if !is_valid_email(&req.email) {
        warn!(email = %req.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }

    if users.find_by_email(&req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(AppError::Conflict("User with this email already exists".into()));
    }
    if users.find_by_username(&req.username).await?.is_some() {
        warn!(username = %req.username, "username already taken");
        return Err(AppError::Conflict("Username already exists".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user = users
        .create(NewUser {
            fullname: req.fullname,
            username: req.username,
            email: req.email,
            password_hash,
        })
        .await?;

    let token = keys.issue(Some(user.id), &user.username, &user.email)?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(token)
}

/// Unknown identity and wrong password stay distinguishable:
/// `UnknownUser` vs `Unauthorized`.
pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<String, AppError> {
    let login = req.user_id.trim();
    if login.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("userId and password are required".into()));
    }

    let user = match users.find_by_login(login).await? {
        Some(u) => u,
        None => {
            warn!(login = %login, "login unknown user");
            return Err(AppError::UnknownUser("User does not exist".into()));
        }
    };

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid Password".into()));
    }

    let token = keys.issue(Some(user.id), &user.username, &user.email)?;
    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(token)
}
