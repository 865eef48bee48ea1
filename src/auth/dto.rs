use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation::{trimmed_lowercase, Schema};

/// Request body for user registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        required(message = "name is required"),
        length(min = 1, max = 100, message = "name must be between 1 and 100 characters")
    )]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed_lowercase")]
    #[validate(
        required(message = "email is required"),
        email(message = "email must be a valid email address"),
        length(min = 1, max = 255, message = "email must be between 1 and 255 characters")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "password is required"),
        length(min = 6, max = 255, message = "password must be between 6 and 255 characters")
    )]
    pub password: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "trimmed_lowercase")]
    #[validate(
        required(message = "email is required"),
        email(message = "email must be a valid email address"),
        length(min = 1, max = 255, message = "email must be between 1 and 255 characters")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "password is required"),
        length(min = 6, max = 255, message = "password must be between 6 and 255 characters")
    )]
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Schema for RegisterRequest {
    type Output = NewUser;

    fn narrow(self) -> NewUser {
        NewUser {
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
        }
    }
}

impl Schema for LoginRequest {
    type Output = Credentials;

    fn narrow(self) -> Credentials {
        Credentials {
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
        }
    }
}

/// Public part of the user returned to the client. Never carries id or password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub name: String,
    pub email: String,
}

/// Body returned by `/login`; the refresh token travels in a cookie.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub name: String,
    pub email: String,
    pub token: String,
}

/// Everything a successful login produces.
#[derive(Debug)]
pub struct LoginOutcome {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}
