use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::repo_types::{Role, User},
    error::AppError,
};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Request body for signup. Every field is optional so that absent fields are
/// reported as validation messages rather than deserialisation failures.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub phone_number: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Signup input after trimming and validation.
#[derive(Debug)]
pub struct ValidSignup {
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug)]
pub struct ValidLogin {
    pub phone_number: String,
    pub password: String,
    pub role: Option<String>,
}

fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^[0-9]{10}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl SignupRequest {
    pub fn validate(self) -> Result<ValidSignup, AppError> {
        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        let full_name = present(self.full_name).map(|v| v.trim().to_string());
        if full_name.is_none() {
            missing.push("Full name is required".to_string());
        }
        let phone_number = present(self.phone_number).map(|v| v.trim().to_string());
        match &phone_number {
            None => missing.push("Phone number is required".to_string()),
            Some(p) if !is_valid_phone(p) => {
                invalid.push("Phone number must be exactly 10 digits".to_string())
            }
            Some(_) => {}
        }
        let address = present(self.address).map(|v| v.trim().to_string());
        if address.is_none() {
            missing.push("Address is required".to_string());
        }
        let password = present(self.password);
        match &password {
            None => missing.push("Password is required".to_string()),
            Some(p) if p.chars().count() < MIN_PASSWORD_LEN => invalid.push(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )),
            Some(_) => {}
        }
        let role = match present(self.role) {
            None => Role::default(),
            Some(r) => r.parse::<Role>().unwrap_or_else(|e| {
                invalid.push(e);
                Role::default()
            }),
        };

        match (full_name, phone_number, address, password) {
            (Some(full_name), Some(phone_number), Some(address), Some(password))
                if invalid.is_empty() =>
            {
                Ok(ValidSignup {
                    full_name,
                    phone_number,
                    address,
                    password,
                    role,
                })
            }
            _ if !missing.is_empty() => {
                missing.extend(invalid);
                Err(AppError::validation(
                    "Please provide all required fields",
                    missing,
                ))
            }
            _ => Err(AppError::validation("Validation error", invalid)),
        }
    }
}

impl LoginRequest {
    pub fn validate(self) -> Result<ValidLogin, AppError> {
        match (present(self.phone_number), present(self.password)) {
            (Some(phone_number), Some(password)) => Ok(ValidLogin {
                phone_number: phone_number.trim().to_string(),
                password,
                role: present(self.role).map(|r| r.trim().to_string()),
            }),
            (phone, password) => {
                let mut errors = Vec::new();
                if phone.is_none() {
                    errors.push("Phone number is required".to_string());
                }
                if password.is_none() {
                    errors.push("Password is required".to_string());
                }
                Err(AppError::validation(
                    "Please provide phone number and password",
                    errors,
                ))
            }
        }
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name,
            phone_number: u.phone_number,
            address: u.address,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Payload returned after signup or login.
#[derive(Debug, Serialize)]
pub struct AuthData {
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileData {
    pub user: PublicUser,
}
