//! Form validation for the account screens.
//!
//! Lengths are counted in characters. Validators collect every problem they
//! find rather than stopping at the first one.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::api::{Credentials, ProfileUpdate, Registration};

/// Characters that satisfy the "special character" password rule.
pub const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

pub const LOGIN_PASSWORD_MIN: usize = 6;
pub const PASSWORD_MIN: usize = 8;
pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Username may only contain letters, digits and underscores")]
    InvalidCharacters,

    #[error("Username must not start with a digit")]
    LeadingDigit,

    #[error("Email address is not valid")]
    InvalidEmail,

    #[error("Password needs an uppercase letter")]
    MissingUppercase,

    #[error("Password needs a lowercase letter")]
    MissingLowercase,

    #[error("Password needs a digit")]
    MissingDigit,

    #[error("Password needs a special character")]
    MissingSpecial,

    #[error("Passwords do not match")]
    Mismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCheck {
    pub strength: PasswordStrength,
    pub errors: Vec<FieldError>,
}

impl PasswordCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn collect(errors: Vec<FieldError>) -> Result<(), Vec<FieldError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// `local@domain.tld` shape check: no whitespace, one `@`, and a dot inside
/// the domain.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(email))
}

pub fn validate_username(username: &str) -> Vec<FieldError> {
    if username.is_empty() {
        return vec![FieldError::Required("Username")];
    }
    let mut errors = Vec::new();
    let len = username.chars().count();
    if len < USERNAME_MIN {
        errors.push(FieldError::TooShort {
            field: "Username",
            min: USERNAME_MIN,
        });
    }
    if len > USERNAME_MAX {
        errors.push(FieldError::TooLong {
            field: "Username",
            max: USERNAME_MAX,
        });
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        errors.push(FieldError::InvalidCharacters);
    }
    if username.starts_with(|c: char| c.is_ascii_digit()) {
        errors.push(FieldError::LeadingDigit);
    }
    errors
}

pub fn validate_email(email: &str) -> Vec<FieldError> {
    if email.is_empty() {
        vec![FieldError::Required("Email")]
    } else if !is_valid_email(email) {
        vec![FieldError::InvalidEmail]
    } else {
        Vec::new()
    }
}

/// Check the password rules and grade its strength.
///
/// One point each for length >= 8, length >= 12, and each character class
/// present; up to 2 points is weak, up to 4 medium, above that strong.
pub fn validate_password(password: &str) -> PasswordCheck {
    if password.is_empty() {
        return PasswordCheck {
            strength: PasswordStrength::Weak,
            errors: vec![FieldError::Required("Password")],
        };
    }
    let len = password.chars().count();
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    let mut errors = Vec::new();
    if len < PASSWORD_MIN {
        errors.push(FieldError::TooShort {
            field: "Password",
            min: PASSWORD_MIN,
        });
    }
    for (present, error) in [
        (upper, FieldError::MissingUppercase),
        (lower, FieldError::MissingLowercase),
        (digit, FieldError::MissingDigit),
        (special, FieldError::MissingSpecial),
    ] {
        if !present {
            errors.push(error);
        }
    }

    let score = [len >= PASSWORD_MIN, len >= 12, upper, lower, digit, special]
        .into_iter()
        .filter(|hit| *hit)
        .count();
    let strength = match score {
        0..=2 => PasswordStrength::Weak,
        3..=4 => PasswordStrength::Medium,
        _ => PasswordStrength::Strong,
    };
    PasswordCheck { strength, errors }
}

/// The login form accepts a username or an email in `username`.
pub fn validate_login(credentials: &Credentials) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if credentials.username.trim().is_empty() {
        errors.push(FieldError::Required("Username or email"));
    }
    if credentials.password.is_empty() {
        errors.push(FieldError::Required("Password"));
    } else if credentials.password.chars().count() < LOGIN_PASSWORD_MIN {
        errors.push(FieldError::TooShort {
            field: "Password",
            min: LOGIN_PASSWORD_MIN,
        });
    }
    collect(errors)
}

pub fn validate_registration(
    registration: &Registration,
    confirm_password: &str,
) -> Result<(), Vec<FieldError>> {
    let mut errors = validate_username(&registration.username);
    errors.extend(validate_email(&registration.email));
    errors.extend(validate_password(&registration.password).errors);
    if confirm_password != registration.password {
        errors.push(FieldError::Mismatch);
    }
    collect(errors)
}

/// Only the fields being changed are checked.
pub fn validate_profile(update: &ProfileUpdate) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if let Some(username) = &update.username {
        errors.extend(validate_username(username));
    }
    if let Some(email) = &update.email {
        errors.extend(validate_email(email));
    }
    collect(errors)
}

pub fn validate_password_change(
    current: &str,
    new_password: &str,
    confirm: &str,
) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if current.is_empty() {
        errors.push(FieldError::Required("Current password"));
    }
    errors.extend(validate_password(new_password).errors);
    if new_password != confirm {
        errors.push(FieldError::Mismatch);
    }
    collect(errors)
}
