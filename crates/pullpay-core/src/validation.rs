//! Client-side form checks. Failures never reach the network.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Amount, Credentials, Identity, NewTransaction, ProfileUpdate, Registration};

const MIN_NAME_CHARS: usize = 2;
const MIN_PASSWORD_CHARS: usize = 8;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@.]+$").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// One or more rejected form fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join(" "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn check(&mut self, ok: bool, field: &'static str, message: &str) {
        if !ok {
            self.errors.push(FieldError {
                field,
                message: message.to_string(),
            });
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                errors: self.errors,
            })
        }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE
        .as_ref()
        .is_some_and(|re| re.is_match(email.trim()))
}

fn has_min_chars(value: &str, min: usize) -> bool {
    value.trim().chars().count() >= min
}

/// # Errors
/// Returns the rejected fields.
pub fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationError> {
    let mut checker = Checker::default();
    match &credentials.identity {
        Identity::Email(email) => {
            checker.check(
                is_valid_email(email),
                "email",
                "Please enter a valid email address.",
            );
            checker.check(
                credentials.password.chars().count() >= MIN_PASSWORD_CHARS,
                "password",
                "Password must be at least 8 characters long.",
            );
        }
        Identity::Username(username) => {
            checker.check(
                !username.trim().is_empty(),
                "username",
                "Username is required",
            );
            checker.check(
                !credentials.password.is_empty(),
                "password",
                "Password is required",
            );
        }
    }
    checker.finish()
}

/// # Errors
/// Returns the rejected fields.
pub fn validate_registration(registration: &Registration) -> Result<(), ValidationError> {
    let mut checker = Checker::default();
    checker.check(
        has_min_chars(&registration.first_name, MIN_NAME_CHARS),
        "first_name",
        "First name must be at least 2 characters.",
    );
    checker.check(
        has_min_chars(&registration.last_name, MIN_NAME_CHARS),
        "last_name",
        "Last name must be at least 2 characters.",
    );
    checker.check(
        is_valid_email(&registration.email),
        "email",
        "Please enter a valid email address.",
    );
    checker.check(
        registration.password.chars().count() >= MIN_PASSWORD_CHARS,
        "password",
        "Password must be at least 8 characters.",
    );
    checker.finish()
}

/// Only the fields being changed are checked.
///
/// # Errors
/// Returns the rejected fields.
pub fn validate_profile_update(update: &ProfileUpdate) -> Result<(), ValidationError> {
    let mut checker = Checker::default();
    if let Some(first_name) = &update.first_name {
        checker.check(
            has_min_chars(first_name, MIN_NAME_CHARS),
            "first_name",
            "First name must be at least 2 characters.",
        );
    }
    if let Some(last_name) = &update.last_name {
        checker.check(
            has_min_chars(last_name, MIN_NAME_CHARS),
            "last_name",
            "Last name must be at least 2 characters.",
        );
    }
    if let Some(email) = &update.email {
        checker.check(
            is_valid_email(email),
            "email",
            "Please enter a valid email address.",
        );
    }
    checker.check(!update.is_empty(), "profile", "Nothing to update.");
    checker.finish()
}

/// Builds the create-transaction body from raw form input.
///
/// # Errors
/// Returns the rejected fields.
pub fn parse_new_transaction(
    amount: &str,
    church_id: Option<u64>,
) -> Result<NewTransaction, ValidationError> {
    let parsed = amount.parse::<Amount>().ok().filter(|a| a.is_positive());

    let mut checker = Checker::default();
    checker.check(
        parsed.is_some(),
        "amount",
        "Amount must be a positive number with at most two decimal places.",
    );
    checker.check(church_id.is_some(), "church_id", "Please select a church.");

    match (parsed, church_id) {
        (Some(amount), Some(church_id)) => Ok(NewTransaction { amount, church_id }),
        _ => Err(ValidationError {
            errors: checker.errors,
        }),
    }
}
