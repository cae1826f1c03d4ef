//! Form validation for login and registration, checked before any request.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::domain::{LoginCredentials, Registration};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Identifier,
    Username,
    Email,
    Password,
}

/// A message attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub message: String,
}

impl FieldError {
    fn new(field: FormField, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn check_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.is_empty() {
        errors.push(FieldError::new(FormField::Password, "Password required"));
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            FormField::Password,
            "Password must be at least 6 characters",
        ));
    }
}

pub fn validate_login(credentials: &LoginCredentials) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if credentials.identifier.trim().is_empty() {
        errors.push(FieldError::new(
            FormField::Identifier,
            "Username or email required",
        ));
    }
    check_password(&credentials.password, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_registration(registration: &Registration) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if registration.username.is_empty() {
        errors.push(FieldError::new(FormField::Username, "Username is required"));
    } else if registration.username.chars().count() < MIN_USERNAME_LEN {
        errors.push(FieldError::new(
            FormField::Username,
            "Username must be at least 3 characters",
        ));
    }

    if registration.email.is_empty() {
        errors.push(FieldError::new(FormField::Email, "Email is required"));
    } else if !EMAIL_PATTERN.is_match(&registration.email) {
        errors.push(FieldError::new(FormField::Email, "Invalid email format"));
    }

    if registration.password.is_empty() {
        errors.push(FieldError::new(FormField::Password, "Password is required"));
    } else if registration.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            FormField::Password,
            "Password must be at least 6 characters",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Maps a 409 from the registration endpoint onto the field it is about.
///
/// The server only says which value clashed in free text, so this looks for
/// "Username" or "Email" in the message.
pub fn registration_conflict(status: u16, message: &str) -> Option<FieldError> {
    if status != 409 {
        return None;
    }
    if message.contains("Username") {
        Some(FieldError::new(FormField::Username, "Username is already taken"))
    } else if message.contains("Email") {
        Some(FieldError::new(FormField::Email, "Email is already taken"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, email: &str, password: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn login_requires_identifier_and_long_enough_password() {
        let errors = validate_login(&LoginCredentials {
            identifier: " ".to_string(),
            password: "12345".to_string(),
        })
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, FormField::Identifier);
        assert_eq!(errors[1].message, "Password must be at least 6 characters");

        assert!(validate_login(&LoginCredentials {
            identifier: "ana".to_string(),
            password: "123456".to_string(),
        })
        .is_ok());
    }

    #[test]
    fn registration_checks_every_field() {
        let errors = validate_registration(&registration("ab", "not-an-email", "")).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![FormField::Username, FormField::Email, FormField::Password]
        );
        assert_eq!(errors[1].message, "Invalid email format");

        assert!(validate_registration(&registration("ana", "ana@example.com", "hunter22")).is_ok());
    }

    #[test]
    fn conflicts_map_to_the_named_field() {
        let username = registration_conflict(409, "Username already exists").unwrap();
        assert_eq!(username.field, FormField::Username);
        assert_eq!(username.message, "Username is already taken");

        let email = registration_conflict(409, "Email already registered").unwrap();
        assert_eq!(email.field, FormField::Email);

        assert_eq!(registration_conflict(409, "Duplicate"), None);
        assert_eq!(registration_conflict(400, "Username already exists"), None);
    }
}
