//! Submitted forms and their field-level validation.
//!
//! Checks that need the store (is this username taken?) happen in the handlers and add
//! to the same [`FormErrors`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::services::UniqueField;

const REQUIRED: &str = "This field is required.";
const INVALID_EMAIL: &str = "Invalid email address.";

/// Messages keyed by field name, rendered next to the field.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn taken(&mut self, field: UniqueField) {
        match field {
            UniqueField::Username => self.add(
                "username",
                "That username is taken. Please choose a different one.",
            ),
            UniqueField::Email => {
                self.add("email", "That email is taken. Please choose a different one.")
            }
        }
    }
}

pub trait Validate {
    fn validate(&self) -> FormErrors;
}

fn required(errors: &mut FormErrors, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
        return false;
    }
    true
}

fn length(errors: &mut FormErrors, field: &'static str, value: &str, min: usize, max: usize) {
    let len = value.chars().count();
    if len < min || len > max {
        errors.add(
            field,
            format!("Field must be between {min} and {max} characters long."),
        );
    }
}

fn max_length(errors: &mut FormErrors, field: &'static str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format!("Field cannot be longer than {max} characters."));
    }
}

/// One `@`, something on both sides, a dot in the domain and no whitespace.
pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

const MAX_EMAIL_LEN: usize = 120;

fn email(errors: &mut FormErrors, field: &'static str, value: &str) {
    if !required(errors, field, value) {
        return;
    }
    if !is_email(value) {
        errors.add(field, INVALID_EMAIL);
    }
    max_length(errors, field, value, MAX_EMAIL_LEN);
}

fn username(errors: &mut FormErrors, value: &str) {
    if required(errors, "username", value) {
        length(errors, "username", value, 2, 20);
    }
}

fn confirmation(errors: &mut FormErrors, password: &str, confirm: &str) {
    required(errors, "password", password);
    if required(errors, "confirm_password", confirm) && confirm != password {
        errors.add("confirm_password", "Field must be equal to password.");
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
}

impl Validate for RegistrationForm {
    fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        username(&mut errors, &self.username);
        email(&mut errors, "email", &self.email);
        confirmation(&mut errors, &self.password, &self.confirm_password);
        errors
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Checkbox; present when ticked.
    pub remember: Option<String>,
}

impl LoginForm {
    pub fn remember(&self) -> bool {
        self.remember
            .as_deref()
            .is_some_and(|v| !v.is_empty() && v != "false")
    }
}

impl Validate for LoginForm {
    fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        email(&mut errors, "email", &self.email);
        required(&mut errors, "password", &self.password);
        errors
    }
}

/// Text fields of the account form. The picture arrives as a separate multipart part.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateAccountForm {
    pub username: String,
    pub email: String,
}

impl Validate for UpdateAccountForm {
    fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        username(&mut errors, &self.username);
        email(&mut errors, "email", &self.email);
        errors
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
}

impl Validate for PostForm {
    fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        if required(&mut errors, "title", &self.title) {
            max_length(&mut errors, "title", &self.title, 100);
        }
        required(&mut errors, "content", &self.content);
        errors
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestResetForm {
    pub email: String,
}

impl Validate for RequestResetForm {
    fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        email(&mut errors, "email", &self.email);
        errors
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetPasswordForm {
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
}

impl Validate for ResetPasswordForm {
    fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        confirmation(&mut errors, &self.password, &self.confirm_password);
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, email: &str, pw: &str, confirm: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.into(),
            email: email.into(),
            password: pw.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn valid_registration() {
        let errors = registration("corey", "corey@blog.com", "pw", "pw").validate();
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn registration_field_rules() {
        let errors = registration("c", "not-an-email", "pw", "wp").validate();
        assert_eq!(
            errors.get("username"),
            ["Field must be between 2 and 20 characters long."]
        );
        assert_eq!(errors.get("email"), [INVALID_EMAIL]);
        assert_eq!(
            errors.get("confirm_password"),
            ["Field must be equal to password."]
        );

        let errors = registration("", "", "", "").validate();
        for field in ["username", "email", "password", "confirm_password"] {
            assert_eq!(errors.get(field), [REQUIRED], "{field}");
        }
    }

    #[test]
    fn username_length_counts_characters() {
        let errors = registration(&"é".repeat(20), "a@b.co", "pw", "pw").validate();
        assert!(errors.get("username").is_empty());
        let errors = registration(&"a".repeat(21), "a@b.co", "pw", "pw").validate();
        assert!(!errors.get("username").is_empty());
    }

    #[test]
    fn email_length_matches_the_column() {
        let longest = format!("{}@blog.com", "a".repeat(111));
        assert_eq!(longest.chars().count(), 120);
        let errors = registration("corey", &longest, "pw", "pw").validate();
        assert!(errors.get("email").is_empty(), "{errors:?}");

        let too_long = format!("{}@blog.com", "a".repeat(112));
        let errors = registration("corey", &too_long, "pw", "pw").validate();
        assert_eq!(
            errors.get("email"),
            ["Field cannot be longer than 120 characters."]
        );

        let form = RequestResetForm { email: too_long };
        assert!(!form.validate().get("email").is_empty());
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("corey@blog.com"));
        assert!(is_email("first.last+tag@mail.example.org"));
        assert!(!is_email("corey@blog"));
        assert!(!is_email("@blog.com"));
        assert!(!is_email("corey@@blog.com"));
        assert!(!is_email("co rey@blog.com"));
        assert!(!is_email("corey@.blog.com"));
    }

    #[test]
    fn post_title_is_bounded() {
        let form = PostForm {
            title: "t".repeat(101),
            content: "body".into(),
        };
        assert_eq!(
            form.validate().get("title"),
            ["Field cannot be longer than 100 characters."]
        );

        let form = PostForm {
            title: "Blog Post 1".into(),
            content: "  ".into(),
        };
        assert_eq!(form.validate().get("content"), [REQUIRED]);
    }

    #[test]
    fn remember_checkbox() {
        let mut form = LoginForm::default();
        assert!(!form.remember());
        form.remember = Some("y".into());
        assert!(form.remember());
    }

    #[test]
    fn taken_fields_get_their_message() {
        let mut errors = FormErrors::default();
        errors.taken(UniqueField::Email);
        assert_eq!(
            errors.get("email"),
            ["That email is taken. Please choose a different one."]
        );
    }
}
