//! Per-field validation errors and the field validators the handlers share.
//!
//! Error bodies are shaped `{"field": ["message", ...]}` so clients can
//! attach messages to the form inputs that produced them. A missing key and
//! a blank value are distinct failures with distinct messages.

use std::collections::BTreeMap;

use serde::Serialize;

pub const MAX_EMAIL_LEN: usize = 50;
pub const MAX_NICK_NAME_LEN: usize = 20;
pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_COMMENT_LEN: usize = 100;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const EMAIL_TAKEN: &str = "A user with this email already exists.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
pub const COMMENT_POST_IMMUTABLE: &str = "The parent post of a comment cannot be changed.";

/// Field name to messages, ordered by field for stable output.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: &str) -> Self {
        let mut errs = Self::new();
        errs.push(field, message);
        errs
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ok(()) when nothing was collected, Err(self) otherwise.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn too_long_message(limit: usize) -> String {
    format!("Ensure this field has no more than {limit} characters.")
}

fn check_length(errs: &mut FieldErrors, field: &str, value: &str, limit: usize) {
    if value.chars().count() > limit {
        errs.push(field, &too_long_message(limit));
    }
}

/// Local part must be non-empty with no whitespace; the domain must contain
/// a dot and not start or end with one.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.starts_with('-')
}

/// Lowercases the domain part only, leaving the local part as entered.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Text-field checks: present when required, non-blank when present, and
/// within the character limit. Limits count Unicode scalar values.
pub fn char_field(
    field: &str,
    value: Option<&str>,
    required: bool,
    limit: usize,
) -> Result<(), FieldErrors> {
    let mut errs = FieldErrors::new();
    match value {
        None if required => errs.push(field, REQUIRED),
        None => {}
        Some(v) => {
            if v.trim().is_empty() {
                errs.push(field, BLANK);
            }
            check_length(&mut errs, field, v, limit);
        }
    }
    errs.into_result()
}

/// Text fields strip surrounding whitespace on the way in; the stored value
/// is the trimmed one, and limits count it. Trim before `char_field`.
pub fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

fn email_into(errs: &mut FieldErrors, email: Option<&str>) {
    match email {
        None => errs.push("email", REQUIRED),
        Some(e) => {
            if e.trim().is_empty() {
                errs.push("email", BLANK);
            } else if !is_valid_email(e) {
                errs.push("email", INVALID_EMAIL);
            }
            check_length(errs, "email", e, MAX_EMAIL_LEN);
        }
    }
}

fn password_into(errs: &mut FieldErrors, password: Option<&str>) {
    match password {
        None => errs.push("password", REQUIRED),
        Some(p) if p.trim().is_empty() => errs.push("password", BLANK),
        Some(_) => {}
    }
}

/// Registration and login both require a well-formed email and a
/// non-blank password; failures on both fields are reported together.
pub fn validate_credentials(
    email: Option<&str>,
    password: Option<&str>,
) -> Result<(), FieldErrors> {
    let mut errs = FieldErrors::new();
    email_into(&mut errs, email);
    password_into(&mut errs, password);
    errs.into_result()
}

/// Credentials plus the two-step confirmation the management add form uses.
pub fn validate_admin_create(
    email: Option<&str>,
    password: Option<&str>,
    confirm: Option<&str>,
) -> Result<(), FieldErrors> {
    let mut errs = FieldErrors::new();
    email_into(&mut errs, email);
    password_into(&mut errs, password);
    match confirm {
        None => errs.push("passwordConfirm", REQUIRED),
        Some(c) if password.is_some_and(|p| p != c) => {
            errs.push("passwordConfirm", PASSWORD_MISMATCH);
        }
        Some(_) => {}
    }
    errs.into_result()
}

/// For updates where the email is already known to be present.
pub fn validate_email(email: &str) -> Result<(), FieldErrors> {
    let mut errs = FieldErrors::new();
    email_into(&mut errs, Some(email));
    errs.into_result()
}

/// For updates where the password is already known to be present.
pub fn validate_password(password: &str) -> Result<(), FieldErrors> {
    let mut errs = FieldErrors::new();
    password_into(&mut errs, Some(password));
    errs.into_result()
}
