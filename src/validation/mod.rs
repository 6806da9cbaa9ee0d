//! Field-level validation of sign-up input.
//!
//! Pure and deterministic: the same input always yields the same
//! [`ValidationResult`]. Each field is checked on its own, so a bad email
//! never changes what is reported for the name. Within a field, violations
//! are recorded in display precedence order, so the first one is the one a
//! form should show.

pub mod messages;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::onboarding::RegistrationRequest;

pub use messages::inline_error;

/// Maximum name length, in characters.
pub const NAME_MAX_LEN: usize = 30;
/// Maximum email length, in characters.
pub const EMAIL_MAX_LEN: usize = 30;
/// Minimum password length, in characters.
pub const PASSWORD_MIN_LEN: usize = 6;

/// Words of letters separated by exactly one space. Combining marks count
/// as part of a letter, so decomposed accents match.
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{M}]+(?: [\p{L}\p{M}]+)*$").expect("name pattern is valid")
});

/// `local@domain.tld`.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// A sign-up form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Email,
    Password,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Name, Field::Email, Field::Password];
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Password => "password",
        };
        write!(f, "{s}")
    }
}

/// A single rule failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationKind {
    Required,
    MaxLength,
    MinLength,
    Pattern,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Required => "required",
            Self::MaxLength => "maxLength",
            Self::MinLength => "minLength",
            Self::Pattern => "pattern",
        };
        write!(f, "{s}")
    }
}

/// Violations per field. Fields without violations are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationResult {
    fields: BTreeMap<Field, Vec<ViolationKind>>,
}

impl ValidationResult {
    /// True when no field has a violation.
    pub fn is_valid(&self) -> bool {
        self.fields.is_empty()
    }

    /// Violations for `field`, empty when the field is valid.
    pub fn violations(&self, field: Field) -> &[ViolationKind] {
        self.fields.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The violation a form should display for `field`.
    pub fn first(&self, field: Field) -> Option<ViolationKind> {
        self.violations(field).first().copied()
    }

    /// Fields with at least one violation, in form order.
    pub fn invalid_fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.keys().copied()
    }

    /// One display message per invalid field.
    pub fn inline_errors(&self) -> Vec<(Field, &'static str)> {
        self.fields
            .iter()
            .filter_map(|(field, kinds)| inline_error(*field, kinds).map(|msg| (*field, msg)))
            .collect()
    }

    fn record(&mut self, field: Field, kinds: Vec<ViolationKind>) {
        if !kinds.is_empty() {
            self.fields.insert(field, kinds);
        }
    }
}

/// Entry point for sign-up validation.
pub struct ValidationGateway;

impl ValidationGateway {
    /// Check every field of `request`.
    pub fn validate(request: &RegistrationRequest) -> ValidationResult {
        let mut result = ValidationResult::default();
        result.record(Field::Name, validate_name(request.name()));
        result.record(Field::Email, validate_email(request.email()));
        result.record(
            Field::Password,
            validate_password(request.password().expose_secret()),
        );
        result
    }

    /// Check a single field, e.g. while the user is typing.
    pub fn validate_field(field: Field, value: &str) -> Vec<ViolationKind> {
        match field {
            Field::Name => validate_name(value),
            Field::Email => validate_email(value),
            Field::Password => validate_password(value),
        }
    }
}

/// Name rules, in display order: pattern, required, maxLength.
///
/// Every rule is checked, so blank input also fails `pattern`.
pub fn validate_name(name: &str) -> Vec<ViolationKind> {
    let mut kinds = Vec::new();
    if !NAME_PATTERN.is_match(name) {
        kinds.push(ViolationKind::Pattern);
    }
    if name.trim().is_empty() {
        kinds.push(ViolationKind::Required);
    }
    if name.chars().count() > NAME_MAX_LEN {
        kinds.push(ViolationKind::MaxLength);
    }
    kinds
}

/// Email rules, in display order: required, pattern, maxLength.
pub fn validate_email(email: &str) -> Vec<ViolationKind> {
    let mut kinds = Vec::new();
    if email.trim().is_empty() {
        kinds.push(ViolationKind::Required);
    }
    if !EMAIL_PATTERN.is_match(email) {
        kinds.push(ViolationKind::Pattern);
    }
    if email.chars().count() > EMAIL_MAX_LEN {
        kinds.push(ViolationKind::MaxLength);
    }
    kinds
}

/// Password rules: required, minLength. Whitespace counts as content.
pub fn validate_password(password: &str) -> Vec<ViolationKind> {
    let mut kinds = Vec::new();
    if password.is_empty() {
        kinds.push(ViolationKind::Required);
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        kinds.push(ViolationKind::MinLength);
    }
    kinds
}
