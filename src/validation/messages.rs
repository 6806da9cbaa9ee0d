//! Inline error text shown under each form field.

use super::{Field, ViolationKind};

/// Which violation wins when a field has several.
fn precedence(field: Field) -> &'static [ViolationKind] {
    use ViolationKind::*;
    match field {
        Field::Name => &[Pattern, Required, MaxLength],
        Field::Email => &[Required, Pattern, MaxLength],
        Field::Password => &[Required, MinLength],
    }
}

fn message(field: Field, kind: ViolationKind) -> Option<&'static str> {
    use ViolationKind::*;
    let text = match (field, kind) {
        (Field::Name, Pattern) => {
            "Name should not contain any special characters, numbers and have more than one space between words"
        }
        (Field::Name, Required) => "Please enter your name",
        (Field::Name, MaxLength) => "Maximum length of name is 30 characters",
        (Field::Email, Required) => "Please enter your email",
        (Field::Email, Pattern) => "Email is invalid",
        (Field::Email, MaxLength) => "Maximum length of email is 30 characters",
        (Field::Password, Required) => "Please enter your password",
        (Field::Password, MinLength) => "Password should be at least 6 characters",
        _ => return None,
    };
    Some(text)
}

/// The single message to display for `field`, if any of `violations`
/// has one.
pub fn inline_error(field: Field, violations: &[ViolationKind]) -> Option<&'static str> {
    precedence(field)
        .iter()
        .find(|kind| violations.contains(kind))
        .and_then(|kind| message(field, *kind))
}
