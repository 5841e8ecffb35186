//! Registration and login forms.

use shopkeep_core::{Email, Username};

use super::{CleanedData, FieldKind, FieldSpec, FormSchema, MissingField, Validator};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[must_use]
pub fn registration_schema() -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::new("username", "Username", FieldKind::Text)
            .validate_with(Validator::MaxLength(Username::MAX_LENGTH)),
        FieldSpec::new("email", "Email", FieldKind::Email),
        FieldSpec::new("password", "Password", FieldKind::Password)
            .validate_with(Validator::MinLength(MIN_PASSWORD_LENGTH)),
        FieldSpec::new("confirm_password", "Confirm password", FieldKind::Password)
            .validate_with(Validator::MatchField("password")),
    ])
}

#[must_use]
pub fn login_schema() -> FormSchema {
    FormSchema::new(vec![
        FieldSpec::new("email", "Email", FieldKind::Email),
        FieldSpec::new("password", "Password", FieldKind::Password),
    ])
}

/// Validated registration submission.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: Username,
    pub email: Email,
    pub password: String,
}

impl Registration {
    /// # Errors
    ///
    /// Returns `MissingField` if the data did not come from the registration form.
    pub fn from_cleaned(data: &CleanedData) -> Result<Self, MissingField> {
        Ok(Self {
            username: Username::parse(data.text("username")?)
                .map_err(|_| MissingField("username"))?,
            email: data.email("email")?.clone(),
            password: data.text("password")?.to_owned(),
        })
    }
}

/// Validated login submission.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

impl Credentials {
    /// # Errors
    ///
    /// Returns `MissingField` if the data did not come from the login form.
    pub fn from_cleaned(data: &CleanedData) -> Result<Self, MissingField> {
        Ok(Self {
            email: data.email("email")?.clone(),
            password: data.text("password")?.to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::forms::FormData;

    #[test]
    fn test_registration() {
        let data = FormData::from_urlencoded(
            b"username=ada&email=Ada%40Example.com&password=hunter22!&confirm_password=hunter22!",
        );
        let registration =
            Registration::from_cleaned(&registration_schema().validate(&data).unwrap()).unwrap();
        assert_eq!(registration.username.as_str(), "ada");
        assert_eq!(registration.email.as_str(), "ada@example.com");
        assert_eq!(registration.password, "hunter22!");
    }

    #[test]
    fn test_registration_password_rules() {
        let data = FormData::from_urlencoded(
            b"username=ada&email=ada%40example.com&password=short&confirm_password=other",
        );
        let form = registration_schema().validate(&data).unwrap_err();
        assert_eq!(
            form.errors(),
            vec![
                ("Password", "Password must be at least 8 characters long"),
                ("Confirm password", "Confirm password does not match Password"),
            ]
        );
        assert_eq!(form.field("email").unwrap().value, "ada@example.com");
        assert_eq!(form.field("confirm_password").unwrap().value, "");
    }

    #[test]
    fn test_login_requires_both_fields() {
        let form = login_schema()
            .validate(&FormData::from_urlencoded(b"email=&password="))
            .unwrap_err();
        assert_eq!(
            form.errors(),
            vec![("Email", "Email is required"), ("Password", "Password is required")]
        );
    }

    #[test]
    fn test_password_whitespace_is_kept() {
        let data = FormData::from_urlencoded(b"email=a%40b.co&password=+spaced+");
        let credentials = Credentials::from_cleaned(&login_schema().validate(&data).unwrap()).unwrap();
        assert_eq!(credentials.password, " spaced ");
    }
}
