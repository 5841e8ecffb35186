//! Declarative HTML forms with server-side validation.
//!
//! A [`FormSchema`] is an ordered list of [`FieldSpec`]s. Choice sources
//! (categories, brands, tags) are passed in when the schema is built, so
//! every request sees the current options.
//!
//! Submissions arrive as [`FormData`] (decoded `application/x-www-form-urlencoded`
//! pairs, repeated keys joined with `,`). [`FormSchema::validate`] returns
//! either [`CleanedData`] to build a typed record from, or a [`BoundForm`]
//! holding the submitted values and one error per failing field, ready to
//! render again through `partials/form_fields.html`.

pub mod account;
pub mod cart;
pub mod catalog;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use shopkeep_core::{Email, parse_id_list};

use crate::models::Term;

// =============================================================================
// Schema
// =============================================================================

/// How a field is parsed and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    Integer,
    Email,
    Password,
    Select,
    /// Multiple ids; submitted as repeated keys or one comma-separated value.
    MultiSelect,
    Hidden,
}

impl FieldKind {
    const fn input_type(self) -> &'static str {
        match self {
            Self::Integer => "number",
            Self::Email => "email",
            Self::Password => "password",
            Self::Hidden => "hidden",
            Self::Text | Self::TextArea | Self::Select | Self::MultiSelect => "text",
        }
    }
}

/// Extra checks run after a field parses. The first failure wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    /// Integer lower bound, inclusive.
    Min(i64),
    /// Integer upper bound, inclusive.
    Max(i64),
    /// Minimum length in characters.
    MinLength(usize),
    /// Maximum length in characters.
    MaxLength(usize),
    /// Value must equal the named field's raw value.
    MatchField(&'static str),
}

/// One option of a select field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    #[must_use]
    pub fn new(value: impl Display, label: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
        }
    }
}

impl<Id: Display> From<&Term<Id>> for Choice {
    fn from(term: &Term<Id>) -> Self {
        Self::new(&term.id, term.name.clone())
    }
}

/// Declaration of a single form field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub validators: Vec<Validator>,
    pub choices: Vec<Choice>,
}

impl FieldSpec {
    /// A required field with no validators.
    #[must_use]
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
            validators: Vec::new(),
            choices: Vec::new(),
        }
    }

    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    #[must_use]
    pub fn choices(mut self, choices: impl IntoIterator<Item = Choice>) -> Self {
        self.choices = choices.into_iter().collect();
        self
    }

    fn has_choice(&self, value: &str) -> bool {
        self.choices.iter().any(|c| c.value == value)
    }
}

/// An ordered set of fields.
#[derive(Debug, Clone)]
pub struct FormSchema {
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    #[must_use]
    pub const fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// An empty form for a first render.
    #[must_use]
    pub fn unbound(&self) -> BoundForm {
        self.bind(&FormData::default(), &BTreeMap::new(), false)
    }

    /// A form prefilled from existing data, e.g. the record being edited.
    #[must_use]
    pub fn with_initial(&self, data: &FormData) -> BoundForm {
        self.bind(data, &BTreeMap::new(), false)
    }

    /// A submitted form that passed validation but was rejected later,
    /// e.g. a registration whose email is already taken.
    #[must_use]
    pub fn reject(&self, data: &FormData, field: &'static str, message: impl Into<String>) -> BoundForm {
        let errors = BTreeMap::from([(field, message.into())]);
        self.bind(data, &errors, true)
    }

    /// Validate a submission.
    ///
    /// # Errors
    ///
    /// Returns the bound form with field errors if any field fails.
    pub fn validate(&self, data: &FormData) -> Result<CleanedData, BoundForm> {
        let mut values = BTreeMap::new();
        let mut errors = BTreeMap::new();

        for spec in &self.fields {
            let raw = data.get(spec.name).unwrap_or_default();
            match self.clean_field(spec, raw, data) {
                Ok(Some(value)) => {
                    values.insert(spec.name, value);
                }
                Ok(None) => {}
                Err(message) => {
                    errors.insert(spec.name, message);
                }
            }
        }

        if errors.is_empty() {
            Ok(CleanedData { values })
        } else {
            Err(self.bind(data, &errors, true))
        }
    }

    fn clean_field(
        &self,
        spec: &FieldSpec,
        raw: &str,
        data: &FormData,
    ) -> Result<Option<Cleaned>, String> {
        // Passwords are taken verbatim; everything else is trimmed.
        let input = if spec.kind == FieldKind::Password {
            raw
        } else {
            raw.trim()
        };

        if input.trim().is_empty() {
            return if spec.required {
                Err(format!("{} is required", spec.label))
            } else {
                Ok(None)
            };
        }

        let value = match spec.kind {
            FieldKind::Text | FieldKind::TextArea | FieldKind::Password | FieldKind::Hidden => {
                Cleaned::Text(input.to_owned())
            }
            FieldKind::Integer => input
                .parse::<i64>()
                .map(Cleaned::Integer)
                .map_err(|_| format!("{} must be a whole number", spec.label))?,
            FieldKind::Email => Email::parse(input)
                .map(Cleaned::Email)
                .map_err(|e| format!("Enter a valid email address ({e})"))?,
            FieldKind::Select => {
                if !spec.has_choice(input) {
                    return Err(format!("Select a valid {}", spec.label.to_lowercase()));
                }
                Cleaned::Text(input.to_owned())
            }
            FieldKind::MultiSelect => {
                let ids: BTreeSet<i32> = parse_id_list(input).map_err(|e| e.to_string())?;
                if let Some(unknown) = ids.iter().find(|id| !spec.has_choice(&id.to_string())) {
                    return Err(format!("'{unknown}' is not a valid choice"));
                }
                if ids.is_empty() {
                    return if spec.required {
                        Err(format!("{} is required", spec.label))
                    } else {
                        Ok(None)
                    };
                }
                Cleaned::Ids(ids)
            }
        };

        for validator in &spec.validators {
            if let Some(message) = self.check(spec, validator, &value, input, data) {
                return Err(message);
            }
        }

        Ok(Some(value))
    }

    fn check(
        &self,
        spec: &FieldSpec,
        validator: &Validator,
        value: &Cleaned,
        input: &str,
        data: &FormData,
    ) -> Option<String> {
        let label = spec.label;
        match (validator, value) {
            (Validator::Min(min), Cleaned::Integer(n)) if n < min => {
                Some(format!("{label} must be at least {min}"))
            }
            (Validator::Max(max), Cleaned::Integer(n)) if n > max => {
                Some(format!("{label} must be at most {max}"))
            }
            (Validator::MinLength(min), _) if input.chars().count() < *min => {
                Some(format!("{label} must be at least {min} characters long"))
            }
            (Validator::MaxLength(max), _) if input.chars().count() > *max => {
                Some(format!("{label} must be at most {max} characters long"))
            }
            (Validator::MatchField(other), _) if data.get(other).unwrap_or_default() != input => {
                let other_label = self.field(other).map_or(*other, |f| f.label);
                Some(format!("{label} does not match {other_label}"))
            }
            _ => None,
        }
    }

    fn bind(
        &self,
        data: &FormData,
        errors: &BTreeMap<&'static str, String>,
        submitted: bool,
    ) -> BoundForm {
        let fields = self
            .fields
            .iter()
            .map(|spec| {
                let value = if spec.kind == FieldKind::Password {
                    String::new()
                } else {
                    data.get(spec.name).unwrap_or_default().trim().to_owned()
                };

                let selected: BTreeSet<&str> = match spec.kind {
                    FieldKind::MultiSelect => value.split(',').map(str::trim).collect(),
                    _ => BTreeSet::from([value.as_str()]),
                };
                let choices = spec
                    .choices
                    .iter()
                    .map(|c| ChoiceView {
                        value: c.value.clone(),
                        label: c.label.clone(),
                        selected: selected.contains(c.value.as_str()),
                    })
                    .collect();

                FieldView {
                    name: spec.name,
                    label: spec.label,
                    kind: spec.kind,
                    required: spec.required,
                    error: errors.get(spec.name).cloned(),
                    choices,
                    submitted,
                    value,
                }
            })
            .collect();

        BoundForm { fields }
    }
}

// =============================================================================
// Submitted Data
// =============================================================================

/// Submitted form values keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData(BTreeMap<String, String>);

impl FormData {
    /// Collect pairs, joining repeated keys with `,`.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        for (key, value) in pairs {
            let value = value.into();
            map.entry(key.into())
                .and_modify(|existing| {
                    existing.push(',');
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        Self(map)
    }

    /// Decode an `application/x-www-form-urlencoded` body or query string.
    #[must_use]
    pub fn from_urlencoded(input: &[u8]) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(input).into_owned())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Builder-style insert, replacing any existing value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self::from_urlencoded(&body))
    }
}

// =============================================================================
// Validation Results
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cleaned {
    Text(String),
    Integer(i64),
    Email(Email),
    Ids(BTreeSet<i32>),
}

/// A validated field was absent or had an unexpected type.
///
/// Only happens when a record is built from a schema it does not match.
#[derive(Debug, Error)]
#[error("form field `{0}` is missing or has the wrong type")]
pub struct MissingField(pub &'static str);

/// Parsed values of a form that passed validation. Blank optional fields
/// are absent.
#[derive(Debug, Clone, Default)]
pub struct CleanedData {
    values: BTreeMap<&'static str, Cleaned>,
}

impl CleanedData {
    #[must_use]
    pub fn opt_text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(Cleaned::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// # Errors
    ///
    /// Returns `MissingField` if the field is absent or not text.
    pub fn text(&self, name: &'static str) -> Result<&str, MissingField> {
        self.opt_text(name).ok_or(MissingField(name))
    }

    #[must_use]
    pub fn opt_integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(Cleaned::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// # Errors
    ///
    /// Returns `MissingField` if the field is absent or not an integer.
    pub fn integer(&self, name: &'static str) -> Result<i64, MissingField> {
        self.opt_integer(name).ok_or(MissingField(name))
    }

    /// # Errors
    ///
    /// Returns `MissingField` if the field is absent or not an email.
    pub fn email(&self, name: &'static str) -> Result<&Email, MissingField> {
        match self.values.get(name) {
            Some(Cleaned::Email(email)) => Ok(email),
            _ => Err(MissingField(name)),
        }
    }

    /// A select value parsed as an id.
    #[must_use]
    pub fn opt_id<T: From<i32>>(&self, name: &str) -> Option<T> {
        self.opt_text(name)
            .and_then(|s| s.parse::<i32>().ok())
            .map(T::from)
    }

    /// # Errors
    ///
    /// Returns `MissingField` if the field is absent or not numeric.
    pub fn id<T: From<i32>>(&self, name: &'static str) -> Result<T, MissingField> {
        self.opt_id(name).ok_or(MissingField(name))
    }

    /// Ids from a multi-select. Absent means empty.
    #[must_use]
    pub fn ids<T: From<i32> + Ord>(&self, name: &str) -> BTreeSet<T> {
        match self.values.get(name) {
            Some(Cleaned::Ids(ids)) => ids.iter().copied().map(T::from).collect(),
            _ => BTreeSet::new(),
        }
    }
}

/// A form bound to values (and possibly errors) for rendering.
#[derive(Debug, Clone)]
pub struct BoundForm {
    fields: Vec<FieldView>,
}

impl BoundForm {
    #[must_use]
    pub fn fields(&self) -> &[FieldView] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldView> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.fields.iter().any(|f| f.error.is_some())
    }

    /// `(label, message)` for every failing field, in schema order.
    #[must_use]
    pub fn errors(&self) -> Vec<(&'static str, &str)> {
        self.fields
            .iter()
            .filter_map(|f| f.error.as_deref().map(|e| (f.label, e)))
            .collect()
    }
}

/// Render model of one field.
#[derive(Debug, Clone)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub value: String,
    pub error: Option<String>,
    pub required: bool,
    pub choices: Vec<ChoiceView>,
    submitted: bool,
}

#[derive(Debug, Clone)]
pub struct ChoiceView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl FieldView {
    #[must_use]
    pub const fn input_type(&self) -> &'static str {
        self.kind.input_type()
    }

    /// Bootstrap classes for the control, including validation state.
    #[must_use]
    pub fn control_class(&self) -> &'static str {
        if self.error.is_some() {
            "form-control is-invalid"
        } else if self.submitted && !self.value.is_empty() {
            "form-control is-valid"
        } else {
            "form-control"
        }
    }

    #[must_use]
    pub fn is_textarea(&self) -> bool {
        self.kind == FieldKind::TextArea
    }

    #[must_use]
    pub fn is_select(&self) -> bool {
        self.kind == FieldKind::Select
    }

    #[must_use]
    pub fn is_multiselect(&self) -> bool {
        self.kind == FieldKind::MultiSelect
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.kind == FieldKind::Hidden
    }
}
