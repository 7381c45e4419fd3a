//! Schema checks for company registrations and DSAR submissions.
//!
//! Validation is pure: it never touches the database, so business conflicts
//! such as a duplicate slug are reported later by the persistence layer.
//! Every violated field is collected; the combined message joins the
//! individual messages with `", "`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::companies::CompanyStatus;

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid slug pattern"));

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("valid email pattern")
});

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PHONE_LEN: usize = 10;
pub const MIN_REQUEST_TEXT_LEN: usize = 10;
/// Width of the company text columns.
pub const MAX_COMPANY_FIELD_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", summarize(.violations))]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn single(field: &'static str, message: &'static str) -> Self {
        Self {
            violations: vec![FieldViolation { field, message }],
        }
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.message)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Default)]
struct Collector {
    violations: Vec<FieldViolation>,
}

impl Collector {
    fn check(&mut self, ok: bool, field: &'static str, message: &'static str) {
        if !ok {
            self.violations.push(FieldViolation { field, message });
        }
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.violations.is_empty() {
            Ok(value())
        } else {
            Err(ValidationErrors {
                violations: self.violations,
            })
        }
    }
}

fn min_chars(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}

fn max_chars(value: &str, max: usize) -> bool {
    value.chars().count() <= max
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_PATTERN.is_match(slug)
}

pub fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.') && !email.contains("..") && EMAIL_PATTERN.is_match(email)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub representation: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub owner_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCompany {
    pub name: String,
    pub representation: String,
    /// `None` when the caller left the slug blank.
    pub slug: Option<String>,
    pub status: CompanyStatus,
    pub owner_id: i64,
}

pub fn validate_company(payload: CompanyPayload) -> Result<ValidCompany, ValidationErrors> {
    let name = payload.name.trim().to_string();
    let representation = payload.representation.trim().to_string();
    let slug = payload
        .slug
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let status = payload
        .status
        .as_deref()
        .and_then(|s| s.parse::<CompanyStatus>().ok());

    let mut errors = Collector::default();
    errors.check(
        min_chars(&payload.name, MIN_NAME_LEN),
        "name",
        "Company name must be at least 2 characters",
    );
    errors.check(
        max_chars(&name, MAX_COMPANY_FIELD_LEN),
        "name",
        "Company name must be at most 255 characters",
    );
    errors.check(
        min_chars(&payload.representation, MIN_NAME_LEN),
        "representation",
        "Representation must be at least 2 characters",
    );
    errors.check(
        max_chars(&representation, MAX_COMPANY_FIELD_LEN),
        "representation",
        "Representation must be at most 255 characters",
    );
    errors.check(
        slug.as_deref().map_or(true, is_valid_slug),
        "slug",
        "Slug must contain only lowercase letters, numbers, and hyphens",
    );
    errors.check(
        slug.as_deref()
            .map_or(true, |slug| max_chars(slug, MAX_COMPANY_FIELD_LEN)),
        "slug",
        "Slug must be at most 255 characters",
    );
    errors.check(
        status.is_some(),
        "status",
        "Status must be one of Active, Inactive, Pending, Approved, Rejected",
    );
    errors.check(payload.owner_id.is_some(), "ownerId", "Owner is required");

    errors.finish(|| ValidCompany {
        name,
        representation,
        slug,
        status: status.unwrap_or_default(),
        owner_id: payload.owner_id.unwrap_or_default(),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsarPayload {
    #[serde(default)]
    pub company_id: Option<i64>,
    #[serde(default)]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub requester_name: String,
    #[serde(default)]
    pub requester_email: String,
    #[serde(default)]
    pub requester_phone: String,
    #[serde(default)]
    pub request_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDsar {
    pub company_id: i64,
    pub owner_id: i64,
    pub requester_name: String,
    pub requester_email: String,
    pub requester_phone: String,
    pub request_text: String,
}

pub fn validate_dsar(payload: DsarPayload) -> Result<ValidDsar, ValidationErrors> {
    let requester_name = payload.requester_name.trim().to_string();
    let requester_email = payload.requester_email.trim().to_string();
    let requester_phone = payload.requester_phone.trim().to_string();
    let request_text = payload.request_text.trim().to_string();

    let mut errors = Collector::default();
    errors.check(
        min_chars(&payload.requester_name, MIN_NAME_LEN),
        "requesterName",
        "Name must be at least 2 characters",
    );
    errors.check(
        is_valid_email(&requester_email),
        "requesterEmail",
        "Invalid email address",
    );
    // Length is the only phone rule; formatting is left to the requester.
    errors.check(
        min_chars(&payload.requester_phone, MIN_PHONE_LEN),
        "requesterPhone",
        "Phone number must be at least 10 characters",
    );
    errors.check(
        min_chars(&payload.request_text, MIN_REQUEST_TEXT_LEN),
        "requestText",
        "Please provide more details (at least 10 characters)",
    );
    errors.check(payload.company_id.is_some(), "companyId", "Company is required");
    errors.check(payload.owner_id.is_some(), "ownerId", "Owner is required");

    errors.finish(|| ValidDsar {
        company_id: payload.company_id.unwrap_or_default(),
        owner_id: payload.owner_id.unwrap_or_default(),
        requester_name,
        requester_email,
        requester_phone,
        request_text,
    })
}
