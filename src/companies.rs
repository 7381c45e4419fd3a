use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Company, NewCompany};
use crate::routing::Role;
use crate::schema::companies;
use crate::users;
use crate::validation::{self, CompanyPayload, ValidationErrors};

/// Lifecycle state stored on a company row.
///
/// `Active` and `Approved` both mean "approved" for gating purposes; see
/// [`CompanyStatus::is_approved`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanyStatus {
    #[default]
    Pending,
    Approved,
    Active,
    Rejected,
    Inactive,
}

impl CompanyStatus {
    pub const ALL: [CompanyStatus; 5] = [
        CompanyStatus::Pending,
        CompanyStatus::Approved,
        CompanyStatus::Active,
        CompanyStatus::Rejected,
        CompanyStatus::Inactive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CompanyStatus::Pending => "Pending",
            CompanyStatus::Approved => "Approved",
            CompanyStatus::Active => "Active",
            CompanyStatus::Rejected => "Rejected",
            CompanyStatus::Inactive => "Inactive",
        }
    }

    pub fn is_approved(self) -> bool {
        matches!(self, CompanyStatus::Approved | CompanyStatus::Active)
    }

    /// Targets an administrator may set through the status endpoint.
    pub fn is_admin_decision(self) -> bool {
        matches!(
            self,
            CompanyStatus::Approved | CompanyStatus::Active | CompanyStatus::Rejected
        )
    }
}

impl fmt::Display for CompanyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown company status `{0}`")]
pub struct UnknownCompanyStatus(pub String);

impl FromStr for CompanyStatus {
    type Err = UnknownCompanyStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        CompanyStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownCompanyStatus(value.to_string()))
    }
}

impl Company {
    /// Parsed lifecycle state; rows with an unrecognised value read as `None`.
    pub fn lifecycle(&self) -> Option<CompanyStatus> {
        self.status.parse().ok()
    }
}

#[derive(Debug, Error)]
pub enum CompanyError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error("only administrators can change company status")]
    Forbidden,
    #[error("company not found")]
    NotFound,
    #[error("slug `{0}` is already in use")]
    DuplicateSlug(String),
    #[error("database error: {0}")]
    Database(#[from] DieselError),
}

pub type CompanyResult<T> = Result<T, CompanyError>;

/// Builds a URL-safe slug from a company name: lowercase, whitespace runs
/// become a single hyphen, anything outside `[a-z0-9-]` is dropped.
pub fn derive_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for ch in name.trim().to_lowercase().chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            slug.push(ch);
        }
    }
    slug
}

/// Registers a company for `owner_id`. New companies always start `Pending`.
pub fn create_company(
    conn: &mut PgConnection,
    owner_id: i64,
    mut payload: CompanyPayload,
) -> CompanyResult<Company> {
    payload.owner_id = Some(owner_id);
    if payload.status.is_none() {
        payload.status = Some(CompanyStatus::Pending.as_str().to_string());
    }
    let valid = validation::validate_company(payload)?;

    let slug = match valid.slug {
        Some(slug) => slug,
        None => derive_slug(&valid.name),
    };
    if !validation::is_valid_slug(&slug) {
        return Err(ValidationErrors::single(
            "slug",
            "Slug could not be derived from the company name",
        )
        .into());
    }

    let new_company = NewCompany {
        name: &valid.name,
        representation: &valid.representation,
        slug: &slug,
        status: CompanyStatus::Pending.as_str(),
        owner_id: valid.owner_id,
    };

    let company = diesel::insert_into(companies::table)
        .values(&new_company)
        .get_result::<Company>(conn)
        .map_err(|err| map_slug_violation(err, &slug))?;

    tracing::info!(
        company_id = company.id,
        owner_id = company.owner_id,
        slug = %company.slug,
        "company registered"
    );
    Ok(company)
}

/// Applies an administrator's decision to a company.
///
/// Approving a company whose slug is still empty assigns a derived slug in
/// the same write. Repeating the current status leaves the row untouched.
pub fn set_company_status(
    conn: &mut PgConnection,
    company_id: i64,
    new_status: &str,
    acting_email: &str,
) -> CompanyResult<Company> {
    let acting = users::find_by_email(conn, acting_email)?.ok_or(CompanyError::Forbidden)?;
    if acting.role.parse::<Role>().ok() != Some(Role::Admin) {
        return Err(CompanyError::Forbidden);
    }

    let target = new_status
        .parse::<CompanyStatus>()
        .ok()
        .filter(|status| status.is_admin_decision())
        .ok_or_else(|| {
            ValidationErrors::single("status", "Status must be Approved, Active, or Rejected")
        })?;

    conn.transaction(|conn| {
        let company = companies::table
            .find(company_id)
            .for_update()
            .first::<Company>(conn)
            .optional()?
            .ok_or(CompanyError::NotFound)?;

        let assigned_slug = (target.is_approved() && company.slug.trim().is_empty())
            .then(|| derive_slug(&company.name))
            .filter(|slug| !slug.is_empty());

        if company.lifecycle() == Some(target) && assigned_slug.is_none() {
            return Ok(company);
        }

        let slug = assigned_slug.unwrap_or_else(|| company.slug.clone());
        let updated = diesel::update(companies::table.find(company_id))
            .set((
                companies::status.eq(target.as_str()),
                companies::slug.eq(&slug),
                companies::updated_at.eq(Utc::now().naive_utc()),
            ))
            .get_result::<Company>(conn)
            .map_err(|err| map_slug_violation(err, &slug))?;

        tracing::info!(
            company_id,
            admin_id = acting.id,
            from = %company.status,
            to = %target,
            slug = %updated.slug,
            "company status changed"
        );
        Ok(updated)
    })
}

fn map_slug_violation(err: DieselError, slug: &str) -> CompanyError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            CompanyError::DuplicateSlug(slug.to_string())
        }
        other => CompanyError::Database(other),
    }
}

pub fn find_company(conn: &mut PgConnection, company_id: i64) -> CompanyResult<Company> {
    companies::table
        .find(company_id)
        .first::<Company>(conn)
        .optional()?
        .ok_or(CompanyError::NotFound)
}

pub fn find_by_slug(conn: &mut PgConnection, slug: &str) -> CompanyResult<Option<Company>> {
    if slug.is_empty() {
        return Ok(None);
    }
    Ok(companies::table
        .filter(companies::slug.eq(slug))
        .first::<Company>(conn)
        .optional()?)
}

pub fn find_owned_company(
    conn: &mut PgConnection,
    owner_id: i64,
    company_id: i64,
) -> CompanyResult<Company> {
    companies::table
        .find(company_id)
        .filter(companies::owner_id.eq(owner_id))
        .first::<Company>(conn)
        .optional()?
        .ok_or(CompanyError::NotFound)
}

pub fn list_companies(conn: &mut PgConnection) -> CompanyResult<Vec<Company>> {
    Ok(companies::table
        .order((companies::created_at.desc(), companies::id.desc()))
        .load(conn)?)
}

pub fn list_owned_companies(conn: &mut PgConnection, owner_id: i64) -> CompanyResult<Vec<Company>> {
    Ok(companies::table
        .filter(companies::owner_id.eq(owner_id))
        .order((companies::created_at.desc(), companies::id.desc()))
        .load(conn)?)
}

/// Companies listed in the public directory, alphabetically.
pub fn list_published_companies(conn: &mut PgConnection) -> CompanyResult<Vec<Company>> {
    Ok(companies::table
        .filter(companies::status.eq(CompanyStatus::Active.as_str()))
        .order((companies::name.asc(), companies::id.asc()))
        .load(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_hyphenated_lowercase_slug() {
        assert_eq!(derive_slug("Acme Corp"), "acme-corp");
        assert_eq!(derive_slug("  Acme   Corp  "), "acme-corp");
        assert_eq!(derive_slug("Acme\tData\nLtd"), "acme-data-ltd");
    }

    #[test]
    fn strips_characters_outside_slug_alphabet() {
        assert_eq!(derive_slug("Acme Corp!"), "acme-corp");
        assert_eq!(derive_slug("O'Brien & Sons (UK)"), "obrien--sons-uk");
        assert_eq!(derive_slug("Café 42"), "caf-42");
        assert_eq!(derive_slug("!!"), "");
    }

    #[test]
    fn derived_slugs_match_the_slug_pattern() {
        for name in ["Acme Corp", "Big Co 2", "x-y z", "Émile Zola GmbH"] {
            let slug = derive_slug(name);
            assert!(validation::is_valid_slug(&slug), "{name:?} -> {slug:?}");
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in CompanyStatus::ALL {
            assert_eq!(status.as_str().parse::<CompanyStatus>(), Ok(status));
        }
        assert!("approved".parse::<CompanyStatus>().is_err());
    }

    #[test]
    fn approved_and_active_are_both_approved() {
        let approved: Vec<_> = CompanyStatus::ALL
            .into_iter()
            .filter(|s| s.is_approved())
            .collect();
        assert_eq!(approved, vec![CompanyStatus::Approved, CompanyStatus::Active]);
    }

    #[test]
    fn admin_decisions_exclude_pending_and_inactive() {
        assert!(!CompanyStatus::Pending.is_admin_decision());
        assert!(!CompanyStatus::Inactive.is_admin_decision());
        assert!(CompanyStatus::Rejected.is_admin_decision());
    }
}
