use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access;
use crate::models::{Company, DsarRequest, NewDsarRequest};
use crate::schema::{companies, dsar_requests};
use crate::users;
use crate::validation::{self, DsarPayload, ValidationErrors};

/// Handling state of a DSAR. Any state may move to any other; there is no
/// forward-only ordering, so a closed request can be reopened.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DsarStatus {
    #[default]
    Open,
    InProgress,
    InReview,
    Closed,
}

impl DsarStatus {
    pub const ALL: [DsarStatus; 4] = [
        DsarStatus::Open,
        DsarStatus::InProgress,
        DsarStatus::InReview,
        DsarStatus::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DsarStatus::Open => "open",
            DsarStatus::InProgress => "in_progress",
            DsarStatus::InReview => "in_review",
            DsarStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for DsarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown request status `{0}`")]
pub struct UnknownDsarStatus(pub String);

impl FromStr for DsarStatus {
    type Err = UnknownDsarStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        DsarStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownDsarStatus(value.to_string()))
    }
}

/// Whether submissions re-check the access gate before inserting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePolicy {
    Enforce,
    Bypass,
}

impl GatePolicy {
    pub fn from_flag(enforce: bool) -> Self {
        if enforce {
            GatePolicy::Enforce
        } else {
            GatePolicy::Bypass
        }
    }
}

#[derive(Debug, Error)]
pub enum DsarError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error("user profile not found")]
    ProfileNotFound,
    #[error("request not found")]
    NotFound,
    #[error("company not found")]
    CompanyNotFound,
    #[error("this company is not accepting requests")]
    NotAcceptingRequests,
    #[error("database error: {0}")]
    Database(#[from] DieselError),
}

pub type DsarResult<T> = Result<T, DsarError>;

/// Records a public submission with status `open`.
///
/// Under [`GatePolicy::Enforce`] the company row is share-locked and checked
/// against the access gate in the same transaction as the insert.
pub fn submit_dsar(
    conn: &mut PgConnection,
    payload: DsarPayload,
    gate: GatePolicy,
) -> DsarResult<DsarRequest> {
    let valid = validation::validate_dsar(payload)?;

    conn.transaction(|conn| {
        let company = companies::table
            .find(valid.company_id)
            .for_share()
            .first::<Company>(conn)
            .optional()?
            .ok_or(DsarError::CompanyNotFound)?;

        let submittable = access::is_publicly_submittable(&company);
        if gate == GatePolicy::Enforce && !submittable {
            return Err(DsarError::NotAcceptingRequests);
        }
        if !submittable {
            tracing::warn!(
                company_id = company.id,
                status = %company.status,
                "accepting request for a company outside the access gate"
            );
        }

        let request = diesel::insert_into(dsar_requests::table)
            .values(&NewDsarRequest {
                company_id: company.id,
                requester_name: &valid.requester_name,
                requester_email: &valid.requester_email,
                requester_phone: &valid.requester_phone,
                request_text: &valid.request_text,
                status: DsarStatus::Open.as_str(),
            })
            .get_result::<DsarRequest>(conn)?;

        tracing::info!(
            dsar_id = request.id,
            company_id = company.id,
            "request submitted"
        );
        Ok(request)
    })
}

/// Moves a request to `new_status` on behalf of any signed-in profile.
pub fn set_dsar_status(
    conn: &mut PgConnection,
    dsar_id: i64,
    new_status: &str,
    acting_email: &str,
) -> DsarResult<DsarRequest> {
    let acting = users::find_by_email(conn, acting_email)?.ok_or(DsarError::ProfileNotFound)?;
    let status = new_status.parse::<DsarStatus>().map_err(|_| {
        ValidationErrors::single(
            "status",
            "Status must be one of open, in_progress, in_review, closed",
        )
    })?;

    let updated = diesel::update(dsar_requests::table.find(dsar_id))
        .set((
            dsar_requests::status.eq(status.as_str()),
            dsar_requests::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result::<DsarRequest>(conn)
        .optional()?
        .ok_or(DsarError::NotFound)?;

    tracing::info!(
        dsar_id,
        user_id = acting.id,
        status = %status,
        "request status changed"
    );
    Ok(updated)
}

pub fn find_dsar(conn: &mut PgConnection, dsar_id: i64) -> DsarResult<DsarRequest> {
    dsar_requests::table
        .find(dsar_id)
        .first::<DsarRequest>(conn)
        .optional()?
        .ok_or(DsarError::NotFound)
}

/// Requests for one company, newest first, optionally narrowed to a status.
pub fn list_for_company(
    conn: &mut PgConnection,
    company_id: i64,
    status: Option<DsarStatus>,
) -> DsarResult<Vec<DsarRequest>> {
    let mut query = dsar_requests::table
        .filter(dsar_requests::company_id.eq(company_id))
        .order((dsar_requests::created_at.desc(), dsar_requests::id.desc()))
        .into_boxed();
    if let Some(status) = status {
        query = query.filter(dsar_requests::status.eq(status.as_str()));
    }
    Ok(query.load(conn)?)
}

/// Every request on the platform with its company, newest first.
pub fn list_all(conn: &mut PgConnection) -> DsarResult<Vec<(DsarRequest, Company)>> {
    Ok(dsar_requests::table
        .inner_join(companies::table)
        .order((dsar_requests::created_at.desc(), dsar_requests::id.desc()))
        .load::<(DsarRequest, Company)>(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_storage_values() {
        let values: Vec<_> = DsarStatus::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(values, ["open", "in_progress", "in_review", "closed"]);
        for status in DsarStatus::ALL {
            assert_eq!(status.as_str().parse::<DsarStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("reopened".parse::<DsarStatus>().is_err());
        assert!("Open".parse::<DsarStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&DsarStatus::InReview).unwrap();
        assert_eq!(json, "\"in_review\"");
    }

    #[test]
    fn gate_policy_follows_flag() {
        assert_eq!(GatePolicy::from_flag(true), GatePolicy::Enforce);
        assert_eq!(GatePolicy::from_flag(false), GatePolicy::Bypass);
    }
}
