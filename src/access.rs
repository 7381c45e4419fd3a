//! Predicates deciding whether a company's public portal is reachable.

use crate::companies::CompanyStatus;
use crate::models::Company;

pub const SUBSCRIPTION_ACTIVE: &str = "active";
pub const SUBSCRIPTION_TRIALING: &str = "trialing";
pub const SUBSCRIPTION_PAST_DUE: &str = "past_due";
pub const SUBSCRIPTION_CANCELED: &str = "canceled";

/// Approved (or `Active`) and holding an active subscription.
pub fn is_publicly_submittable(company: &Company) -> bool {
    company.lifecycle().is_some_and(CompanyStatus::is_approved)
        && company.subscription_status.as_deref() == Some(SUBSCRIPTION_ACTIVE)
}

/// Listed in the public directory. Only the exact `Active` status qualifies.
pub fn is_published(company: &Company) -> bool {
    company.lifecycle() == Some(CompanyStatus::Active)
}

/// Whether the portal page for the company exists at all.
pub fn has_public_page(company: &Company) -> bool {
    company.lifecycle().is_some_and(CompanyStatus::is_approved)
}
