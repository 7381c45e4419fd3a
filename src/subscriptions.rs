//! Mirrors billing-processor events onto company rows.
//!
//! Every write is an overwrite keyed by company id or subscription id, so
//! redelivery converges. Each company remembers the `created` time of the
//! last event applied to it and ignores anything older.

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::access::SUBSCRIPTION_ACTIVE;
use crate::models::Company;
use crate::schema::companies;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Envelope of a processor event, already authenticated.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct CheckoutSessionObject {
    #[serde(default)]
    metadata: Option<CheckoutMetadata>,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    subscription: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CheckoutMetadata {
    #[serde(rename = "companyId", default)]
    company_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SubscriptionObject {
    id: String,
    status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted {
        company_id: Option<String>,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    },
    SubscriptionChanged {
        subscription_id: String,
        status: String,
    },
    Unhandled,
}

impl WebhookEvent {
    pub fn classify(&self) -> Result<BillingEvent, serde_json::Error> {
        match self.event_type.as_str() {
            CHECKOUT_COMPLETED => {
                let session: CheckoutSessionObject =
                    serde_json::from_value(self.data.object.clone())?;
                Ok(BillingEvent::CheckoutCompleted {
                    company_id: session.metadata.and_then(|m| m.company_id),
                    customer_id: session.customer,
                    subscription_id: session.subscription,
                })
            }
            SUBSCRIPTION_UPDATED | SUBSCRIPTION_DELETED => {
                let subscription: SubscriptionObject =
                    serde_json::from_value(self.data.object.clone())?;
                Ok(BillingEvent::SubscriptionChanged {
                    subscription_id: subscription.id,
                    status: subscription.status,
                })
            }
            _ => Ok(BillingEvent::Unhandled),
        }
    }

    fn occurred_at(&self) -> NaiveDateTime {
        DateTime::<Utc>::from_timestamp(self.created, 0)
            .unwrap_or_else(Utc::now)
            .naive_utc()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    MissingCompanyId,
    InvalidCompanyId,
    UnknownSubscription,
    StaleEvent,
    UnhandledType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    Applied { company_id: i64 },
    Ignored(IgnoreReason),
}

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("payload does not match event type: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("company {0} referenced by checkout session not found")]
    CompanyNotFound(i64),
    #[error("database error: {0}")]
    Database(#[from] DieselError),
}

pub fn apply_event(
    conn: &mut PgConnection,
    event: &WebhookEvent,
) -> Result<MirrorOutcome, MirrorError> {
    let occurred_at = event.occurred_at();
    let outcome = match event.classify()? {
        BillingEvent::CheckoutCompleted {
            company_id,
            customer_id,
            subscription_id,
        } => {
            let Some(raw_id) = company_id else {
                return Ok(ignored(event, IgnoreReason::MissingCompanyId));
            };
            let Ok(company_id) = raw_id.trim().parse::<i64>() else {
                return Ok(ignored(event, IgnoreReason::InvalidCompanyId));
            };
            record_checkout(
                conn,
                company_id,
                customer_id.as_deref(),
                subscription_id.as_deref(),
                occurred_at,
            )?
        }
        BillingEvent::SubscriptionChanged {
            subscription_id,
            status,
        } => record_subscription_status(conn, &subscription_id, &status, occurred_at)?,
        BillingEvent::Unhandled => MirrorOutcome::Ignored(IgnoreReason::UnhandledType),
    };

    match outcome {
        MirrorOutcome::Applied { company_id } => tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            company_id,
            "billing event applied"
        ),
        MirrorOutcome::Ignored(reason) => {
            return Ok(ignored(event, reason));
        }
    }
    Ok(outcome)
}

fn ignored(event: &WebhookEvent, reason: IgnoreReason) -> MirrorOutcome {
    tracing::warn!(
        event_id = %event.id,
        event_type = %event.event_type,
        ?reason,
        "billing event ignored"
    );
    MirrorOutcome::Ignored(reason)
}

fn is_stale(company: &Company, occurred_at: NaiveDateTime) -> bool {
    company
        .subscription_event_at
        .is_some_and(|last| occurred_at < last)
}

fn record_checkout(
    conn: &mut PgConnection,
    company_id: i64,
    customer_id: Option<&str>,
    subscription_id: Option<&str>,
    occurred_at: NaiveDateTime,
) -> Result<MirrorOutcome, MirrorError> {
    conn.transaction(|conn| {
        let company = companies::table
            .find(company_id)
            .for_update()
            .first::<Company>(conn)
            .optional()?
            .ok_or(MirrorError::CompanyNotFound(company_id))?;

        if is_stale(&company, occurred_at) {
            return Ok(MirrorOutcome::Ignored(IgnoreReason::StaleEvent));
        }

        diesel::update(companies::table.find(company.id))
            .set((
                companies::stripe_customer_id.eq(customer_id),
                companies::stripe_subscription_id.eq(subscription_id),
                companies::subscription_status.eq(SUBSCRIPTION_ACTIVE),
                companies::subscription_event_at.eq(occurred_at),
                companies::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;
        Ok(MirrorOutcome::Applied {
            company_id: company.id,
        })
    })
}

fn record_subscription_status(
    conn: &mut PgConnection,
    subscription_id: &str,
    status: &str,
    occurred_at: NaiveDateTime,
) -> Result<MirrorOutcome, MirrorError> {
    conn.transaction(|conn| {
        let Some(company) = companies::table
            .filter(companies::stripe_subscription_id.eq(subscription_id))
            .for_update()
            .first::<Company>(conn)
            .optional()?
        else {
            return Ok(MirrorOutcome::Ignored(IgnoreReason::UnknownSubscription));
        };

        if is_stale(&company, occurred_at) {
            return Ok(MirrorOutcome::Ignored(IgnoreReason::StaleEvent));
        }

        diesel::update(companies::table.find(company.id))
            .set((
                companies::subscription_status.eq(status),
                companies::subscription_event_at.eq(occurred_at),
                companies::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;
        Ok(MirrorOutcome::Applied {
            company_id: company.id,
        })
    })
}
