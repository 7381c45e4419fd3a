use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub role: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = companies)]
#[diesel(belongs_to(User, foreign_key = owner_id))]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub representation: String,
    pub slug: String,
    pub status: String,
    pub owner_id: i64,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    pub subscription_event_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = companies)]
pub struct NewCompany<'a> {
    pub name: &'a str,
    pub representation: &'a str,
    pub slug: &'a str,
    pub status: &'a str,
    pub owner_id: i64,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = dsar_requests)]
#[diesel(belongs_to(Company))]
pub struct DsarRequest {
    pub id: i64,
    pub company_id: i64,
    pub requester_name: String,
    pub requester_email: String,
    pub requester_phone: String,
    pub request_text: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = dsar_requests)]
pub struct NewDsarRequest<'a> {
    pub company_id: i64,
    pub requester_name: &'a str,
    pub requester_email: &'a str,
    pub requester_phone: &'a str,
    pub request_text: &'a str,
    pub status: &'a str,
}
