use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::Error as DieselError;

use crate::models::{NewUser, User};
use crate::routing::Role;
use crate::schema::users;

pub fn find_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<User>, DieselError> {
    users::table
        .filter(users::email.eq(email))
        .first::<User>(conn)
        .optional()
}

/// Returns the profile for `email`, creating an owner profile on first sign-in.
/// Existing profiles (including pre-seeded admins) keep their role.
pub fn ensure_profile(conn: &mut PgConnection, email: &str) -> Result<User, DieselError> {
    let inserted = diesel::insert_into(users::table)
        .values(&NewUser {
            email,
            role: Role::Owner.as_str(),
        })
        .on_conflict(users::email)
        .do_nothing()
        .execute(conn)?;

    if inserted > 0 {
        tracing::info!(email, "created owner profile on first sign-in");
    }

    users::table.filter(users::email.eq(email)).first(conn)
}

/// Creates or upgrades the profile for `email` to administrator.
pub fn promote_admin(conn: &mut PgConnection, email: &str) -> Result<User, DieselError> {
    diesel::insert_into(users::table)
        .values(&NewUser {
            email,
            role: Role::Admin.as_str(),
        })
        .on_conflict(users::email)
        .do_update()
        .set(users::role.eq(Role::Admin.as_str()))
        .get_result(conn)
}
