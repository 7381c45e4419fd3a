use std::env;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use dsar_portal::{auth::jwt::JwtService, config::AppConfig, db, users};

const USAGE: &str = "Usage: maintenance <promote-admin|issue-token> <email>";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    let command = args.next();
    let email = args.next();

    match (command.as_deref(), email.as_deref()) {
        (Some("promote-admin"), Some(email)) => promote_admin(email)?,
        (Some("issue-token"), Some(email)) => issue_token(email)?,
        (Some(cmd @ ("promote-admin" | "issue-token")), None) => {
            eprintln!("{cmd} needs an email address\n{USAGE}");
            std::process::exit(1);
        }
        (Some(cmd), _) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        (None, _) => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn promote_admin(email: &str) -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        "loaded portal configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    db::run_migrations(&pool)?;

    let mut conn = pool.get().context("failed to get database connection")?;
    let user = users::promote_admin(&mut conn, email).context("failed to promote profile")?;

    println!("{} is now an admin (profile {}).", user.email, user.id);
    Ok(())
}

fn issue_token(email: &str) -> Result<()> {
    let config = AppConfig::from_env()?;
    let jwt = JwtService::from_config(&config)?;
    let token = jwt
        .generate_token(&format!("local|{email}"), email)
        .context("failed to sign token")?;

    println!("{token}");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
