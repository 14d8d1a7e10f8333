use std::env;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use faculty_reporting::{
    auth::password::{hash_password, MIN_PASSWORD_LENGTH},
    config::AppConfig,
    db,
    models::NewUser,
    schema::users,
    workflow::Role,
};

const USAGE: &str = "Usage:
  maintenance create-user <email> <password> <name> <role> <faculty>
  maintenance approve-students [faculty]";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("create-user") => create_user(&args[1..])?,
        Some("approve-students") => approve_students(args.get(1).map(String::as_str))?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn connect() -> Result<db::PgPool> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        "loaded configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    db::run_migrations(&pool)?;
    Ok(pool)
}

/// Creates an approved account of any role; the only way to bootstrap the
/// first faculty management user.
fn create_user(args: &[String]) -> Result<()> {
    let [email, password, name, role, faculty] = args else {
        bail!("create-user expects 5 arguments\n{USAGE}");
    };
    let role: Role = role.parse()?;
    if password.len() < MIN_PASSWORD_LENGTH {
        bail!("password must be at least {MIN_PASSWORD_LENGTH} characters long");
    }

    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let new_user = NewUser {
        id: Uuid::new_v4(),
        email: email.trim().to_lowercase(),
        password_hash: hash_password(password)?,
        name: name.trim().to_string(),
        role: role.as_str().to_string(),
        faculty: faculty.trim().to_string(),
        program: None,
        class_id: None,
        is_approved: true,
    };
    diesel::insert_into(users::table)
        .values(&new_user)
        .execute(&mut conn)
        .with_context(|| format!("failed to create user {}", new_user.email))?;

    println!("Created {} account {} ({})", role, new_user.email, new_user.id);
    Ok(())
}

fn approve_students(faculty: Option<&str>) -> Result<()> {
    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let pending = users::table
        .filter(users::role.eq(Role::Student.as_str()))
        .filter(users::is_approved.eq(false));
    let changes = (
        users::is_approved.eq(true),
        users::updated_at.eq(Utc::now().naive_utc()),
    );
    let approved = match faculty {
        Some(faculty) => diesel::update(pending.filter(users::faculty.eq(faculty)))
            .set(changes)
            .execute(&mut conn),
        None => diesel::update(pending).set(changes).execute(&mut conn),
    }
    .context("failed to approve students")?;

    println!("Approved {approved} student accounts.");
    Ok(())
}
