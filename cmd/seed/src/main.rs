//! # seed
//!
//! Creates the first administrator, or promotes an existing account.
//! Signup never grants the admin role, so this is the only way to get one.
//!
//! ```text
//! SEED_ADMIN_EMAIL=root@example.com SEED_ADMIN_USERNAME=root \
//! SEED_ADMIN_PASSWORD=... cargo run -p seed
//! ```

use anyhow::{bail, Context};
use auth_adapters::Argon2PasswordHasher;
use configs::{DatabaseBackend, Settings};
use domains::models::{Role, User};
use domains::ports::{PasswordHasher, UserRepo};
use secrecy::ExposeSecret;
use storage_adapters::PgContentStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MIN_PASSWORD_LEN: usize = 6;

struct AdminSeed {
    email: String,
    username: String,
    password: String,
}

fn env_var(name: &str) -> anyhow::Result<String> {
    let value = std::env::var(name).with_context(|| format!("{name} is not set"))?;
    let value = value.trim().to_string();
    if value.is_empty() {
        bail!("{name} is empty");
    }
    Ok(value)
}

impl AdminSeed {
    fn from_env() -> anyhow::Result<Self> {
        let seed = Self {
            email: env_var("SEED_ADMIN_EMAIL")?.to_lowercase(),
            username: env_var("SEED_ADMIN_USERNAME")?,
            password: env_var("SEED_ADMIN_PASSWORD")?,
        };
        if seed.password.chars().count() < MIN_PASSWORD_LEN {
            bail!("SEED_ADMIN_PASSWORD must be {MIN_PASSWORD_LEN} or more characters");
        }
        Ok(seed)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.level)),
        )
        .init();

    if settings.database.backend != DatabaseBackend::Postgres {
        bail!("seeding needs database.backend = \"postgres\"; the in-memory store does not persist");
    }
    let url = settings
        .database
        .url
        .as_ref()
        .context("database.url is not set")?;

    let seed = AdminSeed::from_env()?;

    let store = PgContentStore::connect(url.expose_secret(), settings.database.max_connections).await?;
    store.migrate().await?;

    if let Some(existing) = store.find_user_by_email(&seed.email).await? {
        if existing.role == Role::Admin {
            info!(user_id = %existing.id, "account is already an admin");
            return Ok(());
        }
        store
            .set_role(existing.id, Role::Admin)
            .await?
            .context("account vanished while promoting it")?;
        info!(user_id = %existing.id, email = %seed.email, "promoted existing account to admin");
        return Ok(());
    }

    let hash = Argon2PasswordHasher::new().hash(&seed.password)?;
    let admin = store
        .create_user(User::new(seed.username, seed.email, hash, Role::Admin))
        .await?;
    info!(user_id = %admin.id, email = %admin.email, "created admin account");
    Ok(())
}
