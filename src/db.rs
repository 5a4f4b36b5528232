use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

const INIT_MAX_RETRIES: u32 = 10;
const INIT_RETRY_DELAY: Duration = Duration::from_secs(5);

const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS contact (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL,
    age         INTEGER NOT NULL,
    created_at  DATETIME NOT NULL,
    updated_at  DATETIME NOT NULL
)"#,
    r#"
CREATE TABLE IF NOT EXISTS phone (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id   INTEGER NOT NULL REFERENCES contact(id) ON DELETE CASCADE,
    phone_number TEXT    NOT NULL,
    created_at   DATETIME NOT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_phone_contact_id ON phone(contact_id)",
];

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new().connect_with(options).await
}

pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Connects, creates the schema, and seeds initial data, retrying while the
/// store is not yet reachable. Gives up after a fixed number of attempts.
pub async fn initialize(database_url: &str) -> anyhow::Result<SqlitePool> {
    for attempt in 1..=INIT_MAX_RETRIES {
        match try_initialize(database_url).await {
            Ok(pool) => {
                tracing::info!("database initialized successfully");
                return Ok(pool);
            }
            Err(err) if attempt < INIT_MAX_RETRIES => {
                tracing::warn!(
                    attempt,
                    max_retries = INIT_MAX_RETRIES,
                    error = %err,
                    "database not ready, retrying"
                );
                tokio::time::sleep(INIT_RETRY_DELAY).await;
            }
            Err(err) => {
                return Err(err).context("failed to initialize database after maximum retries")
            }
        }
    }
    unreachable!("retry loop always returns")
}

async fn try_initialize(database_url: &str) -> anyhow::Result<SqlitePool> {
    let pool = connect(database_url).await?;
    create_schema(&pool).await?;
    seed(&pool).await?;
    Ok(pool)
}

/// Seeds a dozen well-known contacts the first time the service starts
/// against an empty store. A non-empty store is left untouched.
pub async fn seed(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        tracing::info!("database already seeded, skipping");
        return Ok(());
    }

    tracing::info!("seeding database with initial contacts");

    let seed_contacts: &[(&str, i64, &[&str])] = &[
        ("John Smith", 32, &["+1-555-0101", "+1-555-0102"]),
        ("Jane Doe", 28, &["+1-555-0201"]),
        ("Robert Johnson", 45, &["+1-555-0301", "+1-555-0302", "+1-555-0303"]),
        ("Emily Davis", 24, &["+1-555-0401"]),
        ("Michael Brown", 38, &["+1-555-0501", "+1-555-0502"]),
        ("Sarah Wilson", 31, &["+1-555-0601"]),
        ("David Martinez", 42, &["+1-555-0701", "+1-555-0702"]),
        ("Lisa Anderson", 29, &["+1-555-0801"]),
        ("James Taylor", 55, &["+1-555-0901", "+1-555-0902"]),
        ("Jennifer Thomas", 33, &["+1-555-1001"]),
        ("William Garcia", 48, &["+1-555-1101", "+1-555-1102"]),
        ("Amanda Rodriguez", 26, &["+1-555-1201"]),
    ];

    let now = chrono::Utc::now();
    let mut tx = pool.begin().await?;
    for &(name, age, numbers) in seed_contacts {
        let contact_id: i64 = sqlx::query_scalar(
            "INSERT INTO contact (name, age, created_at, updated_at) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(name)
        .bind(age)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for &number in numbers {
            sqlx::query("INSERT INTO phone (contact_id, phone_number, created_at) VALUES ($1, $2, $3)")
                .bind(contact_id)
                .bind(number)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }
    }
    tx.commit().await?;

    tracing::info!(count = seed_contacts.len(), "seeded contacts");
    Ok(())
}

#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid in-memory url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("in-memory pool");
    create_schema(&pool).await.expect("schema");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seed_populates_empty_store_once() {
        let pool = memory_pool().await;

        seed(&pool).await.unwrap();
        let contacts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(contacts, 12);

        // Second run is a no-op.
        seed(&pool).await.unwrap();
        let again: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(again, 12);
    }

    #[tokio::test]
    async fn deleting_a_contact_cascades_to_phones() {
        let pool = memory_pool().await;
        seed(&pool).await.unwrap();

        let id: i64 = sqlx::query_scalar("SELECT id FROM contact WHERE name = 'John Smith'")
            .fetch_one(&pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM contact WHERE id = $1")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM phone WHERE contact_id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }
}
