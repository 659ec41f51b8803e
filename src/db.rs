// src/db.rs - Database migrations and setup

use sqlx::SqlitePool;
use anyhow::Result;
use crate::repositories::search_key;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    // Users of the local identity provider
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE CHECK(length(email) >= 5 AND length(email) <= 255),
            password_hash TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1 CHECK(is_active IN (0, 1)),
            last_login DATETIME,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL,
            failed_login_attempts INTEGER NOT NULL DEFAULT 0,
            locked_until DATETIME
        )
        "#,
    )
        .execute(pool)
        .await?;

    // Tokens revoked by sign-out, keyed by their jti claim
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS revoked_tokens (
            jti TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            expires_at DATETIME NOT NULL,
            revoked_at DATETIME NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    // Medication catalog, keyed by SAP code
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS medications (
            sap_code INTEGER PRIMARY KEY,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 255),
            active_ingredient TEXT CHECK(active_ingredient IS NULL OR length(active_ingredient) <= 255),
            search_key TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS repackaging_methods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL UNIQUE CHECK(length(label) > 0 AND length(label) <= 100)
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS medication_methods (
            sap_code INTEGER NOT NULL,
            method_id INTEGER NOT NULL,
            PRIMARY KEY (sap_code, method_id),
            FOREIGN KEY (sap_code) REFERENCES medications (sap_code) ON DELETE CASCADE,
            FOREIGN KEY (method_id) REFERENCES repackaging_methods (id) ON DELETE CASCADE
        )
        "#,
    )
        .execute(pool)
        .await?;

    // Repackaging events. Rows are only ever inserted; user_id scopes reads.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS repackaging_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recorded_at DATETIME NOT NULL,
            user_id TEXT NOT NULL,
            sap_code INTEGER NOT NULL,
            method_id INTEGER NOT NULL,
            initial_quantity INTEGER NOT NULL CHECK(initial_quantity > 0),
            final_quantity INTEGER NOT NULL CHECK(final_quantity >= 0 AND final_quantity <= initial_quantity),
            original_lot TEXT NOT NULL CHECK(length(original_lot) > 0),
            original_expiry DATE NOT NULL,
            repackaged_expiry DATE NOT NULL CHECK(repackaged_expiry >= original_expiry),
            incident_note TEXT CHECK(incident_note IS NULL OR length(incident_note) <= 255),
            FOREIGN KEY (user_id) REFERENCES users (id),
            FOREIGN KEY (sap_code) REFERENCES medications (sap_code),
            FOREIGN KEY (method_id) REFERENCES repackaging_methods (id)
        )
        "#,
    )
        .execute(pool)
        .await?;

    migrate_existing_tables(pool).await?;
    create_indexes(pool).await?;

    log::info!("Database migrations completed");
    Ok(())
}

// ==================== MIGRATION FOR EXISTING DATABASES ====================

/// Databases created before `search_key` existed get the column, and every
/// row without a key gets one.
async fn migrate_existing_tables(pool: &SqlitePool) -> Result<()> {
    let migration_queries = [
        "ALTER TABLE medications ADD COLUMN search_key TEXT NOT NULL DEFAULT ''",
    ];

    for query in migration_queries.iter() {
        // Ignore errors for existing columns
        let _ = sqlx::query(query).execute(pool).await;
    }

    let missing: Vec<(i64, String, Option<String>)> = sqlx::query_as(
        "SELECT sap_code, name, active_ingredient FROM medications WHERE search_key = ''"
    )
        .fetch_all(pool)
        .await?;

    for (sap_code, name, active_ingredient) in missing {
        sqlx::query("UPDATE medications SET search_key = ? WHERE sap_code = ?")
            .bind(search_key(&name, active_ingredient.as_deref()))
            .bind(sap_code)
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_medications_name ON medications (name)",
        "CREATE INDEX IF NOT EXISTS idx_medication_methods_method ON medication_methods (method_id)",
        "CREATE INDEX IF NOT EXISTS idx_events_user_recorded ON repackaging_events (user_id, recorded_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_revoked_tokens_expires ON revoked_tokens (expires_at)",
    ];

    for sql in indexes {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    /// Fresh in-memory database. One connection, so every query sees the
    /// same database.
    pub async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        super::run_migrations(&pool).await.expect("migrations");
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::memory_pool;

    #[actix_rt::test]
    async fn test_missing_search_keys_are_backfilled() {
        let pool = memory_pool().await;
        sqlx::query("INSERT INTO medications (sap_code, name, active_ingredient) VALUES (7, 'ÑAME Ácido', 'Ibuprofeno')")
            .execute(&pool)
            .await
            .unwrap();

        super::run_migrations(&pool).await.unwrap();

        let (key,): (String,) = sqlx::query_as("SELECT search_key FROM medications WHERE sap_code = 7")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(key, "ñame ácido\nibuprofeno");
    }

    #[actix_rt::test]
    async fn test_migrations_are_idempotent() {
        let pool = memory_pool().await;
        super::run_migrations(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
            .fetch_all(&pool)
            .await
            .unwrap();
        let names: Vec<String> = tables.into_iter().map(|t| t.0).collect();
        assert_eq!(
            names,
            vec![
                "medication_methods",
                "medications",
                "repackaging_events",
                "repackaging_methods",
                "revoked_tokens",
                "users",
            ]
        );
    }
}
