use std::time::Duration;

use anyhow::Context;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        identifier      VARCHAR(64)  NOT NULL PRIMARY KEY,
        name            VARCHAR(255) NOT NULL,
        role            VARCHAR(16)  NOT NULL,
        site_id         VARCHAR(64)  NULL,
        position        VARCHAR(255) NOT NULL DEFAULT '',
        credential_hash VARCHAR(255) NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sites (
        site_id       VARCHAR(64)  NOT NULL PRIMARY KEY,
        name          VARCHAR(255) NOT NULL DEFAULT '',
        latitude      DOUBLE       NOT NULL,
        longitude     DOUBLE       NOT NULL,
        radius_meters DOUBLE       NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance_sessions (
        id             BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
        employee_id    VARCHAR(64)  NOT NULL,
        name           VARCHAR(255) NOT NULL,
        site_id        VARCHAR(64)  NULL,
        clock_in_at    DATETIME(3)  NOT NULL,
        in_lat         DOUBLE       NOT NULL,
        in_lng         DOUBLE       NOT NULL,
        clock_out_at   DATETIME(3)  NULL,
        out_lat        DOUBLE       NULL,
        out_lng        DOUBLE       NULL,
        worked_seconds BIGINT       NULL,
        INDEX idx_sessions_open (employee_id, clock_out_at),
        INDEX idx_sessions_recent (employee_id, clock_in_at)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS overtime_requests (
        id            VARCHAR(128) NOT NULL PRIMARY KEY,
        employee_id   VARCHAR(64)  NOT NULL,
        name          VARCHAR(255) NOT NULL,
        site_id       VARCHAR(64)  NOT NULL,
        start_at      DATETIME(3)  NOT NULL,
        end_at        DATETIME(3)  NOT NULL,
        reason        TEXT         NOT NULL,
        status        VARCHAR(16)  NOT NULL DEFAULT 'Pending',
        approver_name VARCHAR(255) NULL,
        decided_at    DATETIME(3)  NULL,
        created_at    DATETIME(3)  NOT NULL,
        INDEX idx_ot_site_status (site_id, status),
        INDEX idx_ot_employee (employee_id)
    )
    "#,
];

pub async fn init_db(database_url: &str, acquire_timeout: Duration) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Creates missing tables. Existing tables are left untouched.
pub async fn ensure_schema(pool: &MySqlPool) -> anyhow::Result<()> {
    for ddl in SCHEMA {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .context("Failed to bootstrap schema")?;
    }
    tracing::info!(tables = SCHEMA.len(), "Database schema ready");
    Ok(())
}
