//! Integration tests for the infrastructure components
//!
//! These tests verify that the PostgreSQL database is properly configured and
//! accessible from the application. They need a running server reachable via
//! `DATABASE_URL`, so they are ignored by default.

use common::database::{DatabaseConfig, health_check, init_pool};
use sqlx::Row;

#[tokio::test]
#[ignore = "requires a running PostgreSQL reachable via DATABASE_URL"]
async fn test_database_integration() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1, "PostgreSQL simple query test failed");

    // gen_random_uuid() backs every primary key in the schema
    let row = sqlx::query("SELECT gen_random_uuid() IS NOT NULL AS ok")
        .fetch_one(&pool)
        .await?;
    let ok: bool = row.get("ok");
    assert!(ok, "gen_random_uuid() is not available");

    Ok(())
}
