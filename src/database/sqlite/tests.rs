use super::*;
use anyhow::Result;
use std::collections::HashSet;
use tempfile::TempDir;

#[tokio::test]
async fn integration_schema_migration() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let database = Database::initialize_from_config_dir(temp_dir.path(), "documind.db").await?;

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx%'",
    )
    .fetch_all(database.pool())
    .await?;

    let expected_tables: HashSet<&'static str> =
        ["embeddings", "model_state"].into_iter().collect();
    let actual_tables: HashSet<&str> = tables.iter().map(|t| t.as_str()).collect();
    assert_eq!(actual_tables, expected_tables);

    Ok(())
}

#[tokio::test]
async fn reopening_keeps_data() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let nested = temp_dir.path().join("nested").join("dir");

    let database = Database::initialize_from_config_dir(&nested, "documind.db").await?;
    sqlx::query("INSERT INTO embeddings (chunk, embedding) VALUES ('kept', '[1.0]')")
        .execute(database.pool())
        .await?;
    database.close().await;

    let reopened = Database::initialize_from_config_dir(&nested, "documind.db").await?;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM embeddings")
        .fetch_one(reopened.pool())
        .await?;
    assert_eq!(count, 1);

    Ok(())
}

#[tokio::test]
async fn model_state_is_singleton() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let database = Database::initialize_from_config_dir(temp_dir.path(), "documind.db").await?;

    let result = sqlx::query("INSERT INTO model_state (id, vectorizer) VALUES (2, '{}')")
        .execute(database.pool())
        .await;
    assert!(result.is_err());

    Ok(())
}
