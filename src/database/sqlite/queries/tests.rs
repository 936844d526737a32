use super::*;
use crate::database::Database;
use tempfile::TempDir;

async fn create_test_database() -> Result<(TempDir, Database)> {
    let temp_dir = TempDir::new()?;
    let database = Database::initialize_from_config_dir(temp_dir.path(), "test.db").await?;
    Ok((temp_dir, database))
}

#[tokio::test]
async fn insert_and_list_in_order() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;
    let mut conn = database.pool().acquire().await?;

    for (chunk, vector) in [("first", [1.0, 0.0]), ("second", [0.0, 1.0])] {
        EmbeddingQueries::insert(
            &mut conn,
            &NewEmbedding {
                chunk,
                embedding: &vector,
            },
        )
        .await?;
    }
    drop(conn);

    let rows = EmbeddingQueries::list_all(database.pool()).await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].chunk, "first");
    assert_eq!(rows[1].vector()?, vec![0.0, 1.0]);
    assert!(rows[0].id < rows[1].id);

    let recent = EmbeddingQueries::list_recent(database.pool(), 1).await?;
    assert_eq!(recent, vec!["second".to_string()]);

    assert_eq!(EmbeddingQueries::count(database.pool()).await?, 2);
    assert_eq!(
        EmbeddingQueries::first_chunk(database.pool()).await?,
        Some("first".to_string())
    );

    Ok(())
}

#[tokio::test]
async fn delete_all_clears_rows() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;
    let mut conn = database.pool().acquire().await?;

    EmbeddingQueries::insert(
        &mut conn,
        &NewEmbedding {
            chunk: "gone soon",
            embedding: &[0.5],
        },
    )
    .await?;

    assert_eq!(EmbeddingQueries::delete_all(&mut conn).await?, 1);
    drop(conn);

    assert_eq!(EmbeddingQueries::count(database.pool()).await?, 0);
    assert_eq!(EmbeddingQueries::first_chunk(database.pool()).await?, None);

    Ok(())
}

#[tokio::test]
async fn model_state_upsert_keeps_single_row() -> Result<()> {
    let (_temp_dir, database) = create_test_database().await?;
    assert_eq!(ModelStateQueries::get(database.pool()).await?, None);

    let mut conn = database.pool().acquire().await?;
    ModelStateQueries::upsert(&mut conn, r#"{"version":1}"#).await?;
    ModelStateQueries::upsert(&mut conn, r#"{"version":2}"#).await?;
    drop(conn);

    let state = ModelStateQueries::get(database.pool())
        .await?
        .expect("model state should exist");
    assert_eq!(state.vectorizer, r#"{"version":2}"#);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM model_state")
        .fetch_one(database.pool())
        .await?;
    assert_eq!(rows, 1);

    let mut conn = database.pool().acquire().await?;
    ModelStateQueries::clear(&mut conn).await?;
    drop(conn);
    assert_eq!(ModelStateQueries::get(database.pool()).await?, None);

    Ok(())
}
