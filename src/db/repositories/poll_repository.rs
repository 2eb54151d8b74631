use crate::db::connection::DbPool;
use crate::db::models::Poll;
use sqlx::Error;

pub async fn create_poll(pool: &DbPool, poll: &Poll) -> Result<i32, Error> {
    let id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO polls (title, description, starts_at, ends_at, is_published, created_by_id, created_on)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(&poll.title)
    .bind(&poll.description)
    .bind(poll.starts_at)
    .bind(poll.ends_at)
    .bind(poll.is_published)
    .bind(&poll.audit.created_by_id)
    .bind(poll.audit.created_on)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

pub async fn get_poll(pool: &DbPool, poll_id: i32) -> Result<Option<Poll>, Error> {
    let row = sqlx::query_as::<_, Poll>(
        r#"
        SELECT id, title, description, starts_at, ends_at, is_published,
               created_by_id, created_on, updated_by_id, updated_on
        FROM polls WHERE id = $1
        "#,
    )
    .bind(poll_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn get_all_polls(pool: &DbPool) -> Result<Vec<Poll>, Error> {
    let rows = sqlx::query_as::<_, Poll>(
        r#"
        SELECT id, title, description, starts_at, ends_at, is_published,
               created_by_id, created_on, updated_by_id, updated_on
        FROM polls ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn update_poll(pool: &DbPool, poll: &Poll) -> Result<(), Error> {
    let result = sqlx::query(
        r#"
        UPDATE polls
        SET title = $2, description = $3, starts_at = $4, ends_at = $5, is_published = $6,
            updated_by_id = $7, updated_on = $8
        WHERE id = $1
        "#,
    )
    .bind(poll.id)
    .bind(&poll.title)
    .bind(&poll.description)
    .bind(poll.starts_at)
    .bind(poll.ends_at)
    .bind(poll.is_published)
    .bind(&poll.audit.updated_by_id)
    .bind(poll.audit.updated_on)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::RowNotFound);
    }
    Ok(())
}

/// Deletes a poll and everything it owns, children first.
pub async fn delete_poll(pool: &DbPool, poll_id: i32) -> Result<(), Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM vote_answers WHERE vote_id IN (SELECT id FROM votes WHERE poll_id = $1)",
    )
    .bind(poll_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM votes WHERE poll_id = $1")
        .bind(poll_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "DELETE FROM answers WHERE question_id IN (SELECT id FROM questions WHERE poll_id = $1)",
    )
    .bind(poll_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM questions WHERE poll_id = $1")
        .bind(poll_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM polls WHERE id = $1")
        .bind(poll_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
