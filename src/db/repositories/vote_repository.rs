use crate::db::connection::DbPool;
use crate::db::models::Vote;
use sqlx::Error;

/// Records a vote and its selections in one transaction. The `UNIQUE(poll_id, user_id)`
/// constraint rejects a second vote even when two requests race past the pre-check.
pub async fn cast_vote(pool: &DbPool, vote: &Vote) -> Result<Vote, Error> {
    let mut tx = pool.begin().await?;

    let vote_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO votes (poll_id, user_id, submitted_on) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(vote.poll_id)
    .bind(&vote.user_id)
    .bind(vote.submitted_on)
    .fetch_one(&mut *tx)
    .await?;

    for selection in &vote.answers {
        sqlx::query(
            "INSERT INTO vote_answers (vote_id, question_id, answer_id) VALUES ($1, $2, $3)",
        )
        .bind(vote_id)
        .bind(selection.question_id)
        .bind(selection.answer_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let mut saved = vote.clone();
    saved.id = vote_id;
    Ok(saved)
}

pub async fn user_has_voted(pool: &DbPool, poll_id: i32, user_id: &str) -> Result<bool, Error> {
    let row = sqlx::query("SELECT id FROM votes WHERE poll_id = $1 AND user_id = $2")
        .bind(poll_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.is_some())
}
