use crate::db::connection::DbPool;
use crate::db::models::{Answer, Question};
use sqlx::{Error, PgConnection};

pub async fn get_questions(pool: &DbPool, poll_id: i32) -> Result<Vec<Question>, Error> {
    let mut questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, poll_id, content, is_active,
               created_by_id, created_on, updated_by_id, updated_on
        FROM questions WHERE poll_id = $1 ORDER BY id
        "#,
    )
    .bind(poll_id)
    .fetch_all(pool)
    .await?;

    let answers = sqlx::query_as::<_, Answer>(
        r#"
        SELECT a.id, a.question_id, a.content, a.is_active
        FROM answers a
        JOIN questions q ON q.id = a.question_id
        WHERE q.poll_id = $1
        ORDER BY a.id
        "#,
    )
    .bind(poll_id)
    .fetch_all(pool)
    .await?;

    for answer in answers {
        if let Some(question) = questions.iter_mut().find(|q| q.id == answer.question_id) {
            question.answers.push(answer);
        }
    }

    Ok(questions)
}

pub async fn get_question(
    pool: &DbPool,
    poll_id: i32,
    question_id: i32,
) -> Result<Option<Question>, Error> {
    let question = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, poll_id, content, is_active,
               created_by_id, created_on, updated_by_id, updated_on
        FROM questions WHERE poll_id = $1 AND id = $2
        "#,
    )
    .bind(poll_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await?;

    let Some(mut question) = question else {
        return Ok(None);
    };

    question.answers = sqlx::query_as::<_, Answer>(
        "SELECT id, question_id, content, is_active FROM answers WHERE question_id = $1 ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(question))
}

pub async fn question_content_exists(
    pool: &DbPool,
    poll_id: i32,
    content: &str,
    except: Option<i32>,
) -> Result<bool, Error> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM questions
            WHERE poll_id = $1
              AND LOWER(TRIM(content)) = LOWER(TRIM($2))
              AND ($3::INT IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(poll_id)
    .bind(content)
    .bind(except)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

pub async fn create_question(pool: &DbPool, question: &Question) -> Result<Question, Error> {
    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO questions (poll_id, content, is_active, created_by_id, created_on)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(question.poll_id)
    .bind(&question.content)
    .bind(question.is_active)
    .bind(&question.audit.created_by_id)
    .bind(question.audit.created_on)
    .fetch_one(&mut *tx)
    .await?;

    let mut saved = question.clone();
    saved.id = id;
    for answer in saved.answers.iter_mut() {
        answer.question_id = id;
        answer.id = insert_answer(&mut *tx, answer).await?;
    }

    tx.commit().await?;
    Ok(saved)
}

pub async fn update_question(pool: &DbPool, question: &Question) -> Result<Question, Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE questions
        SET content = $3, is_active = $4, updated_by_id = $5, updated_on = $6
        WHERE poll_id = $1 AND id = $2
        "#,
    )
    .bind(question.poll_id)
    .bind(question.id)
    .bind(&question.content)
    .bind(question.is_active)
    .bind(&question.audit.updated_by_id)
    .bind(question.audit.updated_on)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Err(Error::RowNotFound);
    }

    let mut saved = question.clone();
    for answer in saved.answers.iter_mut() {
        answer.question_id = question.id;
        if answer.id == 0 {
            answer.id = insert_answer(&mut *tx, answer).await?;
        } else {
            sqlx::query(
                "UPDATE answers SET content = $3, is_active = $4 WHERE question_id = $1 AND id = $2",
            )
            .bind(answer.question_id)
            .bind(answer.id)
            .bind(&answer.content)
            .bind(answer.is_active)
            .execute(&mut *tx)
            .await?;
        }
    }

    let kept: Vec<i32> = saved.answers.iter().map(|a| a.id).collect();

    // Answers already chosen by voters survive as inactive rows.
    sqlx::query(
        r#"
        DELETE FROM answers
        WHERE question_id = $1
          AND id <> ALL($2)
          AND NOT EXISTS (SELECT 1 FROM vote_answers va WHERE va.answer_id = answers.id)
        "#,
    )
    .bind(question.id)
    .bind(&kept)
    .execute(&mut *tx)
    .await?;

    let retired = sqlx::query_as::<_, Answer>(
        r#"
        UPDATE answers SET is_active = FALSE
        WHERE question_id = $1 AND id <> ALL($2)
        RETURNING id, question_id, content, is_active
        "#,
    )
    .bind(question.id)
    .bind(&kept)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    saved.answers.extend(retired);
    saved.answers.sort_by_key(|a| a.id);
    Ok(saved)
}

async fn insert_answer(conn: &mut PgConnection, answer: &Answer) -> Result<i32, Error> {
    sqlx::query_scalar::<_, i32>(
        "INSERT INTO answers (question_id, content, is_active) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(answer.question_id)
    .bind(&answer.content)
    .bind(answer.is_active)
    .fetch_one(conn)
    .await
}
