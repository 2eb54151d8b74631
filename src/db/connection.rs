use crate::config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

pub type DbPool = Pool<Postgres>;

/// Foreign keys deliberately omit `ON DELETE CASCADE`; deleting a poll removes its
/// children explicitly inside one transaction.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS polls (
        id SERIAL PRIMARY KEY,
        title VARCHAR(100) NOT NULL,
        description VARCHAR(1500) NOT NULL DEFAULT '',
        starts_at DATE NOT NULL,
        ends_at DATE NOT NULL,
        is_published BOOLEAN NOT NULL DEFAULT FALSE,
        created_by_id TEXT NOT NULL,
        created_on TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_by_id TEXT,
        updated_on TIMESTAMP WITH TIME ZONE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS questions (
        id SERIAL PRIMARY KEY,
        poll_id INT NOT NULL REFERENCES polls(id),
        content VARCHAR(1000) NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_by_id TEXT NOT NULL,
        created_on TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_by_id TEXT,
        updated_on TIMESTAMP WITH TIME ZONE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS answers (
        id SERIAL PRIMARY KEY,
        question_id INT NOT NULL REFERENCES questions(id),
        content VARCHAR(1000) NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS votes (
        id SERIAL PRIMARY KEY,
        poll_id INT NOT NULL REFERENCES polls(id),
        user_id TEXT NOT NULL,
        submitted_on TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(poll_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vote_answers (
        id SERIAL PRIMARY KEY,
        vote_id INT NOT NULL REFERENCES votes(id),
        question_id INT NOT NULL REFERENCES questions(id),
        answer_id INT NOT NULL REFERENCES answers(id),
        UNIQUE(vote_id, question_id)
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS ux_questions_poll_content
        ON questions (poll_id, LOWER(TRIM(content)))
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_answers_question_id ON answers(question_id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_vote_answers_answer_id ON vote_answers(answer_id)
    "#,
];

pub async fn init_db(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .max_lifetime(Duration::from_secs(30 * 60))
        .idle_timeout(Duration::from_secs(10 * 60))
        .connect(&config.url)
        .await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    Ok(pool)
}
