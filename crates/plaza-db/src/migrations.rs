use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id            TEXT PRIMARY KEY,
                email         TEXT NOT NULL UNIQUE,
                password      TEXT NOT NULL,
                is_active     INTEGER NOT NULL DEFAULT 1,
                is_staff      INTEGER NOT NULL DEFAULT 0,
                is_superuser  INTEGER NOT NULL DEFAULT 0,
                last_login    TEXT,
                created_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE profiles (
                id          TEXT PRIMARY KEY,
                nick_name   TEXT NOT NULL,
                user_id     TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                created_on  TEXT NOT NULL DEFAULT (datetime('now')),
                img         TEXT
            );

            CREATE TABLE posts (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_on  TEXT NOT NULL DEFAULT (datetime('now')),
                img         TEXT
            );

            CREATE INDEX idx_posts_user
                ON posts(user_id);

            CREATE TABLE post_likes (
                post_id  TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (post_id, user_id)
            );

            CREATE INDEX idx_post_likes_post
                ON post_likes(post_id);

            CREATE TABLE comments (
                id       TEXT PRIMARY KEY,
                text     TEXT NOT NULL,
                user_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                post_id  TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_comments_post
                ON comments(post_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
