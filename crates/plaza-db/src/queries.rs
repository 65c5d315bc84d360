use crate::Database;
use crate::models::{CommentRow, PostRow, ProfileRow, UserRow};
use anyhow::Result;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        is_staff: bool,
        is_superuser: bool,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, is_staff, is_superuser)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, email, password_hash, is_staff, is_superuser],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{USER_SELECT} WHERE email = ?1"))?;
            let row = stmt.query_row([email], read_user).optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{USER_SELECT} WHERE id = ?1"))?;
            let row = stmt.query_row([id], read_user).optional()?;
            Ok(row)
        })
    }

    pub fn user_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
                [id],
                |r| r.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Admin listing: ordered by id, the way the management UI displays users.
    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{USER_SELECT} ORDER BY id"))?;
            let rows = stmt
                .query_map([], read_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Partial update: None leaves the column untouched.
    /// Returns false when no user with that id exists.
    pub fn update_user_fields(
        &self,
        id: &str,
        email: Option<&str>,
        password_hash: Option<&str>,
        is_active: Option<bool>,
        is_staff: Option<bool>,
        is_superuser: Option<bool>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                     email        = COALESCE(?2, email),
                     password     = COALESCE(?3, password),
                     is_active    = COALESCE(?4, is_active),
                     is_staff     = COALESCE(?5, is_staff),
                     is_superuser = COALESCE(?6, is_superuser)
                 WHERE id = ?1",
                rusqlite::params![id, email, password_hash, is_active, is_staff, is_superuser],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn touch_last_login(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_login = datetime('now') WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }

    /// Deletes the user; profiles, posts, comments and like rows cascade.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Profiles --

    pub fn create_profile(&self, id: &str, nick_name: &str, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, nick_name, user_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, nick_name, user_id],
            )?;
            Ok(())
        })
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{PROFILE_SELECT} WHERE id = ?1"))?;
            let row = stmt.query_row([id], read_profile).optional()?;
            Ok(row)
        })
    }

    pub fn list_profiles(&self) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{PROFILE_SELECT} ORDER BY created_on, id"))?;
            let rows = stmt
                .query_map([], read_profile)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The myprofile filter: only profiles owned by the given user.
    pub fn list_profiles_for_user(&self, user_id: &str) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{PROFILE_SELECT} WHERE user_id = ?1 ORDER BY created_on, id"
            ))?;
            let rows = stmt
                .query_map([user_id], read_profile)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_profile(&self, id: &str, nick_name: Option<&str>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET nick_name = COALESCE(?2, nick_name) WHERE id = ?1",
                rusqlite::params![id, nick_name],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_profile_img(&self, id: &str, img: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE profiles SET img = ?2 WHERE id = ?1",
                rusqlite::params![id, img],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_profile(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM profiles WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Posts --

    pub fn create_post(&self, id: &str, title: &str, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, title, user_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, title, user_id],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{POST_SELECT} WHERE id = ?1"))?;
            let row = stmt.query_row([id], read_post).optional()?;
            Ok(row)
        })
    }

    pub fn post_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
                [id],
                |r| r.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{POST_SELECT} ORDER BY created_on, id"))?;
            let rows = stmt
                .query_map([], read_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_post(&self, id: &str, title: Option<&str>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET title = COALESCE(?2, title) WHERE id = ?1",
                rusqlite::params![id, title],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_post_img(&self, id: &str, img: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET img = ?2 WHERE id = ?1",
                rusqlite::params![id, img],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the post; comments and like rows cascade.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Likes --

    /// Replaces a post's liked set atomically. The liked relation is settable
    /// as a whole, so the delete + inserts run in one transaction.
    pub fn replace_liked(&self, post_id: &str, user_ids: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM post_likes WHERE post_id = ?1", [post_id])?;
            for user_id in user_ids {
                tx.execute(
                    "INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                    rusqlite::params![post_id, user_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn liked_for_post(&self, post_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT user_id FROM post_likes WHERE post_id = ?1 ORDER BY user_id")?;
            let rows = stmt
                .query_map([post_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch (post_id, user_id) like pairs for a set of posts.
    pub fn liked_for_posts(&self, post_ids: &[String]) -> Result<Vec<(String, String)>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT post_id, user_id FROM post_likes WHERE post_id IN ({}) ORDER BY user_id",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Comments --

    pub fn create_comment(&self, id: &str, text: &str, user_id: &str, post_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, text, user_id, post_id) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, text, user_id, post_id],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{COMMENT_SELECT} WHERE id = ?1"))?;
            let row = stmt.query_row([id], read_comment).optional()?;
            Ok(row)
        })
    }

    pub fn list_comments(&self) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{COMMENT_SELECT} ORDER BY id"))?;
            let rows = stmt
                .query_map([], read_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment(&self, id: &str, text: Option<&str>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET text = COALESCE(?2, text) WHERE id = ?1",
                rusqlite::params![id, text],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Batch-fetch (post_id, comment_id) pairs for a set of posts.
    pub fn comment_ids_for_posts(&self, post_ids: &[String]) -> Result<Vec<(String, String)>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT post_id, id FROM comments WHERE post_id IN ({}) ORDER BY id",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

// -- Row mapping --

const USER_SELECT: &str = "SELECT id, email, password, is_active, is_staff, is_superuser, \
                           last_login, created_at FROM users";
const PROFILE_SELECT: &str = "SELECT id, nick_name, user_id, created_on, img FROM profiles";
const POST_SELECT: &str = "SELECT id, title, user_id, created_on, img FROM posts";
const COMMENT_SELECT: &str = "SELECT id, text, user_id, post_id FROM comments";

fn read_user(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        is_active: row.get(3)?,
        is_staff: row.get(4)?,
        is_superuser: row.get(5)?,
        last_login: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn read_profile(row: &rusqlite::Row) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        nick_name: row.get(1)?,
        user_id: row.get(2)?,
        created_on: row.get(3)?,
        img: row.get(4)?,
    })
}

fn read_post(row: &rusqlite::Row) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        user_id: row.get(2)?,
        created_on: row.get(3)?,
        img: row.get(4)?,
    })
}

fn read_comment(row: &rusqlite::Row) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        text: row.get(1)?,
        user_id: row.get(2)?,
        post_id: row.get(3)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
