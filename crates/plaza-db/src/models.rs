/// Database row types — these map directly to SQLite rows.
/// Distinct from the plaza-types wire schemas to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

pub struct ProfileRow {
    pub id: String,
    pub nick_name: String,
    pub user_id: String,
    pub created_on: String,
    pub img: Option<String>,
}

pub struct PostRow {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub created_on: String,
    pub img: Option<String>,
}

pub struct CommentRow {
    pub id: String,
    pub text: String,
    pub user_id: String,
    pub post_id: String,
}
