use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Bearer-token claims shared by the auth handlers and the middleware.
/// Canonical definition lives here in plaza-types so both sides agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Registration / login --

/// Request bodies deliberately do not use `deny_unknown_fields`: read-only
/// keys (`userProfile`, `userPost`, `userComment`) must be accepted and
/// ignored, never rejected. Fields are optional so handlers can tell a
/// missing key from a blank value.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// The password is write-only: no response type carries it.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

// -- Profiles --

/// One body type serves create and both update flavors, the way a single
/// serializer backs every action on the resource.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileRequest {
    #[serde(rename = "nickName", alias = "nickname")]
    pub nick_name: Option<String>,
    /// Ownership field: whatever the client sends here is ignored, the
    /// owner is always the authenticated caller.
    #[serde(rename = "userProfile", default)]
    pub user_profile: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    #[serde(rename = "nickName")]
    pub nick_name: String,
    #[serde(rename = "userProfile")]
    pub user_profile: Uuid,
    #[serde(with = "crate::dates::date_only")]
    pub created_on: DateTime<Utc>,
    pub img: Option<String>,
}

// -- Posts --

#[derive(Debug, Default, Deserialize)]
pub struct PostRequest {
    pub title: Option<String>,
    /// Settable on create and update alike; omitting the key leaves the
    /// stored set untouched, an empty list clears it.
    pub liked: Option<Vec<Uuid>>,
    #[serde(rename = "userPost", default)]
    pub user_post: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "userPost")]
    pub user_post: Uuid,
    #[serde(with = "crate::dates::date_only")]
    pub created_on: DateTime<Utc>,
    pub img: Option<String>,
    pub liked: Vec<Uuid>,
    pub comments: Vec<Uuid>,
}

// -- Comments --

#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    pub text: Option<String>,
    /// Required on create; immutable afterwards.
    pub post: Option<Uuid>,
    #[serde(rename = "userComment", default)]
    pub user_comment: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub text: String,
    #[serde(rename = "userComment")]
    pub user_comment: Uuid,
    pub post: Uuid,
}

// -- Media --

#[derive(Debug, Serialize)]
pub struct ImageUploadResponse {
    pub img: String,
}

// -- Admin --

#[derive(Debug, Deserialize)]
pub struct AdminUserCreate {
    pub email: Option<String>,
    pub password: Option<String>,
    /// Two-step confirmation, as the management add form requires.
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
    #[serde(rename = "isStaff")]
    pub is_staff: Option<bool>,
    #[serde(rename = "isSuperuser")]
    pub is_superuser: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminUserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
    #[serde(rename = "isStaff")]
    pub is_staff: Option<bool>,
    #[serde(rename = "isSuperuser")]
    pub is_superuser: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct AdminUserSummary {
    pub id: Uuid,
    pub email: String,
}

/// Detail view grouped the way the management UI lays out its fieldsets:
/// identity, permissions, important dates.
#[derive(Debug, Serialize)]
pub struct AdminUserDetail {
    pub id: Uuid,
    pub identity: AdminIdentity,
    pub permissions: AdminPermissions,
    pub dates: AdminDates,
}

#[derive(Debug, Serialize)]
pub struct AdminIdentity {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AdminPermissions {
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "isStaff")]
    pub is_staff: bool,
    #[serde(rename = "isSuperuser")]
    pub is_superuser: bool,
}

#[derive(Debug, Serialize)]
pub struct AdminDates {
    #[serde(rename = "lastLogin")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_sqlite_datetime;

    fn sample_uuid(n: u8) -> Uuid {
        Uuid::from_bytes([n; 16])
    }

    #[test]
    fn profile_response_uses_wire_field_names() {
        let resp = ProfileResponse {
            id: sample_uuid(1),
            nick_name: "Al".into(),
            user_profile: sample_uuid(2),
            created_on: parse_sqlite_datetime("2024-05-17 10:30:00").unwrap(),
            img: None,
        };
        let json = serde_json::to_value(&resp).unwrap();

        assert!(json.get("nickName").is_some());
        assert!(json.get("userProfile").is_some());
        assert_eq!(json["created_on"], "2024-05-17");
        assert!(json.get("nick_name").is_none());
    }

    #[test]
    fn profile_request_accepts_both_nickname_spellings() {
        let a: ProfileRequest = serde_json::from_str(r#"{"nickName": "Al"}"#).unwrap();
        assert_eq!(a.nick_name.as_deref(), Some("Al"));

        let b: ProfileRequest = serde_json::from_str(r#"{"nickname": "Al"}"#).unwrap();
        assert_eq!(b.nick_name.as_deref(), Some("Al"));
    }

    #[test]
    fn missing_keys_deserialize_as_none() {
        let req: RegisterRequest = serde_json::from_str("{}").unwrap();
        assert!(req.email.is_none());
        assert!(req.password.is_none());

        let req: PostRequest = serde_json::from_str("{}").unwrap();
        assert!(req.title.is_none());
        assert!(req.liked.is_none());
    }

    #[test]
    fn ownership_fields_tolerate_any_client_value() {
        let p: ProfileRequest =
            serde_json::from_str(r#"{"nickName": "Al", "userProfile": 42}"#).unwrap();
        assert!(p.user_profile.is_some());

        let c: CommentRequest = serde_json::from_str(
            r#"{"text": "hi", "post": "00000000-0000-0000-0000-000000000001", "userComment": "bogus"}"#,
        )
        .unwrap();
        assert_eq!(c.text.as_deref(), Some("hi"));
    }

    #[test]
    fn user_response_has_no_password_key() {
        let resp = UserResponse {
            id: sample_uuid(3),
            email: "alice@example.com".into(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert!(json.get("password").is_none());
    }

    #[test]
    fn post_response_carries_liked_and_comments() {
        let resp = PostResponse {
            id: sample_uuid(1),
            title: "Hi".into(),
            user_post: sample_uuid(2),
            created_on: parse_sqlite_datetime("2024-05-17 10:30:00").unwrap(),
            img: None,
            liked: vec![sample_uuid(3)],
            comments: vec![sample_uuid(4)],
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["userPost"], sample_uuid(2).to_string());
        assert_eq!(json["liked"].as_array().unwrap().len(), 1);
        assert_eq!(json["comments"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn empty_liked_list_is_distinct_from_missing() {
        let cleared: PostRequest = serde_json::from_str(r#"{"liked": []}"#).unwrap();
        assert_eq!(cleared.liked, Some(vec![]));

        let untouched: PostRequest = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert!(untouched.liked.is_none());
    }

    #[test]
    fn admin_detail_groups_fieldsets() {
        let detail = AdminUserDetail {
            id: sample_uuid(1),
            identity: AdminIdentity {
                email: "a@example.com".into(),
            },
            permissions: AdminPermissions {
                is_active: true,
                is_staff: false,
                is_superuser: false,
            },
            dates: AdminDates {
                last_login: None,
                created_at: parse_sqlite_datetime("2024-05-17 10:30:00").unwrap(),
            },
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["identity"]["email"], "a@example.com");
        assert_eq!(json["permissions"]["isActive"], true);
        assert!(json["dates"].get("lastLogin").is_some());
    }
}
