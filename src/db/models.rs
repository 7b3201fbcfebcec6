use serde::Serialize;

/// Forum user. The password hash never leaves the process: it is skipped
/// during serialization, so no response can carry it.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar_url: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub user_id: String,
    /// Author username, joined in by list queries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub category_ids: Vec<i64>,
    pub category_names: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub user_id: String,
    pub post_id: i64,
    pub content: String,
    pub username: String,
    pub avatar_url: String,
    pub created_at: String,
    pub updated_at: String,
    pub replies: Vec<ReplyComment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyComment {
    pub id: i64,
    pub user_id: String,
    pub parent_comment_id: i64,
    pub content: String,
    pub username: String,
    pub avatar_url: String,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serialization_never_includes_password_hash() {
        let user = User {
            id: "u-1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$2b$12$secret".into(),
            avatar_url: "/static/default-avatar.png".into(),
            created_at: "2026-01-01 00:00:00".into(),
            updated_at: "2026-01-01 00:00:00".into(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("secret"));
        assert!(json.contains("alice"));
    }
}
