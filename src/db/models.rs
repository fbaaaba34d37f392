use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::Serialize;

/// Stored account row. Never serialized: the password hash stays inside the store.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub description: String,
    pub status: String,
    pub joined_at: DateTime<Utc>,
}

/// A resolved, existing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub username: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Identity {
            id: user.id.clone(),
            username: user.username.clone(),
        }
    }
}

/// Post as returned to clients, with the author resolved to a username.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    pub author: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub username: String,
    pub joined_at: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub username: String,
    pub joined_at: DateTime<Utc>,
    pub description: String,
    pub status: String,
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        PublicProfile {
            username: user.username,
            joined_at: user.joined_at,
            description: user.description,
            status: user.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Post input that has passed validation: content or image, never neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    content: String,
    image: Option<String>,
}

impl NewPost {
    pub fn new(content: &str, image: Option<String>) -> Result<Self, ValidationError> {
        let image = image.filter(|i| !i.is_empty());
        if content.trim().is_empty() && image.is_none() {
            return Err(ValidationError(
                "Post must have content or an image".into(),
            ));
        }
        Ok(NewPost {
            content: content.to_string(),
            image,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }
}

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {}", millis).into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_post_accepts_content_only() {
        let post = NewPost::new("hello", None).unwrap();
        assert_eq!(post.content(), "hello");
        assert_eq!(post.image(), None);
    }

    #[test]
    fn new_post_accepts_image_only() {
        let post = NewPost::new("", Some("/uploads/a.png".into())).unwrap();
        assert_eq!(post.content(), "");
        assert_eq!(post.image(), Some("/uploads/a.png"));
    }

    #[test]
    fn new_post_rejects_neither() {
        assert!(NewPost::new("", None).is_err());
        assert!(NewPost::new("   \n", None).is_err());
        assert!(NewPost::new("", Some(String::new())).is_err());
    }

    #[test]
    fn post_serializes_with_client_field_names() {
        let ts = Utc.timestamp_millis_opt(0).single().unwrap();
        let post = Post {
            id: "p1".into(),
            content: "hi".into(),
            author: "alice".into(),
            image: None,
            created_at: ts,
            updated_at: ts,
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["_id"], "p1");
        assert_eq!(json["author"], "alice");
        assert!(json["image"].is_null());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn profile_has_no_password_field() {
        let user = User {
            id: "u1".into(),
            username: "alice".into(),
            password_hash: "$2b$hash".into(),
            description: "hi".into(),
            status: "busy".into(),
            joined_at: Utc::now(),
        };
        let json = serde_json::to_string(&PublicProfile::from(user)).unwrap();
        assert!(!json.contains("hash"));
        assert!(json.contains("joinedAt"));
    }

    #[test]
    fn new_post_keeps_content_as_sent() {
        let post = NewPost::new("    fn main() {}\n", None).unwrap();
        assert_eq!(post.content(), "    fn main() {}\n");
    }
}
