use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity - a reader's reply to a post.
///
/// Comments are never edited by readers; moderation flips `active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub active: bool,
}

impl Comment {
    /// Create a new, active comment on a post.
    pub fn new(post_id: i64, name: String, email: String, body: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            post_id,
            name,
            email,
            body,
            created: now,
            updated: now,
            active: true,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.updated = Utc::now();
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Comment by {} on post {}", self.name, self.post_id)
    }
}
