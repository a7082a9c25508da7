use serde::{Deserialize, Serialize};

/// Tag entity - a free-form label shared between posts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl Tag {
    pub fn new(name: String, slug: String) -> Self {
        Self { id: 0, name, slug }
    }
}
