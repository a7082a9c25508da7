//! Input schemas for the public and admin forms.
//!
//! Each form is deserialized leniently (every field defaults to empty) and then
//! validated into a typed payload. Validation never touches storage; checks
//! that need it (title uniqueness per day) are done by the caller and reported
//! through the same [`FieldErrors`] shape.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{Comment, Post, PostStatus};
use crate::slug::{is_valid_slug, slugify};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_SLUG: &str =
    "Enter a valid slug consisting of letters, numbers, underscores or hyphens.";

const EMAIL_MAX_LENGTH: usize = 254;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

/// Field name to error messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

fn required<'a>(errors: &mut FieldErrors, field: &str, value: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    }
    value
}

fn max_length(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
    }
}

fn email<'a>(errors: &mut FieldErrors, field: &str, value: &'a str) -> &'a str {
    let value = required(errors, field, value);
    if !value.is_empty() {
        if !EMAIL_RE.is_match(value) {
            errors.add(field, INVALID_EMAIL);
        } else {
            max_length(errors, field, value, EMAIL_MAX_LENGTH);
        }
    }
    value
}

/// Reader-submitted request to recommend a post by email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailPostForm {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comments: String,
}

/// A validated share request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRequest {
    pub name: String,
    pub email: String,
    pub to: String,
    pub comments: Option<String>,
}

impl EmailPostForm {
    pub const NAME_MAX_LENGTH: usize = 25;

    pub fn validate(&self) -> Result<ShareRequest, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = required(&mut errors, "name", &self.name);
        max_length(&mut errors, "name", name, Self::NAME_MAX_LENGTH);
        let from = email(&mut errors, "email", &self.email);
        let to = email(&mut errors, "to", &self.to);
        let comments = self.comments.trim();

        errors.into_result(|| ShareRequest {
            name: name.to_string(),
            email: from.to_string(),
            to: to.to_string(),
            comments: (!comments.is_empty()).then(|| comments.to_string()),
        })
    }
}

/// Reader-submitted comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub name: String,
    pub email: String,
    pub body: String,
}

/// A validated comment, not yet attached to a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub name: String,
    pub email: String,
    pub body: String,
}

impl NewComment {
    pub fn into_comment(self, post_id: i64) -> Comment {
        Comment::new(post_id, self.name, self.email, self.body)
    }
}

impl CommentForm {
    pub const NAME_MAX_LENGTH: usize = 80;

    pub fn validate(&self) -> Result<NewComment, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = required(&mut errors, "name", &self.name);
        max_length(&mut errors, "name", name, Self::NAME_MAX_LENGTH);
        let email = email(&mut errors, "email", &self.email);
        let body = required(&mut errors, "body", &self.body);

        errors.into_result(|| NewComment {
            name: name.to_string(),
            email: email.to_string(),
            body: body.to_string(),
        })
    }
}

/// Title search form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchForm {
    pub query: String,
}

impl SearchForm {
    /// Returns the trimmed query.
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        let query = required(&mut errors, "query", &self.query);
        errors.into_result(|| query.to_string())
    }
}

/// Staff-submitted post create/update payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub slug: Option<String>,
    pub body: String,
    pub status: PostStatus,
    pub publish: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// A validated post payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub slug: String,
    pub body: String,
    pub status: PostStatus,
    pub publish: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl PostForm {
    pub const TITLE_MAX_LENGTH: usize = 250;
    pub const SLUG_MAX_LENGTH: usize = 250;

    pub fn validate(&self) -> Result<PostDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = required(&mut errors, "title", &self.title);
        max_length(&mut errors, "title", title, Self::TITLE_MAX_LENGTH);

        let slug = match self.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => {
                if !is_valid_slug(slug) {
                    errors.add("slug", INVALID_SLUG);
                }
                slug.to_string()
            }
            _ => {
                let generated = slugify(title);
                if generated.is_empty() && !title.is_empty() {
                    errors.add("slug", INVALID_SLUG);
                }
                generated
            }
        };
        max_length(&mut errors, "slug", &slug, Self::SLUG_MAX_LENGTH);

        let body = required(&mut errors, "body", &self.body);

        let mut tags: Vec<String> = Vec::new();
        for name in self.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|t| slugify(t) == slugify(name)) {
                tags.push(name.to_string());
            }
        }

        errors.into_result(|| PostDraft {
            title: title.to_string(),
            slug,
            body: body.to_string(),
            status: self.status,
            publish: self.publish,
            tags,
        })
    }
}

impl PostDraft {
    /// Build a new post written by `author_id`.
    pub fn into_post(self, author_id: i64) -> Post {
        let mut post = Post::new(author_id, self.title, self.slug, self.body);
        post.status = self.status;
        if let Some(publish) = self.publish {
            post.publish = publish;
        }
        post
    }

    /// Overwrite the editable fields of an existing post.
    pub fn apply_to(&self, post: &mut Post) {
        post.title = self.title.clone();
        post.slug = self.slug.clone();
        post.body = self.body.clone();
        post.status = self.status;
        if let Some(publish) = self.publish {
            post.publish = publish;
        }
        post.touch();
    }
}
