use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{Author, Comment, Post, Tag};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity (insert when unsaved, update otherwise).
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// A published post paired with its title similarity to a search query.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub post: Post,
    pub similarity: f32,
}

/// Post repository.
///
/// Every query returns posts in default order (newest `publish` first) unless
/// documented otherwise.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, i64> {
    /// Every post regardless of status.
    async fn all_posts(&self) -> Result<Vec<Post>, RepoError>;

    /// Posts whose status is `Published`.
    async fn published_posts(&self) -> Result<Vec<Post>, RepoError>;

    /// A single published post by id.
    async fn find_published(&self, id: i64) -> Result<Option<Post>, RepoError>;

    /// Published posts with `slug` whose publish timestamp falls on `date` (UTC).
    /// More than one result means the lookup is ambiguous.
    async fn published_by_slug_on(
        &self,
        date: NaiveDate,
        slug: &str,
    ) -> Result<Vec<Post>, RepoError>;

    /// Number of published posts, optionally restricted to a tag.
    async fn count_published(&self, tag_id: Option<i64>) -> Result<u64, RepoError>;

    /// One window of published posts, optionally restricted to a tag.
    async fn published_page(
        &self,
        tag_id: Option<i64>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError>;

    /// Other published posts sharing at least one of `tag_ids`, ordered by shared
    /// tag count, then newest first.
    async fn similar_published(
        &self,
        post_id: i64,
        tag_ids: &[i64],
        limit: u64,
    ) -> Result<Vec<Post>, RepoError>;

    /// Published posts whose title trigram similarity to `query` exceeds
    /// `threshold`, best match first.
    async fn search_published_titles(
        &self,
        query: &str,
        threshold: f32,
    ) -> Result<Vec<SearchHit>, RepoError>;

    /// Whether another post already uses `title` on the given publish date.
    async fn title_taken_on(
        &self,
        title: &str,
        date: NaiveDate,
        exclude_id: Option<i64>,
    ) -> Result<bool, RepoError>;

    /// Save a post and replace its tags as one unit: when either step fails
    /// nothing is stored. Tags are created by name when missing.
    async fn save_with_tags(
        &self,
        post: Post,
        tag_names: &[String],
    ) -> Result<(Post, Vec<Tag>), RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, i64> {
    /// Active comments of a post, oldest first.
    async fn active_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError>;

    /// All comments of a post including deactivated ones, oldest first.
    async fn all_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError>;
}

/// Tag repository.
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError>;

    /// Tags attached to a post, ordered by name.
    async fn tags_for_post(&self, post_id: i64) -> Result<Vec<Tag>, RepoError>;

    /// Replace the tags of a post, creating missing tags by name.
    async fn set_post_tags(&self, post_id: i64, names: &[String]) -> Result<Vec<Tag>, RepoError>;
}

/// Author repository with domain-specific methods.
#[async_trait]
pub trait AuthorRepository: BaseRepository<Author, i64> {
    /// Find an author by their login name.
    async fn find_by_username(&self, username: &str) -> Result<Option<Author>, RepoError>;
}
