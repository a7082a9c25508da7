//! A single in-process store implementing every repository port.
//!
//! All tables sit behind one async `RwLock`, so each repository call is atomic
//! and cascades (post -> comments, post -> tag links, author -> posts) happen
//! under the same write guard. Data is lost on process restart.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use quill_core::domain::{Author, Comment, Post, Tag};
use quill_core::error::RepoError;
use quill_core::ports::{
    AuthorRepository, BaseRepository, CommentRepository, PostRepository, SearchHit,
    TagRepository,
};
use quill_core::recommend::rank_similar;
use quill_core::search::trigram_similarity;
use quill_core::slug::slugify;

/// Monotonic id generator; ids are never reused after deletion.
#[derive(Default)]
struct Sequence(i64);

impl Sequence {
    fn next(&mut self) -> i64 {
        self.0 += 1;
        self.0
    }

    fn observe(&mut self, id: i64) {
        self.0 = self.0.max(id);
    }
}

#[derive(Default)]
struct Tables {
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    tags: BTreeMap<i64, Tag>,
    /// (post_id, tag_id)
    post_tags: BTreeSet<(i64, i64)>,
    authors: BTreeMap<i64, Author>,
    post_seq: Sequence,
    comment_seq: Sequence,
    tag_seq: Sequence,
    author_seq: Sequence,
}

impl Tables {
    fn tag_ids(&self, post_id: i64) -> Vec<i64> {
        self.post_tags
            .range((post_id, i64::MIN)..=(post_id, i64::MAX))
            .map(|(_, tag_id)| *tag_id)
            .collect()
    }

    /// Published posts in default order, optionally restricted to a tag.
    fn published(&self, tag_id: Option<i64>) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .values()
            .filter(|p| p.is_published())
            .filter(|p| tag_id.is_none_or(|tag| self.post_tags.contains(&(p.id, tag))))
            .collect();
        sort_newest_first(&mut posts);
        posts
    }

    fn check_author(&self, post: &Post) -> Result<(), RepoError> {
        if self.authors.contains_key(&post.author_id) {
            Ok(())
        } else {
            Err(RepoError::Constraint(format!(
                "author {} does not exist",
                post.author_id
            )))
        }
    }

    fn put_post(&mut self, mut post: Post) -> Post {
        if post.id == 0 {
            post.id = self.post_seq.next();
        } else {
            self.post_seq.observe(post.id);
        }
        self.posts.insert(post.id, post.clone());
        post
    }

    /// Replace the links of `post_id`. Names must have passed `check_tag_names`.
    fn replace_tags(&mut self, post_id: i64, names: &[String]) -> Vec<Tag> {
        self.post_tags.retain(|(p, _)| *p != post_id);

        let mut attached = Vec::with_capacity(names.len());
        for name in names {
            let slug = slugify(name);
            let existing = self.tags.values().find(|t| t.slug == slug).cloned();
            let tag = match existing {
                Some(tag) => tag,
                None => {
                    let mut tag = Tag::new(name.clone(), slug);
                    tag.id = self.tag_seq.next();
                    self.tags.insert(tag.id, tag.clone());
                    tag
                }
            };
            self.post_tags.insert((post_id, tag.id));
            if !attached.contains(&tag) {
                attached.push(tag);
            }
        }

        attached.sort_by(|a, b| a.name.cmp(&b.name));
        attached
    }

    fn remove_post(&mut self, post_id: i64) -> bool {
        if self.posts.remove(&post_id).is_none() {
            return false;
        }
        self.comments.retain(|_, c| c.post_id != post_id);
        self.post_tags.retain(|(p, _)| *p != post_id);
        true
    }

    fn comments_for(&self, post_id: i64, active_only: bool) -> Vec<Comment> {
        let mut comments: Vec<&Comment> = self
            .comments
            .values()
            .filter(|c| c.post_id == post_id && (c.active || !active_only))
            .collect();
        comments.sort_by_key(|c| (c.created, c.id));
        comments.into_iter().cloned().collect()
    }
}

fn sort_newest_first(posts: &mut [&Post]) {
    posts.sort_by_key(|p| (Reverse(p.publish), Reverse(p.id)));
}

fn check_tag_names(names: &[String]) -> Result<(), RepoError> {
    match names.iter().find(|name| slugify(name).is_empty()) {
        Some(name) => Err(RepoError::Constraint(format!(
            "tag '{name}' has no usable slug"
        ))),
        None => Ok(()),
    }
}

/// In-memory implementation of all repository ports.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<Post, i64> for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        tables.check_author(&post)?;
        Ok(tables.put_post(post))
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.remove_post(id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn all_posts(&self) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<&Post> = tables.posts.values().collect();
        sort_newest_first(&mut posts);
        Ok(posts.into_iter().cloned().collect())
    }

    async fn published_posts(&self) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.published(None).into_iter().cloned().collect())
    }

    async fn find_published(&self, id: i64) -> Result<Option<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).filter(|p| p.is_published()).cloned())
    }

    async fn published_by_slug_on(
        &self,
        date: NaiveDate,
        slug: &str,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .published(None)
            .into_iter()
            .filter(|p| p.slug == slug && p.publish_date() == date)
            .cloned()
            .collect())
    }

    async fn count_published(&self, tag_id: Option<i64>) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.published(tag_id).len() as u64)
    }

    async fn published_page(
        &self,
        tag_id: Option<i64>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .published(tag_id)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn similar_published(
        &self,
        post_id: i64,
        tag_ids: &[i64],
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        let candidates: Vec<(&Post, Vec<i64>)> = tables
            .published(None)
            .into_iter()
            .map(|p| (p, tables.tag_ids(p.id)))
            .collect();

        Ok(rank_similar(
            post_id,
            tag_ids,
            candidates.iter().map(|(p, tags)| (*p, tags.as_slice())),
            limit,
        ))
    }

    async fn search_published_titles(
        &self,
        query: &str,
        threshold: f32,
    ) -> Result<Vec<SearchHit>, RepoError> {
        let tables = self.tables.read().await;
        let mut hits: Vec<SearchHit> = tables
            .published(None)
            .into_iter()
            .map(|post| SearchHit {
                similarity: trigram_similarity(&post.title, query),
                post: post.clone(),
            })
            .filter(|hit| hit.similarity > threshold)
            .collect();

        // `published` already yields newest first; a stable sort keeps that for ties.
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        Ok(hits)
    }

    async fn title_taken_on(
        &self,
        title: &str,
        date: NaiveDate,
        exclude_id: Option<i64>,
    ) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.values().any(|p| {
            p.title == title && p.publish_date() == date && Some(p.id) != exclude_id
        }))
    }

    async fn save_with_tags(
        &self,
        post: Post,
        tag_names: &[String],
    ) -> Result<(Post, Vec<Tag>), RepoError> {
        let mut tables = self.tables.write().await;

        // Validate everything before the first write.
        tables.check_author(&post)?;
        check_tag_names(tag_names)?;

        let saved = tables.put_post(post);
        let tags = tables.replace_tags(saved.id, tag_names);
        Ok((saved, tags))
    }
}

#[async_trait]
impl BaseRepository<Comment, i64> for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, RepoError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn save(&self, mut comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;

        if !tables.posts.contains_key(&comment.post_id) {
            return Err(RepoError::Constraint(format!(
                "post {} does not exist",
                comment.post_id
            )));
        }

        if comment.id == 0 {
            comment.id = tables.comment_seq.next();
        } else {
            tables.comment_seq.observe(comment.id);
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn active_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError> {
        Ok(self.tables.read().await.comments_for(post_id, true))
    }

    async fn all_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError> {
        Ok(self.tables.read().await.comments_for(post_id, false))
    }
}

#[async_trait]
impl TagRepository for InMemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.tags.values().find(|t| t.slug == slug).cloned())
    }

    async fn tags_for_post(&self, post_id: i64) -> Result<Vec<Tag>, RepoError> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .tag_ids(post_id)
            .into_iter()
            .filter_map(|id| tables.tags.get(&id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn set_post_tags(&self, post_id: i64, names: &[String]) -> Result<Vec<Tag>, RepoError> {
        let mut tables = self.tables.write().await;

        if !tables.posts.contains_key(&post_id) {
            return Err(RepoError::NotFound);
        }
        check_tag_names(names)?;

        Ok(tables.replace_tags(post_id, names))
    }
}

#[async_trait]
impl BaseRepository<Author, i64> for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Author>, RepoError> {
        Ok(self.tables.read().await.authors.get(&id).cloned())
    }

    async fn save(&self, mut author: Author) -> Result<Author, RepoError> {
        let mut tables = self.tables.write().await;

        let duplicate = tables
            .authors
            .values()
            .any(|a| a.username == author.username && a.id != author.id);
        if duplicate {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }

        if author.id == 0 {
            author.id = tables.author_seq.next();
        } else {
            tables.author_seq.observe(author.id);
        }
        tables.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.authors.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        let owned: Vec<i64> = tables
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in owned {
            tables.remove_post(post_id);
        }
        Ok(())
    }
}

#[async_trait]
impl AuthorRepository for InMemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Author>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .authors
            .values()
            .find(|a| a.username == username)
            .cloned())
    }
}
