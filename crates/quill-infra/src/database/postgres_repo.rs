//! PostgreSQL repository implementations.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType,
    NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
    TransactionTrait, TryIntoModel, Value,
};

use quill_core::domain::{Author, Comment, Post, Tag};
use quill_core::error::RepoError;
use quill_core::ports::{
    AuthorRepository, CommentRepository, PostRepository, SearchHit, TagRepository,
};
use quill_core::slug::slugify;

use super::entity::author::{self, Entity as AuthorEntity};
use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::post_tag::{self, Entity as PostTagEntity};
use super::entity::tag::{self, Entity as TagEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

/// PostgreSQL tag repository.
pub type PostgresTagRepository = PostgresBaseRepository<TagEntity>;

/// PostgreSQL author repository.
pub type PostgresAuthorRepository = PostgresBaseRepository<AuthorEntity>;

/// `[start, end)` of a UTC calendar day.
fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + TimeDelta::days(1))
}

fn newest_first(select: Select<PostEntity>) -> Select<PostEntity> {
    select
        .order_by_desc(post::Column::Publish)
        .order_by_desc(post::Column::Id)
}

fn published(tag_id: Option<i64>) -> Select<PostEntity> {
    let select = PostEntity::find().filter(post::Column::Status.eq(post::Status::Published));
    match tag_id {
        Some(tag_id) => select
            .join(JoinType::InnerJoin, post::Relation::PostTag.def())
            .filter(post_tag::Column::TagId.eq(tag_id)),
        None => select,
    }
}

fn into_posts(models: Vec<post::Model>) -> Vec<Post> {
    models.into_iter().map(Into::into).collect()
}

/// A post row annotated with `similarity(title, query)`.
#[derive(Debug, FromQueryResult)]
struct SearchRow {
    id: i64,
    title: String,
    slug: String,
    author_id: i64,
    body: String,
    publish: DateTimeWithTimeZone,
    created: DateTimeWithTimeZone,
    updated: DateTimeWithTimeZone,
    status: post::Status,
    similarity: f32,
}

impl From<SearchRow> for SearchHit {
    fn from(row: SearchRow) -> Self {
        let model = post::Model {
            id: row.id,
            title: row.title,
            slug: row.slug,
            author_id: row.author_id,
            body: row.body,
            publish: row.publish,
            created: row.created,
            updated: row.updated,
            status: row.status,
        };
        SearchHit {
            post: model.into(),
            similarity: row.similarity,
        }
    }
}

/// Swap the tag links of `post_id` for `names`, creating tags by slug.
/// Runs on the caller's connection so it can share a transaction.
async fn replace_post_tags<C>(conn: &C, post_id: i64, names: &[String]) -> Result<Vec<Tag>, RepoError>
where
    C: ConnectionTrait,
{
    PostTagEntity::delete_many()
        .filter(post_tag::Column::PostId.eq(post_id))
        .exec(conn)
        .await
        .map_err(map_db_err)?;

    let mut attached: Vec<tag::Model> = Vec::with_capacity(names.len());
    for name in names {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(RepoError::Constraint(format!("tag '{name}' has no usable slug")));
        }

        let existing = TagEntity::find()
            .filter(tag::Column::Slug.eq(slug.as_str()))
            .one(conn)
            .await
            .map_err(map_db_err)?;

        let model = match existing {
            Some(model) => model,
            None => tag::ActiveModel {
                id: NotSet,
                name: Set(name.clone()),
                slug: Set(slug),
            }
            .insert(conn)
            .await
            .map_err(map_db_err)?,
        };

        if attached.iter().any(|t| t.id == model.id) {
            continue;
        }

        post_tag::ActiveModel {
            post_id: Set(post_id),
            tag_id: Set(model.id),
        }
        .insert(conn)
        .await
        .map_err(map_db_err)?;
        attached.push(model);
    }

    attached.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(attached.into_iter().map(Into::into).collect())
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn all_posts(&self) -> Result<Vec<Post>, RepoError> {
        let models = newest_first(PostEntity::find())
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(into_posts(models))
    }

    async fn published_posts(&self) -> Result<Vec<Post>, RepoError> {
        let models = newest_first(published(None))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(into_posts(models))
    }

    async fn find_published(&self, id: i64) -> Result<Option<Post>, RepoError> {
        let model = PostEntity::find_by_id(id)
            .filter(post::Column::Status.eq(post::Status::Published))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(model.map(Into::into))
    }

    async fn published_by_slug_on(
        &self,
        date: NaiveDate,
        slug: &str,
    ) -> Result<Vec<Post>, RepoError> {
        let (start, end) = day_bounds(date);
        let models = newest_first(published(None))
            .filter(post::Column::Slug.eq(slug))
            .filter(post::Column::Publish.gte(start))
            .filter(post::Column::Publish.lt(end))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(into_posts(models))
    }

    async fn count_published(&self, tag_id: Option<i64>) -> Result<u64, RepoError> {
        published(tag_id).count(&self.db).await.map_err(map_db_err)
    }

    async fn published_page(
        &self,
        tag_id: Option<i64>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let models = newest_first(published(tag_id))
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(into_posts(models))
    }

    async fn similar_published(
        &self,
        post_id: i64,
        tag_ids: &[i64],
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        let shared_tags = Expr::col((PostTagEntity, post_tag::Column::TagId)).count();
        let models = published(None)
            .join(JoinType::InnerJoin, post::Relation::PostTag.def())
            .filter(post_tag::Column::TagId.is_in(tag_ids.iter().copied()))
            .filter(post::Column::Id.ne(post_id))
            .group_by(post::Column::Id)
            .order_by_desc(shared_tags)
            .order_by_desc(post::Column::Publish)
            .order_by_desc(post::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(into_posts(models))
    }

    async fn search_published_titles(
        &self,
        query: &str,
        threshold: f32,
    ) -> Result<Vec<SearchHit>, RepoError> {
        // pg_trgm's similarity() over the title only.
        let score = Expr::cust_with_values(r#"similarity("posts"."title", $1)"#, [query]);
        let above_threshold = Expr::cust_with_values(
            r#"similarity("posts"."title", $1) > $2"#,
            [Value::from(query.to_owned()), Value::from(threshold)],
        );

        let rows = published(None)
            .column_as(score, "similarity")
            .filter(above_threshold)
            .order_by_desc(Expr::cust("similarity"))
            .order_by_desc(post::Column::Publish)
            .into_model::<SearchRow>()
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn title_taken_on(
        &self,
        title: &str,
        date: NaiveDate,
        exclude_id: Option<i64>,
    ) -> Result<bool, RepoError> {
        let (start, end) = day_bounds(date);
        let mut select = PostEntity::find()
            .filter(post::Column::Title.eq(title))
            .filter(post::Column::Publish.gte(start))
            .filter(post::Column::Publish.lt(end));
        if let Some(id) = exclude_id {
            select = select.filter(post::Column::Id.ne(id));
        }

        let count = select.count(&self.db).await.map_err(map_db_err)?;
        Ok(count > 0)
    }

    async fn save_with_tags(
        &self,
        post: Post,
        tag_names: &[String],
    ) -> Result<(Post, Vec<Tag>), RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let active_model: post::ActiveModel = post.into();
        let saved = active_model
            .save(&txn)
            .await
            .map_err(map_db_err)?
            .try_into_model()
            .map_err(|e| RepoError::Query(e.to_string()))?;

        // Dropping `txn` on an error rolls the post back with the tags.
        let tags = replace_post_tags(&txn, saved.id, tag_names).await?;
        txn.commit().await.map_err(map_db_err)?;

        Ok((saved.into(), tags))
    }
}

impl PostgresCommentRepository {
    async fn for_post(&self, post_id: i64, active_only: bool) -> Result<Vec<Comment>, RepoError> {
        let mut select = CommentEntity::find().filter(comment::Column::PostId.eq(post_id));
        if active_only {
            select = select.filter(comment::Column::Active.eq(true));
        }

        let models = select
            .order_by_asc(comment::Column::Created)
            .order_by_asc(comment::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn active_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError> {
        self.for_post(post_id, true).await
    }

    async fn all_for_post(&self, post_id: i64) -> Result<Vec<Comment>, RepoError> {
        self.for_post(post_id, false).await
    }
}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, RepoError> {
        let model = TagEntity::find()
            .filter(tag::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(model.map(Into::into))
    }

    async fn tags_for_post(&self, post_id: i64) -> Result<Vec<Tag>, RepoError> {
        let models = TagEntity::find()
            .join(JoinType::InnerJoin, tag::Relation::PostTag.def())
            .filter(post_tag::Column::PostId.eq(post_id))
            .order_by_asc(tag::Column::Name)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn set_post_tags(&self, post_id: i64, names: &[String]) -> Result<Vec<Tag>, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let exists = PostEntity::find_by_id(post_id)
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .is_some();
        if !exists {
            return Err(RepoError::NotFound);
        }

        let tags = replace_post_tags(&txn, post_id, names).await?;
        txn.commit().await.map_err(map_db_err)?;
        Ok(tags)
    }
}

#[async_trait]
impl AuthorRepository for PostgresAuthorRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<Author>, RepoError> {
        tracing::debug!(%username, "Finding author by username");

        let model = AuthorEntity::find()
            .filter(author::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(model.map(Into::into))
    }
}
