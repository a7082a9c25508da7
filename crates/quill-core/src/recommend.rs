//! Tag-overlap recommendation.

use std::cmp::Reverse;
use std::collections::HashSet;

use crate::domain::Post;

/// Number of similar posts shown on a detail page.
pub const SIMILAR_POSTS_LIMIT: u64 = 4;

/// Rank candidates by how many of `tag_ids` they carry.
///
/// Candidates sharing no tag are dropped, as is the post `exclude_id` itself.
/// Order: shared count descending, then `publish` descending, then id
/// descending. Each candidate is expected at most once.
pub fn rank_similar<'a, I>(exclude_id: i64, tag_ids: &[i64], candidates: I, limit: u64) -> Vec<Post>
where
    I: IntoIterator<Item = (&'a Post, &'a [i64])>,
{
    let wanted: HashSet<i64> = tag_ids.iter().copied().collect();

    let mut scored: Vec<(usize, &Post)> = candidates
        .into_iter()
        .filter(|(post, _)| post.id != exclude_id)
        .map(|(post, tags)| {
            let distinct: HashSet<&i64> = tags.iter().filter(|t| wanted.contains(*t)).collect();
            (distinct.len(), post)
        })
        .filter(|(shared, _)| *shared > 0)
        .collect();

    scored.sort_by_key(|(shared, post)| (Reverse(*shared), Reverse(post.publish), Reverse(post.id)));

    scored
        .into_iter()
        .take(limit as usize)
        .map(|(_, post)| post.clone())
        .collect()
}
