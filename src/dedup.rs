use anyhow::Result;
use std::collections::HashSet;

use crate::store::PostStore;
use crate::types::{Fingerprint, Post, PostId};

/// Run-scoped memory of every post id and content fingerprint already seen.
///
/// Seeded once from the store, then owned by the orchestrator for the run.
#[derive(Debug, Clone, Default)]
pub struct DedupIndex {
    seen_ids: HashSet<String>,
    seen_fingerprints: HashSet<Fingerprint>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(ids: HashSet<String>, fingerprints: HashSet<Fingerprint>) -> Self {
        Self {
            seen_ids: ids,
            seen_fingerprints: fingerprints,
        }
    }

    pub fn from_store<S: PostStore + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self::seeded(store.existing_ids()?, store.existing_fingerprints()?))
    }

    /// Unseen id (synthetic ids never match) and unseen content.
    pub fn is_novel(&self, post: &Post) -> bool {
        let id_seen = match &post.id {
            PostId::Source(id) => self.seen_ids.contains(id),
            PostId::Synthetic(_) => false,
        };
        !id_seen && !self.seen_fingerprints.contains(&post.fingerprint())
    }

    pub fn record(&mut self, post: &Post) {
        if let PostId::Source(id) = &post.id {
            self.seen_ids.insert(id.clone());
        }
        self.seen_fingerprints.insert(post.fingerprint());
    }

    /// Keep the novel posts in order, recording each as it is kept.
    pub fn retain_novel(&mut self, posts: Vec<Post>) -> Vec<Post> {
        let mut kept = Vec::with_capacity(posts.len());
        for post in posts {
            if self.is_novel(&post) {
                self.record(&post);
                kept.push(post);
            }
        }
        kept
    }

    pub fn seen_id_count(&self) -> usize {
        self.seen_ids.len()
    }

    pub fn seen_fingerprint_count(&self) -> usize {
        self.seen_fingerprints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_post(id: PostId, title: &str) -> Post {
        Post {
            id,
            title: title.to_string(),
            description: format!("{} описание", title),
            work_type: String::new(),
            payment: String::new(),
            deadline: String::new(),
            url: String::new(),
            source_url: "https://t.me/s/a".to_string(),
            scraped_at: Utc::now(),
            published_at: None,
        }
    }

    #[test]
    fn test_seen_id_is_not_novel() {
        let mut index = DedupIndex::new();
        let post = make_post(PostId::Source("1".to_string()), "Вакансия");
        assert!(index.is_novel(&post));
        index.record(&post);

        let same_id = make_post(PostId::Source("1".to_string()), "Другая вакансия");
        assert!(!index.is_novel(&same_id));
    }

    #[test]
    fn test_same_content_different_id_is_not_novel() {
        let mut index = DedupIndex::new();
        index.record(&make_post(PostId::Source("1".to_string()), "Вакансия"));
        assert!(!index.is_novel(&make_post(PostId::Source("2".to_string()), "ВАКАНСИЯ")));
    }

    #[test]
    fn test_synthetic_ids_never_recorded() {
        let mut index = DedupIndex::new();
        let post = make_post(PostId::synthetic(), "Вакансия");
        index.record(&post);
        assert_eq!(index.seen_id_count(), 0);
        assert_eq!(index.seen_fingerprint_count(), 1);
        assert!(!index.is_novel(&make_post(PostId::synthetic(), "Вакансия")));
    }

    #[test]
    fn test_retain_novel_keeps_first_of_duplicates() {
        let mut index = DedupIndex::seeded(HashSet::from(["7".to_string()]), HashSet::new());
        let posts = vec![
            make_post(PostId::Source("7".to_string()), "Старая"),
            make_post(PostId::Source("8".to_string()), "Новая"),
            make_post(PostId::Source("9".to_string()), "Новая"),
        ];
        let kept = index.retain_novel(posts);
        let ids: Vec<&str> = kept.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["8"]);
    }
}
