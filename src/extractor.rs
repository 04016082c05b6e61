//! Post Extraction
//!
//! Turns one rendered page snapshot into normalized `Post` records:
//! - resolve a stable id (structured attribute, permalink tail, synthetic)
//! - split text into title/description and pull labeled fields
//! - drop noise via `ContentClassifier`
//! - resolve the publication instant
//!
//! Pure with respect to the snapshot: no network or storage access.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::classifier::ContentClassifier;
use crate::dom::{FeedDocument, FeedSelectors, RawNode};
use crate::error::ExtractionError;
use crate::fields::{extract_field, split_text, FieldLabels};
use crate::timestamp;
use crate::types::{Post, PostId};

/// Texts shorter than this carry nothing worth classifying.
pub const MIN_TEXT_CHARS: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct PostExtractor {
    selectors: FeedSelectors,
    classifier: ContentClassifier,
}

impl PostExtractor {
    pub fn new(selectors: FeedSelectors) -> Self {
        Self {
            selectors,
            classifier: ContentClassifier::new(),
        }
    }

    pub fn selectors(&self) -> &FeedSelectors {
        &self.selectors
    }

    /// Extract every accepted post from `html`, in document order.
    pub fn extract(&self, html: &str, source_url: &str, scraped_at: DateTime<Utc>) -> Vec<Post> {
        let document = FeedDocument::parse(html);
        let nodes = document.post_nodes(&self.selectors);
        let total = nodes.len();

        let posts: Vec<Post> = nodes
            .iter()
            .filter_map(|node| match self.parse_post(node, source_url, scraped_at) {
                Ok(post) => post,
                Err(e) => {
                    debug!(source = source_url, error = %e, "Skipping post node");
                    None
                }
            })
            .collect();

        debug!(source = source_url, nodes = total, accepted = posts.len(), "Extracted page snapshot");
        posts
    }

    /// `Ok(None)` for nodes filtered as too short or not a job post.
    pub fn parse_post(
        &self,
        node: &RawNode,
        source_url: &str,
        scraped_at: DateTime<Utc>,
    ) -> Result<Option<Post>, ExtractionError> {
        let text = node
            .body_text
            .as_deref()
            .unwrap_or(node.full_text.as_str())
            .trim();

        if text.is_empty() {
            return Err(ExtractionError::EmptyNode);
        }
        if text.chars().count() < MIN_TEXT_CHARS {
            return Ok(None);
        }

        let (title, description) = split_text(text);
        if !self.classifier.is_job_post(&title, &description) {
            return Ok(None);
        }

        let id = resolve_id(node);
        let url = resolve_url(node, &id, source_url);
        let published_at = timestamp::resolve(node, scraped_at).unwrap_or(scraped_at);

        Ok(Some(Post {
            work_type: extract_field(text, FieldLabels::WORK_TYPE),
            payment: extract_field(text, FieldLabels::PAYMENT),
            deadline: extract_field(text, FieldLabels::DEADLINE),
            id,
            title,
            description,
            url,
            source_url: source_url.to_string(),
            scraped_at,
            published_at: Some(published_at),
        }))
    }
}

/// Structured attribute tail, then permalink tail, then a fresh synthetic id.
pub fn resolve_id(node: &RawNode) -> PostId {
    node.id_attribute
        .as_deref()
        .and_then(|attr| last_segment(attr))
        .and_then(PostId::from_source)
        .or_else(|| {
            node.permalink
                .as_deref()
                .and_then(|href| last_segment(href))
                .and_then(PostId::from_source)
        })
        .unwrap_or_else(PostId::synthetic)
}

fn last_segment(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

/// Link back to the post: the node's own permalink, else `<channel>/<id>`.
pub fn resolve_url(node: &RawNode, id: &PostId, source_url: &str) -> String {
    if let Some(href) = node.permalink.as_deref() {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
    }
    if id.is_synthetic() {
        return source_url.to_string();
    }
    format!(
        "{}/{}",
        source_url.replace("/s/", "/").trim_end_matches('/'),
        id
    )
}
