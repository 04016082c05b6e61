//! Post Storage
//!
//! Persistent collaborators seeding the dedup index and receiving accepted posts:
//! - `JsonFileStore`: one timestamped JSON array per run (`jobs_<date>_<time>.json`)
//! - `SqliteStore`: `posts` table keyed by id, fingerprint indexed
//! - `MemoryStore`: in-process, for tests and embedding callers
//!
//! Every store re-checks ids and fingerprints on `append`, so replaying a
//! batch never duplicates rows.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::StoreKind;
use crate::types::{Fingerprint, Post, PostId};

/// Result of handing a batch to a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub accepted: usize,
    pub skipped: usize,
}

pub trait PostStore {
    /// Page-provided ids already stored. Synthetic ids are never reported.
    fn existing_ids(&self) -> Result<HashSet<String>>;

    fn existing_fingerprints(&self) -> Result<HashSet<Fingerprint>>;

    fn append(&mut self, posts: &[Post]) -> Result<AppendOutcome>;
}

/// Open the store configured for the crawl binary under `data_dir`.
pub fn open_store(kind: StoreKind, data_dir: &Path) -> Result<Box<dyn PostStore>> {
    match kind {
        StoreKind::Json => Ok(Box::new(JsonFileStore::open(data_dir)?)),
        StoreKind::Sqlite => Ok(Box::new(SqliteStore::open(&data_dir.join("posts.db"))?)),
    }
}

/// Tracks what a batch may still add, starting from what is already stored.
struct BatchFilter {
    ids: HashSet<String>,
    fingerprints: HashSet<Fingerprint>,
}

impl BatchFilter {
    fn admit(&mut self, post: &Post) -> bool {
        let fingerprint = post.fingerprint();
        if self.fingerprints.contains(&fingerprint) {
            return false;
        }
        if let PostId::Source(id) = &post.id {
            if !self.ids.insert(id.clone()) {
                return false;
            }
        }
        self.fingerprints.insert(fingerprint);
        true
    }
}

// ============================================================================
// JSON files
// ============================================================================

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory {:?}", dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every post in every `*.json` file, files in name order.
    pub fn load_all(&self) -> Result<Vec<Post>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list data directory {:?}", self.dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
            .collect();
        files.sort();

        let mut posts = Vec::new();
        for path in files {
            match read_post_file(&path) {
                Ok(mut batch) => posts.append(&mut batch),
                Err(e) => warn!(file = ?path, error = %e, "Skipping unreadable post file"),
            }
        }
        Ok(posts)
    }

    fn next_file_path(&self, now: DateTime<Utc>) -> PathBuf {
        let stem = format!("jobs_{}", now.format("%Y-%m-%d_%H-%M-%S"));
        let mut path = self.dir.join(format!("{}.json", stem));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{}_{}.json", stem, n));
            n += 1;
        }
        path
    }
}

fn read_post_file(path: &Path) -> Result<Vec<Post>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read posts from {:?}", path))?;
    let posts: Vec<Post> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse posts JSON in {:?}", path))?;
    Ok(posts)
}

impl PostStore for JsonFileStore {
    fn existing_ids(&self) -> Result<HashSet<String>> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter_map(|p| match p.id {
                PostId::Source(id) => Some(id),
                PostId::Synthetic(_) => None,
            })
            .collect())
    }

    fn existing_fingerprints(&self) -> Result<HashSet<Fingerprint>> {
        Ok(self.load_all()?.iter().map(Post::fingerprint).collect())
    }

    fn append(&mut self, posts: &[Post]) -> Result<AppendOutcome> {
        let mut filter = BatchFilter {
            ids: self.existing_ids()?,
            fingerprints: self.existing_fingerprints()?,
        };
        let fresh: Vec<&Post> = posts.iter().filter(|p| filter.admit(p)).collect();
        let outcome = AppendOutcome {
            accepted: fresh.len(),
            skipped: posts.len() - fresh.len(),
        };

        if fresh.is_empty() {
            debug!(skipped = outcome.skipped, "No new posts to write");
            return Ok(outcome);
        }

        let path = self.next_file_path(Utc::now());
        let json = serde_json::to_string_pretty(&fresh)?;
        fs::write(&path, json).with_context(|| format!("Failed to write posts to {:?}", path))?;
        info!(file = ?path, accepted = outcome.accepted, skipped = outcome.skipped, "Saved posts");
        Ok(outcome)
    }
}

// ============================================================================
// SQLite
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open post database {:?}", db_path))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                fingerprint TEXT NOT NULL,
                synthetic INTEGER NOT NULL DEFAULT 0,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                work_type TEXT NOT NULL,
                payment TEXT NOT NULL,
                deadline TEXT NOT NULL,
                url TEXT NOT NULL,
                source_url TEXT NOT NULL,
                scraped_at TEXT NOT NULL,
                published_at TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_posts_fingerprint ON posts(fingerprint)",
            [],
        )?;

        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl PostStore for SqliteStore {
    fn existing_ids(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT id FROM posts WHERE synthetic = 0")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<String>>>()?;
        Ok(ids)
    }

    fn existing_fingerprints(&self) -> Result<HashSet<Fingerprint>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT fingerprint FROM posts")?;
        let digests = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(digests.into_iter().map(Fingerprint::from_digest).collect())
    }

    fn append(&mut self, posts: &[Post]) -> Result<AppendOutcome> {
        let tx = self.conn.transaction()?;
        let mut outcome = AppendOutcome::default();

        for post in posts {
            let fingerprint = post.fingerprint();
            let known: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM posts WHERE fingerprint = ?1 LIMIT 1",
                    params![fingerprint.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if known.is_some() {
                outcome.skipped += 1;
                continue;
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO posts
                 (id, fingerprint, synthetic, title, description, work_type, payment,
                  deadline, url, source_url, scraped_at, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    post.id.as_str(),
                    fingerprint.as_str(),
                    post.id.is_synthetic(),
                    post.title,
                    post.description,
                    post.work_type,
                    post.payment,
                    post.deadline,
                    post.url,
                    post.source_url,
                    post.scraped_at.to_rfc3339(),
                    post.published_at.map(|at| at.to_rfc3339()),
                ],
            )?;
            if inserted == 0 {
                outcome.skipped += 1;
            } else {
                outcome.accepted += 1;
            }
        }

        tx.commit()?;
        info!(accepted = outcome.accepted, skipped = outcome.skipped, "Stored posts");
        Ok(outcome)
    }
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    posts: Vec<Post>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }
}

impl PostStore for MemoryStore {
    fn existing_ids(&self) -> Result<HashSet<String>> {
        Ok(self
            .posts
            .iter()
            .filter(|p| !p.id.is_synthetic())
            .map(|p| p.id.as_str().to_string())
            .collect())
    }

    fn existing_fingerprints(&self) -> Result<HashSet<Fingerprint>> {
        Ok(self.posts.iter().map(Post::fingerprint).collect())
    }

    fn append(&mut self, posts: &[Post]) -> Result<AppendOutcome> {
        let mut filter = BatchFilter {
            ids: self.existing_ids()?,
            fingerprints: self.existing_fingerprints()?,
        };
        let mut outcome = AppendOutcome::default();
        for post in posts {
            if filter.admit(post) {
                self.posts.push(post.clone());
                outcome.accepted += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        Ok(outcome)
    }
}
