use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Deadline for every metadata call against a remote backend.
const METADATA_DEADLINE: Duration = Duration::from_secs(1);

/// Key prefix isolating video entries in a shared etcd keyspace.
const ETCD_KEY_PREFIX: &str = "videos/";

/// One uploaded video as the front-end tracks it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub video_id: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Metadata index backend, selected by the `web` CLI.
pub enum MetadataStore {
    Sqlite(SqliteMetadata),
    Etcd(EtcdMetadata),
}

impl MetadataStore {
    pub fn open(kind: &str, options: &str) -> anyhow::Result<Self> {
        match kind {
            "sqlite" => Ok(Self::Sqlite(SqliteMetadata::open(options)?)),
            "etcd" => Ok(Self::Etcd(EtcdMetadata::new(options.split(',')))),
            other => Err(anyhow!("unknown metadata service type [sqlite/etcd]: {other}")),
        }
    }

    pub async fn create(
        &self,
        video_id: &str,
        uploaded_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        match self {
            Self::Sqlite(s) => s.create(video_id, uploaded_at),
            Self::Etcd(e) => e.create(video_id, uploaded_at).await,
        }
    }

    pub async fn read(&self, video_id: &str) -> anyhow::Result<Option<VideoMetadata>> {
        match self {
            Self::Sqlite(s) => s.read(video_id),
            Self::Etcd(e) => e.read(video_id).await,
        }
    }

    pub async fn list(&self) -> anyhow::Result<Vec<VideoMetadata>> {
        match self {
            Self::Sqlite(s) => s.list(),
            Self::Etcd(e) => e.list().await,
        }
    }
}

/// SQLite-backed metadata index for single-process deployments.
pub struct SqliteMetadata {
    conn: Mutex<Connection>,
}

impl SqliteMetadata {
    pub fn open(db_path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open database {db_path}"))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS videos (
                id TEXT PRIMARY KEY,
                uploaded_at TEXT NOT NULL
            )",
            [],
        )
        .context("failed to create videos table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn create(&self, video_id: &str, uploaded_at: DateTime<Utc>) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO videos (id, uploaded_at) VALUES (?1, ?2)",
            params![video_id, uploaded_at.to_rfc3339()],
        )
        .context("failed to insert metadata")?;
        Ok(())
    }

    fn read(&self, video_id: &str) -> anyhow::Result<Option<VideoMetadata>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, uploaded_at FROM videos WHERE id = ?1",
                params![video_id],
                |row| {
                    let id: String = row.get(0)?;
                    let uploaded_at: String = row.get(1)?;
                    Ok((id, uploaded_at))
                },
            )
            .optional()
            .context("failed to read metadata")?;
        row.map(|(video_id, uploaded_at)| {
            Ok(VideoMetadata {
                video_id,
                uploaded_at: DateTime::parse_from_rfc3339(&uploaded_at)?.with_timezone(&Utc),
            })
        })
        .transpose()
    }

    fn list(&self) -> anyhow::Result<Vec<VideoMetadata>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, uploaded_at FROM videos ORDER BY id")
            .context("failed to list metadata")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let uploaded_at: String = row.get(1)?;
            Ok((id, uploaded_at))
        })?;
        let mut videos = Vec::new();
        for row in rows {
            let (video_id, uploaded_at) = row?;
            videos.push(VideoMetadata {
                video_id,
                uploaded_at: DateTime::parse_from_rfc3339(&uploaded_at)?.with_timezone(&Utc),
            });
        }
        Ok(videos)
    }
}

/// Metadata index backed by an etcd cluster, spoken to through the v3
/// HTTP/JSON gateway. Keys and values travel base64-encoded; entries are
/// stored as the JSON form of [`VideoMetadata`].
pub struct EtcdMetadata {
    endpoints: Vec<String>,
    http: reqwest::Client,
}

impl EtcdMetadata {
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints = nodes
            .into_iter()
            .map(|node| {
                let node = node.as_ref();
                if node.starts_with("http://") || node.starts_with("https://") {
                    node.to_string()
                } else {
                    format!("http://{node}")
                }
            })
            .collect();
        Self {
            endpoints,
            http: reqwest::Client::new(),
        }
    }

    /// Issues one KV call, trying each endpoint until one answers.
    async fn kv(&self, path: &str, body: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let mut last_err = None;
        for endpoint in &self.endpoints {
            let url = format!("{endpoint}{path}");
            match self
                .http
                .post(&url)
                .json(&body)
                .timeout(METADATA_DEADLINE)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    return resp.json().await.context("malformed etcd response");
                }
                Ok(resp) => last_err = Some(anyhow!("{} returned {}", url, resp.status())),
                Err(e) => last_err = Some(anyhow::Error::from(e)),
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("no etcd endpoints configured")))
    }

    fn entry_key(video_id: &str) -> String {
        format!("{ETCD_KEY_PREFIX}{video_id}")
    }

    async fn create(&self, video_id: &str, uploaded_at: DateTime<Utc>) -> anyhow::Result<()> {
        let metadata = VideoMetadata {
            video_id: video_id.to_string(),
            uploaded_at,
        };
        let body = json!({
            "key": BASE64.encode(Self::entry_key(video_id)),
            "value": BASE64.encode(serde_json::to_vec(&metadata)?),
        });
        self.kv("/v3/kv/put", body).await?;
        Ok(())
    }

    async fn read(&self, video_id: &str) -> anyhow::Result<Option<VideoMetadata>> {
        let body = json!({ "key": BASE64.encode(Self::entry_key(video_id)) });
        let resp = self.kv("/v3/kv/range", body).await?;
        let Some(kvs) = resp.get("kvs").and_then(|k| k.as_array()) else {
            return Ok(None);
        };
        let Some(value) = kvs.first().and_then(|kv| kv.get("value")).and_then(|v| v.as_str())
        else {
            return Ok(None);
        };
        let decoded = BASE64.decode(value).context("malformed etcd value")?;
        Ok(Some(serde_json::from_slice(&decoded)?))
    }

    async fn list(&self) -> anyhow::Result<Vec<VideoMetadata>> {
        // [prefix, prefix-with-last-byte-incremented) covers every entry key.
        let range_end = {
            let mut end = ETCD_KEY_PREFIX.as_bytes().to_vec();
            if let Some(last) = end.last_mut() {
                *last += 1;
            }
            end
        };
        let body = json!({
            "key": BASE64.encode(ETCD_KEY_PREFIX),
            "range_end": BASE64.encode(range_end),
        });
        let resp = self.kv("/v3/kv/range", body).await?;
        let mut videos = Vec::new();
        if let Some(kvs) = resp.get("kvs").and_then(|k| k.as_array()) {
            for kv in kvs {
                let Some(value) = kv.get("value").and_then(|v| v.as_str()) else {
                    continue;
                };
                let decoded = BASE64.decode(value).context("malformed etcd value")?;
                videos.push(serde_json::from_slice(&decoded)?);
            }
        }
        Ok(videos)
    }
}
