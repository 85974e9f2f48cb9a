// src/store/firestore.rs
//! Cloud Firestore backend over the v1 REST API.
//!
//! Only two endpoints are used: `documents/{collection}` (list, paginated) and
//! `documents:commit` (atomic batch of up to 500 writes). Authentication is an
//! externally minted OAuth bearer token; the emulator accepts none.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{new_id, SnapshotStore};
use crate::error::StoreError;
use crate::ingest::types::{CanonicalRecord, StoredRecord};

/// Firestore rejects commits with more writes than this.
pub const BATCH_LIMIT: usize = 500;
const PAGE_SIZE: usize = 300;

pub struct FirestoreStore {
    client: Client,
    base: Url,
    project_id: String,
    database: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreStore {
    pub fn new(base_url: &str, project_id: &str, database: &str, token: Option<String>) -> anyhow::Result<Self> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            anyhow::bail!("firestore base url {base_url:?} cannot be a base");
        }
        Ok(Self {
            client: Client::new(),
            base,
            project_id: project_id.to_string(),
            database: database.to_string(),
            token,
        })
    }

    /// `projects/{p}/databases/{d}/documents`, as used inside request bodies.
    fn documents_root(&self) -> String {
        format!("projects/{}/databases/{}/documents", self.project_id, self.database)
    }

    fn url(&self, tail: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty().extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                self.database.as_str(),
            ]);
            segs.extend(tail);
        }
        url
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    async fn check(resp: reqwest::Response, collection: &str) -> Result<reqwest::Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let reason = format!("HTTP {status}: {}", body.trim());
        if status.is_server_error()
            || matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
            )
        {
            Err(StoreError::Unavailable(reason))
        } else {
            Err(StoreError::Rejected {
                collection: collection.to_string(),
                reason,
            })
        }
    }

    async fn list_documents(&self, collection: &str, names_only: bool) -> Result<Vec<Document>, StoreError> {
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.url(&["documents", collection]);
            {
                let mut q = url.query_pairs_mut();
                q.append_pair("pageSize", &PAGE_SIZE.to_string());
                if names_only {
                    q.append_pair("mask.fieldPaths", "__name__");
                }
                if let Some(t) = &page_token {
                    q.append_pair("pageToken", t);
                }
            }
            let resp = self
                .authorize(self.client.get(url))
                .send()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let page: ListResponse = Self::check(resp, collection)
                .await?
                .json()
                .await
                .map_err(|e| StoreError::Unavailable(format!("decoding list response: {e}")))?;
            out.extend(page.documents);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }
        Ok(out)
    }

    async fn commit(&self, collection: &str, writes: Vec<Value>) -> Result<(), StoreError> {
        let url = self.url(&["documents:commit"]);
        let resp = self
            .authorize(self.client.post(url))
            .json(&json!({ "writes": writes }))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::check(resp, collection).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FirestoreStore {
    async fn erase_all(&self, collection: &str) -> Result<usize, StoreError> {
        let docs = self.list_documents(collection, true).await?;
        let total = docs.len();
        // One commit is atomic; beyond the batch limit deletion is sequential.
        for chunk in docs.chunks(BATCH_LIMIT) {
            let writes = chunk.iter().map(|d| json!({ "delete": d.name })).collect();
            self.commit(collection, writes).await?;
        }
        if total > BATCH_LIMIT {
            tracing::warn!(target: "store", collection, total, "erase split across several commits");
        }
        Ok(total)
    }

    async fn insert_all(&self, collection: &str, records: &[CanonicalRecord]) -> Result<usize, StoreError> {
        if records.len() > BATCH_LIMIT {
            return Err(StoreError::BatchTooLarge {
                size: records.len(),
                limit: BATCH_LIMIT,
            });
        }
        if records.is_empty() {
            return Ok(0);
        }
        let root = self.documents_root();
        let writes = records
            .iter()
            .map(|r| {
                json!({
                    "update": {
                        "name": format!("{root}/{collection}/{}", new_id()),
                        "fields": encode_fields(r),
                    },
                    "currentDocument": { "exists": false },
                })
            })
            .collect();
        self.commit(collection, writes).await?;
        Ok(records.len())
    }

    async fn list(&self, collection: &str) -> Result<Vec<StoredRecord>, StoreError> {
        let docs = self.list_documents(collection, false).await?;
        Ok(docs.into_iter().filter_map(decode_document).collect())
    }

    fn name(&self) -> &'static str {
        "firestore"
    }
}

fn timestamp_value(ts: &DateTime<Utc>) -> Value {
    json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::Millis, true) })
}

/// Firestore `fields` map for one record.
pub fn encode_fields(r: &CanonicalRecord) -> Value {
    json!({
        "title": { "stringValue": r.title },
        "link": { "stringValue": r.link },
        "source": { "stringValue": r.source },
        "publishedAt": timestamp_value(&r.published_at),
        "publishedAtRaw": match &r.published_at_raw {
            Some(raw) => json!({ "stringValue": raw }),
            None => json!({ "nullValue": null }),
        },
        "createdAt": timestamp_value(&r.created_at),
    })
}

fn decode_document(doc: Document) -> Option<StoredRecord> {
    let string = |k: &str| {
        doc.fields
            .get(k)
            .and_then(|v| v.get("stringValue"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let timestamp = |k: &str| {
        doc.fields
            .get(k)
            .and_then(|v| v.get("timestampValue"))
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
    };
    let record = CanonicalRecord {
        title: string("title").unwrap_or_default(),
        link: string("link").unwrap_or_default(),
        source: string("source").unwrap_or_default(),
        published_at: timestamp("publishedAt")?,
        published_at_raw: string("publishedAtRaw"),
        created_at: timestamp("createdAt")?,
    };
    let id = doc.name.rsplit('/').next()?.to_string();
    Some(StoredRecord { id, record })
}
