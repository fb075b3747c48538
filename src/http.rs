//! HTTP client for the occurrence backend.
//!
//! Thin async wrappers over the REST endpoints the map and "my occurrences" screens
//! use, plus the fetch → filter → cluster pipeline:
//! - Bearer-token authentication on every request
//! - Retry with exponential backoff on 429 and transport errors
//! - Bounded concurrent detail fetches when a cluster marker is opened
//! - Multipart submission of new occurrences, including queued offline drafts
//!
//! Every response is wrapped in a `{"data": ...}` envelope.

use base64::Engine;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::{
    cluster_occurrences, retain_clusterable, to_markers, ClusterConfig, Error, MapMarker,
    Occurrence, OccurrenceCluster, OccurrenceStatus, OfflineDraft, Result,
};

#[cfg(feature = "offline")]
use crate::OfflineStore;

// Detail fetches for one tapped marker; clusters rarely exceed a few dozen members
const MAX_CONCURRENCY: usize = 8;
const BASE_BACKOFF_MS: u64 = 200;

/// Connection settings for the backend.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ClientConfig {
    /// API root, e.g. `http://10.0.2.2:8080/api`. Trailing slashes are ignored.
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>` when present
    pub bearer_token: Option<String>,
    /// Per-request timeout. Default: 30 seconds
    pub timeout_secs: u64,
    /// Retries on 429 or transport errors before giving up. Default: 3
    pub max_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            bearer_token: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Filters accepted by the occurrence list endpoint. Unset fields are not sent.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct OccurrenceFilter {
    pub status: Option<OccurrenceStatus>,
    pub category: Option<String>,
    /// ISO 8601 timestamp
    pub start_date: Option<String>,
    /// ISO 8601 timestamp
    pub end_date: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl OccurrenceFilter {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(start) = &self.start_date {
            pairs.push(("startDate", start.clone()));
        }
        if let Some(end) = &self.end_date {
            pairs.push(("endDate", end.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(size) = self.size {
            pairs.push(("size", size.to_string()));
        }
        pairs
    }
}

/// Occurrence category as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "crate::id_as_string")]
    pub id: String,
    pub name: String,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub total_elements: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            total_elements: None,
            total_pages: None,
            number: None,
            size: None,
        }
    }
}

/// Response envelope used by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Serialize)]
struct SyncRequest<'a> {
    occurrences: &'a [OfflineDraft],
}

/// Image attached to a new occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    /// Name of the form part file, e.g. `photo.jpg`. Its extension picks the content type.
    pub file_name: String,
}

impl PhotoUpload {
    /// Read a photo from a local path or `file://` URI. The upload is named `photo.<ext>`.
    pub async fn from_uri(uri: &str) -> Result<Self> {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| Error::Photo { path: path.to_string(), source })?;

        Ok(Self {
            bytes,
            file_name: format!("photo.{}", extension_of(path)),
        })
    }

    fn mime_type(&self) -> String {
        match extension_of(&self.file_name).as_str() {
            "jpg" | "jpeg" => "image/jpeg".to_string(),
            other => format!("image/{}", other),
        }
    }
}

fn extension_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("jpg")
        .to_ascii_lowercase()
}

/// A new occurrence, submitted as `multipart/form-data`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOccurrence {
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub category: Option<String>,
    pub photo: Option<PhotoUpload>,
}

impl NewOccurrence {
    fn form(&self) -> Result<Form> {
        let mut form = Form::new()
            .text("description", self.description.clone())
            .text("lat", self.latitude.to_string())
            .text("lon", self.longitude.to_string());

        if let Some(category) = &self.category {
            form = form.text("category", category.clone());
        }
        if let Some(photo) = &self.photo {
            let part = Part::bytes(photo.bytes.clone())
                .file_name(photo.file_name.clone())
                .mime_str(&photo.mime_type())?;
            form = form.part("photo", part);
        }
        Ok(form)
    }
}

/// Fields to change on an existing occurrence. Unset fields are left out of the body.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OccurrenceStatus>,
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS * (1 << attempt.min(4)))
}

/// Client for the occurrence backend
pub struct OccurrenceClient {
    client: Client,
    config: ClientConfig,
}

impl OccurrenceClient {
    /// Create a client. Fails if `base_url` is empty or the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::InvalidConfig("base_url is empty".to_string()));
        }

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request, rebuilding it for each attempt.
    async fn send<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> Result<RequestBuilder>,
    {
        let mut retries = 0;
        let started = Instant::now();

        loop {
            match self.authorized(build()?).send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::TOO_MANY_REQUESTS && retries < self.config.max_retries {
                        retries += 1;
                        let wait = backoff(retries);
                        warn!(
                            "[OccurrenceClient] 429 from {}, retry {} after {:?}",
                            url, retries, wait
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    if !status.is_success() {
                        return Err(Error::Status { status: status.as_u16(), url: url.to_string() });
                    }

                    debug!("[OccurrenceClient] {} {} in {:?}", status, url, started.elapsed());
                    return Ok(resp);
                }
                Err(e) => {
                    if retries >= self.config.max_retries {
                        return Err(e.into());
                    }
                    retries += 1;
                    let wait = backoff(retries);
                    warn!(
                        "[OccurrenceClient] Error from {}: {}, retry {} after {:?}",
                        url, e, retries, wait
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path);
        let resp = self.send(&url, || Ok(self.client.get(&url).query(query))).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// List occurrences matching `filter`. A missing `data`/`content` is an empty list.
    pub async fn list_occurrences(&self, filter: &OccurrenceFilter) -> Result<Vec<Occurrence>> {
        let envelope: Envelope<Page<Occurrence>> =
            self.get_json("/ocorrencias", &filter.query_pairs()).await?;
        let occurrences = envelope.data.map(|page| page.content).unwrap_or_default();
        info!("[OccurrenceClient] Listed {} occurrences", occurrences.len());
        Ok(occurrences)
    }

    /// The signed-in user's occurrences, one page at a time.
    pub async fn my_occurrences(&self, page: u32, size: u32) -> Result<Page<Occurrence>> {
        let query = [("page", page.to_string()), ("size", size.to_string())];
        let envelope: Envelope<Page<Occurrence>> = self.get_json("/ocorrencias/me", &query).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Full record for one occurrence.
    pub async fn get_occurrence(&self, id: &str) -> Result<Occurrence> {
        let path = format!("/ocorrencias/{}", id);
        let envelope: Envelope<Occurrence> = self.get_json(&path, &[]).await?;
        envelope.data.ok_or_else(|| Error::EmptyResponse(self.url(&path)))
    }

    /// Full records for several occurrences, fetched concurrently.
    ///
    /// Results are in the order of `ids`; one failure does not cancel the others.
    pub async fn get_occurrences(&self, ids: &[String]) -> Vec<Result<Occurrence>> {
        let start = Instant::now();
        let results: Vec<Result<Occurrence>> = stream::iter(ids)
            .map(|id| self.get_occurrence(id))
            .buffered(MAX_CONCURRENCY)
            .collect()
            .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(
            "[OccurrenceClient] Fetched {} occurrence details ({} failed) in {:?}",
            ids.len(), failed, start.elapsed()
        );
        results
    }

    /// Photo of an occurrence, base64-encoded for inline display.
    pub async fn get_photo_base64(&self, id: &str) -> Result<String> {
        let url = self.url(&format!("/ocorrencias/{}/foto", id));
        let resp = self.send(&url, || Ok(self.client.get(&url))).await?;
        let bytes = resp.bytes().await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(&bytes))
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let envelope: Envelope<Vec<Category>> = self.get_json("/categorias", &[]).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Upload drafts captured offline in one batch.
    pub async fn sync_offline(&self, drafts: &[OfflineDraft]) -> Result<()> {
        let url = self.url("/sincronizacao");
        let body = SyncRequest { occurrences: drafts };
        self.send(&url, || Ok(self.client.post(&url).json(&body))).await?;
        info!("[OccurrenceClient] Synced {} offline drafts", drafts.len());
        Ok(())
    }

    /// Submit a new occurrence.
    pub async fn create_occurrence(&self, occurrence: &NewOccurrence) -> Result<()> {
        let url = self.url("/ocorrencias");
        self.send(&url, || Ok(self.client.post(&url).multipart(occurrence.form()?)))
            .await?;
        info!(
            "[OccurrenceClient] Created occurrence at ({:.5}, {:.5}){}",
            occurrence.latitude,
            occurrence.longitude,
            if occurrence.photo.is_some() { " with photo" } else { "" }
        );
        Ok(())
    }

    pub async fn update_occurrence(&self, id: &str, update: &OccurrenceUpdate) -> Result<()> {
        let url = self.url(&format!("/ocorrencias/{}", id));
        self.send(&url, || Ok(self.client.put(&url).json(update))).await?;
        Ok(())
    }

    pub async fn delete_occurrence(&self, id: &str) -> Result<()> {
        let url = self.url(&format!("/ocorrencias/{}", id));
        self.send(&url, || Ok(self.client.delete(&url))).await?;
        info!("[OccurrenceClient] Deleted occurrence {}", id);
        Ok(())
    }

    /// Submit one offline draft as a new occurrence, then drop it from `store`.
    ///
    /// The draft stays queued when its photo cannot be read or the upload fails.
    #[cfg(feature = "offline")]
    pub async fn send_draft(&self, store: &OfflineStore, draft: &OfflineDraft) -> Result<()> {
        let photo = match &draft.photo_uri {
            Some(uri) => Some(PhotoUpload::from_uri(uri).await?),
            None => None,
        };

        let occurrence = NewOccurrence {
            description: draft.description.clone().unwrap_or_default(),
            latitude: draft.latitude,
            longitude: draft.longitude,
            category: draft.category_id.clone(),
            photo,
        };
        self.create_occurrence(&occurrence).await?;
        store.remove(&draft.id)?;
        Ok(())
    }

    /// Send every pending draft, oldest first. Returns how many were sent.
    ///
    /// A draft that fails is logged and left queued; the rest are still attempted.
    #[cfg(feature = "offline")]
    pub async fn send_pending(&self, store: &OfflineStore) -> Result<u32> {
        let drafts = store.pending()?;
        let mut sent = 0;

        for draft in &drafts {
            match self.send_draft(store, draft).await {
                Ok(()) => sent += 1,
                Err(e) => warn!("[OccurrenceClient] Draft {} not sent: {}", draft.id, e),
            }
        }

        info!("[OccurrenceClient] Sent {} of {} offline drafts", sent, drafts.len());
        Ok(sent)
    }

    /// Fetch occurrences, drop those without a usable location and cluster the rest.
    pub async fn fetch_clusters(
        &self,
        filter: &OccurrenceFilter,
        config: &ClusterConfig,
    ) -> Result<Vec<OccurrenceCluster>> {
        let occurrences = self.list_occurrences(filter).await?;
        let total = occurrences.len();
        let clusterable = retain_clusterable(occurrences);
        if clusterable.len() < total {
            debug!(
                "[OccurrenceClient] Skipped {} occurrences without location",
                total - clusterable.len()
            );
        }
        Ok(cluster_occurrences(&clusterable, config.radius_meters))
    }
}

fn blocking_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?)
}

/// Blocking wrapper for callers without an async runtime (FFI, demos).
pub fn fetch_cluster_markers_blocking(
    config: ClientConfig,
    filter: OccurrenceFilter,
    cluster_config: ClusterConfig,
) -> Result<Vec<MapMarker>> {
    let rt = blocking_runtime()?;
    let client = OccurrenceClient::new(config)?;
    let clusters = rt.block_on(client.fetch_clusters(&filter, &cluster_config))?;
    Ok(to_markers(&clusters))
}

/// Blocking wrapper around [`OccurrenceClient::send_pending`].
#[cfg(feature = "offline")]
pub fn send_pending_blocking(config: ClientConfig, store: &OfflineStore) -> Result<u32> {
    let rt = blocking_runtime()?;
    let client = OccurrenceClient::new(config)?;
    rt.block_on(client.send_pending(store))
}
