//! Google Drive v3 REST client implementing [`RemoteStore`].
//!
//! Authentication is out of scope: the client is handed an OAuth access
//! token and sends it as a bearer token on every request.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use payslip_shared::{DriveConfig, PayslipError, Result};

use crate::store::{ChunkProgress, RemoteFile, RemoteNode, RemoteStore};

/// User-Agent string for Drive requests.
const USER_AGENT: &str = concat!("payslip/", env!("CARGO_PKG_VERSION"));

/// Largest page Drive accepts for `files.list`.
const PAGE_SIZE: &str = "1000";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct NameOnly {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedFile {
    id: String,
    name: String,
    web_view_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ---------------------------------------------------------------------------
// DriveClient
// ---------------------------------------------------------------------------

/// Thin Drive v3 client: listing, metadata, media download, multipart upload.
pub struct DriveClient {
    client: Client,
    api_base: String,
    upload_base: String,
    token: String,
}

impl DriveClient {
    /// Create a client from the `[drive]` config and an access token.
    pub fn new(config: &DriveConfig, token: impl Into<String>) -> Result<Self> {
        let api_base = validate_base(&config.api_base, "api_base")?;
        let upload_base = validate_base(&config.upload_base, "upload_base")?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PayslipError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base,
            upload_base,
            token: token.into(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| PayslipError::Network(format!("{url}: {e}")))?;

        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| PayslipError::Network(format!("{url}: invalid response body: {e}")))
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    #[instrument(skip(self))]
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteNode>> {
        let id = validate_id(folder_id)?;
        let url = format!("{}/files", self.api_base);
        let q = format!("'{id}' in parents and trashed=false");

        let mut nodes = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("q", q.as_str()),
                ("fields", "nextPageToken, files(id, name, mimeType)"),
                ("pageSize", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let list: FileList = self.get_json(&url, &query).await?;
            nodes.extend(
                list.files
                    .into_iter()
                    .map(|f| RemoteNode::new(f.id, f.name, f.mime_type)),
            );

            match list.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = nodes.len(), "listed folder children");
        Ok(nodes)
    }

    #[instrument(skip(self))]
    async fn get_name(&self, id: &str) -> Result<String> {
        let id = validate_id(id)?;
        let url = format!("{}/files/{id}", self.api_base);
        let meta: NameOnly = self.get_json(&url, &[("fields", "name")]).await?;
        Ok(meta.name)
    }

    #[instrument(skip(self, on_chunk), fields(dest = %dest.display()))]
    async fn download(&self, file_id: &str, dest: &Path, on_chunk: ChunkProgress<'_>) -> Result<u64> {
        let id = validate_id(file_id)?;
        let url = format!("{}/files/{id}", self.api_base);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| PayslipError::Network(format!("{url}: {e}")))?;
        let mut response = check_status(response).await?;
        let total = response.content_length();

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PayslipError::io(parent, e))?;
        }

        // Partial content only ever lives under `<dest>.part`.
        let partial = partial_path(dest);
        let written = match stream_to_file(&mut response, &partial, total, on_chunk, &url).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        if let Err(e) = tokio::fs::rename(&partial, dest).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(PayslipError::io(dest, e));
        }

        debug!(bytes = written, "download complete");
        Ok(written)
    }

    #[instrument(skip(self), fields(path = %local_path.display()))]
    async fn upload(&self, local_path: &Path, dest_folder_id: &str) -> Result<RemoteFile> {
        let folder = validate_id(dest_folder_id)?;
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PayslipError::validation(format!("not a file path: {}", local_path.display()))
            })?;

        let content = tokio::fs::read(local_path)
            .await
            .map_err(|e| PayslipError::io(local_path, e))?;

        let metadata = serde_json::json!({ "name": file_name, "parents": [folder] });
        let boundary = format!("payslip-{}", Uuid::now_v7().simple());
        let body = multipart_related(&boundary, &metadata, content_type_for(local_path), &content);

        let url = format!("{}/files", self.upload_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .query(&[("uploadType", "multipart"), ("fields", "id, name, webViewLink")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| PayslipError::Network(format!("{url}: {e}")))?;

        let created: CreatedFile = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| PayslipError::Network(format!("{url}: invalid response body: {e}")))?;

        debug!(id = %created.id, "upload complete");
        Ok(RemoteFile {
            id: created.id,
            name: created.name,
            link: created.web_view_link,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_base(base: &str, field: &str) -> Result<String> {
    let parsed = Url::parse(base)
        .map_err(|e| PayslipError::config(format!("invalid drive.{field} '{base}': {e}")))?;
    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(PayslipError::config(format!(
            "drive.{field} must be an http(s) URL, got '{base}'"
        )));
    }
    Ok(base.trim_end_matches('/').to_string())
}

/// Drive ids are URL-safe base64-ish; anything else would break the `q` query.
fn validate_id(id: &str) -> Result<&str> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(id)
    } else {
        Err(PayslipError::validation(format!("invalid Drive id '{id}'")))
    }
}

/// Turn a non-2xx response into [`PayslipError::Remote`], keeping Drive's message.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| default_reason(status));
    Err(PayslipError::remote(status.as_u16(), message))
}

fn default_reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_string()
}

/// Copy the response body into `partial`, reporting progress per chunk.
async fn stream_to_file(
    response: &mut Response,
    partial: &Path,
    total: Option<u64>,
    on_chunk: ChunkProgress<'_>,
    url: &str,
) -> Result<u64> {
    let mut file = tokio::fs::File::create(partial)
        .await
        .map_err(|e| PayslipError::io(partial, e))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| PayslipError::Network(format!("{url}: body read failed: {e}")))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| PayslipError::io(partial, e))?;
        written += chunk.len() as u64;
        on_chunk(written, total);
    }

    file.flush().await.map_err(|e| PayslipError::io(partial, e))?;
    Ok(written)
}

fn partial_path(dest: &Path) -> std::path::PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Build a `multipart/related` body: JSON metadata part, then the media part.
fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    media_type: &str,
    content: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {media_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
