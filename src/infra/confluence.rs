//! Confluence REST client.
//!
//! Pages are addressed by their browser URL; the numeric content id is the
//! path segment after `/pages/`. Body updates are idempotent: the current
//! storage body is fetched first and the PUT is skipped when the new body
//! is structurally identical, so re-running a sync against unchanged
//! designs writes nothing and bumps no versions.

use std::path::Path;

use reqwest::{Client, StatusCode, Url, multipart};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use super::figma::user_agent;

const FULL_WIDTH_PROPERTY: &str = "content-appearance-published";
const FULL_WIDTH_VALUE: &str = "full-width";

#[derive(Debug, Error)]
pub enum WikiError {
    #[error("page id could not be derived from `{url}`")]
    PageUrl { url: String },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error: {0}")]
    Server(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A page as fetched from the wiki: identity, version, and storage body.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub version: Version,
    #[serde(default)]
    pub body: Option<PageBody>,
}

impl Page {
    fn storage_value(&self) -> &str {
        self.body
            .as_ref()
            .map(|body| body.storage.value.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Version {
    pub number: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageBody {
    pub storage: StorageBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageBody {
    pub value: String,
}

/// Outcome of an idempotent body update.
#[derive(Debug, Clone)]
pub struct PageUpdate {
    pub title: String,
    pub updated: bool,
}

#[derive(Debug, Deserialize)]
struct ContentList {
    #[serde(default)]
    results: Vec<ContentRef>,
}

#[derive(Debug, Deserialize)]
struct ContentRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PropertyValue {
    value: serde_json::Value,
    version: Version,
}

/// Client for the Confluence content REST API, authenticated with HTTP
/// basic credentials (username + API token).
#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    http: Client,
    base: Url,
    username: String,
    token: String,
}

impl ConfluenceClient {
    pub fn new(base: &str, username: String, token: String) -> Result<Self, WikiError> {
        let base = Url::parse(base)?.join("/")?;
        let http = Client::builder().user_agent(user_agent()).build()?;
        Ok(Self {
            http,
            base,
            username,
            token,
        })
    }

    /// Extract the numeric content id from a page's browser URL.
    pub fn page_id_from_url(page_url: &str) -> Result<&str, WikiError> {
        page_url
            .split_once("/pages/")
            .map(|(_, rest)| rest.split('/').next().unwrap_or(rest))
            .filter(|id| !id.is_empty() && id.chars().all(|ch| ch.is_ascii_digit()))
            .ok_or_else(|| WikiError::PageUrl {
                url: page_url.to_string(),
            })
    }

    fn content_url(&self, tail: &str) -> Result<Url, WikiError> {
        Ok(self.base.join(&format!("rest/api/content/{tail}"))?)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, WikiError> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.token))
            .query(query)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            return Err(WikiError::Server(format!("status {status} body {text}")));
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| WikiError::Server(format!("failed to parse body: {err}")))
    }

    /// Fetch a page's title, version, and storage body by its URL.
    pub async fn fetch_page(&self, page_url: &str) -> Result<Page, WikiError> {
        let page_id = Self::page_id_from_url(page_url)?;
        let url = self.content_url(page_id)?;
        self.get_json(url, &[("expand", "body.storage,version")]).await
    }

    /// Fetch only the page title; used when page updates are skipped but
    /// the summary still needs something to link to.
    pub async fn page_title(&self, page_url: &str) -> Result<String, WikiError> {
        Ok(self.fetch_page(page_url).await?.title)
    }

    /// Replace a page's storage body, skipping the write when the new body
    /// is structurally identical to the current one. On an actual write the
    /// version auto-increments and the full-width appearance property is
    /// set afterwards.
    pub async fn update_page_body(
        &self,
        page_url: &str,
        new_body: &str,
    ) -> Result<PageUpdate, WikiError> {
        let page = self.fetch_page(page_url).await?;

        if bodies_equivalent(page.storage_value(), new_body) {
            info!(
                target: "vetrina::wiki",
                page = %page.id,
                title = %page.title,
                "page body unchanged, skipping write"
            );
            return Ok(PageUpdate {
                title: page.title,
                updated: false,
            });
        }

        let url = self.content_url(&page.id)?;
        let payload = json!({
            "id": page.id,
            "type": "page",
            "title": page.title,
            "body": {
                "storage": {
                    "value": new_body,
                    "representation": "storage"
                }
            },
            "version": { "number": page.version.number + 1 }
        });

        let response = self
            .http
            .put(url)
            .basic_auth(&self.username, Some(&self.token))
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WikiError::Server(format!("status {status} body {text}")));
        }

        self.set_full_width(&page.id).await?;

        info!(
            target: "vetrina::wiki",
            page = %page.id,
            title = %page.title,
            version = page.version.number + 1,
            "page body updated"
        );
        Ok(PageUpdate {
            title: page.title,
            updated: true,
        })
    }

    /// Upsert the published-appearance property so the page renders at
    /// full width.
    async fn set_full_width(&self, page_id: &str) -> Result<(), WikiError> {
        let url = self.content_url(&format!("{page_id}/property/{FULL_WIDTH_PROPERTY}"))?;

        let current = self
            .http
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .await?;

        match current.status() {
            StatusCode::NOT_FOUND => {
                let create_url = self.content_url(&format!("{page_id}/property"))?;
                let payload = json!({
                    "key": FULL_WIDTH_PROPERTY,
                    "value": FULL_WIDTH_VALUE,
                });
                let response = self
                    .http
                    .post(create_url)
                    .basic_auth(&self.username, Some(&self.token))
                    .json(&payload)
                    .send()
                    .await?;
                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(WikiError::Server(format!("status {status} body {text}")));
                }
            }
            status if status.is_success() => {
                let bytes = current.bytes().await?;
                let property: PropertyValue = serde_json::from_slice(&bytes)
                    .map_err(|err| WikiError::Server(format!("failed to parse body: {err}")))?;
                if property.value == json!(FULL_WIDTH_VALUE) {
                    return Ok(());
                }
                let payload = json!({
                    "key": FULL_WIDTH_PROPERTY,
                    "value": FULL_WIDTH_VALUE,
                    "version": { "number": property.version.number + 1 }
                });
                let response = self
                    .http
                    .put(url)
                    .basic_auth(&self.username, Some(&self.token))
                    .json(&payload)
                    .send()
                    .await?;
                if !response.status().is_success() {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    return Err(WikiError::Server(format!("status {status} body {text}")));
                }
            }
            status => {
                let text = current.text().await.unwrap_or_default();
                return Err(WikiError::Server(format!("status {status} body {text}")));
            }
        }
        Ok(())
    }

    /// Upload a file as a page attachment, replacing any existing
    /// attachment with the same name.
    pub async fn upload_attachment(&self, page_url: &str, file: &Path) -> Result<(), WikiError> {
        let page_id = Self::page_id_from_url(page_url)?;
        let filename = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| WikiError::Server(format!("`{}` has no file name", file.display())))?;

        let list_url = self.content_url(&format!("{page_id}/child/attachment"))?;
        let existing: ContentList = self
            .get_json(list_url.clone(), &[("filename", filename.as_str())])
            .await?;
        for attachment in &existing.results {
            debug!(
                target: "vetrina::wiki",
                page = page_id,
                attachment = %attachment.id,
                filename = %filename,
                "replacing existing attachment"
            );
            self.delete_content(&attachment.id, "current").await?;
            self.delete_content(&attachment.id, "trashed").await?;
        }

        let bytes = tokio::fs::read(file).await?;
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str("image/png")?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("minorEdit", "true");

        let response = self
            .http
            .post(list_url)
            .basic_auth(&self.username, Some(&self.token))
            .header("X-Atlassian-Token", "no-check")
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WikiError::Server(format!("status {status} body {text}")));
        }

        debug!(
            target: "vetrina::wiki",
            page = page_id,
            filename = %filename,
            "attachment uploaded"
        );
        Ok(())
    }

    /// Remove every attachment from a page.
    pub async fn remove_all_attachments(&self, page_url: &str) -> Result<(), WikiError> {
        let page_id = Self::page_id_from_url(page_url)?;
        let list_url = self.content_url(&format!("{page_id}/child/attachment"))?;
        let attachments: ContentList = self.get_json(list_url, &[("limit", "200")]).await?;

        info!(
            target: "vetrina::wiki",
            page = page_id,
            count = attachments.results.len(),
            "removing existing attachments"
        );
        for attachment in &attachments.results {
            self.delete_content(&attachment.id, "current").await?;
            self.delete_content(&attachment.id, "trashed").await?;
        }
        Ok(())
    }

    async fn delete_content(&self, content_id: &str, status: &str) -> Result<(), WikiError> {
        let url = self.content_url(content_id)?;
        let response = self
            .http
            .delete(url)
            .basic_auth(&self.username, Some(&self.token))
            .query(&[("status", status)])
            .send()
            .await?;
        // deleting the trashed copy of something never trashed 404s
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(WikiError::Server(format!("status {status} body {text}")));
        }
        Ok(())
    }
}

/// Structural body comparison: line endings normalized and trailing
/// whitespace trimmed, so byte-identical bodies always match and cosmetic
/// line-ending drift does not force a version bump.
pub fn bodies_equivalent(current: &str, new: &str) -> bool {
    fn normalized(text: &str) -> String {
        let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }
    normalized(current) == normalized(new)
}
