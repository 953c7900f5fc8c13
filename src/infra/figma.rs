//! Figma image export client.
//!
//! One operation: render the frame a reference URL points at to a PNG on
//! disk. The images endpoint returns a map from node id to a short-lived
//! image URL; a null entry means the frame no longer exists, which is the
//! most common way a reference rots.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::domain::record::{ExportError, ImageExporter};

const TOKEN_HEADER: &str = "X-Figma-Token";

/// A parsed design reference: the file and the frame within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReference {
    file_key: String,
    node_id: String,
}

impl FrameReference {
    /// Parse a reference URL of the form
    /// `https://www.figma.com/{file|proto|design}/<key>/…?node-id=<id>`.
    pub fn parse(reference: &str) -> Result<Self, ExportError> {
        let url = Url::parse(reference)
            .map_err(|err| ExportError::Reference(format!("`{reference}`: {err}")))?;

        let host_ok = url
            .host_str()
            .is_some_and(|host| host == "figma.com" || host.ends_with(".figma.com"));
        if !host_ok {
            return Err(ExportError::Reference(format!(
                "`{reference}` is not a Figma URL"
            )));
        }

        let mut segments = url
            .path_segments()
            .ok_or_else(|| ExportError::Reference(format!("`{reference}` has no path")))?;
        let kind = segments.next().unwrap_or_default();
        if !matches!(kind, "file" | "proto" | "design") {
            return Err(ExportError::Reference(format!(
                "`{reference}` does not address a design file"
            )));
        }
        let file_key = segments
            .next()
            .filter(|key| !key.is_empty() && key.chars().all(char::is_alphanumeric))
            .ok_or_else(|| {
                ExportError::Reference(format!("could not extract file key from `{reference}`"))
            })?
            .to_string();

        let node_id = url
            .query_pairs()
            .find(|(name, _)| name == "node-id")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ExportError::Reference(format!("could not extract node-id from `{reference}`"))
            })?;

        Ok(Self { file_key, node_id })
    }

    pub fn file_key(&self) -> &str {
        &self.file_key
    }

    /// Node id as passed in the `ids` query parameter.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// The images endpoint keys its response map with the colon form of the
    /// node id, regardless of the form the reference URL carried.
    pub fn response_key(&self) -> String {
        self.node_id.replace('-', ":")
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    images: HashMap<String, Option<String>>,
}

/// Client for the Figma REST images endpoint.
#[derive(Debug, Clone)]
pub struct FigmaClient {
    http: Client,
    api_base: Url,
    token: String,
    scale: u8,
}

impl FigmaClient {
    pub fn new(api_base: &str, token: String, scale: u8) -> Result<Self, ExportError> {
        let api_base = Url::parse(api_base)
            .and_then(|url| url.join("/"))
            .map_err(|err| ExportError::Service(format!("invalid api base url: {err}")))?;
        let http = Client::builder()
            .user_agent(user_agent())
            .build()
            .map_err(|err| ExportError::Service(err.to_string()))?;
        Ok(Self {
            http,
            api_base,
            token,
            scale,
        })
    }

    async fn image_url(&self, frame: &FrameReference) -> Result<String, ExportError> {
        let endpoint = self
            .api_base
            .join(&format!("v1/images/{}", frame.file_key()))
            .map_err(|err| ExportError::Service(err.to_string()))?;

        let response = self
            .http
            .get(endpoint)
            .header(TOKEN_HEADER, &self.token)
            .query(&[
                ("ids", frame.node_id()),
                ("format", "png"),
                ("scale", &self.scale.to_string()),
            ])
            .send()
            .await
            .map_err(|err| ExportError::Service(err.to_string()))?;

        if response.status() == StatusCode::FORBIDDEN {
            return Err(ExportError::Service(
                "export service returned 403: the token is expired or has no access to the file"
                    .to_string(),
            ));
        }
        let response = response
            .error_for_status()
            .map_err(|err| ExportError::Service(err.to_string()))?;

        let body: ImagesResponse = response
            .json()
            .await
            .map_err(|err| ExportError::Service(format!("failed to parse images response: {err}")))?;

        body.images
            .get(&frame.response_key())
            .and_then(Option::as_deref)
            .filter(|image_url| !image_url.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ExportError::Service(format!(
                    "no image url for node `{}`: the link no longer resolves",
                    frame.node_id()
                ))
            })
    }
}

#[async_trait]
impl ImageExporter for FigmaClient {
    async fn export_png(&self, reference: &str, dest: &Path) -> Result<(), ExportError> {
        let frame = FrameReference::parse(reference)?;
        let image_url = self.image_url(&frame).await?;

        let image = self
            .http
            .get(&image_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| ExportError::Service(format!("image download failed: {err}")))?
            .bytes()
            .await
            .map_err(|err| ExportError::Service(format!("image download failed: {err}")))?;

        tokio::fs::write(dest, &image).await?;
        Ok(())
    }
}

pub fn user_agent() -> &'static str {
    concat!("vetrina/", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::FrameReference;

    #[test]
    fn parses_design_file_and_proto_references() {
        for kind in ["design", "file", "proto"] {
            let reference =
                format!("https://www.figma.com/{kind}/a1B2c3/Checkout?node-id=12-34&t=xyz");
            let frame = FrameReference::parse(&reference).expect("parseable");
            assert_eq!(frame.file_key(), "a1B2c3");
            assert_eq!(frame.node_id(), "12-34");
            assert_eq!(frame.response_key(), "12:34");
        }
    }

    #[test]
    fn keeps_colon_node_ids_as_is() {
        let frame =
            FrameReference::parse("https://figma.com/design/abc/View?node-id=5:9").expect("parse");
        assert_eq!(frame.node_id(), "5:9");
        assert_eq!(frame.response_key(), "5:9");
    }

    #[test]
    fn rejects_references_without_a_frame() {
        assert!(FrameReference::parse("https://www.figma.com/design/abc/View").is_err());
        assert!(FrameReference::parse("https://www.figma.com/files/recent?node-id=1-2").is_err());
        assert!(FrameReference::parse("https://example.com/design/abc?node-id=1-2").is_err());
        assert!(FrameReference::parse("not a url").is_err());
    }
}
