//! Cloudinary upload API backend.
//!
//! Requests are signed with SHA-256 over the sorted parameters followed by the
//! API secret, so the Cloudinary product environment must be set to SHA-256
//! signatures.

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::instrument;

use super::{ImageStorage, StorageError, StoredImage, UploadFile};
use crate::config::CloudinaryConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const MAX_STEM_LEN: usize = 60;

/// Cloudinary-backed [`ImageStorage`].
pub struct CloudinaryStorage {
    http: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    folder: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryStorage {
    #[must_use]
    pub fn new(http: reqwest::Client, config: &CloudinaryConfig) -> Self {
        Self {
            http,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{API_BASE}/{}/image/{action}", self.cloud_name)
    }

    async fn rejected(response: reqwest::Response) -> StorageError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map_or(text, |e| e.error.message);
        StorageError::Rejected(format!("{status}: {message}"))
    }
}

/// Hex SHA-256 of `k=v` pairs sorted by key and joined by `&`, followed by the secret.
fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_unstable();
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Public id for a new asset: millisecond timestamp plus a sanitized file stem.
fn public_id_for(file_name: &str, millis: i64) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem);
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();
    let stem = stem.trim_matches('_');

    if stem.is_empty() {
        format!("{millis}-image")
    } else {
        format!("{millis}-{stem}")
    }
}

/// Multipart part for an upload. The content type comes from the shopper's
/// browser; one that does not parse is dropped and Cloudinary sniffs the bytes.
fn file_part(file: &UploadFile) -> Part {
    let part = || Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
    match file.content_type.as_deref() {
        Some(content_type) => part().mime_str(content_type).unwrap_or_else(|_| {
            tracing::debug!(content_type, "Ignoring unparseable file content type");
            part()
        }),
        None => part(),
    }
}

#[async_trait::async_trait]
impl ImageStorage for CloudinaryStorage {
    #[instrument(skip(self, file), fields(file = %file.file_name, bytes = file.bytes.len()))]
    async fn upload(&self, file: &UploadFile) -> Result<StoredImage, StorageError> {
        let now = Utc::now();
        let public_id = public_id_for(&file.file_name, now.timestamp_millis());
        let timestamp = now.timestamp().to_string();
        let signature = sign_params(
            &[
                ("folder", self.folder.as_str()),
                ("public_id", public_id.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            self.api_secret.expose_secret(),
        );

        let form = Form::new()
            .part("file", file_part(file))
            .text("folder", self.folder.clone())
            .text("public_id", public_id)
            .text("timestamp", timestamp)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);

        let response = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body: UploadResponse = serde_json::from_str(&response.text().await?)?;
        tracing::debug!(public_id = %body.public_id, "Image stored");

        Ok(StoredImage {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, public_id: &str) -> Result<(), StorageError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            self.api_secret.expose_secret(),
        );

        let params = [
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.api_key.as_str()),
            ("signature", signature.as_str()),
        ];

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let body: DestroyResponse = serde_json::from_str(&response.text().await?)?;
        if body.result != "ok" && body.result != "not found" {
            return Err(StorageError::Rejected(body.result));
        }

        Ok(())
    }
}
