//! # Cloudinary media storage
//!
//! Signed uploads to Cloudinary's REST API. Requests are signed with the
//! SHA-256 of the sorted parameter string followed by the API secret.

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::Utc;
use domains::models::{ImageAsset, Upload};
use domains::ports::MediaStorage;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, instrument};

use super::extension_for;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Clone)]
pub struct CloudinaryMediaStorage {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryMediaStorage {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<SecretString>,
    ) -> Self {
        Self {
            client: Client::new(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{API_BASE}/{}/image/{action}", self.cloud_name)
    }

    /// Adds `api_key`, `timestamp` and `signature` to the signed `params`.
    fn signed_form(&self, params: &[(&str, String)]) -> Form {
        let timestamp = Utc::now().timestamp().to_string();

        let mut signed: Vec<(&str, String)> = params.to_vec();
        signed.push(("timestamp", timestamp.clone()));
        let signature = sign(&signed, &self.api_secret);

        let mut form = Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key.to_string(), value.clone());
        }
        form
    }

    async fn post<T: for<'de> Deserialize<'de>>(&self, action: &str, form: Form) -> anyhow::Result<T> {
        let response = self
            .client
            .post(self.endpoint(action))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("cloudinary {action} request failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, action, "cloudinary returned an error");
            bail!("cloudinary {action} failed with status {status}");
        }

        response
            .json()
            .await
            .with_context(|| format!("parsing cloudinary {action} response"))
    }
}

/// Cloudinary request signature: `k1=v1&k2=v2…` sorted by key, secret appended, hashed.
pub fn sign(params: &[(&str, String)], api_secret: &SecretString) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{joined}{}", api_secret.expose_secret()).as_bytes()))
}

#[async_trait]
impl MediaStorage for CloudinaryMediaStorage {
    #[instrument(skip(self, upload), fields(size = upload.bytes.len()))]
    async fn upload(&self, upload: Upload) -> anyhow::Result<ImageAsset> {
        let file_name = upload
            .file_name
            .clone()
            .unwrap_or_else(|| format!("upload.{}", extension_for(&upload.bytes)));
        let content_type = upload
            .content_type
            .as_ref()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(file_name)
            .mime_str(&content_type)
            .context("invalid upload content type")?;

        let form = self.signed_form(&[]).part("file", part);
        let body: UploadResponse = self.post("upload", form).await?;

        debug!(public_id = %body.public_id, "uploaded image to cloudinary");
        Ok(ImageAsset {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, public_id: &str) -> anyhow::Result<()> {
        let form = self.signed_form(&[("public_id", public_id.to_string())]);
        let body: DestroyResponse = self.post("destroy", form).await?;

        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => bail!("cloudinary refused to destroy {public_id}: {other}"),
        }
    }
}
