//! Object storage (OSS) transfer.

use agentbay_core::{Result, ToolCaller, ToolRequest, invoke};
use serde::Serialize;

/// `oss_env_init` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct OssEnvInitRequest<'a> {
    /// STS credentials the session uses for later transfers.
    pub access_key_id: &'a str,
    pub access_key_secret: &'a str,
    pub security_token: &'a str,
    /// OSS endpoint; the image default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<&'a str>,
    /// OSS region; the image default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<&'a str>,
}

impl ToolRequest for OssEnvInitRequest<'_> {
    const NAME: &'static str = "oss_env_init";
}

/// A bucket object and the session file it is transferred to or from.
#[derive(Debug, Clone, Serialize)]
pub struct OssObjectRequest<'a> {
    pub bucket: &'a str,
    /// Object key inside the bucket.
    pub object: &'a str,
    /// File path inside the session.
    pub path: &'a str,
}

/// `oss_upload` arguments.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct OssUploadRequest<'a>(pub OssObjectRequest<'a>);

impl ToolRequest for OssUploadRequest<'_> {
    const NAME: &'static str = "oss_upload";
}

/// `oss_download` arguments.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct OssDownloadRequest<'a>(pub OssObjectRequest<'a>);

impl ToolRequest for OssDownloadRequest<'_> {
    const NAME: &'static str = "oss_download";
}

/// A presigned or public URL and the session file it is transferred to or from.
#[derive(Debug, Clone, Serialize)]
pub struct OssUrlRequest<'a> {
    pub url: &'a str,
    pub path: &'a str,
}

/// `oss_upload_annon` arguments.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct OssUploadAnonymousRequest<'a>(pub OssUrlRequest<'a>);

impl ToolRequest for OssUploadAnonymousRequest<'_> {
    const NAME: &'static str = "oss_upload_annon";
}

/// `oss_download_annon` arguments.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct OssDownloadAnonymousRequest<'a>(pub OssUrlRequest<'a>);

impl ToolRequest for OssDownloadAnonymousRequest<'_> {
    const NAME: &'static str = "oss_download_annon";
}

/// Output of an OSS operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OssResult {
    pub request_id: String,
    pub content: String,
}

/// OSS transfer between a session and object storage.
pub struct Oss<'a, C: ?Sized> {
    caller: &'a C,
}

impl<'a, C: ToolCaller + ?Sized> Oss<'a, C> {
    #[must_use]
    pub const fn new(caller: &'a C) -> Self {
        Self { caller }
    }

    /// Initialize OSS credentials inside the session.
    ///
    /// # Errors
    /// Returns error if the call fails or the credentials are rejected.
    pub async fn env_init(
        &self,
        access_key_id: &str,
        access_key_secret: &str,
        security_token: &str,
        endpoint: Option<&str>,
        region: Option<&str>,
    ) -> Result<OssResult> {
        self.send(&OssEnvInitRequest {
            access_key_id,
            access_key_secret,
            security_token,
            endpoint,
            region,
        })
        .await
    }

    /// Upload a session file to `bucket/object`.
    ///
    /// # Errors
    /// Returns error if the call fails or the upload fails remotely.
    pub async fn upload(&self, bucket: &str, object: &str, path: &str) -> Result<OssResult> {
        self.send(&OssUploadRequest(OssObjectRequest {
            bucket,
            object,
            path,
        }))
        .await
    }

    /// Upload a session file to a presigned URL.
    ///
    /// # Errors
    /// Returns error if the call fails or the upload fails remotely.
    pub async fn upload_anonymous(&self, url: &str, path: &str) -> Result<OssResult> {
        self.send(&OssUploadAnonymousRequest(OssUrlRequest { url, path }))
            .await
    }

    /// Download `bucket/object` into the session.
    ///
    /// # Errors
    /// Returns error if the call fails or the download fails remotely.
    pub async fn download(&self, bucket: &str, object: &str, path: &str) -> Result<OssResult> {
        self.send(&OssDownloadRequest(OssObjectRequest {
            bucket,
            object,
            path,
        }))
        .await
    }

    /// Download a URL into the session.
    ///
    /// # Errors
    /// Returns error if the call fails or the download fails remotely.
    pub async fn download_anonymous(&self, url: &str, path: &str) -> Result<OssResult> {
        self.send(&OssDownloadAnonymousRequest(OssUrlRequest { url, path }))
            .await
    }

    async fn send<R: ToolRequest>(&self, request: &R) -> Result<OssResult> {
        let output = invoke(self.caller, request).await?;
        Ok(OssResult {
            request_id: output.request_id,
            content: output.data,
        })
    }
}
