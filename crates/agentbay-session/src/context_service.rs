//! Persistent context management.

use std::sync::Arc;

use agentbay_core::{AgentBayError, Context, Result};
use agentbay_transport::{ApiResponse, HttpTransport};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Page size used when none is requested.
pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Paging for `ContextService::list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextListParams {
    pub max_results: Option<u32>,
    pub next_token: Option<String>,
}

/// One page of contexts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextListResult {
    pub request_id: String,
    pub contexts: Vec<Context>,
    /// Token for the next page; `None` on the last page.
    pub next_token: Option<String>,
    pub max_results: u32,
    pub total_count: u64,
}

/// A fetched or created context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextResult {
    pub request_id: String,
    pub context: Context,
}

/// A presigned URL for one context file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileUrlResult {
    pub request_id: String,
    pub url: String,
    /// Expiry as a Unix timestamp in seconds.
    pub expire_time: Option<i64>,
}

/// A file stored in a context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContextFileEntry {
    pub file_id: String,
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub gmt_create: String,
    pub gmt_modified: String,
    pub size: u64,
    pub status: String,
}

/// Files stored under one folder of a context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextFileListResult {
    pub request_id: String,
    pub entries: Vec<ContextFileEntry>,
    pub count: Option<u64>,
}

/// Context as returned by the service.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ContextData {
    id: String,
    name: String,
    state: String,
    create_time: Option<String>,
    last_used_time: Option<String>,
    os_type: Option<String>,
}

impl From<ContextData> for Context {
    fn from(data: ContextData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            state: data.state,
            created_at: data.create_time,
            last_used_at: data.last_used_time,
            os_type: data.os_type,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FileUrlData {
    url: String,
    expire_time: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListContextsBody<'a> {
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetContextBody<'a> {
    name: &'a str,
    allow_create: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ModifyContextBody<'a> {
    id: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteContextBody<'a> {
    id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ContextFileBody<'a> {
    context_id: &'a str,
    file_path: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeContextFilesBody<'a> {
    context_id: &'a str,
    parent_folder_path: &'a str,
    page_number: u32,
    page_size: u32,
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AgentBayError::InvalidArgument(format!("{what} cannot be empty")));
    }
    Ok(())
}

/// Context CRUD and file URLs.
///
/// Nothing is cached; every call goes to the service.
#[derive(Debug, Clone)]
pub struct ContextService {
    transport: Arc<HttpTransport>,
}

impl ContextService {
    #[must_use]
    pub const fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// # Errors
    /// Returns error if the call fails or the page cannot be decoded.
    #[instrument(skip(self))]
    pub async fn list(&self, params: &ContextListParams) -> Result<ContextListResult> {
        let max_results = params.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let response = self
            .transport
            .call_action("ListContexts", &ListContextsBody {
                max_results,
                next_token: params.next_token.as_deref(),
            })
            .await?;

        let contexts: Vec<ContextData> = if response.data.is_null() {
            Vec::new()
        } else {
            response.data_as("context list")?
        };
        debug!(count = contexts.len(), "contexts listed");

        Ok(ContextListResult {
            next_token: response.extra_str("NextToken"),
            max_results: response
                .extra_u64("MaxResults")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(max_results),
            total_count: response.extra_u64("TotalCount").unwrap_or_default(),
            contexts: contexts.into_iter().map(Context::from).collect(),
            request_id: response.request_id,
        })
    }

    /// Fetch a context by name, creating it when `create` is set.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an empty name, or error if the call fails
    /// or the context does not exist.
    #[instrument(skip(self))]
    pub async fn get(&self, name: &str, create: bool) -> Result<ContextResult> {
        require(name, "context name")?;
        let response = self
            .transport
            .call_action("GetContext", &GetContextBody {
                name,
                allow_create: create,
            })
            .await?;

        let data: ContextData = response.data_as("context")?;
        if data.id.is_empty() {
            return Err(AgentBayError::decode("context", &"Id missing from response data"));
        }
        let mut context = Context::from(data);
        if context.name.is_empty() {
            name.clone_into(&mut context.name);
        }
        Ok(ContextResult {
            request_id: response.request_id,
            context,
        })
    }

    /// # Errors
    /// Returns error if the call fails.
    pub async fn create(&self, name: &str) -> Result<ContextResult> {
        self.get(name, true).await
    }

    /// Rename a context.
    ///
    /// # Errors
    /// Returns error if the call fails.
    #[instrument(skip(self, context), fields(context_id = %context.id))]
    pub async fn update(&self, context: &Context) -> Result<String> {
        require(&context.id, "context id")?;
        let response = self
            .transport
            .call_action("ModifyContext", &ModifyContextBody {
                id: &context.id,
                name: &context.name,
            })
            .await?;
        Ok(response.request_id)
    }

    /// # Errors
    /// Returns error if the call fails.
    #[instrument(skip(self, context), fields(context_id = %context.id))]
    pub async fn delete(&self, context: &Context) -> Result<String> {
        require(&context.id, "context id")?;
        let response = self
            .transport
            .call_action("DeleteContext", &DeleteContextBody { id: &context.id })
            .await?;
        info!(request_id = %response.request_id, "context deleted");
        Ok(response.request_id)
    }

    /// Presigned download URL for a context file.
    ///
    /// # Errors
    /// Returns error if the call fails or no URL is returned.
    #[instrument(skip(self))]
    pub async fn get_file_download_url(&self, context_id: &str, file_path: &str) -> Result<FileUrlResult> {
        self.file_url("GetContextFileDownloadUrl", context_id, file_path)
            .await
    }

    /// Presigned upload URL for a context file.
    ///
    /// # Errors
    /// Returns error if the call fails or no URL is returned.
    #[instrument(skip(self))]
    pub async fn get_file_upload_url(&self, context_id: &str, file_path: &str) -> Result<FileUrlResult> {
        self.file_url("GetContextFileUploadUrl", context_id, file_path)
            .await
    }

    async fn file_url(&self, action: &str, context_id: &str, file_path: &str) -> Result<FileUrlResult> {
        require(context_id, "context id")?;
        require(file_path, "file path")?;
        let response = self
            .transport
            .call_action(action, &ContextFileBody {
                context_id,
                file_path,
            })
            .await?;

        let data: FileUrlData = response.data_as("file URL")?;
        if data.url.is_empty() {
            return Err(AgentBayError::decode("file URL", &"Url missing from response data"));
        }
        Ok(FileUrlResult {
            request_id: response.request_id,
            url: data.url,
            expire_time: data.expire_time,
        })
    }

    /// List files under a folder of a context.
    ///
    /// # Errors
    /// Returns error if the call fails or the listing cannot be decoded.
    #[instrument(skip(self))]
    pub async fn list_files(
        &self,
        context_id: &str,
        parent_folder_path: &str,
        page_number: u32,
        page_size: u32,
    ) -> Result<ContextFileListResult> {
        require(context_id, "context id")?;
        let response = self
            .transport
            .call_action("DescribeContextFiles", &DescribeContextFilesBody {
                context_id,
                parent_folder_path,
                page_number,
                page_size,
            })
            .await?;

        let entries = file_entries(&response)?;
        Ok(ContextFileListResult {
            count: response.extra_u64("Count"),
            request_id: response.request_id,
            entries,
        })
    }

    /// # Errors
    /// Returns error if the call fails.
    #[instrument(skip(self))]
    pub async fn delete_file(&self, context_id: &str, file_path: &str) -> Result<String> {
        require(context_id, "context id")?;
        require(file_path, "file path")?;
        let response = self
            .transport
            .call_action("DeleteContextFile", &ContextFileBody {
                context_id,
                file_path,
            })
            .await?;
        Ok(response.request_id)
    }
}

fn file_entries(response: &ApiResponse) -> Result<Vec<ContextFileEntry>> {
    if response.data.is_null() {
        return Ok(Vec::new());
    }
    response.data_as("context files")
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::session::test_support::transport;

    #[tokio::test]
    async fn test_list_reads_pagination() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ListContexts")
            .match_body(Matcher::Json(json!({"MaxResults": 10})))
            .with_status(200)
            .with_body(
                r#"{"RequestId":"r-l","Success":true,"NextToken":"t-2","MaxResults":10,"TotalCount":11,
                "Data":[{"Id":"ctx-1","Name":"profile","State":"available","CreateTime":"2025-01-01T00:00:00Z","OsType":"linux"}]}"#,
            )
            .create_async()
            .await;

        let result = ContextService::new(transport(&server))
            .list(&ContextListParams::default())
            .await
            .unwrap();

        assert_eq!(result.contexts[0].id, "ctx-1");
        assert_eq!(result.contexts[0].created_at.as_deref(), Some("2025-01-01T00:00:00Z"));
        assert_eq!(result.next_token.as_deref(), Some("t-2"));
        assert_eq!(result.total_count, 11);
    }

    #[tokio::test]
    async fn test_create_is_get_with_allow_create() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/GetContext")
            .match_body(Matcher::Json(json!({"Name": "profile", "AllowCreate": true})))
            .with_status(200)
            .with_body(r#"{"RequestId":"r-g","Success":true,"Data":{"Id":"ctx-9","State":"available"}}"#)
            .create_async()
            .await;

        let result = ContextService::new(transport(&server))
            .create("profile")
            .await
            .unwrap();

        assert_eq!(result.context.id, "ctx-9");
        assert_eq!(result.context.name, "profile");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_missing_context_is_remote_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/GetContext")
            .with_status(200)
            .with_body(r#"{"RequestId":"r-g","Success":false,"Code":"InvalidContext.NotFound"}"#)
            .create_async()
            .await;

        let err = ContextService::new(transport(&server))
            .get("missing", false)
            .await
            .unwrap_err();
        assert!(err.is_remote());
        assert_eq!(err.to_string(), "InvalidContext.NotFound");
    }

    #[tokio::test]
    async fn test_update_and_delete_bodies() {
        let mut server = mockito::Server::new_async().await;
        let modify = server
            .mock("POST", "/ModifyContext")
            .match_body(Matcher::Json(json!({"Id": "ctx-1", "Name": "renamed"})))
            .with_status(200)
            .with_body(r#"{"RequestId":"r-m","Success":true}"#)
            .create_async()
            .await;
        let delete = server
            .mock("POST", "/DeleteContext")
            .match_body(Matcher::Json(json!({"Id": "ctx-1"})))
            .with_status(200)
            .with_body(r#"{"RequestId":"r-d","Success":true}"#)
            .create_async()
            .await;

        let service = ContextService::new(transport(&server));
        let context = Context::new("ctx-1", "renamed");
        assert_eq!(service.update(&context).await.unwrap(), "r-m");
        assert_eq!(service.delete(&context).await.unwrap(), "r-d");
        modify.assert_async().await;
        delete.assert_async().await;

        assert!(service.delete(&Context::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_file_urls() {
        let mut server = mockito::Server::new_async().await;
        let _upload = server
            .mock("POST", "/GetContextFileUploadUrl")
            .match_body(Matcher::Json(json!({"ContextId": "ctx-1", "FilePath": "/a.txt"})))
            .with_status(200)
            .with_body(r#"{"RequestId":"r-u","Success":true,"Data":{"Url":"https://oss/put","ExpireTime":1700000000}}"#)
            .create_async()
            .await;
        let _download = server
            .mock("POST", "/GetContextFileDownloadUrl")
            .with_status(200)
            .with_body(r#"{"RequestId":"r-dl","Success":true,"Data":{}}"#)
            .create_async()
            .await;

        let service = ContextService::new(transport(&server));
        let upload = service.get_file_upload_url("ctx-1", "/a.txt").await.unwrap();
        assert_eq!(upload.url, "https://oss/put");
        assert_eq!(upload.expire_time, Some(1_700_000_000));

        let err = service
            .get_file_download_url("ctx-1", "/a.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentBayError::Decode { .. }));
        assert!(service.get_file_upload_url("ctx-1", "").await.is_err());
    }

    #[tokio::test]
    async fn test_list_and_delete_files() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("POST", "/DescribeContextFiles")
            .match_body(Matcher::Json(json!({
                "ContextId": "ctx-1",
                "ParentFolderPath": "/docs",
                "PageNumber": 1,
                "PageSize": 50
            })))
            .with_status(200)
            .with_body(
                r#"{"RequestId":"r-f","Success":true,"Count":1,
                "Data":[{"FileId":"f-1","FileName":"a.txt","FilePath":"/docs/a.txt","FileType":"file","Size":12,"Status":"ok"}]}"#,
            )
            .create_async()
            .await;
        let _delete = server
            .mock("POST", "/DeleteContextFile")
            .match_body(Matcher::Json(json!({"ContextId": "ctx-1", "FilePath": "/docs/a.txt"})))
            .with_status(200)
            .with_body(r#"{"RequestId":"r-x","Success":true}"#)
            .create_async()
            .await;

        let service = ContextService::new(transport(&server));
        let files = service.list_files("ctx-1", "/docs", 1, 50).await.unwrap();
        assert_eq!(files.count, Some(1));
        assert_eq!(files.entries[0].file_path, "/docs/a.txt");
        assert_eq!(files.entries[0].size, 12);

        let request_id = service.delete_file("ctx-1", "/docs/a.txt").await.unwrap();
        assert_eq!(request_id, "r-x");
    }
}
