//! File system operations.

use std::collections::BTreeMap;

use agentbay_core::{AgentBayError, Result, ToolCaller, ToolRequest, invoke};
use serde::Serialize;

/// Default chunk size for large file transfers (60 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 60 * 1024;

/// `create_directory` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct CreateDirectoryRequest<'a> {
    pub path: &'a str,
}

impl ToolRequest for CreateDirectoryRequest<'_> {
    const NAME: &'static str = "create_directory";
}

/// One text replacement for `edit_file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEdit {
    pub old_text: String,
    pub new_text: String,
}

impl FileEdit {
    #[must_use]
    pub fn new(old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            old_text: old_text.into(),
            new_text: new_text.into(),
        }
    }
}

/// `edit_file` arguments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditFileRequest<'a> {
    pub path: &'a str,
    pub edits: &'a [FileEdit],
    pub dry_run: bool,
}

impl ToolRequest for EditFileRequest<'_> {
    const NAME: &'static str = "edit_file";
}

/// `get_file_info` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct GetFileInfoRequest<'a> {
    pub path: &'a str,
}

impl ToolRequest for GetFileInfoRequest<'_> {
    const NAME: &'static str = "get_file_info";
}

/// `list_directory` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct ListDirectoryRequest<'a> {
    pub path: &'a str,
}

impl ToolRequest for ListDirectoryRequest<'_> {
    const NAME: &'static str = "list_directory";
}

/// `move_file` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct MoveFileRequest<'a> {
    pub source: &'a str,
    pub destination: &'a str,
}

impl ToolRequest for MoveFileRequest<'_> {
    const NAME: &'static str = "move_file";
}

const fn is_zero(n: &u64) -> bool {
    *n == 0
}

const fn is_empty_slice(s: &&[String]) -> bool {
    s.is_empty()
}

/// `read_file` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct ReadFileRequest<'a> {
    pub path: &'a str,
    #[serde(skip_serializing_if = "is_zero")]
    pub offset: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub length: u64,
}

impl ToolRequest for ReadFileRequest<'_> {
    const NAME: &'static str = "read_file";
}

/// `read_multiple_files` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct ReadMultipleFilesRequest<'a> {
    pub paths: &'a [String],
}

impl ToolRequest for ReadMultipleFilesRequest<'_> {
    const NAME: &'static str = "read_multiple_files";
}

/// `search_files` arguments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilesRequest<'a> {
    pub path: &'a str,
    pub pattern: &'a str,
    #[serde(skip_serializing_if = "is_empty_slice")]
    pub exclude_patterns: &'a [String],
}

impl ToolRequest for SearchFilesRequest<'_> {
    const NAME: &'static str = "search_files";
}

/// How `write_file` treats existing content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Overwrite,
    Append,
}

/// `write_file` arguments.
#[derive(Debug, Clone, Serialize)]
pub struct WriteFileRequest<'a> {
    pub path: &'a str,
    pub content: &'a str,
    pub mode: WriteMode,
}

impl ToolRequest for WriteFileRequest<'_> {
    const NAME: &'static str = "write_file";
}

/// Result of an operation that only reports success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOperationResult {
    pub request_id: String,
    pub output: String,
}

/// File content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileContentResult {
    pub request_id: String,
    pub content: String,
}

/// File metadata parsed from `key: value` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub is_directory: bool,
    pub modified: String,
    pub mode: String,
    /// Keys the parser does not map to a field.
    pub extra: BTreeMap<String, String>,
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_directory: bool,
}

/// Parse `get_file_info` output.
#[must_use]
pub fn parse_file_info(text: &str) -> FileInfo {
    let mut info = FileInfo::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        match key {
            "name" => info.name = value.to_string(),
            "path" => info.path = value.to_string(),
            "size" => info.size = value.parse().unwrap_or(0),
            "isDirectory" => info.is_directory = value.eq_ignore_ascii_case("true"),
            "modified" => info.modified = value.to_string(),
            "mode" | "permissions" => info.mode = value.to_string(),
            _ => {
                info.extra.insert(key.to_string(), value.to_string());
            }
        }
    }
    info
}

/// Parse `list_directory` output (`[DIR] name` / `[FILE] name` lines).
#[must_use]
pub fn parse_directory_listing(text: &str) -> Vec<DirectoryEntry> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            if let Some(name) = line.strip_prefix("[DIR]") {
                Some(DirectoryEntry {
                    name: name.trim().to_string(),
                    is_directory: true,
                })
            } else {
                line.strip_prefix("[FILE]").map(|name| DirectoryEntry {
                    name: name.trim().to_string(),
                    is_directory: false,
                })
            }
        })
        .collect()
}

/// Parse `read_multiple_files` output (`<path>:\n<content>` blocks separated by `---` lines).
///
/// A block only starts a new file when its header names one of `paths`;
/// any other block is file content that itself contained a `---` line.
#[must_use]
pub fn parse_multiple_files(text: &str, paths: &[String]) -> BTreeMap<String, String> {
    let requested = |candidate: &str| paths.iter().any(|p| p == candidate.trim());

    let mut files: BTreeMap<String, String> = BTreeMap::new();
    // Current file and whether its header line had no content after it.
    let mut current: Option<(String, bool)> = None;
    for block in text.split("\n---\n") {
        let trimmed = block.trim_start_matches('\n');
        let (first, rest) = match trimmed.split_once('\n') {
            Some((first, rest)) => (first, Some(rest)),
            None => (trimmed, None),
        };

        if let Some(path) = first.strip_suffix(':').filter(|p| requested(*p)) {
            let path = path.trim().to_string();
            files.insert(path.clone(), rest.unwrap_or_default().to_string());
            current = Some((path, rest.is_none()));
            continue;
        }
        if let Some((path, inline)) = first.split_once(": ").filter(|(p, _)| requested(*p)) {
            let content = rest.map_or_else(|| inline.to_string(), |rest| format!("{inline}\n{rest}"));
            let path = path.trim().to_string();
            files.insert(path.clone(), content);
            current = Some((path, false));
            continue;
        }

        if let Some((path, bare_header)) = current.as_mut() {
            if let Some(content) = files.get_mut(path.as_str()) {
                content.push_str(if *bare_header { "---\n" } else { "\n---\n" });
                content.push_str(block);
            }
            *bare_header = false;
        }
    }
    files
}

/// Parse `search_files` output, one path per line.
#[must_use]
pub fn parse_search_results(text: &str) -> Vec<String> {
    if text.trim() == "No matches found" {
        return Vec::new();
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Split `content` into chunks of at most `chunk_size` bytes on char boundaries.
fn split_chunks(content: &str, chunk_size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        let mut end = chunk_size.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // A single char wider than the chunk size.
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

/// File system operations in a session.
pub struct FileSystem<'a, C: ?Sized> {
    caller: &'a C,
}

impl<'a, C: ToolCaller + ?Sized> FileSystem<'a, C> {
    #[must_use]
    pub const fn new(caller: &'a C) -> Self {
        Self { caller }
    }

    /// Create a directory (and missing parents).
    ///
    /// # Errors
    /// Returns error if the call fails or the remote side rejects it.
    pub async fn create_directory(&self, path: &str) -> Result<FileOperationResult> {
        let output = invoke(self.caller, &CreateDirectoryRequest { path }).await?;
        Ok(FileOperationResult {
            request_id: output.request_id,
            output: output.data,
        })
    }

    /// Apply text replacements to a file; `dry_run` returns the diff only.
    ///
    /// # Errors
    /// Returns error if `edits` is empty, the call fails, or the edit fails remotely.
    pub async fn edit_file(
        &self,
        path: &str,
        edits: &[FileEdit],
        dry_run: bool,
    ) -> Result<FileOperationResult> {
        if edits.is_empty() {
            return Err(AgentBayError::InvalidArgument(
                "edit_file requires at least one edit".to_string(),
            ));
        }
        let output = invoke(self.caller, &EditFileRequest {
            path,
            edits,
            dry_run,
        })
        .await?;
        Ok(FileOperationResult {
            request_id: output.request_id,
            output: output.data,
        })
    }

    /// Get file metadata.
    ///
    /// # Errors
    /// Returns error if the call fails or the path does not exist.
    pub async fn get_file_info(&self, path: &str) -> Result<FileInfo> {
        let output = invoke(self.caller, &GetFileInfoRequest { path }).await?;
        Ok(parse_file_info(&output.data))
    }

    /// List a directory.
    ///
    /// # Errors
    /// Returns error if the call fails or the path is not a directory.
    pub async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        let output = invoke(self.caller, &ListDirectoryRequest { path }).await?;
        Ok(parse_directory_listing(&output.data))
    }

    /// Move or rename a file.
    ///
    /// # Errors
    /// Returns error if the call fails or the move fails remotely.
    pub async fn move_file(&self, source: &str, destination: &str) -> Result<FileOperationResult> {
        let output = invoke(self.caller, &MoveFileRequest {
            source,
            destination,
        })
        .await?;
        Ok(FileOperationResult {
            request_id: output.request_id,
            output: output.data,
        })
    }

    /// Read a whole file.
    ///
    /// # Errors
    /// Returns error if the call fails or the file cannot be read.
    pub async fn read_file(&self, path: &str) -> Result<FileContentResult> {
        self.read_file_range(path, 0, 0).await
    }

    /// Read `length` bytes from `offset`; zero values are omitted.
    ///
    /// # Errors
    /// Returns error if the call fails or the file cannot be read.
    pub async fn read_file_range(
        &self,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<FileContentResult> {
        let output = invoke(self.caller, &ReadFileRequest {
            path,
            offset,
            length,
        })
        .await?;
        Ok(FileContentResult {
            request_id: output.request_id,
            content: output.data,
        })
    }

    /// Read several files in one call.
    ///
    /// # Errors
    /// Returns error if `paths` is empty, the call fails, or reading fails remotely.
    pub async fn read_multiple_files(&self, paths: &[String]) -> Result<BTreeMap<String, String>> {
        if paths.is_empty() {
            return Err(AgentBayError::InvalidArgument(
                "read_multiple_files requires at least one path".to_string(),
            ));
        }
        let output = invoke(self.caller, &ReadMultipleFilesRequest { paths }).await?;
        Ok(parse_multiple_files(&output.data, paths))
    }

    /// Search for files under `path` whose names match `pattern`.
    ///
    /// # Errors
    /// Returns error if the call fails or the search fails remotely.
    pub async fn search_files(
        &self,
        path: &str,
        pattern: &str,
        exclude_patterns: &[String],
    ) -> Result<Vec<String>> {
        let output = invoke(self.caller, &SearchFilesRequest {
            path,
            pattern,
            exclude_patterns,
        })
        .await?;
        Ok(parse_search_results(&output.data))
    }

    /// Write content to a file.
    ///
    /// # Errors
    /// Returns error if the call fails or the write fails remotely.
    pub async fn write_file(
        &self,
        path: &str,
        content: &str,
        mode: WriteMode,
    ) -> Result<FileOperationResult> {
        let output = invoke(self.caller, &WriteFileRequest {
            path,
            content,
            mode,
        })
        .await?;
        Ok(FileOperationResult {
            request_id: output.request_id,
            output: output.data,
        })
    }

    /// Read a file in chunks of `chunk_size` bytes.
    ///
    /// # Errors
    /// Returns error if `chunk_size` is zero, the path is a directory, or any call fails.
    pub async fn read_large_file(&self, path: &str, chunk_size: usize) -> Result<FileContentResult> {
        if chunk_size == 0 {
            return Err(AgentBayError::InvalidArgument(
                "chunk size must be positive".to_string(),
            ));
        }
        let info = self.get_file_info(path).await?;
        if info.is_directory {
            return Err(AgentBayError::InvalidArgument(format!(
                "{path} is a directory"
            )));
        }

        let chunk = chunk_size as u64;
        if info.size <= chunk {
            return self.read_file(path).await;
        }

        let mut content = String::new();
        let mut request_id = String::new();
        let mut offset = 0;
        while offset < info.size {
            let length = chunk.min(info.size - offset);
            tracing::debug!(path, offset, length, "reading chunk");
            let part = self.read_file_range(path, offset, length).await?;
            content.push_str(&part.content);
            request_id = part.request_id;
            offset += length;
        }

        Ok(FileContentResult {
            request_id,
            content,
        })
    }

    /// Write a file in chunks of at most `chunk_size` bytes.
    ///
    /// The first chunk overwrites, the rest append.
    ///
    /// # Errors
    /// Returns error if `chunk_size` is zero or any call fails.
    pub async fn write_large_file(
        &self,
        path: &str,
        content: &str,
        chunk_size: usize,
    ) -> Result<FileOperationResult> {
        if chunk_size == 0 {
            return Err(AgentBayError::InvalidArgument(
                "chunk size must be positive".to_string(),
            ));
        }
        if content.len() <= chunk_size {
            return self.write_file(path, content, WriteMode::Overwrite).await;
        }

        let mut last = FileOperationResult::default();
        for (i, part) in split_chunks(content, chunk_size).into_iter().enumerate() {
            let mode = if i == 0 {
                WriteMode::Overwrite
            } else {
                WriteMode::Append
            };
            tracing::debug!(path, chunk = i, len = part.len(), "writing chunk");
            last = self.write_file(path, part, mode).await?;
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mock::MockCaller;

    #[tokio::test]
    async fn test_write_file_arguments() {
        let caller = MockCaller::new().ok("");
        FileSystem::new(&caller)
            .write_file("/tmp/a.txt", "hello", WriteMode::Append)
            .await
            .unwrap();

        assert_eq!(
            caller.last_call(),
            (
                "write_file".to_string(),
                json!({"path": "/tmp/a.txt", "content": "hello", "mode": "append"})
            )
        );
    }

    #[tokio::test]
    async fn test_read_file_omits_zero_range() {
        let caller = MockCaller::new().ok("content");
        let result = FileSystem::new(&caller).read_file("/etc/hostname").await.unwrap();

        assert_eq!(result.content, "content");
        assert_eq!(caller.last_call().1, json!({"path": "/etc/hostname"}));
    }

    #[tokio::test]
    async fn test_edit_file_arguments() {
        let caller = MockCaller::new().ok("diff");
        let edits = [FileEdit::new("foo", "bar")];
        FileSystem::new(&caller)
            .edit_file("/tmp/x", &edits, true)
            .await
            .unwrap();

        assert_eq!(
            caller.last_call(),
            (
                "edit_file".to_string(),
                json!({
                    "path": "/tmp/x",
                    "edits": [{"oldText": "foo", "newText": "bar"}],
                    "dryRun": true
                })
            )
        );
    }

    #[tokio::test]
    async fn test_search_files_arguments_and_parse() {
        let caller = MockCaller::new().ok("/src/a.rs\n/src/b.rs\n");
        let excludes = vec!["target".to_string()];
        let matches = FileSystem::new(&caller)
            .search_files("/src", "*.rs", &excludes)
            .await
            .unwrap();

        assert_eq!(matches, vec!["/src/a.rs", "/src/b.rs"]);
        assert_eq!(
            caller.last_call().1,
            json!({"path": "/src", "pattern": "*.rs", "excludePatterns": ["target"]})
        );
    }

    #[tokio::test]
    async fn test_move_file_arguments() {
        let caller = MockCaller::new();
        FileSystem::new(&caller).move_file("/a", "/b").await.unwrap();
        assert_eq!(
            caller.last_call(),
            ("move_file".to_string(), json!({"source": "/a", "destination": "/b"}))
        );
    }

    #[test]
    fn test_parse_directory_listing() {
        let entries = parse_directory_listing("[DIR] src\n[FILE] Cargo.toml\nnoise\n");
        assert_eq!(
            entries,
            vec![
                DirectoryEntry {
                    name: "src".into(),
                    is_directory: true
                },
                DirectoryEntry {
                    name: "Cargo.toml".into(),
                    is_directory: false
                },
            ]
        );
    }

    #[test]
    fn test_parse_file_info() {
        let info = parse_file_info(
            "name: a.txt\npath: /tmp/a.txt\nsize: 42\nisDirectory: false\nmodified: 2025-01-01 10:00:00\nowner: root\n",
        );
        assert_eq!(info.name, "a.txt");
        assert_eq!(info.size, 42);
        assert!(!info.is_directory);
        assert_eq!(info.modified, "2025-01-01 10:00:00");
        assert_eq!(info.extra.get("owner").map(String::as_str), Some("root"));
    }

    #[test]
    fn test_parse_multiple_files() {
        let paths = vec!["/a.txt".to_string(), "/b.txt".to_string()];
        let files = parse_multiple_files("/a.txt:\nalpha\nbeta\n---\n/b.txt:\ngamma", &paths);
        assert_eq!(files.get("/a.txt").map(String::as_str), Some("alpha\nbeta"));
        assert_eq!(files.get("/b.txt").map(String::as_str), Some("gamma"));
    }

    #[test]
    fn test_parse_multiple_files_keeps_front_matter() {
        let paths = vec!["/notes.md".to_string(), "/b.txt".to_string()];
        let files = parse_multiple_files(
            "/notes.md:\n---\ntitle: Hello\n---\nbody\n---\n/b.txt:\ngamma",
            &paths,
        );

        assert_eq!(files.len(), 2);
        assert_eq!(
            files.get("/notes.md").map(String::as_str),
            Some("---\ntitle: Hello\n---\nbody")
        );
        assert_eq!(files.get("/b.txt").map(String::as_str), Some("gamma"));
        assert!(!files.contains_key("title"));
    }

    #[test]
    fn test_parse_multiple_files_separator_inside_content() {
        let paths = vec!["/a.yaml".to_string()];
        let files = parse_multiple_files("/a.yaml:\nkind: One\n---\nkind: Two", &paths);
        assert_eq!(
            files.get("/a.yaml").map(String::as_str),
            Some("kind: One\n---\nkind: Two")
        );
    }

    #[test]
    fn test_parse_search_no_matches() {
        assert!(parse_search_results("No matches found").is_empty());
    }

    #[test]
    fn test_split_chunks_char_boundaries() {
        let chunks = split_chunks("aé€b", 2);
        assert_eq!(chunks.concat(), "aé€b");
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[tokio::test]
    async fn test_read_large_file_in_chunks() {
        let caller = MockCaller::new()
            .ok("name: big\nsize: 10\nisDirectory: false")
            .ok("0123")
            .ok("4567")
            .ok("89");

        let result = FileSystem::new(&caller)
            .read_large_file("/big", 4)
            .await
            .unwrap();

        assert_eq!(result.content, "0123456789");
        let calls = caller.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[2].1, json!({"path": "/big", "offset": 4, "length": 4}));
        assert_eq!(calls[3].1, json!({"path": "/big", "offset": 8, "length": 2}));
    }

    #[tokio::test]
    async fn test_write_large_file_overwrites_then_appends() {
        let caller = MockCaller::new();
        FileSystem::new(&caller)
            .write_large_file("/big", "abcdefg", 3)
            .await
            .unwrap();

        let modes: Vec<_> = caller
            .calls()
            .into_iter()
            .map(|(_, args)| (args["content"].clone(), args["mode"].clone()))
            .collect();
        assert_eq!(
            modes,
            vec![
                (json!("abc"), json!("overwrite")),
                (json!("def"), json!("append")),
                (json!("g"), json!("append")),
            ]
        );
    }
}
