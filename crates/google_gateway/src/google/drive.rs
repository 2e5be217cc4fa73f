//! Drive file listing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Largest page Drive's `files.list` will return.
pub const DRIVE_MAX_PAGE_SIZE: u32 = 1000;

/// Fields requested from `files.list`; only id and name are relayed.
pub const DRIVE_LIST_FIELDS: &str = "nextPageToken, files(id, name)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
}

/// One page of a `files.list` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListPage {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Fetch a single page of the caller's files.
    async fn list_files_page(&self, page_token: Option<&str>, page_size: u32) -> Result<FileListPage>;
}

/// List every file visible to the caller.
///
/// Pages are fetched one after another and concatenated in the order Drive
/// returns them. A failure on any page fails the whole listing.
pub async fn list_all_files<D>(drive: &D) -> Result<Vec<DriveFile>>
where
    D: DriveApi + ?Sized,
{
    let mut all_files = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = drive
            .list_files_page(page_token.as_deref(), DRIVE_MAX_PAGE_SIZE)
            .await?;
        pages += 1;
        all_files.extend(page.files);

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    tracing::debug!("Listed {} Drive files across {} pages", all_files.len(), pages);
    Ok(all_files)
}
