//! Google Drive and Sheets access
//!
//! The services in [`drive`] and [`sheets`] are written against the
//! [`DriveApi`] and [`SheetsApi`] traits; [`GoogleClient`] implements both
//! over the Google REST endpoints.

pub mod client;
pub mod drive;
pub mod sheets;

pub use client::{GoogleClient, GoogleEndpoints};
pub use drive::{list_all_files, DriveApi, DriveFile, FileListPage};
pub use sheets::{RangeValues, SheetsApi, ValueInputOption, ValueRange};
