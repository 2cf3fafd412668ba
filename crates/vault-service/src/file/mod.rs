//! File content: upload, download, and archive walks.

pub mod download;
pub mod upload;

pub use download::{ArchiveEntry, DownloadService};
pub use upload::{UploadFailure, UploadFile, UploadOutcome, UploadService};
