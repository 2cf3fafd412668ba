//! # vault-service
//!
//! Engine services for Vault. Each service authorizes through the access
//! resolver, mutates through one store transaction, journals the event in
//! that same transaction, and pushes to the notification hub only after
//! the commit succeeds.
//!
//! Services follow constructor injection: all collaborators are handed in
//! as `Arc` references at construction time.

pub mod access;
pub mod context;
pub mod favorite;
pub mod file;
pub mod journal;
pub mod node;
pub mod services;
pub mod session;
pub mod share;
pub mod unit_of_work;
pub mod user;

pub use access::{AccessSource, NodeAccess};
pub use context::RequestContext;
pub use favorite::FavoriteService;
pub use file::{ArchiveEntry, DownloadService, UploadFile, UploadOutcome, UploadService};
pub use journal::{Journal, JournalService};
pub use node::{NodeService, TrashService};
pub use services::Services;
pub use session::{SessionService, SessionVerifier};
pub use share::ShareService;
pub use unit_of_work::UnitOfWork;
pub use user::UserService;
