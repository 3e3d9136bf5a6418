//! Services module
//!
//! Business logic that coordinates the persisted store and the remote API.

pub mod auth;
pub mod downloads;
pub mod index;
pub mod search;
pub mod session;
pub mod tags;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthService, OtpChallenge};
pub use downloads::{preview_kind, DownloadService, DownloadedFile, PreviewKind};
pub use index::DocumentIndex;
pub use search::{load_more, LocalBackend, RemoteBackend, ResultSet, SearchBackend, SearchFilter, SearchPage};
pub use session::{DownloadPrompt, LoadMoreOutcome, SearchOutcome, SearchSession, SearchState, SessionSnapshot};
pub use tags::TagService;
pub use upload::{UploadForm, UploadService};
