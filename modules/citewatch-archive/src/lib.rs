pub mod archive;
pub mod error;
pub mod health;
pub mod similarity;
pub mod text_extract;
pub mod transport;
pub mod wayback;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use archive::{ArchivedCopy, SnapshotArchive};
pub use error::{ArchiveError, Result};
pub use health::{is_homepage_redirect, HealthReport, UrlHealthChecker};
pub use similarity::similarity;
pub use text_extract::extract_main_text;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use wayback::WaybackClient;
