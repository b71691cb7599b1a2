pub mod crossref;
pub mod error;
pub mod pubmed;
pub mod registry;
pub mod resolver;
pub mod sources;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use crossref::CrossrefClient;
pub use error::{RetractionError, Result};
pub use pubmed::PubMedClient;
pub use registry::{RegistrySync, SyncReport};
pub use resolver::{describe_retraction, RetractionResolver};
pub use sources::{BibliographicIndex, IndexRecord, PublisherMetadata, UpdateRelation, WorkRecord};
