pub mod config;
pub mod error;
pub mod metadata;
pub mod path;
pub mod related;
pub mod scanner;
pub mod source;
pub mod store;
pub mod types;

pub use config::StoreConfig;
pub use error::{ContentError, Result};
pub use metadata::{Extracted, ParseStrategy};
pub use path::PathResolver;
pub use related::RelatedDocumentScorer;
pub use scanner::ContentTreeScanner;
pub use source::ContentSource;
pub use store::ContentStore;
pub use types::{ContentItem, DirectoryListing, Document, EntryType, Metadata, RelatedDocument};
