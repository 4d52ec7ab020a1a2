// ABOUTME: Persistence layer for comicstrip, delegating storage to a backend-as-a-service.
// ABOUTME: Provides the ComicStore client, the Backend traits, and REST and local backends.

pub mod backend;
pub mod comic_store;
pub mod local;
pub mod rest;
pub mod testing;

pub use backend::{Backend, BackendError, BlobStore, ComicRow, RowStore};
pub use comic_store::{ComicStore, StoreError};
pub use local::LocalBackend;
pub use rest::{RestBackend, RestConfig};
