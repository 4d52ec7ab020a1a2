// ABOUTME: Core library for comicstrip, containing the comic model, editor state, and reader cursor.
// ABOUTME: Also plans page-set synchronization so the store crate only has to execute writes.

pub mod editor;
pub mod image;
pub mod model;
pub mod reader;
pub mod sync;

pub use editor::{Editor, EditorError, EditorPage};
pub use image::{ImageUpload, PageImage};
pub use model::{Comic, ComicId, ComicSummary, IdStyle, ModelError, Page, PageId};
pub use reader::{NavKey, ReaderCursor};
pub use sync::{PageDraft, PageWrite, SyncPlan, WriteKind, plan_page_sync};
