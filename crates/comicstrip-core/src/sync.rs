// ABOUTME: Plans how to bring a comic's stored pages in line with an edited page list.
// ABOUTME: Produces deletes for dropped pages and an ordered update-or-insert write per draft.

use std::collections::HashSet;

use crate::image::PageImage;
use crate::model::PageId;

/// A page as handed to the persistence client. `id` is set only for pages
/// that were loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDraft {
    pub id: Option<PageId>,
    pub image: PageImage,
    pub caption: String,
}

impl PageDraft {
    pub fn new(image: PageImage, caption: impl Into<String>) -> Self {
        Self {
            id: None,
            image,
            caption: caption.into(),
        }
    }

    pub fn with_id(mut self, id: PageId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Whether a draft overwrites an existing row or creates a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteKind {
    Update(PageId),
    Insert,
}

/// One row write, pointing back at the draft it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWrite {
    pub draft_index: usize,
    pub page_number: u32,
    pub kind: WriteKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub delete: Vec<PageId>,
    pub writes: Vec<PageWrite>,
}

impl SyncPlan {
    pub fn inserts(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| w.kind == WriteKind::Insert)
            .count()
    }

    pub fn updates(&self) -> usize {
        self.writes.len() - self.inserts()
    }
}

/// Diff the stored page ids against the edited drafts.
///
/// Stored pages missing from the drafts are deleted (in stored order). Each
/// draft gets position `index + 1`; drafts whose id is still stored are
/// updated in place, everything else is inserted. If two drafts carry the
/// same id only the first keeps it.
pub fn plan_page_sync(existing: &[PageId], drafts: &[PageDraft]) -> SyncPlan {
    let existing_set: HashSet<&PageId> = existing.iter().collect();
    let kept: HashSet<&PageId> = drafts.iter().filter_map(|d| d.id.as_ref()).collect();

    let delete = existing
        .iter()
        .filter(|id| !kept.contains(id))
        .cloned()
        .collect();

    let mut claimed: HashSet<&PageId> = HashSet::new();
    let writes = drafts
        .iter()
        .enumerate()
        .map(|(index, draft)| {
            let kind = match &draft.id {
                Some(id) if existing_set.contains(id) && claimed.insert(id) => {
                    WriteKind::Update(id.clone())
                }
                _ => WriteKind::Insert,
            };
            PageWrite {
                draft_index: index,
                page_number: (index + 1) as u32,
                kind,
            }
        })
        .collect();

    SyncPlan { delete, writes }
}
