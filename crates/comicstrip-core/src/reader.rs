// ABOUTME: Read-only paging over a comic: a clamped cursor plus keyboard and click-zone mapping.
// ABOUTME: Left/up arrows and the left half of a page go back; right/down and the right half go forward.

/// Direction requested by a reader input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Previous,
    Next,
}

impl NavKey {
    /// Map a DOM `KeyboardEvent.key` value. Unrelated keys yield `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" | "ArrowUp" => Some(NavKey::Previous),
            "ArrowRight" | "ArrowDown" => Some(NavKey::Next),
            _ => None,
        }
    }

    /// Map a click at horizontal offset `x` within a page `width` pixels wide.
    pub fn from_click(x: f64, width: f64) -> Option<Self> {
        if !(width > 0.0) || !x.is_finite() {
            return None;
        }
        if x < width / 2.0 {
            Some(NavKey::Previous)
        } else {
            Some(NavKey::Next)
        }
    }
}

/// Position within a comic of `len` pages. Always within `0..len` (0 when empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderCursor {
    len: usize,
    index: usize,
}

impl ReaderCursor {
    pub fn new(len: usize) -> Self {
        Self { len, index: 0 }
    }

    /// Start at a 1-based page number, clamped into range.
    pub fn at_page(len: usize, page_number: usize) -> Self {
        let mut cursor = Self::new(len);
        cursor.index = page_number.saturating_sub(1);
        cursor.clamp();
        cursor
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// 1-based page number for display and URLs.
    pub fn page_number(&self) -> usize {
        self.index + 1
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.len
    }

    pub fn previous(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    pub fn advance(&mut self) {
        if self.has_next() {
            self.index += 1;
        }
    }

    pub fn apply(&mut self, key: NavKey) {
        match key {
            NavKey::Previous => self.previous(),
            NavKey::Next => self.advance(),
        }
    }

    fn clamp(&mut self) {
        if self.len == 0 {
            self.index = 0;
        } else if self.index >= self.len {
            self.index = self.len - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_keys_map_to_directions() {
        assert_eq!(NavKey::from_key("ArrowLeft"), Some(NavKey::Previous));
        assert_eq!(NavKey::from_key("ArrowUp"), Some(NavKey::Previous));
        assert_eq!(NavKey::from_key("ArrowRight"), Some(NavKey::Next));
        assert_eq!(NavKey::from_key("ArrowDown"), Some(NavKey::Next));
        assert_eq!(NavKey::from_key("Enter"), None);
    }

    #[test]
    fn click_halves_map_to_directions() {
        assert_eq!(NavKey::from_click(10.0, 400.0), Some(NavKey::Previous));
        assert_eq!(NavKey::from_click(399.0, 400.0), Some(NavKey::Next));
        assert_eq!(NavKey::from_click(10.0, 0.0), None);
        assert_eq!(NavKey::from_click(f64::NAN, 100.0), None);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut cursor = ReaderCursor::new(3);
        for _ in 0..5 {
            cursor.apply(NavKey::Previous);
        }
        assert_eq!(cursor.index(), 0);
        for _ in 0..5 {
            cursor.apply(NavKey::Next);
        }
        assert_eq!(cursor.index(), 2);
        assert!(!cursor.has_next());
        assert!(cursor.has_previous());
    }

    #[test]
    fn empty_comic_cursor_is_pinned_at_zero() {
        let mut cursor = ReaderCursor::new(0);
        cursor.advance();
        cursor.previous();
        assert_eq!(cursor.index(), 0);
        assert!(cursor.is_empty());
    }

    #[test]
    fn at_page_clamps_page_number() {
        assert_eq!(ReaderCursor::at_page(3, 0).page_number(), 1);
        assert_eq!(ReaderCursor::at_page(3, 2).page_number(), 2);
        assert_eq!(ReaderCursor::at_page(3, 99).page_number(), 3);
    }
}
