//! Back/forward history of visited item URLs.
//!
//! Two stacks with browser-like rules:
//!
//! - a remembered visit is pushed onto `back` unless it repeats the top;
//! - if it matches the top of `forward` it is taken off `forward` (a redo),
//!   otherwise `forward` is discarded;
//! - going back moves the top of `back` onto `forward` and returns the new
//!   top of `back`, which is loaded without being remembered again;
//! - going forward returns the top of `forward`, which is loaded as a
//!   remembered visit and therefore follows the redo rule above.

use tracing::debug;

/// Navigation history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    back: Vec<String>,
    forward: Vec<String>,
}

impl History {
    /// Empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful, remembered visit to `url`.
    pub fn push_visit(&mut self, url: &str) {
        if self.back.last().is_none_or(|top| top != url) {
            self.back.push(url.to_string());
        }
        if self.forward.last().is_some_and(|top| top == url) {
            self.forward.pop();
        } else if !self.forward.is_empty() {
            debug!(discarded = self.forward.len(), "forward history cleared");
            self.forward.clear();
        }
    }

    /// Steps back and returns the URL to load, if at least two entries exist.
    pub fn go_back(&mut self) -> Option<String> {
        if self.back.len() < 2 {
            return None;
        }
        let current = self.back.pop()?;
        self.forward.push(current);
        self.back.last().cloned()
    }

    /// URL to load when going forward.
    ///
    /// The entry stays on the stack until the visit succeeds and
    /// [`push_visit`](Self::push_visit) consumes it.
    #[must_use]
    pub fn forward_target(&self) -> Option<String> {
        self.forward.last().cloned()
    }

    /// Whether going back is possible.
    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.back.len() >= 2
    }

    /// Whether going forward is possible.
    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Back stack, oldest first.
    #[must_use]
    pub fn back(&self) -> &[String] {
        &self.back
    }

    /// Forward stack, oldest first; the last element is the next redo.
    #[must_use]
    pub fn forward(&self) -> &[String] {
        &self.forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visited(urls: &[&str]) -> History {
        let mut history = History::new();
        for url in urls {
            history.push_visit(url);
        }
        history
    }

    #[test]
    fn test_push_skips_duplicate_top() {
        let history = visited(&["a", "a", "b", "b"]);
        assert_eq!(history.back(), ["a", "b"]);
    }

    #[test]
    fn test_back_needs_two_entries() {
        let mut history = visited(&["a"]);
        assert_eq!(history.go_back(), None);
        assert_eq!(history.back(), ["a"]);
        assert!(history.forward().is_empty());
    }

    #[test]
    fn test_back_then_forward_restores_stacks() {
        let mut history = visited(&["a", "b"]);
        let before = history.clone();

        assert_eq!(history.go_back().as_deref(), Some("a"));
        assert_eq!(history.back(), ["a"]);
        assert_eq!(history.forward(), ["b"]);

        let target = history.forward_target();
        assert_eq!(target.as_deref(), Some("b"));
        history.push_visit("b");
        assert_eq!(history, before);
    }

    #[test]
    fn test_new_visit_clears_forward() {
        let mut history = visited(&["a", "b", "c"]);
        history.go_back();
        history.go_back();
        assert_eq!(history.forward(), ["c", "b"]);

        history.push_visit("x");
        assert_eq!(history.back(), ["a", "x"]);
        assert!(history.forward().is_empty());
    }

    #[test]
    fn test_redo_pops_only_matching_top() {
        let mut history = visited(&["a", "b", "c"]);
        history.go_back();
        history.go_back();
        history.push_visit("b");
        assert_eq!(history.back(), ["a", "b"]);
        assert_eq!(history.forward(), ["c"]);
        assert!(history.can_go_forward());
    }

    #[test]
    fn test_forward_target_is_none_when_empty() {
        let history = visited(&["a", "b"]);
        assert_eq!(history.forward_target(), None);
        assert!(history.can_go_back());
    }
}
