/// Clipboard operation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClipboardOp {
    /// Copy sources into the destination directory on paste.
    Copy,
    /// Move sources into the destination directory on paste.
    Cut,
}

/// Pending copy or cut payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileClipboard {
    /// Operation kind.
    pub op: ClipboardOp,
    /// Source paths captured when the clipboard was populated.
    pub sources: Vec<String>,
}

/// Holds at most one copy-or-cut payload.
///
/// Setting either kind replaces the other, so copied and cut paths can never
/// coexist. An empty payload is stored as nothing.
#[derive(Clone, Debug, Default)]
pub struct Clipboard {
    content: Option<FileClipboard>,
}

impl Clipboard {
    /// Empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents.
    pub fn set(&mut self, op: ClipboardOp, sources: Vec<String>) {
        self.content = (!sources.is_empty()).then_some(FileClipboard { op, sources });
    }

    /// Current payload.
    pub fn content(&self) -> Option<&FileClipboard> {
        self.content.as_ref()
    }

    /// Paths pending a copy.
    pub fn copied(&self) -> &[String] {
        self.sources_for(ClipboardOp::Copy)
    }

    /// Paths pending a move.
    pub fn cut(&self) -> &[String] {
        self.sources_for(ClipboardOp::Cut)
    }

    fn sources_for(&self, op: ClipboardOp) -> &[String] {
        match &self.content {
            Some(c) if c.op == op => &c.sources,
            _ => &[],
        }
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }

    /// Drop the payload.
    pub fn clear(&mut self) {
        self.content = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_then_cut_replaces_copied_set() {
        let mut clip = Clipboard::new();
        clip.set(ClipboardOp::Copy, vec!["/a".into(), "/b".into()]);
        clip.set(ClipboardOp::Cut, vec!["/c".into()]);
        assert!(clip.copied().is_empty());
        assert_eq!(clip.cut(), ["/c".to_owned()]);

        clip.set(ClipboardOp::Copy, vec!["/d".into()]);
        assert!(clip.cut().is_empty());
        assert_eq!(clip.copied(), ["/d".to_owned()]);
    }

    #[test]
    fn empty_sources_leave_clipboard_empty() {
        let mut clip = Clipboard::new();
        clip.set(ClipboardOp::Cut, vec!["/a".into()]);
        clip.set(ClipboardOp::Copy, Vec::new());
        assert!(clip.is_empty());
    }
}
