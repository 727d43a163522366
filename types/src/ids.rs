use std::fmt;
use std::path::{Path, PathBuf};

/// Handle for one open editor view inside the host.
///
/// The host assigns these; the overlay never fabricates one, it only keys
/// its bookkeeping on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical identity of the file behind an editor view.
///
/// Two sessions displaying the same file must resolve to equal `DocumentId`s;
/// the session resolver is responsible for canonicalizing the path before
/// constructing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(PathBuf);

impl DocumentId {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_compare_by_value() {
        assert_eq!(SessionId::new(7), SessionId::new(7));
        assert_ne!(SessionId::new(7), SessionId::new(8));
        assert_eq!(SessionId::new(7).value(), 7);
    }

    #[test]
    fn document_ids_compare_by_path() {
        let a = DocumentId::new("/src/Foo.java");
        let b = DocumentId::new("/src/Foo.java");
        let c = DocumentId::new("/src/Bar.java");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn document_id_exposes_path() {
        let id = DocumentId::new("/src/Foo.java");
        assert_eq!(id.path(), Path::new("/src/Foo.java"));
        assert_eq!(id.to_string(), "/src/Foo.java");
    }
}
