use kvgit_types::Reference;

/// Snapshot of a repository's references, sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefCache {
    all: Vec<Reference>,
    symbolic: Vec<Reference>,
}

impl RefCache {
    /// Build from references already sorted by name.
    pub fn from_sorted(all: Vec<Reference>) -> Self {
        let symbolic = all.iter().filter(|r| r.is_symbolic()).cloned().collect();
        Self { all, symbolic }
    }

    /// Every reference.
    pub fn all(&self) -> &[Reference] {
        &self.all
    }

    /// Only the symbolic references.
    pub fn symbolic(&self) -> &[Reference] {
        &self.symbolic
    }

    /// Look a reference up by name.
    pub fn find(&self, name: &str) -> Option<&Reference> {
        self.all
            .binary_search_by(|r| r.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.all[i])
    }

    /// Number of references in the cache.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    /// Returns `true` if the repository has no references.
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}
