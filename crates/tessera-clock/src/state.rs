//! Resolved view of a name

use crate::name::Name;
use crate::revision::Revision;
use tessera_core::Cid;

/// The heads of a name's clock at the time it was resolved
///
/// One revision means the history has converged. More than one means
/// concurrent writers have not been merged yet; the caller resolves that by
/// publishing a [`Revision::increment`] of this state.
#[derive(Debug, Clone)]
pub struct State<O> {
    name: Name,
    revisions: Vec<Revision<O>>,
}

impl<O> State<O> {
    /// Build a state; revisions are de-duplicated and ordered by CID
    pub fn new(name: Name, revisions: impl IntoIterator<Item = Revision<O>>) -> Self {
        let mut revisions: Vec<Revision<O>> = revisions.into_iter().collect();
        revisions.sort_by(|a, b| a.cid().cmp(b.cid()));
        revisions.dedup_by(|a, b| a.cid() == b.cid());
        Self { name, revisions }
    }

    /// The name this state belongs to
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Head revisions
    pub fn revisions(&self) -> &[Revision<O>] {
        &self.revisions
    }

    /// Head CIDs
    pub fn heads(&self) -> Vec<Cid> {
        self.revisions.iter().map(|r| *r.cid()).collect()
    }

    /// Whether concurrent heads are waiting to be merged
    pub fn is_conflicted(&self) -> bool {
        self.revisions.len() > 1
    }

    /// The current operation, when there is exactly one head
    ///
    /// A conflicted state has no current value.
    pub fn value(&self) -> Option<&O> {
        match self.revisions.as_slice() {
            [only] => Some(only.operation()),
            _ => None,
        }
    }
}
