use std::collections::BTreeSet;

use ot_store::{Commit, CommitStore};

use super::OtAlgorithms;
use super::walker::Frontier;
use crate::algebra::OtDiff;
use crate::error::OtError;

impl<S> OtAlgorithms<'_, S>
where
    S: CommitStore,
    S::Diff: OtDiff,
{
    /// Walk down from `heads` until `predicate` accepts the whole queued
    /// frontier, and return the ids of that frontier.
    ///
    /// The predicate sees the frontier before every step, including the
    /// initial one made of the heads themselves.
    ///
    /// # Errors
    /// [`OtError::IncompleteGraph`] if the graph is exhausted first.
    #[tracing::instrument(skip_all, fields(heads = heads.len()))]
    pub async fn find_cut<P>(&self, heads: &BTreeSet<S::Id>, predicate: P) -> Result<BTreeSet<S::Id>, OtError>
    where
        P: Fn(&[&Commit<S::Id, S::Diff>]) -> bool,
    {
        let (mut frontier, _) = Frontier::seed(self.store, heads, self.config.walk.max_commits).await?;
        loop {
            let accepted = {
                let cut: Vec<_> = frontier.commits().collect();
                (!cut.is_empty() && predicate(&cut))
                    .then(|| cut.iter().map(|commit| commit.id().clone()).collect::<BTreeSet<_>>())
            };
            if let Some(cut) = accepted {
                tracing::debug!(size = cut.len(), "found cut");
                return Ok(cut);
            }
            let Some(commit) = frontier.pop() else {
                return Err(OtError::incomplete("no cut found before the graph was exhausted"));
            };
            frontier.enqueue_parents(self.store, &commit).await?;
        }
    }
}
