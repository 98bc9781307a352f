//! Per-organization commit counters

use shared_types::MspId;

/// Counters for one organization during one commit wait.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrgCommitCount {
    /// Sources believed live at start
    pub initial: u32,
    /// Sources that have not responded yet
    pub remaining: u32,
    /// Sources that reported the transaction as valid
    pub valid: u32,
}

impl OrgCommitCount {
    /// Every source has answered and none confirmed.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0 && self.valid == 0
    }
}

/// Counters for every organization in scope, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitTally {
    orgs: Vec<(MspId, OrgCommitCount)>,
}

impl CommitTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an organization known without counting a live source for it.
    pub fn seed(&mut self, msp_id: &MspId) {
        self.entry_mut(msp_id);
    }

    /// Count one live source for `msp_id`.
    pub fn add_live_source(&mut self, msp_id: &MspId) {
        let count = self.entry_mut(msp_id);
        count.initial += 1;
        count.remaining += 1;
    }

    /// Apply one signal from a source of `msp_id`. Returns `None` when the
    /// organization is unknown or has no outstanding sources.
    pub fn record(&mut self, msp_id: &MspId, success: bool) -> Option<OrgCommitCount> {
        let count = self
            .orgs
            .iter_mut()
            .find(|(msp, _)| msp == msp_id)
            .map(|(_, count)| count)?;
        if count.remaining == 0 {
            return None;
        }
        count.remaining -= 1;
        if success {
            count.valid += 1;
        }
        Some(*count)
    }

    pub fn get(&self, msp_id: &MspId) -> Option<&OrgCommitCount> {
        self.orgs
            .iter()
            .find(|(msp, _)| msp == msp_id)
            .map(|(_, count)| count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MspId, &OrgCommitCount)> {
        self.orgs.iter().map(|(msp, count)| (msp, count))
    }

    pub fn is_empty(&self) -> bool {
        self.orgs.is_empty()
    }

    pub fn org_count(&self) -> usize {
        self.orgs.len()
    }

    pub fn total_initial(&self) -> u32 {
        self.orgs.iter().map(|(_, c)| c.initial).sum()
    }

    pub fn total_remaining(&self) -> u32 {
        self.orgs.iter().map(|(_, c)| c.remaining).sum()
    }

    fn entry_mut(&mut self, msp_id: &MspId) -> &mut OrgCommitCount {
        let index = match self.orgs.iter().position(|(msp, _)| msp == msp_id) {
            Some(index) => index,
            None => {
                self.orgs.push((msp_id.clone(), OrgCommitCount::default()));
                self.orgs.len() - 1
            }
        };
        &mut self.orgs[index].1
    }
}
