//! Quorum strategies
//!
//! A strategy decides, from per-organization counters, whether a commit wait
//! has passed, failed, or must keep waiting.
//!
//! | strategy | scope | passes when |
//! |----------|-------|-------------|
//! | `mspAll` | own organization | every own source answered, at least one valid |
//! | `mspAny` | own organization | any own source reports valid |
//! | `channelAll` | every organization | every organization has a valid answer |
//! | `channelAny` | every organization | any source reports valid |

use crate::domain::tally::CommitTally;
use crate::error::CommitError;
use serde::{Deserialize, Serialize};
use shared_types::MspId;
use std::fmt;
use std::str::FromStr;

/// Which peers an event manager connects for a strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyScope {
    /// Peers of the application's own organization
    Organization,
    /// Peers of every organization on the channel
    Channel,
}

/// Outcome of evaluating one signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyVerdict {
    Passed,
    Failed,
    Ongoing,
}

impl StrategyVerdict {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Ongoing)
    }
}

/// Commit quorum strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CommitStrategy {
    MspAll,
    MspAny,
    ChannelAll,
    ChannelAny,
}

impl CommitStrategy {
    pub const ALL: [CommitStrategy; 4] = [
        Self::MspAll,
        Self::MspAny,
        Self::ChannelAll,
        Self::ChannelAny,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::MspAll => "mspAll",
            Self::MspAny => "mspAny",
            Self::ChannelAll => "channelAll",
            Self::ChannelAny => "channelAny",
        }
    }

    pub fn scope(self) -> StrategyScope {
        match self {
            Self::MspAll | Self::MspAny => StrategyScope::Organization,
            Self::ChannelAll | Self::ChannelAny => StrategyScope::Channel,
        }
    }

    /// Whether the live sources counted in `tally` could possibly satisfy
    /// this strategy.
    pub fn check_initial_state(self, tally: &CommitTally) -> bool {
        match self {
            Self::MspAll | Self::MspAny | Self::ChannelAll => {
                !tally.is_empty() && tally.iter().all(|(_, count)| count.initial >= 1)
            }
            Self::ChannelAny => tally.total_initial() >= 1,
        }
    }

    /// Evaluate a signal from a source of `msp_id`.
    ///
    /// `tally` must already reflect the signal.
    pub fn on_signal(self, msp_id: &MspId, tally: &CommitTally, is_error: bool) -> StrategyVerdict {
        match self {
            Self::MspAll => remaining_for_org(msp_id, tally),
            Self::MspAny => {
                if is_error {
                    remaining_for_org(msp_id, tally)
                } else {
                    StrategyVerdict::Passed
                }
            }
            Self::ChannelAll => each_org_has_valid(tally),
            Self::ChannelAny => {
                if !is_error {
                    StrategyVerdict::Passed
                } else if tally.total_remaining() == 0 {
                    StrategyVerdict::Failed
                } else {
                    StrategyVerdict::Ongoing
                }
            }
        }
    }
}

fn remaining_for_org(msp_id: &MspId, tally: &CommitTally) -> StrategyVerdict {
    match tally.get(msp_id) {
        Some(count) if count.remaining == 0 => {
            if count.valid > 0 {
                StrategyVerdict::Passed
            } else {
                StrategyVerdict::Failed
            }
        }
        Some(_) => StrategyVerdict::Ongoing,
        None => StrategyVerdict::Ongoing,
    }
}

fn each_org_has_valid(tally: &CommitTally) -> StrategyVerdict {
    if tally.iter().all(|(_, count)| count.valid > 0) {
        StrategyVerdict::Passed
    } else if tally.iter().any(|(_, count)| count.is_exhausted()) {
        StrategyVerdict::Failed
    } else {
        StrategyVerdict::Ongoing
    }
}

impl fmt::Display for CommitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommitStrategy {
    type Err = CommitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mspAll" | "MSPID_SCOPE_ALLFORTX" => Ok(Self::MspAll),
            "mspAny" | "MSPID_SCOPE_ANYFORTX" => Ok(Self::MspAny),
            "channelAll" | "CHANNEL_SCOPE_ALLFORTX" => Ok(Self::ChannelAll),
            "channelAny" | "CHANNEL_SCOPE_ANYFORTX" => Ok(Self::ChannelAny),
            other => Err(CommitError::Configuration(format!(
                "unknown event handling strategy: {}",
                other
            ))),
        }
    }
}

impl TryFrom<String> for CommitStrategy {
    type Error = CommitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CommitStrategy> for String {
    fn from(value: CommitStrategy) -> Self {
        value.name().to_string()
    }
}
