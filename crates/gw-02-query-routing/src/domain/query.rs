//! Query request and handler selection

use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use shared_types::{ProposalRequest, TxId};
use std::fmt;
use std::str::FromStr;

/// A read-only chaincode invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChaincodeQuery {
    pub chaincode_id: String,
    pub function: String,
    pub args: Vec<String>,
    pub tx_id: TxId,
}

impl ChaincodeQuery {
    pub fn new(
        chaincode_id: impl Into<String>,
        function: impl Into<String>,
        args: Vec<String>,
        tx_id: TxId,
    ) -> Self {
        Self {
            chaincode_id: chaincode_id.into(),
            function: function.into(),
            args,
            tx_id,
        }
    }

    pub(crate) fn to_request(&self) -> ProposalRequest {
        ProposalRequest::new(
            self.chaincode_id.clone(),
            self.function.clone(),
            self.args.clone(),
            self.tx_id.clone(),
        )
    }
}

/// Which query handler a ledger uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum QueryHandlerKind {
    #[default]
    Sticky,
    RoundRobin,
}

impl QueryHandlerKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sticky => "sticky",
            Self::RoundRobin => "round_robin",
        }
    }
}

impl fmt::Display for QueryHandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QueryHandlerKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sticky" | "default" => Ok(Self::Sticky),
            "round_robin" | "roundrobin" => Ok(Self::RoundRobin),
            other => Err(QueryError::Configuration(format!(
                "unknown query handler: {}",
                other
            ))),
        }
    }
}

impl TryFrom<String> for QueryHandlerKind {
    type Error = QueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QueryHandlerKind> for String {
    fn from(value: QueryHandlerKind) -> Self {
        value.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_kind_parsing() {
        assert_eq!("sticky".parse::<QueryHandlerKind>().unwrap(), QueryHandlerKind::Sticky);
        assert_eq!(
            "RoundRobin".parse::<QueryHandlerKind>().unwrap(),
            QueryHandlerKind::RoundRobin
        );
        assert!("random".parse::<QueryHandlerKind>().is_err());
        assert_eq!(QueryHandlerKind::default(), QueryHandlerKind::Sticky);
    }
}
