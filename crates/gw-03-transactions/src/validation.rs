//! Endorsement response validation

use crate::error::{TransactionError, TransactionResult};
use shared_types::{Endorsement, ProposalResponse, STATUS_OK};

/// Responses that can be sent to the orderer, plus a warning for each one
/// that cannot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidatedResponses {
    pub valid: Vec<Endorsement>,
    pub invalid_messages: Vec<String>,
}

/// Split `responses` into valid endorsements and warnings.
///
/// An endorsement is valid when `verify` accepts it and its status is 200.
/// Fails when `responses` is empty or nothing is valid.
pub fn validate_peer_responses<F>(
    responses: &[ProposalResponse],
    verify: F,
) -> TransactionResult<ValidatedResponses>
where
    F: Fn(&Endorsement) -> bool,
{
    if responses.is_empty() {
        return Err(TransactionError::NoResponses);
    }

    let mut validated = ValidatedResponses::default();
    for response in responses {
        match response {
            Err(error) => validated.invalid_messages.push(format!(
                "Response from attempted peer comms was an error: {}",
                error
            )),
            Ok(endorsement) if !verify(endorsement) => validated.invalid_messages.push(format!(
                "Proposal response from peer {} failed verification",
                endorsement.peer
            )),
            Ok(endorsement) if endorsement.response.status != STATUS_OK => {
                validated.invalid_messages.push(format!(
                    "Unexpected response of {}. Payload was: {}",
                    endorsement.response.status,
                    String::from_utf8_lossy(&endorsement.response.payload)
                ))
            }
            Ok(endorsement) => validated.valid.push(endorsement.clone()),
        }
    }

    if validated.valid.is_empty() {
        return Err(TransactionError::InvalidProposalResponse {
            messages: validated.invalid_messages,
        });
    }
    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{ChaincodeResponse, PeerResponseError};

    fn endorsement(peer: &str, status: u32, payload: &[u8]) -> ProposalResponse {
        Ok(Endorsement {
            peer: peer.to_string(),
            response: ChaincodeResponse {
                status,
                message: String::new(),
                payload: payload.to_vec(),
            },
            results: Vec::new(),
        })
    }

    #[test]
    fn test_empty_responses() {
        assert_eq!(
            validate_peer_responses(&[], |_| true),
            Err(TransactionError::NoResponses)
        );
    }

    #[test]
    fn test_splits_valid_and_invalid() {
        let responses = vec![
            endorsement("p1", 200, b"ok"),
            endorsement("p2", 500, b"broken"),
            Err(PeerResponseError::transport("p3", "connection refused")),
            endorsement("p4", 200, b"forged"),
        ];

        let validated = validate_peer_responses(&responses, |e| e.peer != "p4").unwrap();
        assert_eq!(validated.valid.len(), 1);
        assert_eq!(validated.valid[0].peer, "p1");
        assert_eq!(validated.invalid_messages.len(), 3);
        assert!(validated.invalid_messages[0].contains("Unexpected response of 500"));
        assert!(validated.invalid_messages[1].contains("p3: connection refused"));
        assert!(validated.invalid_messages[2].contains("p4 failed verification"));
    }

    #[test]
    fn test_no_valid_lists_every_warning() {
        let responses = vec![
            endorsement("p1", 500, b"x"),
            Err(PeerResponseError::unavailable("p2")),
        ];

        let err = validate_peer_responses(&responses, |_| true).unwrap_err();
        let text = err.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "No valid responses from any peers.");
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains("14 UNAVAILABLE"));
    }
}
