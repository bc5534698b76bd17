//! CloudFront implementation of [`CdnClient`].

use super::{CdnClient, CdnError, InvalidationRequest};
use crate::aws::{AwsSession, FailureClass, classify, describe};
use aws_sdk_cloudfront::Client;
use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};

/// Issues `CreateInvalidation` requests.
#[derive(Debug, Clone)]
pub struct CloudFrontClient {
    session: AwsSession,
    client: Client,
}

impl CloudFrontClient {
    /// Create a client on `session`.
    #[must_use]
    pub fn new(session: AwsSession) -> Self {
        Self {
            client: Client::new(session.config()),
            session,
        }
    }
}

fn permanent(err: impl std::fmt::Display) -> CdnError {
    CdnError::Permanent {
        reason: err.to_string(),
    }
}

impl CdnClient for CloudFrontClient {
    fn create_invalidation(&self, request: &InvalidationRequest) -> Result<String, CdnError> {
        let quantity = i32::try_from(request.paths.len()).map_err(permanent)?;
        let paths = Paths::builder()
            .quantity(quantity)
            .set_items(Some(request.paths.clone()))
            .build()
            .map_err(permanent)?;
        let batch = InvalidationBatch::builder()
            .paths(paths)
            .caller_reference(request.caller_reference.as_str())
            .build()
            .map_err(permanent)?;

        let output = self
            .session
            .block_on(
                self.client
                    .create_invalidation()
                    .distribution_id(&request.distribution_id)
                    .invalidation_batch(batch)
                    .send(),
            )
            .map_err(|err| {
                let reason = describe(&err);
                match classify(&err) {
                    FailureClass::Unauthorized => CdnError::Unauthorized { reason },
                    FailureClass::Transient => CdnError::Transient { reason },
                    FailureClass::Permanent => CdnError::Permanent { reason },
                }
            })?;

        output
            .invalidation()
            .map(|invalidation| invalidation.id().to_owned())
            .ok_or_else(|| CdnError::Permanent {
                reason: "response carried no invalidation".to_owned(),
            })
    }
}
