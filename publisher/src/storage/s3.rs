//! S3 implementation of [`ObjectStore`].

use super::{ObjectStore, StoreError};
use crate::artefact::sha256_digest::Sha256Digest;
use crate::aws::{AwsSession, FailureClass, classify, describe};
use crate::destination::Destination;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

/// Uploads objects with `PutObject`.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    session: AwsSession,
    client: Client,
}

impl S3ObjectStore {
    /// Create a store on `session`.
    ///
    /// A storage endpoint on the session is applied here, with path-style
    /// addressing, which S3-compatible servers expect.
    #[must_use]
    pub fn new(session: AwsSession) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(session.config());
        if let Some(endpoint) = session.storage_endpoint() {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let config = builder.build();
        Self {
            client: Client::from_conf(config),
            session,
        }
    }
}

impl ObjectStore for S3ObjectStore {
    fn put_object(
        &self,
        destination: &Destination,
        body: &[u8],
        digest: &Sha256Digest,
    ) -> Result<(), StoreError> {
        let request = self
            .client
            .put_object()
            .bucket(&destination.bucket)
            .key(&destination.key)
            .body(ByteStream::from(body.to_vec()))
            .checksum_sha256(digest.to_base64())
            .set_content_type(destination.content_type.clone());

        let output = self.session.block_on(request.send()).map_err(|err| {
            let reason = describe(&err);
            match classify(&err) {
                FailureClass::Unauthorized => StoreError::Unauthorized { reason },
                FailureClass::Transient => StoreError::Transient { reason },
                FailureClass::Permanent => StoreError::Permanent { reason },
            }
        })?;

        log::debug!(
            "stored {destination} (etag {})",
            output.e_tag().unwrap_or("none")
        );
        Ok(())
    }
}
