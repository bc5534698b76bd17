//! Shared AWS session for the S3 and CloudFront adapters.
//!
//! The SDK is asynchronous; the publisher is not. An [`AwsSession`] owns a
//! current-thread Tokio runtime and the loaded [`SdkConfig`], and the
//! adapters `block_on` each request. SDK-level retries are disabled because
//! [`crate::retry`] owns that concern.
//!
//! A custom endpoint applies to storage only. The shared config never
//! carries it, so CloudFront requests always go to AWS.

use crate::credentials::Credentials;
use crate::error::Result;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Provider name attached to the static credentials.
const PROVIDER_NAME: &str = "stork-publisher";

/// Error codes meaning the credentials were refused.
const UNAUTHORIZED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "InvalidAccessKeyId",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
];

/// Error codes for throttling or service hiccups worth retrying.
const TRANSIENT_CODES: &[&str] = &[
    "RequestTimeout",
    "SlowDown",
    "Throttling",
    "ThrottlingException",
    "ServiceUnavailable",
    "InternalError",
];

/// Connection settings for an [`AwsSession`].
#[derive(Debug, Clone, Copy)]
pub struct AwsSettings<'a> {
    /// Region of the bucket.
    pub region: &'a str,
    /// Custom S3-compatible endpoint for storage requests.
    pub endpoint_url: Option<&'a str>,
    /// Static credentials from the environment.
    pub credentials: &'a Credentials,
}

/// A loaded SDK configuration plus the runtime that drives it.
#[derive(Clone)]
pub struct AwsSession {
    runtime: Arc<Runtime>,
    config: SdkConfig,
    storage_endpoint: Option<String>,
}

impl std::fmt::Debug for AwsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSession")
            .field("region", &self.config.region())
            .field("storage_endpoint", &self.storage_endpoint)
            .finish_non_exhaustive()
    }
}

impl AwsSession {
    /// Build the runtime and load the SDK configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PublishError::Io`] if the runtime cannot be
    /// created.
    pub fn connect(settings: &AwsSettings<'_>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let credentials = aws_credential_types::Credentials::new(
            settings.credentials.access_key_id(),
            settings.credentials.secret_access_key(),
            settings.credentials.session_token().map(str::to_owned),
            None,
            PROVIDER_NAME,
        );

        let loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.to_owned()))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled());
        if let Some(endpoint) = settings.endpoint_url {
            log::info!("routing storage requests to {endpoint}");
        }

        let config = runtime.block_on(loader.load());
        log::debug!("AWS session ready for region {}", settings.region);

        Ok(Self {
            runtime: Arc::new(runtime),
            config,
            storage_endpoint: settings.endpoint_url.map(str::to_owned),
        })
    }

    /// The loaded SDK configuration.
    #[must_use]
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// The S3-compatible endpoint storage requests go to, if not AWS.
    #[must_use]
    pub fn storage_endpoint(&self) -> Option<&str> {
        self.storage_endpoint.as_deref()
    }

    /// Drive `future` to completion on the session runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// How an SDK failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureClass {
    Unauthorized,
    Transient,
    Permanent,
}

/// Sort an SDK error into [`FailureClass`] buckets.
pub(crate) fn classify<E: ProvideErrorMetadata>(err: &SdkError<E, HttpResponse>) -> FailureClass {
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            FailureClass::Transient
        }
        SdkError::ServiceError(context) => {
            let status = context.raw().status().as_u16();
            classify_service(err.code(), status)
        }
        _ => FailureClass::Permanent,
    }
}

fn classify_service(code: Option<&str>, status: u16) -> FailureClass {
    match code {
        Some(code) if UNAUTHORIZED_CODES.contains(&code) => FailureClass::Unauthorized,
        Some(code) if TRANSIENT_CODES.contains(&code) => FailureClass::Transient,
        _ if status == 401 || status == 403 => FailureClass::Unauthorized,
        _ if status == 429 || status >= 500 => FailureClass::Transient,
        _ => FailureClass::Permanent,
    }
}

/// Render an SDK error with its full source chain.
pub(crate) fn describe<E>(err: &SdkError<E, HttpResponse>) -> String
where
    E: std::error::Error + 'static,
{
    aws_sdk_s3::error::DisplayErrorContext(err).to_string()
}
