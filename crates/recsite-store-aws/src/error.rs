//! Mapping of AWS SDK errors onto [`StoreError`].

use std::error::Error;
use std::fmt::Debug;

use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use recsite_store::{ErrorStatus, StoreError, StoreErrorKind};

/// Walk the error source chain and join all messages.
pub(crate) fn error_chain(err: &dyn Error) -> String {
    let mut msgs = vec![err.to_string()];
    let mut source = err.source();
    while let Some(s) = source {
        msgs.push(s.to_string());
        source = s.source();
    }
    msgs.join(": ")
}

/// Map an AWS error code to a semantic kind and retry guidance.
pub(crate) fn classify(code: Option<&str>) -> (StoreErrorKind, ErrorStatus) {
    match code {
        Some(
            "NoSuchKey"
            | "NoSuchBucket"
            | "NoSuchDistribution"
            | "ResourceNotFoundException"
            | "QueueDoesNotExist"
            | "AWS.SimpleQueueService.NonExistentQueue",
        ) => (StoreErrorKind::NotFound, ErrorStatus::Permanent),
        Some(
            "AccessDenied"
            | "AccessDeniedException"
            | "InvalidClientTokenId"
            | "ExpiredToken"
            | "UnrecognizedClientException",
        ) => (StoreErrorKind::PermissionDenied, ErrorStatus::Permanent),
        Some(
            "Throttling"
            | "ThrottlingException"
            | "ProvisionedThroughputExceededException"
            | "RequestLimitExceeded"
            | "SlowDown"
            | "TooManyInvalidationsInProgress"
            | "AWS.SimpleQueueService.RequestThrottled",
        ) => (StoreErrorKind::RateLimited, ErrorStatus::Persistent),
        Some(
            "ServiceUnavailable" | "InternalError" | "InternalFailure" | "InternalServerError",
        ) => (StoreErrorKind::Unavailable, ErrorStatus::Persistent),
        Some(
            "ValidationException"
            | "InvalidArgument"
            | "InvalidParameterValue"
            | "ReceiptHandleIsInvalid",
        ) => (StoreErrorKind::InvalidKey, ErrorStatus::Permanent),
        _ => (StoreErrorKind::Other, ErrorStatus::Permanent),
    }
}

/// Convert an SDK call failure into a [`StoreError`].
pub(crate) fn sdk_error<E, R>(backend: &'static str, err: &SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + Error + 'static,
    R: Debug,
{
    let (kind, status) = match err {
        SdkError::TimeoutError(_) => (StoreErrorKind::Timeout, ErrorStatus::Temporary),
        SdkError::DispatchFailure(_) => (StoreErrorKind::Unavailable, ErrorStatus::Temporary),
        _ => classify(err.code()),
    };
    StoreError::new(kind)
        .with_status(status)
        .with_backend(backend)
        .with_message(error_chain(err))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_classify_not_found() {
        assert_eq!(
            classify(Some("ResourceNotFoundException")),
            (StoreErrorKind::NotFound, ErrorStatus::Permanent)
        );
        assert_eq!(
            classify(Some("AWS.SimpleQueueService.NonExistentQueue")),
            (StoreErrorKind::NotFound, ErrorStatus::Permanent)
        );
    }

    #[test]
    fn test_classify_throttling_is_retryable() {
        let (kind, status) = classify(Some("ProvisionedThroughputExceededException"));

        assert_eq!(kind, StoreErrorKind::RateLimited);
        assert_eq!(status, ErrorStatus::Persistent);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(
            classify(Some("SomethingNew")),
            (StoreErrorKind::Other, ErrorStatus::Permanent)
        );
        assert_eq!(classify(None), (StoreErrorKind::Other, ErrorStatus::Permanent));
    }

    #[test]
    fn test_error_chain_joins_sources() {
        let inner = std::io::Error::other("connection reset");
        let outer = StoreError::new(StoreErrorKind::Unavailable).with_source(inner);

        assert_eq!(error_chain(&outer), "Unavailable: connection reset: connection reset");
    }
}
