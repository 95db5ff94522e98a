//! Classification of AWS SDK errors into retryable and fatal scheduler
//! errors.

use aws_sdk_ecs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use migrun_core::scheduler::SchedulerError;

/// Service error codes worth retrying.
const RETRYABLE_CODES: &[&str] = &[
    "ServerException",
    "ThrottlingException",
    "Throttling",
    "RequestLimitExceeded",
    "ServiceUnavailable",
    "RequestTimeout",
];

pub fn is_retryable_code(code: Option<&str>) -> bool {
    code.is_some_and(|code| RETRYABLE_CODES.contains(&code))
}

/// Classify a failed status/stop call.
///
/// Timeouts, dispatch and response failures are transient, as are
/// throttling and server-side service errors.  Everything else is fatal.
pub fn classify<E, R>(err: &SdkError<E, R>) -> SchedulerError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(err).to_string();

    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            SchedulerError::Transient(message)
        }
        SdkError::ServiceError(service) if is_retryable_code(service.err().code()) => {
            SchedulerError::Transient(message)
        }
        _ => SchedulerError::Fatal(message),
    }
}

/// A failed `RunTask` call is always a launch error, never retried.
pub fn launch_error<E, R>(err: &SdkError<E, R>) -> SchedulerError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    SchedulerError::Launch(DisplayErrorContext(err).to_string())
}
