use std::error;
use std::fmt;

use archiver::archiver_error;
use archiver::error::{ArchiverError, ErrorKind};
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

/// Service error code reported for a missing table or delivery stream.
const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";

/// Converts an SDK error into an [`ArchiverError`].
///
/// A missing resource becomes `not_found`, every other failure becomes `otherwise`.
pub(crate) fn classify_sdk_error<E, R>(
    err: SdkError<E, R>,
    description: &'static str,
    not_found: ErrorKind,
    otherwise: ErrorKind,
) -> ArchiverError
where
    E: ProvideErrorMetadata + error::Error + Send + Sync + 'static,
    R: fmt::Debug + Send + Sync + 'static,
{
    let kind = match err.code() {
        Some(RESOURCE_NOT_FOUND) => not_found,
        _ => otherwise,
    };
    let detail = DisplayErrorContext(&err).to_string();

    archiver_error!(kind, description, detail = detail, source: err)
}
