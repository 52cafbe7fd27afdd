//! Shorthand for building and returning [`crate::error::ArchiverError`] values.

/// Builds an [`crate::error::ArchiverError`] from a kind and a static description.
///
/// An optional third argument adds dynamic detail: `detail = owned_string` moves a [`String`],
/// any other expression is rendered with `to_string()`. A trailing `source: err` attaches the
/// originating error.
#[macro_export]
macro_rules! archiver_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::ArchiverError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::ArchiverError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, detail = $detail:expr) => {
        $crate::error::ArchiverError::from(($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr, source: $source:expr) => {
        $crate::error::ArchiverError::from(($kind, $desc, $detail)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::ArchiverError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::ArchiverError::from(($kind, $desc, $detail.to_string()))
            .with_source($source)
    };
}

/// Returns early with an [`crate::error::ArchiverError`].
///
/// Accepts the same arguments as [`archiver_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::archiver_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::archiver_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr) => {
        return ::core::result::Result::Err($crate::archiver_error!($kind, $desc, detail = $detail))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::archiver_error!(
            $kind,
            $desc,
            detail = $detail,
            source: $source
        ))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::archiver_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::archiver_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
