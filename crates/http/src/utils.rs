//! Internal helper macros.

/// Returns early with `$error` unless `$predicate` holds.
///
/// Like `assert!`, but for validation that must fail with an error instead of
/// panicking.
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
