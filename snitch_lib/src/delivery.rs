//! Callback-style delivery on top of the async operations.
//!
//! Every [`crate::Client`] operation is an `async fn` returning
//! `Result<T, Error>`; awaiting it is the primary entry point. [`with_callback`]
//! adapts any of them to a `(error, result)` callback without a second code
//! path in the client.

use crate::error::Error;
use std::future::Future;

/// Run `operation` and hand its outcome to `callback`.
///
/// The callback is invoked exactly once, with `(None, Some(value))` on
/// success or `(Some(error), None)` on failure, and its return value is
/// passed back in `Ok`. Validation errors raised before any network call
/// ([`Error::is_preflight`]) skip the callback and come back as `Err`.
///
/// ```no_run
/// # async fn demo(client: &snitch_lib::Client) -> Result<(), snitch_lib::Error> {
/// use snitch_lib::delivery::with_callback;
///
/// with_callback(client.get_snitch("c2354d53d2"), |err, snitch| {
///     match (err, snitch) {
///         (Some(e), _) => eprintln!("lookup failed: {}", e),
///         (None, Some(s)) => println!("{:?}", s),
///         (None, None) => {}
///     }
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_callback<T, R, Fut, F>(operation: Fut, callback: F) -> Result<R, Error>
where
    Fut: Future<Output = Result<T, Error>>,
    F: FnOnce(Option<Error>, Option<T>) -> R,
{
    match operation.await {
        Ok(value) => Ok(callback(None, Some(value))),
        Err(err) if err.is_preflight() => Err(err),
        Err(err) => Ok(callback(Some(err), None)),
    }
}
