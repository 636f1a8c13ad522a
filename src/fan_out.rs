//! Concurrent fan-out with a fail-fast join
//!
//! A view that needs several independent resources issues every request at
//! once and treats the set as one result: if any request fails, the whole
//! set fails and the values that did arrive are dropped.

use std::future::Future;

use futures::future::try_join_all;

use crate::error::RequestError;

/// Await every future concurrently; the first failure fails the set.
///
/// Results are returned in the order of `requests`.
pub async fn join_fail_fast<I, F, T>(requests: I) -> Result<Vec<T>, RequestError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, RequestError>>,
{
    try_join_all(requests).await
}
