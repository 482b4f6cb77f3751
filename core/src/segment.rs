//! Splitting bulk operations into requests the service will accept.
//!
//! The service fails bulk requests above roughly 100 items, so a bulk
//! create/update/delete is sent as consecutive chunks of at most
//! `max_chunk` items. Chunks run strictly in order, one after another, and
//! their results are concatenated in the same order.
//!
//! A segmented operation is not atomic: if chunk `k` fails, chunks before it
//! have already been applied and chunks after it are never sent.

use std::ops::Range;

use tracing::debug;

use crate::error::ApiError;

/// Index ranges of the chunks for `len` items. Empty for `len == 0`.
pub fn plan_chunks(len: usize, max_chunk: usize) -> Result<Vec<Range<usize>>, ApiError> {
    if max_chunk == 0 {
        return Err(ApiError::validation("chunk size must be positive"));
    }
    Ok((0..len)
        .step_by(max_chunk)
        .map(|start| start..len.min(start + max_chunk))
        .collect())
}

/// Run `op` once per chunk of `items` and concatenate the results.
///
/// When everything fits in one chunk, `op` is called once with all items
/// and its result is returned as is. The first error is returned
/// immediately.
pub fn segmented<T, R, F>(items: &[T], max_chunk: usize, mut op: F) -> Result<Vec<R>, ApiError>
where
    F: FnMut(&[T]) -> Result<Vec<R>, ApiError>,
{
    let chunks = plan_chunks(items.len(), max_chunk)?;
    match chunks.len() {
        0 => return Ok(Vec::new()),
        1 => return op(items),
        n => debug!(items = items.len(), chunks = n, max_chunk, "segmenting bulk operation"),
    }

    let mut output = Vec::with_capacity(items.len());
    for (index, range) in chunks.into_iter().enumerate() {
        debug!(chunk = index, size = range.len(), "sending chunk");
        output.extend(op(&items[range])?);
    }
    Ok(output)
}
