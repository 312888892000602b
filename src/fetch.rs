//! Bounded worker pool for per-chapter image fetches
//!
//! A fixed number of workers pull `(index, url)` pairs from a shared queue
//! and write each result into the slot addressed by its index, so network
//! completion order never affects output order. One slot failing is
//! recorded in place and does not cancel sibling fetches; the chapter-level
//! caller decides what a partial chapter means. The pool performs a single
//! attempt per URL; retry belongs to the fetch function it is given (see
//! [`crate::retry`]).

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Fetch every URL with at most `pool_size` concurrent workers.
///
/// The output has the same length and order as `urls`: `output[i]` is the
/// outcome of fetching `urls[i]`, regardless of pool size or completion
/// timing. Pool size 0 is treated as 1.
pub async fn fetch_all<F, Fut>(
    urls: &[String],
    pool_size: usize,
    fetch_one: F,
) -> Vec<Result<Vec<u8>>>
where
    F: Fn(String) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<u8>>> + Send,
{
    if urls.is_empty() {
        return Vec::new();
    }

    let workers = pool_size.max(1).min(urls.len());
    let urls = Arc::new(urls.to_vec());
    let next_index = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = tokio::sync::mpsc::channel::<(usize, Result<Vec<u8>>)>(urls.len());

    for _ in 0..workers {
        let urls = Arc::clone(&urls);
        let next_index = Arc::clone(&next_index);
        let tx = tx.clone();
        let fetch_one = fetch_one.clone();

        tokio::spawn(async move {
            loop {
                let index = next_index.fetch_add(1, Ordering::SeqCst);
                let Some(url) = urls.get(index) else {
                    break;
                };
                let result = fetch_one(url.clone()).await;
                if tx.send((index, result)).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(tx);

    let mut slots: Vec<Option<Result<Vec<u8>>>> = (0..urls.len()).map(|_| None).collect();
    while let Some((index, result)) = rx.recv().await {
        slots[index] = Some(result);
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                // Only reachable if a worker panicked mid-fetch.
                Err(Error::Io(std::io::Error::other("fetch worker terminated")))
            })
        })
        .collect()
}
