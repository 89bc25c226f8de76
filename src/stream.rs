use std::fmt::Display;
use std::io;

use bytes::Bytes;
use futures::{Stream, StreamExt};

/// Hard cap on relayed payloads: 20 MiB.
pub const MAX_PAYLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Wrap a byte stream so it errors out the moment cumulative bytes exceed
/// `cap`. Declared Content-Length is irrelevant here; only counted bytes
/// matter, which protects the relay against absent, wrong, or adversarial
/// length claims.
pub fn limit_bytes<S, E>(stream: S, cap: u64) -> impl Stream<Item = Result<Bytes, io::Error>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let mut total: u64 = 0;
    stream.map(move |chunk| match chunk {
        Ok(bytes) => {
            total += bytes.len() as u64;
            if total > cap {
                Err(io::Error::other("payload exceeds maximum size"))
            } else {
                Ok(bytes)
            }
        }
        Err(err) => Err(io::Error::other(err.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(sizes: &[usize]) -> Vec<Result<Bytes, io::Error>> {
        sizes
            .iter()
            .map(|&n| Ok(Bytes::from(vec![0u8; n])))
            .collect()
    }

    #[tokio::test]
    async fn passes_streams_under_the_cap() {
        let limited = limit_bytes(stream::iter(chunks(&[400, 400, 200])), 1000);
        let collected: Vec<_> = limited.collect().await;
        assert_eq!(collected.len(), 3);
        assert!(collected.iter().all(|c| c.is_ok()));
    }

    #[tokio::test]
    async fn aborts_before_delivering_past_the_cap() {
        let limited = limit_bytes(stream::iter(chunks(&[600, 600, 600])), 1000);
        let collected: Vec<_> = limited.collect().await;
        // First chunk passes, second crosses the cap and errors.
        assert!(collected[0].is_ok());
        assert!(collected[1].is_err());
        let delivered: u64 = collected
            .iter()
            .filter_map(|c| c.as_ref().ok())
            .map(|b| b.len() as u64)
            .sum();
        assert!(delivered <= 1000);
    }

    #[tokio::test]
    async fn exact_cap_is_allowed() {
        let limited = limit_bytes(stream::iter(chunks(&[500, 500])), 1000);
        let collected: Vec<_> = limited.collect().await;
        assert!(collected.iter().all(|c| c.is_ok()));
    }

    #[tokio::test]
    async fn upstream_errors_are_propagated() {
        let source = stream::iter(vec![
            Ok::<_, io::Error>(Bytes::from_static(b"ok")),
            Err(io::Error::other("upstream reset")),
        ]);
        let limited = limit_bytes(source, 1000);
        let collected: Vec<_> = limited.collect().await;
        assert!(collected[0].is_ok());
        assert!(collected[1].is_err());
    }
}
