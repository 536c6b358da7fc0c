//! Input debouncer.
//!
//! Turns a live stream of raw input events into query strings: a value is
//! only forwarded once the input has been quiet for `delay`, and a value
//! equal to the previously forwarded one is swallowed.  Dropping the input
//! sender tears the task down; whatever was still pending is discarded.

use std::time::Duration;

use finder_proto::protocol::QueryEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Spawn a debouncer task.  `wrap` turns each settled query into whatever
/// the consumer on `output` expects.
pub fn spawn<T, F>(
    delay: Duration,
    mut input: mpsc::Receiver<QueryEvent>,
    output: mpsc::Sender<T>,
    wrap: F,
) -> JoinHandle<()>
where
    T: Send + 'static,
    F: Fn(String) -> T + Send + 'static,
{
    tokio::spawn(async move {
        let mut last_emitted: Option<String> = None;

        loop {
            let first = match input.recv().await {
                Some(ev) => ev,
                None => break,
            };
            let mut latest = first;

            // Every new event restarts the quiet period.
            loop {
                tokio::select! {
                    next = input.recv() => match next {
                        Some(ev) => latest = ev,
                        None => return,
                    },
                    _ = tokio::time::sleep(delay) => break,
                }
            }

            if last_emitted.as_deref() == Some(latest.text.as_str()) {
                trace!("debounce: unchanged {:?}, suppressed", latest.text);
                continue;
            }

            trace!(
                "debounce: settled {:?} after {:?}",
                latest.text,
                latest.at.elapsed()
            );
            last_emitted = Some(latest.text.clone());
            if output.send(wrap(latest.text)).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Instant};

    const DELAY: Duration = Duration::from_millis(300);

    fn start() -> (mpsc::Sender<QueryEvent>, mpsc::Receiver<String>) {
        let (in_tx, in_rx) = mpsc::channel(16);
        let (out_tx, out_rx) = mpsc::channel(16);
        spawn(DELAY, in_rx, out_tx, |q| q);
        (in_tx, out_rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_emits_only_final_value() {
        let (tx, mut rx) = start();
        for q in ["c", "ca", "cat"] {
            tx.send(QueryEvent::now(q)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(rx.recv().await.as_deref(), Some("cat"));
        assert!(timeout(Duration::from_secs(5), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_full_quiet_period() {
        let (tx, mut rx) = start();
        let sent = Instant::now();
        tx.send(QueryEvent::now("biology")).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("biology"));
        assert!(sent.elapsed() >= DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_value_is_suppressed() {
        let (tx, mut rx) = start();
        tx.send(QueryEvent::now("cat")).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("cat"));

        // Typed and deleted within the window: settles back on "cat"
        tx.send(QueryEvent::now("cats")).await.unwrap();
        tx.send(QueryEvent::now("cat")).await.unwrap();
        assert!(timeout(Duration::from_secs(5), rx.recv()).await.is_err());

        tx.send(QueryEvent::now("dog")).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("dog"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_quiet_periods_emit_separately() {
        let (tx, mut rx) = start();
        tx.send(QueryEvent::now("art")).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("art"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(QueryEvent::now("arts")).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("arts"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_discards_pending() {
        let (tx, mut rx) = start();
        tx.send(QueryEvent::now("pending")).await.unwrap();
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }
}
