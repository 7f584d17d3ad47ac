use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// Run `op` against each candidate in order and return the first success.
///
/// Every failure except the last is logged and swallowed; the last one is
/// returned. An empty candidate list yields `None`.
pub async fn first_success<C, T, E, F, Fut>(candidates: &[C], mut op: F) -> Option<Result<T, E>>
where
    C: Clone + Display,
    E: Display,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last = None;
    for (attempt, candidate) in candidates.iter().enumerate() {
        match op(candidate.clone()).await {
            Ok(value) => return Some(Ok(value)),
            Err(err) => {
                if attempt + 1 < candidates.len() {
                    warn!(attempt = attempt + 1, %candidate, "attempt failed, falling back: {}", err);
                }
                last = Some(Err(err));
            }
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_returns_first_success() {
        let calls = AtomicUsize::new(0);
        let result = first_success(&["bad", "good", "unused"], |c| {
            calls.fetch_add(1, Ordering::SeqCst);
            let c = c.to_string();
            async move {
                if c == "bad" {
                    Err(format!("{} failed", c))
                } else {
                    Ok(c)
                }
            }
        })
        .await;

        assert_eq!(result, Some(Ok("good".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_returns_last_error() {
        let result: Option<Result<(), String>> =
            first_success(&["a", "b"], |c| {
                let c = c.to_string();
                async move { Err(format!("{} failed", c)) }
            })
            .await;

        assert_eq!(result, Some(Err("b failed".to_string())));
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let candidates: [&str; 0] = [];
        let result: Option<Result<(), String>> =
            first_success(&candidates, |_| async { Ok(()) }).await;
        assert!(result.is_none());
    }
}
