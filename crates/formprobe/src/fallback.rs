//! Ordered fallback over equivalent attempts.
//!
//! Attempts run strictly one after another; precedence is the iteration
//! order, never whichever finishes first.

use crate::result::{FormprobeError, FormprobeResult};
use std::future::Future;

/// A failed attempt and the input that produced it
#[derive(Debug)]
pub struct AttemptFailure<T> {
    /// Position of the attempt in the input order
    pub index: usize,
    /// Input that was attempted
    pub item: T,
    /// Why it failed
    pub error: FormprobeError,
}

/// Run `attempt` on each item in order and return the first success.
///
/// Items after the first success are never attempted. When every attempt
/// fails, all failures are returned in the order they occurred.
pub async fn first_ok<I, T, R, F, Fut>(
    items: I,
    mut attempt: F,
) -> Result<R, Vec<AttemptFailure<T>>>
where
    I: IntoIterator<Item = T>,
    T: Clone,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = FormprobeResult<R>>,
{
    let mut failures = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        match attempt(item.clone()).await {
            Ok(value) => return Ok(value),
            Err(error) => failures.push(AttemptFailure { index, item, error }),
        }
    }
    Err(failures)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn test_returns_first_success_and_stops() {
        let seen = RefCell::new(Vec::new());
        let result = first_ok([1, 2, 3, 4], |n| {
            seen.borrow_mut().push(n);
            async move {
                if n >= 2 {
                    Ok(n * 10)
                } else {
                    Err(FormprobeError::page("no"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 20);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_collects_every_failure_in_order() {
        let failures = first_ok(["a", "b"], |s| async move {
            Err::<(), _>(FormprobeError::page(format!("{s} failed")))
        })
        .await
        .unwrap_err();

        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].index, 0);
        assert_eq!(failures[1].item, "b");
        assert!(failures[1].error.to_string().contains("b failed"));
    }

    #[tokio::test]
    async fn test_empty_input_has_no_failures() {
        let failures = first_ok(Vec::<u8>::new(), |_| async { Ok::<_, FormprobeError>(()) })
            .await
            .unwrap_err();
        assert!(failures.is_empty());
    }
}
