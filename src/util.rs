use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

/// Run `fut` unless `cancel` fires first. A cancelled future is dropped, which
/// aborts any request it had in flight.
pub(crate) async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ClientError::Cancelled),
        res = fut => res,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let res = cancellable(&cancel, async { Ok::<_, ClientError>(5) }).await;
        assert_eq!(res.unwrap(), 5);
    }

    #[tokio::test]
    async fn cancellation_wins_over_pending_work() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let res = cancellable(&cancel, std::future::pending::<Result<(), ClientError>>()).await;
        assert!(matches!(res, Err(ClientError::Cancelled)));
    }
}
