use std::future::Future;

/// Call `done` once the outcome settles: with `None` on success, with the error otherwise.
pub async fn notify_when<F, T, E, C>(outcome: F, done: C)
where
    F: Future<Output = Result<T, E>>,
    C: FnOnce(Option<E>),
{
    match outcome.await {
        Ok(_) => done(None),
        Err(error) => done(Some(error)),
    }
}

/// Bridge a fallible future to a completion callback, see [notify_when].
///
/// Works on an assertion outcome as well as on the future of the response under test.
pub trait AndNotifyWhen<T, E>: Future<Output = Result<T, E>> + Sized {
    /// Call `done` once this future settles.
    fn and_notify_when<C>(self, done: C) -> impl Future<Output = ()>
    where
        C: FnOnce(Option<E>),
    {
        notify_when(self, done)
    }
}

impl<F, T, E> AndNotifyWhen<T, E> for F where F: Future<Output = Result<T, E>> {}
