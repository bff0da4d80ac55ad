use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::{Outcome, Result};

type CallFn<T> = dyn Fn() -> BoxFuture<'static, Outcome<T>> + Send + Sync;

/// An opaque, repeatable transport call.
///
/// The coordinator invokes it once per attempt, so it has to produce a fresh
/// future on every call.
pub struct RequestFn<T>(Arc<CallFn<T>>);

impl<T: 'static> RequestFn<T> {
    /// Wrap an async closure as a transport call
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        Self(Arc::new(move || f().boxed()))
    }

    pub(crate) fn call(&self) -> BoxFuture<'static, Outcome<T>> {
        (self.0)()
    }
}

impl<T> Clone for RequestFn<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for RequestFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestFn")
    }
}

/// The eventual result of a submitted request.
///
/// `Pending` can be cloned and awaited from several places; every clone
/// resolves to the same result.
#[must_use = "a pending result does nothing unless awaited"]
pub struct Pending<T: Clone> {
    inner: Shared<BoxFuture<'static, Result<T>>>,
}

impl<T> Pending<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }
}

impl<T: Clone> Clone for Pending<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl<T: Clone> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("settled", &self.inner.peek().is_some())
            .finish()
    }
}
