//! Lazily built, invalidatable values with single-flight construction.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

enum State<T> {
    Unbuilt,
    Building {
        generation: u64,
        future: Shared<BoxFuture<'static, Arc<T>>>,
    },
    Ready(Arc<T>),
    Invalidated,
}

/// A value built on first use and shared by everyone who asks while the build
/// is in flight. Invalidating drops the value; the next caller rebuilds it.
pub struct Deferred<T> {
    state: Mutex<State<T>>,
    generation: Mutex<u64>,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::Unbuilt),
            generation: Mutex::new(0),
        }
    }
}

fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Send + Sync + 'static> Deferred<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value, building it with `build` unless it is ready or already being
    /// built. `build` is only called by the caller that starts a build.
    pub async fn get_or_build<F, Fut>(&self, build: F) -> Arc<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (generation, future) = {
            let mut state = lock(&self.state);
            match &*state {
                State::Ready(value) => return Arc::clone(value),
                State::Building { generation, future } => (*generation, future.clone()),
                State::Unbuilt | State::Invalidated => {
                    let generation = {
                        let mut counter = lock(&self.generation);
                        *counter += 1;
                        *counter
                    };
                    let future = build().map(Arc::new).boxed().shared();
                    *state = State::Building {
                        generation,
                        future: future.clone(),
                    };
                    (generation, future)
                }
            }
        };

        let value = future.await;
        let mut state = lock(&self.state);
        if matches!(&*state, State::Building { generation: g, .. } if *g == generation) {
            *state = State::Ready(Arc::clone(&value));
        }
        value
    }

    /// Forget the value; a build in flight finishes for its waiters but is not kept.
    pub fn invalidate(&self) {
        *lock(&self.state) = State::Invalidated;
    }

    pub fn get(&self) -> Option<Arc<T>> {
        match &*lock(&self.state) {
            State::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    pub fn is_building(&self) -> bool {
        matches!(&*lock(&self.state), State::Building { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_build() {
        let deferred = Arc::new(Deferred::<usize>::new());
        let builds = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let deferred = Arc::clone(&deferred);
            let builds = Arc::clone(&builds);
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                deferred
                    .get_or_build(move || async move {
                        builds.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        42
                    })
                    .await
            }));
        }
        while !deferred.is_building() {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        gate.notify_one();

        for handle in handles {
            assert_eq!(*handle.await.unwrap(), 42);
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(deferred.get().as_deref(), Some(&42));
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let deferred = Deferred::<String>::new();
        let first = deferred.get_or_build(|| async { "one".to_string() }).await;
        assert_eq!(*first, "one");
        let cached = deferred.get_or_build(|| async { "unused".to_string() }).await;
        assert_eq!(*cached, "one");

        deferred.invalidate();
        assert!(deferred.get().is_none());
        let rebuilt = deferred.get_or_build(|| async { "two".to_string() }).await;
        assert_eq!(*rebuilt, "two");
    }
}
