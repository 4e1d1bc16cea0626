//! Element-wise stages: one element in, zero or more elements out.

use crate::core::{spawn_stage, Inlet, Outlet, Pipe};
use std::collections::HashSet;
use std::hash::Hash;

/// Forwards every element unchanged and in order.
#[must_use]
pub fn passthrough<T: Send + 'static>() -> Pipe<T, T> {
    spawn_stage(|mut input: Outlet<T>, output: Inlet<T>| async move {
        while let Some(item) = input.recv().await {
            if output.send(item).await.is_err() {
                return;
            }
        }
    })
}

/// Transforms every element with `f`.
pub fn map<I, O, F>(f: F) -> Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> O + Send + 'static,
{
    spawn_stage(move |mut input: Outlet<I>, output: Inlet<O>| async move {
        while let Some(item) = input.recv().await {
            if output.send(f(item)).await.is_err() {
                return;
            }
        }
    })
}

/// Keeps only the elements for which `predicate` returns true.
pub fn filter<T, F>(predicate: F) -> Pipe<T, T>
where
    T: Send + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    spawn_stage(move |mut input: Outlet<T>, output: Inlet<T>| async move {
        while let Some(item) = input.recv().await {
            if !predicate(&item) {
                continue;
            }
            if output.send(item).await.is_err() {
                return;
            }
        }
    })
}

/// Alias of [`filter`] that reads better when the intent is to keep matches.
pub fn keep_if<T, F>(predicate: F) -> Pipe<T, T>
where
    T: Send + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    filter(predicate)
}

/// Drops the elements matching `predicate` and keeps everything else.
pub fn drop_if<T, F>(predicate: F) -> Pipe<T, T>
where
    T: Send + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    filter(move |item| !predicate(item))
}

/// Maps every element to a collection and sends its items one at a time.
pub fn flat_map<I, O, C, F>(f: F) -> Pipe<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
    C: IntoIterator<Item = O>,
    F: Fn(I) -> C + Send + 'static,
{
    spawn_stage(move |mut input: Outlet<I>, output: Inlet<O>| async move {
        while let Some(item) = input.recv().await {
            // Collect first so a non-Send iterator never lives across an await.
            let items: Vec<O> = f(item).into_iter().collect();
            for out in items {
                if output.send(out).await.is_err() {
                    return;
                }
            }
        }
    })
}

/// Splits every incoming batch into its individual elements.
#[must_use]
pub fn flatten<T: Send + 'static>() -> Pipe<Vec<T>, T> {
    flat_map(|batch: Vec<T>| batch)
}

/// Running fold over the stream.
///
/// The first element is emitted unchanged and becomes the accumulator;
/// every later element is combined with it and the new accumulator is
/// emitted.
pub fn reduce<T, F>(f: F) -> Pipe<T, T>
where
    T: Clone + Send + 'static,
    F: Fn(T, T) -> T + Send + 'static,
{
    spawn_stage(move |mut input: Outlet<T>, output: Inlet<T>| async move {
        let mut acc: Option<T> = None;
        while let Some(item) = input.recv().await {
            let next = match acc.take() {
                None => item,
                Some(prev) => f(prev, item),
            };
            acc = Some(next.clone());
            if output.send(next).await.is_err() {
                return;
            }
        }
    })
}

/// Forwards only the first occurrence of each element.
#[must_use]
pub fn unique<T>() -> Pipe<T, T>
where
    T: Clone + Eq + Hash + Send + 'static,
{
    unique_by(T::clone)
}

/// Forwards only the first element seen for each key.
pub fn unique_by<T, K, F>(key: F) -> Pipe<T, T>
where
    T: Send + 'static,
    K: Eq + Hash + Send + 'static,
    F: Fn(&T) -> K + Send + 'static,
{
    spawn_stage(move |mut input: Outlet<T>, output: Inlet<T>| async move {
        let mut seen = HashSet::new();
        while let Some(item) = input.recv().await {
            if !seen.insert(key(&item)) {
                continue;
            }
            if output.send(item).await.is_err() {
                return;
            }
        }
    })
}
