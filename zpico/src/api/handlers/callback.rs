//
// Copyright (c) 2023 ZettaScale Technology
//
// This program and the accompanying materials are made available under the
// terms of the Eclipse Public License 2.0 which is available at
// http://www.eclipse.org/legal/epl-2.0, or the Apache License, Version 2.0
// which is available at https://www.apache.org/licenses/LICENSE-2.0.
//
// SPDX-License-Identifier: EPL-2.0 OR Apache-2.0
//
// Contributors:
//   ZettaScale Zenoh Team, <zenoh@zettascale.tech>
//

//! Callback handler trait.
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use zpico_core::zlock;

use super::{IntoHandler, API_DATA_RECEPTION_SEND_RETRY_MS};

/// Turn a [`FnMut`]`(T)` into a [`Fn`]`(T)` by guarding it with a [`Mutex`](std::sync::Mutex).
pub fn locked<T>(fnmut: impl FnMut(T)) -> impl Fn(T) {
    let lock = std::sync::Mutex::new(fnmut);
    move |x| zlock!(lock)(x)
}

/// Callback type used by zpico entities.
///
/// Every clone shares a `released` flag, raised by the session when it closes. Blocking
/// handlers poll it so that a full channel cannot hold the read task forever.
pub struct Callback<T> {
    f: Arc<dyn Fn(T) + Send + Sync>,
    released: Arc<AtomicBool>,
}

impl<T> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            released: self.released.clone(),
        }
    }
}

impl<T> Callback<T> {
    pub fn new(cb: Arc<dyn Fn(T) + Send + Sync>) -> Self {
        Self::with_release_flag(cb, Arc::new(AtomicBool::new(false)))
    }

    fn with_release_flag(f: Arc<dyn Fn(T) + Send + Sync>, released: Arc<AtomicBool>) -> Self {
        Self { f, released }
    }

    #[inline]
    pub fn call(&self, arg: T) {
        (self.f)(arg)
    }

    /// Whether both callbacks invoke the same closure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }

    /// Stop blocking handlers from waiting on their consumer.
    pub(crate) fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl<T> std::fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Callback")
    }
}

impl<T> IntoHandler<T> for Callback<T> {
    type Handler = ();

    fn into_handler(self) -> (Callback<T>, Self::Handler) {
        (self, ())
    }
}

impl<T, F> IntoHandler<T> for F
where
    F: Fn(T) + Send + Sync + 'static,
{
    type Handler = ();

    fn into_handler(self) -> (Callback<T>, Self::Handler) {
        (Callback::new(Arc::new(self)), ())
    }
}

impl<T, H> IntoHandler<T> for (Callback<T>, H) {
    type Handler = H;

    fn into_handler(self) -> (Callback<T>, Self::Handler) {
        self
    }
}

impl<T: Send + 'static> IntoHandler<T> for (flume::Sender<T>, flume::Receiver<T>) {
    type Handler = flume::Receiver<T>;

    fn into_handler(self) -> (Callback<T>, Self::Handler) {
        let (sender, receiver) = self;
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        let retry = Duration::from_millis(*API_DATA_RECEPTION_SEND_RETRY_MS);
        let send = move |mut t: T| loop {
            match sender.send_timeout(t, retry) {
                Ok(()) => return,
                Err(flume::SendTimeoutError::Timeout(back)) => {
                    if flag.load(Ordering::Acquire) {
                        tracing::debug!("Handler released, dropping event");
                        return;
                    }
                    t = back;
                }
                Err(e @ flume::SendTimeoutError::Disconnected(_)) => {
                    tracing::error!("{}", e);
                    return;
                }
            }
        };
        (Callback::with_release_flag(Arc::new(send), released), receiver)
    }
}

/// A handler made of two functions:
///  - `callback`: called for every event.
///  - `drop`: called once the handler is released by every declaration holding it.
///
/// `callback` is never called once `drop` has started, and `drop` runs exactly once, after
/// every `callback` invocation has returned.
pub struct CallbackDrop<Callback, DropFn>
where
    DropFn: FnMut() + Send + Sync + 'static,
{
    pub callback: Callback,
    pub drop: DropFn,
}

impl<Callback, DropFn> Drop for CallbackDrop<Callback, DropFn>
where
    DropFn: FnMut() + Send + Sync + 'static,
{
    fn drop(&mut self) {
        (self.drop)()
    }
}

impl<OnEvent, Event, DropFn> IntoHandler<Event> for CallbackDrop<OnEvent, DropFn>
where
    OnEvent: Fn(Event) + Send + Sync + 'static,
    DropFn: FnMut() + Send + Sync + 'static,
{
    type Handler = ();

    fn into_handler(self) -> (Callback<Event>, Self::Handler) {
        (move |evt| (self.callback)(evt)).into_handler()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn dropper_runs_once_after_last_clone() {
        let calls = Arc::new(AtomicUsize::new(0));
        let drops = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let d = drops.clone();
        let (cb, ()): (Callback<usize>, ()) = CallbackDrop {
            callback: move |n: usize| {
                c.fetch_add(n, Ordering::SeqCst);
            },
            drop: move || {
                d.fetch_add(1, Ordering::SeqCst);
            },
        }
        .into_handler();

        let alias = cb.clone();
        assert!(alias.ptr_eq(&cb));
        cb.call(2);
        alias.call(3);
        drop(cb);
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        drop(alias);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn released_channel_stops_waiting() {
        let (cb, rx) = flume::bounded::<u8>(1).into_handler();
        cb.call(1);
        let blocked = {
            let cb = cb.clone();
            std::thread::spawn(move || cb.call(2))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(!blocked.is_finished());
        cb.release();
        blocked.join().unwrap();
        assert!(cb.is_released());
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), [1]);
    }

    #[test]
    fn locked_fnmut() {
        let mut seen = Vec::new();
        {
            let f = locked(|x: u8| seen.push(x));
            f(1);
            f(2);
        }
        assert_eq!(seen, [1, 2]);
    }
}
