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
use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use zpico_result::ZResult;

use super::{
    handlers::Callback,
    key_expr::KeyExpr,
    sample::Sample,
    session::WeakSession,
    Id,
};
use crate::net::registry::Registered;

pub(crate) struct SubscriberState {
    pub(crate) id: Id,
    pub(crate) key_expr: KeyExpr,
    pub(crate) callback: Callback<Sample>,
}

impl fmt::Debug for SubscriberState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("key_expr", &self.key_expr)
            .finish()
    }
}

impl Registered for SubscriberState {
    fn id(&self) -> Id {
        self.id
    }

    fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }
}

#[derive(Debug)]
pub(crate) struct SubscriberInner {
    pub(crate) session: WeakSession,
    pub(crate) state: Arc<SubscriberState>,
    // Subscriber is undeclared on drop unless its handler is a ZST, i.e. it is callback-only
    pub(crate) undeclare_on_drop: bool,
}

/// A subscriber that provides data through a handler.
///
/// Equal declarations (same key expression, same callback) share one entry in the session;
/// the entry is only undeclared on the wire once every subscriber sharing it is undeclared.
///
/// # Examples
/// ```no_run
/// # fn run(session: zpico::Session) -> zpico::ZResult<()> {
/// let subscriber = session.declare_subscriber("demo/**", zpico::handlers::RingChannel::new(16))?;
/// while let Ok(sample) = subscriber.recv() {
///     println!("{}: {:?}", sample.key_expr(), sample.payload());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Subscriber<Handler> {
    pub(crate) inner: SubscriberInner,
    pub(crate) handler: Handler,
}

impl<Handler> Subscriber<Handler> {
    pub fn id(&self) -> Id {
        self.inner.state.id
    }

    pub fn key_expr(&self) -> &KeyExpr {
        &self.inner.state.key_expr
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut Handler {
        &mut self.handler
    }

    /// Undeclare this subscriber. The callback is released once no other subscriber shares
    /// it, after any in-flight invocation returned.
    pub fn undeclare(mut self) -> ZResult<()> {
        self.undeclare_impl()
    }

    fn undeclare_impl(&mut self) -> ZResult<()> {
        // set the flag first to avoid double panic if this function panics
        self.inner.undeclare_on_drop = false;
        match self.inner.session.upgrade() {
            Some(session) => session.undeclare_subscriber_inner(self.inner.state.id),
            None => Ok(()),
        }
    }
}

impl<Handler> Drop for Subscriber<Handler> {
    fn drop(&mut self) {
        if self.inner.undeclare_on_drop {
            if let Err(error) = self.undeclare_impl() {
                tracing::error!(error);
            }
        }
    }
}

impl<Handler> Deref for Subscriber<Handler> {
    type Target = Handler;

    fn deref(&self) -> &Self::Target {
        self.handler()
    }
}

impl<Handler> DerefMut for Subscriber<Handler> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.handler_mut()
    }
}
