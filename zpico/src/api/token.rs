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
use std::{fmt, sync::Arc};

use zpico_result::ZResult;

use super::{key_expr::KeyExpr, session::WeakSession, Id};
use crate::net::registry::Registered;

pub(crate) struct TokenState {
    pub(crate) id: Id,
    pub(crate) key_expr: KeyExpr,
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.id)
            .field("key_expr", &self.key_expr)
            .finish()
    }
}

impl Registered for TokenState {
    fn id(&self) -> Id {
        self.id
    }

    fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }
}

/// A liveliness token: the peer sees it declared for as long as the token lives.
#[derive(Debug)]
pub struct Token {
    pub(crate) session: WeakSession,
    pub(crate) state: Arc<TokenState>,
    pub(crate) undeclare_on_drop: bool,
}

impl Token {
    pub fn id(&self) -> Id {
        self.state.id
    }

    pub fn key_expr(&self) -> &KeyExpr {
        &self.state.key_expr
    }

    pub fn undeclare(mut self) -> ZResult<()> {
        self.undeclare_impl()
    }

    fn undeclare_impl(&mut self) -> ZResult<()> {
        self.undeclare_on_drop = false;
        match self.session.upgrade() {
            Some(session) => session.undeclare_token_inner(self.state.id),
            None => Ok(()),
        }
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        if self.undeclare_on_drop {
            if let Err(error) = self.undeclare_impl() {
                tracing::error!(error);
            }
        }
    }
}
