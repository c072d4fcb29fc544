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
use std::fmt;

use zpico_buffers::ZBuf;
use zpico_protocol::core::{Encoding, ExprId, Reliability, Timestamp};
use zpico_result::ZResult;

use super::{
    key_expr::KeyExpr,
    sample::{SampleKind, SourceInfo},
    session::WeakSession,
    Id,
};
use crate::net::filtering::{WriteFilter, WriteFilterState};

/// Options of a `put` or a `delete`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub encoding: Encoding,
    pub reliability: Reliability,
    /// Overrides the session clock, if any.
    pub timestamp: Option<Timestamp>,
    pub source_info: Option<SourceInfo>,
}

impl PutOptions {
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn reliability(mut self, reliability: Reliability) -> Self {
        self.reliability = reliability;
        self
    }

    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn source_info(mut self, source_info: SourceInfo) -> Self {
        self.source_info = Some(source_info);
        self
    }
}

/// A publisher on a fixed key expression.
///
/// The key expression is declared to the peer once, so publications only carry its
/// numerical alias. When interests are enabled, publications are not sent at all while
/// the peer has no matching subscriber.
///
/// # Examples
/// ```no_run
/// # fn run(session: zpico::Session) -> zpico::ZResult<()> {
/// let publisher = session.declare_publisher("demo/example/temperature")?;
/// publisher.put("21.5")?;
/// # Ok(())
/// # }
/// ```
pub struct Publisher {
    pub(crate) session: WeakSession,
    pub(crate) id: Id,
    pub(crate) key_expr: KeyExpr,
    pub(crate) expr_id: ExprId,
    pub(crate) filter: Option<WriteFilter>,
    pub(crate) undeclare_on_drop: bool,
}

impl Publisher {
    pub fn id(&self) -> Id {
        self.id
    }

    pub fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }

    /// The state of the write filter, `None` when interests are disabled.
    pub fn write_filter(&self) -> Option<WriteFilterState> {
        self.filter.as_ref().map(WriteFilter::state)
    }

    fn is_filtered(&self) -> bool {
        self.filter.as_ref().is_some_and(WriteFilter::is_active)
    }

    pub fn put<IntoZBuf: Into<ZBuf>>(&self, payload: IntoZBuf) -> ZResult<()> {
        self.put_with(payload, PutOptions::default())
    }

    pub fn put_with<IntoZBuf: Into<ZBuf>>(
        &self,
        payload: IntoZBuf,
        options: PutOptions,
    ) -> ZResult<()> {
        self.resolve_put(SampleKind::Put, payload.into(), options)
    }

    pub fn delete(&self) -> ZResult<()> {
        self.delete_with(PutOptions::default())
    }

    pub fn delete_with(&self, options: PutOptions) -> ZResult<()> {
        self.resolve_put(SampleKind::Delete, ZBuf::empty(), options)
    }

    fn resolve_put(&self, kind: SampleKind, payload: ZBuf, options: PutOptions) -> ZResult<()> {
        if self.is_filtered() {
            tracing::trace!("Write filter active on {}: publication skipped", self.key_expr);
            return Ok(());
        }
        self.session
            .upgrade_or_closed()?
            .resolve_put(&self.key_expr, kind, payload, options)
    }

    pub fn undeclare(mut self) -> ZResult<()> {
        self.undeclare_impl()
    }

    fn undeclare_impl(&mut self) -> ZResult<()> {
        // set the flag first to avoid double panic if this function panics
        self.undeclare_on_drop = false;
        let Some(session) = self.session.upgrade() else {
            return Ok(());
        };
        let filter = self.filter.take().map(|f| f.undeclare(&session));
        session.undeclare_keyexpr_inner(self.expr_id)?;
        filter.unwrap_or(Ok(()))
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("id", &self.id)
            .field("key_expr", &self.key_expr)
            .field("write_filter", &self.write_filter())
            .finish()
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        if self.undeclare_on_drop {
            if let Err(error) = self.undeclare_impl() {
                tracing::error!(error);
            }
        }
    }
}
