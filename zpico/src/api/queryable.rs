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

use uhlc::HLC;
use zpico_buffers::ZBuf;
use zpico_protocol::{
    core::{Encoding, EntityGlobalId, EntityId, WireExpr, ZenohId},
    network::{response, RequestId, Response, ResponseFinal},
    zenoh::{self, err::ext::ErrBodyType, ConsolidationMode, ResponseBody},
};
use zpico_result::{bail, ZResult};

use super::{handlers::Callback, key_expr::KeyExpr, session::WeakSession, Id};
use crate::net::{primitives::Primitives, registry::Registered};

pub(crate) struct QueryInner {
    pub(crate) key_expr: KeyExpr,
    pub(crate) parameters: String,
    pub(crate) qid: RequestId,
    pub(crate) zid: ZenohId,
    pub(crate) primitives: Arc<dyn Primitives>,
    pub(crate) hlc: Option<Arc<HLC>>,
    pub(crate) value: Option<(ZBuf, Encoding)>,
}

impl Drop for QueryInner {
    fn drop(&mut self) {
        let res = self.primitives.send_response_final(ResponseFinal {
            rid: self.qid,
            ext_qos: response::ext::QoSType::RESPONSE_FINAL,
            ext_tstamp: None,
        });
        if let Err(e) = res {
            tracing::debug!("Unable to finalize query {}: {}", self.qid, e);
        }
    }
}

/// A query received by a queryable.
///
/// The querier is told that no more reply will come once the last clone is dropped.
#[derive(Clone)]
pub struct Query {
    pub(crate) inner: Arc<QueryInner>,
    pub(crate) eid: EntityId,
}

impl Query {
    #[inline(always)]
    pub fn key_expr(&self) -> &KeyExpr {
        &self.inner.key_expr
    }

    #[inline(always)]
    pub fn parameters(&self) -> &str {
        &self.inner.parameters
    }

    #[inline(always)]
    pub fn payload(&self) -> Option<&ZBuf> {
        self.inner.value.as_ref().map(|(p, _)| p)
    }

    #[inline(always)]
    pub fn encoding(&self) -> Option<&Encoding> {
        self.inner.value.as_ref().map(|(_, e)| e)
    }

    fn accepts_replies_on(&self, key_expr: &KeyExpr) -> bool {
        self.inner.key_expr.intersects(key_expr)
            || self.inner.parameters.split('&').any(|p| p == "_anyke")
    }

    fn respid(&self) -> Option<response::ext::ResponderIdType> {
        Some(response::ext::ResponderIdType {
            id: EntityGlobalId {
                zid: self.inner.zid,
                eid: self.eid,
            },
        })
    }

    /// Reply with `payload` on `key_expr`, which must intersect the query's key expression
    /// unless the querier accepts any key.
    pub fn reply<TryIntoKeyExpr, IntoZBuf>(
        &self,
        key_expr: TryIntoKeyExpr,
        payload: IntoZBuf,
    ) -> ZResult<()>
    where
        TryIntoKeyExpr: TryInto<KeyExpr>,
        <TryIntoKeyExpr as TryInto<KeyExpr>>::Error: Into<zpico_result::Error>,
        IntoZBuf: Into<ZBuf>,
    {
        self.reply_with_encoding(key_expr, payload, Encoding::empty())
    }

    pub fn reply_with_encoding<TryIntoKeyExpr, IntoZBuf>(
        &self,
        key_expr: TryIntoKeyExpr,
        payload: IntoZBuf,
        encoding: Encoding,
    ) -> ZResult<()>
    where
        TryIntoKeyExpr: TryInto<KeyExpr>,
        <TryIntoKeyExpr as TryInto<KeyExpr>>::Error: Into<zpico_result::Error>,
        IntoZBuf: Into<ZBuf>,
    {
        let key_expr: KeyExpr = key_expr.try_into().map_err(Into::into)?;
        if !self.accepts_replies_on(&key_expr) {
            bail!(
                "Attempted to reply on `{}`, which does not intersect with query `{}`",
                key_expr,
                self.inner.key_expr
            );
        }
        let timestamp = self.inner.hlc.as_ref().map(|hlc| hlc.new_timestamp());
        self.inner.primitives.send_response(Response {
            rid: self.inner.qid,
            wire_expr: WireExpr::from(key_expr.to_string()),
            payload: ResponseBody::Reply(zenoh::Reply {
                timestamp,
                encoding,
                ext_sinfo: None,
                ext_consolidation: ConsolidationMode::DEFAULT,
                ext_unknown: vec![],
                payload: payload.into(),
            }),
            ext_qos: response::ext::QoSType::RESPONSE,
            ext_tstamp: None,
            ext_respid: self.respid(),
        })
    }

    /// Reply with an error. Error replies are not bound to a key expression.
    pub fn reply_err<IntoZBuf>(&self, payload: IntoZBuf) -> ZResult<()>
    where
        IntoZBuf: Into<ZBuf>,
    {
        self.inner.primitives.send_response(Response {
            rid: self.inner.qid,
            wire_expr: WireExpr::from(self.inner.key_expr.to_string()),
            payload: ResponseBody::Err(zenoh::Err {
                code: 0,
                is_infrastructure: false,
                timestamp: None,
                ext_sinfo: None,
                ext_body: Some(ErrBodyType {
                    encoding: Encoding::empty(),
                    payload: payload.into(),
                }),
                ext_unknown: vec![],
            }),
            ext_qos: response::ext::QoSType::RESPONSE,
            ext_tstamp: None,
            ext_respid: self.respid(),
        })
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key_expr", &self.inner.key_expr)
            .field("parameters", &self.inner.parameters)
            .finish()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inner.parameters.is_empty() {
            write!(f, "{}", self.inner.key_expr)
        } else {
            write!(f, "{}?{}", self.inner.key_expr, self.inner.parameters)
        }
    }
}

pub(crate) struct QueryableState {
    pub(crate) id: Id,
    pub(crate) key_expr: KeyExpr,
    pub(crate) complete: bool,
    pub(crate) callback: Callback<Query>,
}

impl fmt::Debug for QueryableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queryable")
            .field("id", &self.id)
            .field("key_expr", &self.key_expr)
            .field("complete", &self.complete)
            .finish()
    }
}

impl Registered for QueryableState {
    fn id(&self) -> Id {
        self.id
    }

    fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }
}

#[derive(Debug)]
pub(crate) struct QueryableInner {
    pub(crate) session: WeakSession,
    pub(crate) state: Arc<QueryableState>,
    // Queryable is undeclared on drop unless its handler is a ZST, i.e. it is callback-only
    pub(crate) undeclare_on_drop: bool,
}

/// A queryable that provides queries through a handler.
///
/// # Examples
/// ```no_run
/// # fn run(session: zpico::Session) -> zpico::ZResult<()> {
/// let queryable = session.declare_queryable(
///     "demo/example/**",
///     false,
///     zpico::handlers::FifoChannel::new(8),
/// )?;
/// while let Ok(query) = queryable.recv() {
///     query.reply("demo/example/a", "value")?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Queryable<Handler> {
    pub(crate) inner: QueryableInner,
    pub(crate) handler: Handler,
}

impl<Handler> Queryable<Handler> {
    pub fn id(&self) -> Id {
        self.inner.state.id
    }

    pub fn key_expr(&self) -> &KeyExpr {
        &self.inner.state.key_expr
    }

    pub fn complete(&self) -> bool {
        self.inner.state.complete
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut Handler {
        &mut self.handler
    }

    pub fn undeclare(mut self) -> ZResult<()> {
        self.undeclare_impl()
    }

    fn undeclare_impl(&mut self) -> ZResult<()> {
        // set the flag first to avoid double panic if this function panics
        self.inner.undeclare_on_drop = false;
        match self.inner.session.upgrade() {
            Some(session) => session.undeclare_queryable_inner(self.inner.state.id),
            None => Ok(()),
        }
    }
}

impl<Handler> Drop for Queryable<Handler> {
    fn drop(&mut self) {
        if self.inner.undeclare_on_drop {
            if let Err(error) = self.undeclare_impl() {
                tracing::error!(error);
            }
        }
    }
}

impl<Handler> Deref for Queryable<Handler> {
    type Target = Handler;

    fn deref(&self) -> &Self::Target {
        self.handler()
    }
}

impl<Handler> DerefMut for Queryable<Handler> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.handler_mut()
    }
}
