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
    fmt, mem,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Mutex, RwLock, Weak,
    },
    time::Instant,
};

use uhlc::{HLCBuilder, HLC};
use zpico_buffers::ZBuf;
use zpico_core::{zlock, zread, zwrite};
use zpico_protocol::{
    core::{ExprId, Timestamp, WhatAmI, WireExpr, ZenohId},
    network::{
        declare::{
            self, common::ext::WireExprType, queryable::ext::QueryableInfoType, DeclareFinal,
            DeclareKeyExpr, DeclareQueryable, DeclareSubscriber, DeclareToken, UndeclareKeyExpr,
            UndeclareQueryable, UndeclareSubscriber, UndeclareToken,
        },
        interest::{self, InterestId, InterestMode, InterestOptions},
        push, request,
        request::ext::TargetType,
        Declare, DeclareBody, Interest, NetworkBody, NetworkMessage, Push, Request, RequestId,
        Response, ResponseFinal,
    },
    transport::close,
    zenoh::{
        self, query::ext::QueryBodyType, ConsolidationMode, PushBody, RequestBody, ResponseBody,
    },
};
use zpico_result::{errno, zerror, ZResult};

use super::{
    handlers::{Callback, FifoChannel, IntoHandler, RingChannel},
    key_expr::KeyExpr,
    publisher::{PutOptions, Publisher},
    query::{GetOptions, Reply, ReplyError},
    queryable::{Query, QueryInner, Queryable, QueryableInner, QueryableState},
    sample::{Sample, SampleKind},
    subscriber::{Subscriber, SubscriberInner, SubscriberState},
    token::{Token, TokenState},
    Id,
};
use crate::{
    config::Config,
    net::{
        filtering::WriteFilter,
        interest::{DeclareData, DeclareKind, InterestMsg, InterestMsgKind, InterestState, RemoteDeclares},
        primitives::Primitives,
        query::{Delivery, PendingQueries, PendingQuery},
        registry::{Declared, Registry, Resources},
        transport::{Link, TransportPeer, TransportPeerEventHandler, TransportUnicast},
    },
};

fn declare(body: DeclareBody) -> Declare {
    Declare {
        interest_id: None,
        ext_qos: declare::ext::QoSType::DECLARE,
        ext_tstamp: None,
        ext_nodeid: declare::ext::NodeIdType::DEFAULT,
        body,
    }
}

fn deliver(deliveries: Vec<Delivery>) {
    for (callback, reply) in deliveries {
        callback.call(reply);
    }
}

pub(crate) struct SessionState {
    pub(crate) primitives: Option<Arc<dyn Primitives>>,
    pub(crate) resources: Resources,
    pub(crate) subscribers: Registry<SubscriberState>,
    pub(crate) queryables: Registry<QueryableState>,
    pub(crate) tokens: Registry<TokenState>,
    pub(crate) interests: Registry<InterestState>,
    pub(crate) queries: PendingQueries,
    pub(crate) remote_declares: RemoteDeclares,
}

impl SessionState {
    fn new() -> Self {
        Self {
            primitives: None,
            resources: Resources::default(),
            subscribers: Registry::default(),
            queryables: Registry::default(),
            tokens: Registry::default(),
            interests: Registry::default(),
            queries: PendingQueries::default(),
            remote_declares: RemoteDeclares::default(),
        }
    }

    pub(crate) fn primitives(&self) -> ZResult<Arc<dyn Primitives>> {
        self.primitives
            .as_ref()
            .cloned()
            .ok_or_else(|| zerror!((errno::SESSION_CLOSED) "Session closed").into())
    }

    fn matching_interests(&self, msg: &InterestMsg) -> Vec<Arc<InterestState>> {
        self.interests
            .iter()
            .filter(|i| i.matches(msg))
            .cloned()
            .collect()
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("subscribers", &self.subscribers.len())
            .field("queryables", &self.queryables.len())
            .field("tokens", &self.tokens.len())
            .field("interests", &self.interests.len())
            .field("queries", &self.queries.len())
            .finish()
    }
}

pub(crate) struct SessionInner {
    zid: ZenohId,
    peer: TransportPeer,
    config: Config,
    pub(crate) state: RwLock<SessionState>,
    id_counter: AtomicU32,
    qid_counter: AtomicU32,
    hlc: Option<Arc<HLC>>,
    closed: AtomicBool,
    transport: Mutex<Option<Arc<TransportUnicast>>>,
}

impl fmt::Debug for SessionInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.zid)
            .field("peer", &self.peer)
            .finish()
    }
}

/// A weak reference to a session, held by the entities it declared.
#[derive(Clone)]
pub(crate) struct WeakSession(Weak<SessionInner>);

impl WeakSession {
    pub(crate) fn upgrade(&self) -> Option<Arc<SessionInner>> {
        self.0.upgrade()
    }

    pub(crate) fn upgrade_or_closed(&self) -> ZResult<Arc<SessionInner>> {
        self.upgrade()
            .ok_or_else(|| zerror!((errno::SESSION_CLOSED) "Session closed").into())
    }
}

impl fmt::Debug for WeakSession {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.upgrade() {
            Some(session) => session.fmt(f),
            None => f.write_str("Session(dropped)"),
        }
    }
}

impl SessionInner {
    pub(crate) fn mode(&self) -> WhatAmI {
        self.config.mode
    }

    fn next_id(&self) -> Id {
        self.id_counter.fetch_add(1, Ordering::Relaxed)
    }

    fn new_timestamp(&self) -> Option<Timestamp> {
        self.hlc.as_ref().map(|hlc| hlc.new_timestamp())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn declare_keyexpr_inner(&self, key_expr: &KeyExpr) -> ZResult<ExprId> {
        let mut state = zwrite!(self.state);
        let primitives = state.primitives()?;
        let (id, new) = state.resources.declare_local(key_expr)?;
        if new {
            tracing::debug!("Declare keyexpr {} = {}", id, key_expr);
            // Sent under the lock: the alias must reach the peer before any message using it
            let res = primitives.send_declare(declare(DeclareBody::DeclareKeyExpr(DeclareKeyExpr {
                id,
                wire_expr: WireExpr::from(key_expr.to_string()),
            })));
            if let Err(e) = res {
                if let Err(undo) = state.resources.undeclare_local(id) {
                    tracing::warn!("Unable to roll back keyexpr {}: {}", id, undo);
                }
                return Err(e);
            }
        }
        Ok(id)
    }

    pub(crate) fn undeclare_keyexpr_inner(&self, id: ExprId) -> ZResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        let mut state = zwrite!(self.state);
        if state.resources.undeclare_local(id)? {
            tracing::debug!("Undeclare keyexpr {}", id);
            if let Some(primitives) = state.primitives.as_ref() {
                primitives.send_declare(declare(DeclareBody::UndeclareKeyExpr(UndeclareKeyExpr {
                    id,
                })))?;
            }
        }
        Ok(())
    }

    pub(crate) fn declare_subscriber_inner(
        &self,
        key_expr: &KeyExpr,
        callback: Callback<Sample>,
    ) -> ZResult<Arc<SubscriberState>> {
        let mut state = zwrite!(self.state);
        let primitives = state.primitives()?;
        let declared = state.subscribers.declare(
            key_expr,
            |s| s.callback.ptr_eq(&callback),
            || SubscriberState {
                id: self.next_id(),
                key_expr: key_expr.clone(),
                callback: callback.clone(),
            },
        )?;
        let sub_state = match declared {
            Declared::Shared(s) => {
                tracing::trace!(
                    "Subscriber {} on {} shared ({:?} references)",
                    s.id,
                    key_expr,
                    state.subscribers.refcount(s.id)
                );
                return Ok(s);
            }
            Declared::New(s) => s,
        };
        let wire_expr = state.resources.wire_expr(key_expr);
        drop(state);

        tracing::debug!("Declare subscriber {} on {}", sub_state.id, key_expr);
        let res = primitives.send_declare(declare(DeclareBody::DeclareSubscriber(
            DeclareSubscriber {
                id: sub_state.id,
                wire_expr,
            },
        )));
        if let Err(e) = res {
            let removed = zwrite!(self.state).subscribers.undeclare(sub_state.id);
            drop(removed);
            return Err(e);
        }
        Ok(sub_state)
    }

    pub(crate) fn undeclare_subscriber_inner(&self, sid: Id) -> ZResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        let mut state = zwrite!(self.state);
        let Some(sub_state) = state.subscribers.undeclare(sid)? else {
            return Ok(());
        };
        let primitives = state.primitives.clone();
        let wire_expr = state.resources.wire_expr(&sub_state.key_expr);
        drop(state);

        tracing::debug!("Undeclare subscriber {} on {}", sid, sub_state.key_expr);
        if let Some(primitives) = primitives {
            primitives.send_declare(declare(DeclareBody::UndeclareSubscriber(
                UndeclareSubscriber {
                    id: sid,
                    ext_wire_expr: WireExprType { wire_expr },
                },
            )))?;
        }
        // the callback, and its dropper, are released here outside of the lock
        drop(sub_state);
        Ok(())
    }

    pub(crate) fn declare_queryable_inner(
        &self,
        key_expr: &KeyExpr,
        complete: bool,
        callback: Callback<Query>,
    ) -> ZResult<Arc<QueryableState>> {
        let mut state = zwrite!(self.state);
        let primitives = state.primitives()?;
        let declared = state.queryables.declare(
            key_expr,
            |q| q.complete == complete && q.callback.ptr_eq(&callback),
            || QueryableState {
                id: self.next_id(),
                key_expr: key_expr.clone(),
                complete,
                callback: callback.clone(),
            },
        )?;
        let qable_state = match declared {
            Declared::Shared(q) => {
                tracing::trace!(
                    "Queryable {} on {} shared ({:?} references)",
                    q.id,
                    key_expr,
                    state.queryables.refcount(q.id)
                );
                return Ok(q);
            }
            Declared::New(q) => q,
        };
        let wire_expr = state.resources.wire_expr(key_expr);
        drop(state);

        tracing::debug!("Declare queryable {} on {}", qable_state.id, key_expr);
        let res = primitives.send_declare(declare(DeclareBody::DeclareQueryable(
            DeclareQueryable {
                id: qable_state.id,
                wire_expr,
                ext_info: QueryableInfoType {
                    complete,
                    distance: 0,
                },
            },
        )));
        if let Err(e) = res {
            let removed = zwrite!(self.state).queryables.undeclare(qable_state.id);
            drop(removed);
            return Err(e);
        }
        Ok(qable_state)
    }

    pub(crate) fn undeclare_queryable_inner(&self, qid: Id) -> ZResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        let mut state = zwrite!(self.state);
        let Some(qable_state) = state.queryables.undeclare(qid)? else {
            return Ok(());
        };
        let primitives = state.primitives.clone();
        let wire_expr = state.resources.wire_expr(&qable_state.key_expr);
        drop(state);

        tracing::debug!("Undeclare queryable {} on {}", qid, qable_state.key_expr);
        if let Some(primitives) = primitives {
            primitives.send_declare(declare(DeclareBody::UndeclareQueryable(
                UndeclareQueryable {
                    id: qid,
                    ext_wire_expr: WireExprType { wire_expr },
                },
            )))?;
        }
        drop(qable_state);
        Ok(())
    }

    pub(crate) fn declare_token_inner(&self, key_expr: &KeyExpr) -> ZResult<Arc<TokenState>> {
        let mut state = zwrite!(self.state);
        let primitives = state.primitives()?;
        // Every token is announced on its own
        let tok_state = state
            .tokens
            .declare(
                key_expr,
                |_| false,
                || TokenState {
                    id: self.next_id(),
                    key_expr: key_expr.clone(),
                },
            )?
            .state()
            .clone();
        let wire_expr = state.resources.wire_expr(key_expr);
        drop(state);

        tracing::debug!("Declare token {} on {}", tok_state.id, key_expr);
        let res = primitives.send_declare(declare(DeclareBody::DeclareToken(DeclareToken {
            id: tok_state.id,
            wire_expr,
        })));
        if let Err(e) = res {
            let removed = zwrite!(self.state).tokens.undeclare(tok_state.id);
            drop(removed);
            return Err(e);
        }
        Ok(tok_state)
    }

    pub(crate) fn undeclare_token_inner(&self, tid: Id) -> ZResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        let mut state = zwrite!(self.state);
        let Some(tok_state) = state.tokens.undeclare(tid)? else {
            return Ok(());
        };
        let primitives = state.primitives.clone();
        let wire_expr = state.resources.wire_expr(&tok_state.key_expr);
        drop(state);

        tracing::debug!("Undeclare token {} on {}", tid, tok_state.key_expr);
        match primitives {
            Some(primitives) => primitives.send_declare(declare(DeclareBody::UndeclareToken(
                UndeclareToken {
                    id: tid,
                    ext_wire_expr: WireExprType { wire_expr },
                },
            ))),
            None => Ok(()),
        }
    }

    /// Register an interest and send it to the peer, asking for its current and future
    /// declarations. Only restricted to `key_expr` when one is given.
    pub(crate) fn declare_interest_inner(
        &self,
        key_expr: Option<&KeyExpr>,
        options: InterestOptions,
        callback: Callback<InterestMsg>,
    ) -> ZResult<InterestId> {
        let mut state = zwrite!(self.state);
        let primitives = state.primitives()?;
        let key = match key_expr {
            Some(k) => k.clone(),
            None => KeyExpr::new("**")?,
        };
        let id = state
            .interests
            .declare(
                &key,
                |_| false,
                || InterestState {
                    id: self.next_id(),
                    key_expr: key.clone(),
                    restricted: key_expr.is_some(),
                    options,
                    callback,
                },
            )?
            .state()
            .id;
        let wire_expr = key_expr.map(|k| state.resources.wire_expr(k));
        drop(state);

        tracing::debug!("Declare interest {} on {}", id, key);
        let res = primitives.send_interest(Interest {
            id,
            mode: InterestMode::CurrentFuture,
            options,
            wire_expr,
            ext_qos: interest::ext::QoSType::DECLARE,
            ext_tstamp: None,
            ext_nodeid: interest::ext::NodeIdType::DEFAULT,
        });
        if let Err(e) = res {
            let removed = zwrite!(self.state).interests.undeclare(id);
            drop(removed);
            return Err(e);
        }
        Ok(id)
    }

    pub(crate) fn undeclare_interest_inner(&self, id: InterestId) -> ZResult<()> {
        if self.is_closed() {
            return Ok(());
        }
        let mut state = zwrite!(self.state);
        let removed = state.interests.undeclare(id)?;
        let primitives = state.primitives.clone();
        drop(state);

        tracing::debug!("Undeclare interest {}", id);
        if let Some(primitives) = primitives {
            primitives.send_interest(Interest {
                id,
                mode: InterestMode::Final,
                options: InterestOptions::empty(),
                wire_expr: None,
                ext_qos: interest::ext::QoSType::DECLARE,
                ext_tstamp: None,
                ext_nodeid: interest::ext::NodeIdType::DEFAULT,
            })?;
        }
        drop(removed);
        Ok(())
    }

    pub(crate) fn resolve_put(
        &self,
        key_expr: &KeyExpr,
        kind: SampleKind,
        payload: ZBuf,
        options: PutOptions,
    ) -> ZResult<()> {
        let state = zread!(self.state);
        let primitives = state.primitives()?;
        let wire_expr = state.resources.wire_expr(key_expr);
        drop(state);

        let timestamp = options.timestamp.or_else(|| self.new_timestamp());
        let payload = match kind {
            SampleKind::Put => PushBody::Put(zenoh::Put {
                timestamp,
                encoding: options.encoding,
                ext_sinfo: options.source_info.map(Into::into),
                ext_unknown: vec![],
                payload,
            }),
            SampleKind::Delete => PushBody::Del(zenoh::Del {
                timestamp,
                ext_sinfo: options.source_info.map(Into::into),
                ext_unknown: vec![],
            }),
        };
        primitives.send_push(
            Push {
                wire_expr,
                ext_qos: push::ext::QoSType::PUSH,
                ext_tstamp: None,
                ext_nodeid: push::ext::NodeIdType::DEFAULT,
                payload,
            },
            options.reliability,
        )
    }

    pub(crate) fn query(
        &self,
        selector: &str,
        options: GetOptions,
        callback: Callback<Reply>,
    ) -> ZResult<RequestId> {
        let (key, parameters) = selector.split_once('?').unwrap_or((selector, ""));
        let key_expr = KeyExpr::new(key)?;
        // Replies are consolidated locally: `Auto` stands for `Latest`
        let consolidation = match options.consolidation {
            ConsolidationMode::Auto => ConsolidationMode::Latest,
            mode => mode,
        };
        let timeout = options
            .timeout
            .unwrap_or_else(|| self.config.queries_default_timeout());
        let qid = self.qid_counter.fetch_add(1, Ordering::Relaxed);

        let mut state = zwrite!(self.state);
        let primitives = state.primitives()?;
        let wire_expr = state.resources.wire_expr(&key_expr);
        state.queries.register(
            qid,
            PendingQuery::new(
                key_expr,
                parameters.to_string(),
                consolidation,
                callback,
                Instant::now() + timeout,
            ),
        )?;
        drop(state);

        tracing::debug!("Query {} on {} ({:?})", qid, selector, consolidation);
        let ext_body = options.payload.map(|payload| QueryBodyType {
            encoding: options.encoding,
            payload,
        });
        let res = primitives.send_request(Request {
            id: qid,
            wire_expr,
            ext_qos: request::ext::QoSType::REQUEST,
            ext_tstamp: None,
            ext_nodeid: request::ext::NodeIdType::DEFAULT,
            ext_target: options.target,
            ext_budget: None,
            ext_timeout: Some(timeout),
            payload: RequestBody::Query(zenoh::Query {
                consolidation,
                parameters: parameters.to_string(),
                ext_sinfo: None,
                ext_body,
                ext_unknown: vec![],
            }),
        });
        if let Err(e) = res {
            let query = zwrite!(self.state).queries.finalize(qid);
            drop(query);
            return Err(e);
        }
        Ok(qid)
    }

    /// Terminate the queries whose deadline is reached: their retained replies are delivered,
    /// followed by a timeout error.
    pub(crate) fn process_timeouts(&self, now: Instant) {
        let expired = zwrite!(self.state).queries.drop_expired(now);
        for (qid, query) in expired {
            tracing::debug!("Query {} on {}?{} timed out", qid, query.key_expr, query.parameters);
            let callback = query.callback.clone();
            deliver(query.into_deliveries());
            callback.call(Reply {
                result: Err(ReplyError::timeout()),
                replier_id: None,
            });
        }
    }

    pub(crate) fn close(&self) -> ZResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!("Closing session {}", self.zid);
        let transport = zlock!(self.transport).take();

        let mut state = zwrite!(self.state);
        state.primitives = None;
        let subscribers = state.subscribers.drain();
        let queryables = state.queryables.drain();
        let tokens = state.tokens.drain();
        let interests = state.interests.drain();
        let queries = state.queries.drain();
        state.remote_declares.clear();
        state.resources.clear();
        drop(state);

        // The read task may be blocked on a full channel: release the handlers before joining it
        subscribers.iter().for_each(|s| s.callback.release());
        queryables.iter().for_each(|q| q.callback.release());
        interests.iter().for_each(|i| i.callback.release());
        queries.iter().for_each(|q| q.callback.release());

        let res = match transport {
            Some(transport) => transport.close(close::reason::GENERIC),
            None => Ok(()),
        };
        for query in queries {
            deliver(query.into_deliveries());
        }
        // callbacks and their droppers are released outside of the lock
        drop((subscribers, queryables, tokens, interests));
        res
    }

    fn handle_push(&self, msg: Push) -> ZResult<()> {
        let state = zread!(self.state);
        let key_expr = state.resources.expand(&msg.wire_expr)?;
        let subscribers = state.subscribers.lookup_by_key(&key_expr);
        drop(state);
        if subscribers.is_empty() {
            tracing::trace!("No subscriber for {}", key_expr);
            return Ok(());
        }

        let sample = match msg.payload {
            PushBody::Put(put) => Sample::from_put(key_expr, put),
            PushBody::Del(del) => Sample::from_del(key_expr, del),
        };
        for sub in subscribers {
            sub.callback.call(sample.clone());
        }
        Ok(())
    }

    fn handle_request(&self, msg: Request) -> ZResult<()> {
        let query = match msg.payload {
            RequestBody::Query(query) => query,
            RequestBody::Put(_) | RequestBody::Del(_) | RequestBody::Pull(_) => {
                tracing::debug!("Unsupported request {} from {}", msg.id, self.peer);
                return Ok(());
            }
        };

        let state = zread!(self.state);
        let primitives = state.primitives()?;
        let key_expr = state.resources.expand(&msg.wire_expr)?;
        let queryables: Vec<Arc<QueryableState>> = state
            .queryables
            .lookup_by_key(&key_expr)
            .into_iter()
            .filter(|q| msg.ext_target != TargetType::AllComplete || q.complete)
            .collect();
        drop(state);

        tracing::debug!(
            "Query {} on {}?{}: {} matching queryables",
            msg.id,
            key_expr,
            query.parameters,
            queryables.len()
        );
        let inner = Arc::new(QueryInner {
            key_expr,
            parameters: query.parameters,
            qid: msg.id,
            zid: self.zid,
            primitives,
            hlc: self.hlc.clone(),
            value: query.ext_body.map(|b| (b.payload, b.encoding)),
        });
        for qable in queryables {
            qable.callback.call(Query {
                inner: inner.clone(),
                eid: qable.id,
            });
        }
        // without any matching queryable, dropping the last reference finalizes the query
        Ok(())
    }

    fn handle_response(&self, msg: Response) -> ZResult<()> {
        let replier_id = msg.ext_respid.map(|r| r.id);
        let mut state = zwrite!(self.state);
        let delivery = match msg.payload {
            ResponseBody::Reply(reply) => {
                let key_expr = state.resources.expand(&msg.wire_expr)?;
                let reply = Reply {
                    result: Ok(Sample::from_reply(key_expr, reply)),
                    replier_id,
                };
                state.queries.append_partial_reply(msg.rid, reply)?
            }
            ResponseBody::Put(put) => {
                let key_expr = state.resources.expand(&msg.wire_expr)?;
                let reply = Reply {
                    result: Ok(Sample::from_put(key_expr, put)),
                    replier_id,
                };
                state.queries.append_partial_reply(msg.rid, reply)?
            }
            ResponseBody::Err(err) => {
                let (payload, encoding) = err
                    .ext_body
                    .map(|b| (b.payload, b.encoding))
                    .unwrap_or_default();
                let reply = Reply {
                    result: Err(ReplyError {
                        payload,
                        encoding,
                        code: err.code,
                    }),
                    replier_id,
                };
                state.queries.append_error(msg.rid, reply)
            }
            ResponseBody::Ack(_) => None,
        };
        drop(state);

        if let Some((callback, reply)) = delivery {
            callback.call(reply);
        }
        Ok(())
    }

    fn handle_response_final(&self, msg: ResponseFinal) -> ZResult<()> {
        let query = zwrite!(self.state).queries.finalize(msg.rid);
        if let Some(query) = query {
            tracing::debug!("Query {} finalized", msg.rid);
            deliver(query.into_deliveries());
        }
        Ok(())
    }

    fn handle_interest(&self, msg: Interest) -> ZResult<()> {
        if !matches!(
            msg.mode,
            InterestMode::Current | InterestMode::CurrentFuture
        ) {
            // future declarations are always sent
            return Ok(());
        }

        let state = zread!(self.state);
        let primitives = state.primitives()?;
        let restriction = msg
            .wire_expr
            .as_ref()
            .map(|w| state.resources.expand(w))
            .transpose()?;
        let wanted = |k: &KeyExpr| restriction.as_ref().map_or(true, |r| r.intersects(k));

        let mut bodies = Vec::new();
        if msg.options.subscribers() {
            for s in state.subscribers.iter().filter(|s| wanted(&s.key_expr)) {
                bodies.push(DeclareBody::DeclareSubscriber(DeclareSubscriber {
                    id: s.id,
                    wire_expr: state.resources.wire_expr(&s.key_expr),
                }));
            }
        }
        if msg.options.queryables() {
            for q in state.queryables.iter().filter(|q| wanted(&q.key_expr)) {
                bodies.push(DeclareBody::DeclareQueryable(DeclareQueryable {
                    id: q.id,
                    wire_expr: state.resources.wire_expr(&q.key_expr),
                    ext_info: QueryableInfoType {
                        complete: q.complete,
                        distance: 0,
                    },
                }));
            }
        }
        if msg.options.tokens() {
            for t in state.tokens.iter().filter(|t| wanted(&t.key_expr)) {
                bodies.push(DeclareBody::DeclareToken(DeclareToken {
                    id: t.id,
                    wire_expr: state.resources.wire_expr(&t.key_expr),
                }));
            }
        }
        drop(state);

        tracing::debug!(
            "Interest {} from {}: {} current declarations",
            msg.id,
            self.peer,
            bodies.len()
        );
        bodies.push(DeclareBody::DeclareFinal(DeclareFinal));
        for body in bodies {
            primitives.send_declare(Declare {
                interest_id: Some(msg.id),
                ..declare(body)
            })?;
        }
        Ok(())
    }

    fn handle_declare(&self, msg: Declare) -> ZResult<()> {
        match msg.body {
            DeclareBody::DeclareKeyExpr(m) => {
                let mut state = zwrite!(self.state);
                let key_expr = state.resources.expand(&m.wire_expr)?;
                tracing::trace!("Remote keyexpr {} = {}", m.id, key_expr);
                state.resources.declare_remote(m.id, key_expr)
            }
            DeclareBody::UndeclareKeyExpr(m) => zwrite!(self.state).resources.undeclare_remote(m.id),
            DeclareBody::DeclareSubscriber(m) => {
                self.remote_declare(DeclareKind::Subscriber, m.id, &m.wire_expr)
            }
            DeclareBody::UndeclareSubscriber(m) => {
                self.remote_undeclare(DeclareKind::Subscriber, m.id, &m.ext_wire_expr)
            }
            DeclareBody::DeclareQueryable(m) => {
                self.remote_declare(DeclareKind::Queryable, m.id, &m.wire_expr)
            }
            DeclareBody::UndeclareQueryable(m) => {
                self.remote_undeclare(DeclareKind::Queryable, m.id, &m.ext_wire_expr)
            }
            DeclareBody::DeclareToken(m) => {
                self.remote_declare(DeclareKind::Token, m.id, &m.wire_expr)
            }
            DeclareBody::UndeclareToken(m) => {
                self.remote_undeclare(DeclareKind::Token, m.id, &m.ext_wire_expr)
            }
            DeclareBody::DeclareFinal(_) => match msg.interest_id {
                Some(id) => {
                    let interest = zread!(self.state).interests.get(id).cloned();
                    if let Some(interest) = interest {
                        interest.callback.call(InterestMsg::final_(self.peer.zid));
                    }
                    Ok(())
                }
                None => Ok(()),
            },
        }
    }

    fn notify_interests(&self, interests: Vec<Arc<InterestState>>, msg: InterestMsg) {
        for interest in interests {
            interest.callback.call(msg.clone());
        }
    }

    fn remote_declare(&self, kind: DeclareKind, id: u32, wire_expr: &WireExpr) -> ZResult<()> {
        let mut state = zwrite!(self.state);
        let key_expr = state.resources.expand(wire_expr)?;
        tracing::trace!("Remote {:?} {} on {}", kind, id, key_expr);
        state.remote_declares.insert(DeclareData {
            kind,
            id,
            key_expr: key_expr.clone(),
        })?;
        let msg = InterestMsg {
            kind: InterestMsgKind::declare(kind),
            id,
            key_expr: Some(key_expr),
            peer: self.peer.zid,
        };
        let interests = state.matching_interests(&msg);
        drop(state);
        self.notify_interests(interests, msg);
        Ok(())
    }

    fn remote_undeclare(&self, kind: DeclareKind, id: u32, ext: &WireExprType) -> ZResult<()> {
        let mut state = zwrite!(self.state);
        let key_expr = match state.remote_declares.remove(kind, id) {
            Some(data) => Some(data.key_expr),
            None if !ext.is_null() => state.resources.expand(&ext.wire_expr).ok(),
            None => None,
        };
        tracing::trace!("Remote undeclare {:?} {}", kind, id);
        let msg = InterestMsg {
            kind: InterestMsgKind::undeclare(kind),
            id,
            key_expr,
            peer: self.peer.zid,
        };
        let interests = state.matching_interests(&msg);
        drop(state);
        self.notify_interests(interests, msg);
        Ok(())
    }
}

impl TransportPeerEventHandler for SessionInner {
    fn handle_message(&self, msg: NetworkMessage) -> ZResult<()> {
        match msg.body {
            NetworkBody::Push(m) => self.handle_push(m),
            NetworkBody::Request(m) => self.handle_request(m),
            NetworkBody::Response(m) => self.handle_response(m),
            NetworkBody::ResponseFinal(m) => self.handle_response_final(m),
            NetworkBody::Interest(m) => self.handle_interest(m),
            NetworkBody::Declare(m) => self.handle_declare(m),
            NetworkBody::OAM(_) => {
                tracing::trace!("Ignoring OAM from {}", self.peer);
                Ok(())
            }
        }
    }

    fn tick(&self) {
        self.process_timeouts(Instant::now());
    }

    fn closed(&self) {
        let mut state = zwrite!(self.state);
        if state.primitives.take().is_none() {
            return;
        }
        tracing::debug!("Connection with {} dropped", self.peer);
        let msg = InterestMsg::connection_dropped(self.peer.zid);
        let interests = state.matching_interests(&msg);
        let queries = state.queries.drain();
        state.remote_declares.clear();
        drop(state);

        self.notify_interests(interests, msg);
        for query in queries {
            deliver(query.into_deliveries());
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            tracing::debug!(error);
        }
    }
}

/// A zpico session, bound to a single peer.
///
/// Cloning a session is cheap; the session is closed when the last clone is dropped or
/// [`Session::close`] is called. Declared entities only keep a weak reference to it.
#[derive(Clone)]
pub struct Session(pub(crate) Arc<SessionInner>);

impl Session {
    pub(crate) fn new<L: Link + 'static>(config: Config, link: L, peer: TransportPeer) -> ZResult<Session> {
        config.validate()?;
        let zid = config.id.unwrap_or_else(ZenohId::rand);
        let hlc = config
            .timestamping
            .enabled
            .then(|| Arc::new(HLCBuilder::new().with_id(zid.into()).build()));

        let inner = Arc::new(SessionInner {
            zid,
            peer,
            config,
            state: RwLock::new(SessionState::new()),
            id_counter: AtomicU32::new(1),
            qid_counter: AtomicU32::new(0),
            hlc,
            closed: AtomicBool::new(false),
            transport: Mutex::new(None),
        });

        let handler: Weak<dyn TransportPeerEventHandler> = Arc::downgrade(&inner) as _;
        let transport = TransportUnicast::new(&inner.config, Arc::new(link), peer, handler);
        zwrite!(inner.state).primitives = Some(transport.clone() as Arc<dyn Primitives>);
        *zlock!(inner.transport) = Some(transport.clone());
        transport.start(&inner.config)?;

        tracing::info!("Session {} opened with {}", zid, peer);
        Ok(Session(inner))
    }

    pub(crate) fn downgrade(&self) -> WeakSession {
        WeakSession(Arc::downgrade(&self.0))
    }

    /// The id of this session.
    pub fn zid(&self) -> ZenohId {
        self.0.zid
    }

    /// The peer this session is connected to.
    pub fn peer(&self) -> &TransportPeer {
        &self.0.peer
    }

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    /// A new timestamp from the session clock, if timestamping is enabled.
    pub fn new_timestamp(&self) -> Option<Timestamp> {
        self.0.new_timestamp()
    }

    /// A ring channel sized by `handlers.ring_capacity`.
    pub fn ring_channel(&self) -> RingChannel {
        RingChannel::new(self.0.config.handlers.ring_capacity)
    }

    /// A FIFO channel sized by `handlers.fifo_capacity`.
    pub fn fifo_channel(&self) -> FifoChannel {
        FifoChannel::new(self.0.config.handlers.fifo_capacity)
    }

    /// Close the session: every declaration is dropped, handler channels are closed and the
    /// transport tasks are stopped. Closing twice is a no-op.
    pub fn close(&self) -> ZResult<()> {
        self.0.close()
    }

    /// Whether the session was closed or lost its peer.
    pub fn is_closed(&self) -> bool {
        zread!(self.0.state).primitives.is_none()
    }

    /// Declare a numerical alias for `key_expr` to the peer. Later messages on this key
    /// expression carry the alias instead of the full string.
    pub fn declare_keyexpr<TryIntoKeyExpr>(&self, key_expr: TryIntoKeyExpr) -> ZResult<KeyExpr>
    where
        TryIntoKeyExpr: TryInto<KeyExpr>,
        <TryIntoKeyExpr as TryInto<KeyExpr>>::Error: Into<zpico_result::Error>,
    {
        let key_expr: KeyExpr = key_expr.try_into().map_err(Into::into)?;
        self.0.declare_keyexpr_inner(&key_expr)?;
        Ok(key_expr)
    }

    pub fn undeclare_keyexpr(&self, key_expr: &KeyExpr) -> ZResult<()> {
        let id = zread!(self.0.state).resources.local_id(key_expr);
        match id {
            Some(id) => self.0.undeclare_keyexpr_inner(id),
            None => Err(zerror!((errno::REGISTRY_NOT_FOUND) "No alias declared for {}", key_expr).into()),
        }
    }

    /// Declare a subscriber on `key_expr`. Samples are delivered through `handler`.
    pub fn declare_subscriber<TryIntoKeyExpr, Handler>(
        &self,
        key_expr: TryIntoKeyExpr,
        handler: Handler,
    ) -> ZResult<Subscriber<Handler::Handler>>
    where
        TryIntoKeyExpr: TryInto<KeyExpr>,
        <TryIntoKeyExpr as TryInto<KeyExpr>>::Error: Into<zpico_result::Error>,
        Handler: IntoHandler<Sample>,
    {
        let key_expr: KeyExpr = key_expr.try_into().map_err(Into::into)?;
        let (callback, handler) = handler.into_handler();
        let state = self.0.declare_subscriber_inner(&key_expr, callback)?;
        Ok(Subscriber {
            inner: SubscriberInner {
                session: self.downgrade(),
                state,
                undeclare_on_drop: mem::size_of::<Handler::Handler>() > 0,
            },
            handler,
        })
    }

    /// Declare a queryable on `key_expr`. Queries are delivered through `handler`.
    pub fn declare_queryable<TryIntoKeyExpr, Handler>(
        &self,
        key_expr: TryIntoKeyExpr,
        complete: bool,
        handler: Handler,
    ) -> ZResult<Queryable<Handler::Handler>>
    where
        TryIntoKeyExpr: TryInto<KeyExpr>,
        <TryIntoKeyExpr as TryInto<KeyExpr>>::Error: Into<zpico_result::Error>,
        Handler: IntoHandler<Query>,
    {
        let key_expr: KeyExpr = key_expr.try_into().map_err(Into::into)?;
        let (callback, handler) = handler.into_handler();
        let state = self.0.declare_queryable_inner(&key_expr, complete, callback)?;
        Ok(Queryable {
            inner: QueryableInner {
                session: self.downgrade(),
                state,
                undeclare_on_drop: mem::size_of::<Handler::Handler>() > 0,
            },
            handler,
        })
    }

    /// Declare a publisher on `key_expr`.
    pub fn declare_publisher<TryIntoKeyExpr>(&self, key_expr: TryIntoKeyExpr) -> ZResult<Publisher>
    where
        TryIntoKeyExpr: TryInto<KeyExpr>,
        <TryIntoKeyExpr as TryInto<KeyExpr>>::Error: Into<zpico_result::Error>,
    {
        let key_expr: KeyExpr = key_expr.try_into().map_err(Into::into)?;
        let expr_id = self.0.declare_keyexpr_inner(&key_expr)?;
        let filter = if self.0.config.interests.enabled {
            match WriteFilter::new(&self.0, &key_expr, false) {
                Ok(filter) => Some(filter),
                Err(e) => {
                    if let Err(undo) = self.0.undeclare_keyexpr_inner(expr_id) {
                        tracing::warn!("Unable to undeclare keyexpr {}: {}", expr_id, undo);
                    }
                    return Err(e);
                }
            }
        } else {
            None
        };
        Ok(Publisher {
            session: self.downgrade(),
            id: self.0.next_id(),
            key_expr,
            expr_id,
            filter,
            undeclare_on_drop: true,
        })
    }

    /// Declare a liveliness token on `key_expr`.
    pub fn declare_token<TryIntoKeyExpr>(&self, key_expr: TryIntoKeyExpr) -> ZResult<Token>
    where
        TryIntoKeyExpr: TryInto<KeyExpr>,
        <TryIntoKeyExpr as TryInto<KeyExpr>>::Error: Into<zpico_result::Error>,
    {
        let key_expr: KeyExpr = key_expr.try_into().map_err(Into::into)?;
        let state = self.0.declare_token_inner(&key_expr)?;
        Ok(Token {
            session: self.downgrade(),
            state,
            undeclare_on_drop: true,
        })
    }

    /// Declare an interest in the declarations of the peer, restricted to `key_expr` when
    /// one is given. Notifications are delivered through `handler`.
    pub fn declare_interest<Handler>(
        &self,
        key_expr: Option<&KeyExpr>,
        options: InterestOptions,
        handler: Handler,
    ) -> ZResult<(InterestId, Handler::Handler)>
    where
        Handler: IntoHandler<InterestMsg>,
    {
        let (callback, handler) = handler.into_handler();
        let id = self.0.declare_interest_inner(key_expr, options, callback)?;
        Ok((id, handler))
    }

    pub fn undeclare_interest(&self, id: InterestId) -> ZResult<()> {
        self.0.undeclare_interest_inner(id)
    }

    /// Publish `payload` on `key_expr`. Session-level publications are never filtered.
    pub fn put<TryIntoKeyExpr, IntoZBuf>(&self, key_expr: TryIntoKeyExpr, payload: IntoZBuf) -> ZResult<()>
    where
        TryIntoKeyExpr: TryInto<KeyExpr>,
        <TryIntoKeyExpr as TryInto<KeyExpr>>::Error: Into<zpico_result::Error>,
        IntoZBuf: Into<ZBuf>,
    {
        self.put_with(key_expr, payload, PutOptions::default())
    }

    pub fn put_with<TryIntoKeyExpr, IntoZBuf>(
        &self,
        key_expr: TryIntoKeyExpr,
        payload: IntoZBuf,
        options: PutOptions,
    ) -> ZResult<()>
    where
        TryIntoKeyExpr: TryInto<KeyExpr>,
        <TryIntoKeyExpr as TryInto<KeyExpr>>::Error: Into<zpico_result::Error>,
        IntoZBuf: Into<ZBuf>,
    {
        let key_expr: KeyExpr = key_expr.try_into().map_err(Into::into)?;
        self.0
            .resolve_put(&key_expr, SampleKind::Put, payload.into(), options)
    }

    pub fn delete<TryIntoKeyExpr>(&self, key_expr: TryIntoKeyExpr) -> ZResult<()>
    where
        TryIntoKeyExpr: TryInto<KeyExpr>,
        <TryIntoKeyExpr as TryInto<KeyExpr>>::Error: Into<zpico_result::Error>,
    {
        let key_expr: KeyExpr = key_expr.try_into().map_err(Into::into)?;
        self.0
            .resolve_put(&key_expr, SampleKind::Delete, ZBuf::empty(), PutOptions::default())
    }

    /// Query `selector` (`key_expr[?parameters]`). Replies are delivered through `handler`;
    /// the handler is released once the query is finalized, timed out or the session closed.
    ///
    /// # Examples
    /// ```no_run
    /// # fn run(session: zpico::Session) -> zpico::ZResult<()> {
    /// use zpico::query::GetOptions;
    ///
    /// let (_, replies) = session.get("demo/example/**", GetOptions::default(), zpico::handlers::FifoChannel::new(8))?;
    /// while let Ok(reply) = replies.recv() {
    ///     match reply.result() {
    ///         Ok(sample) => println!("{}: {:?}", sample.key_expr(), sample.payload()),
    ///         Err(err) => println!("error: {:?}", err.payload()),
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn get<Handler>(
        &self,
        selector: &str,
        options: GetOptions,
        handler: Handler,
    ) -> ZResult<(RequestId, Handler::Handler)>
    where
        Handler: IntoHandler<Reply>,
    {
        let (callback, handler) = handler.into_handler();
        let qid = self.0.query(selector, options, callback)?;
        Ok((qid, handler))
    }

    /// Terminate the queries whose timeout expired. The lease task calls it periodically.
    pub fn process_timeouts(&self) {
        self.0.process_timeouts(Instant::now())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
