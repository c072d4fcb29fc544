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

//! Queries issued by this session and waiting for their replies.
use std::{collections::HashMap, time::Instant};

use zpico_protocol::{core::Timestamp, network::RequestId};
use zpico_result::{errno, zerror, ZResult};

use crate::api::{
    handlers::Callback,
    key_expr::KeyExpr,
    query::{ConsolidationMode, Reply},
};

/// A reply ready to be handed to its callback, once the session lock is released.
pub(crate) type Delivery = (Callback<Reply>, Reply);

pub(crate) struct PendingQuery {
    pub(crate) key_expr: KeyExpr,
    pub(crate) parameters: String,
    /// Never `Auto`: resolved when the query is issued.
    pub(crate) consolidation: ConsolidationMode,
    pub(crate) anykey: bool,
    pub(crate) callback: Callback<Reply>,
    pub(crate) deadline: Instant,
    /// Per key: the last delivered timestamp (monotonic) or the retained reply (latest).
    latest: Vec<(KeyExpr, Option<Timestamp>, Option<Reply>)>,
}

impl PendingQuery {
    pub(crate) fn new(
        key_expr: KeyExpr,
        parameters: String,
        consolidation: ConsolidationMode,
        callback: Callback<Reply>,
        deadline: Instant,
    ) -> Self {
        let anykey = parameters.split('&').any(|p| p == "_anyke");
        Self {
            key_expr,
            parameters,
            consolidation,
            anykey,
            callback,
            deadline,
            latest: Vec::new(),
        }
    }

    fn accepts(&self, key_expr: &KeyExpr) -> bool {
        self.anykey || self.key_expr.intersects(key_expr)
    }

    /// Consolidate `reply`, returning it if it must be delivered right away.
    fn consolidate(&mut self, reply: Reply) -> ZResult<Option<Reply>> {
        let Some(sample) = reply.sample() else {
            return Ok(Some(reply));
        };
        let key = sample.key_expr().clone();
        let ts = sample.timestamp().copied();

        match self.consolidation {
            ConsolidationMode::None => Ok(Some(reply)),
            ConsolidationMode::Monotonic => match self.latest.iter_mut().find(|(k, ..)| *k == key) {
                Some((_, last, _)) if ts > *last => {
                    *last = ts;
                    Ok(Some(reply))
                }
                Some(_) => {
                    tracing::trace!("Dropping non monotonic reply on {}", key);
                    Ok(None)
                }
                None => {
                    self.remember(key, ts, None)?;
                    Ok(Some(reply))
                }
            },
            ConsolidationMode::Latest | ConsolidationMode::Auto => {
                match self.latest.iter_mut().find(|(k, ..)| *k == key) {
                    Some((_, last, stored)) => {
                        if ts > *last {
                            *last = ts;
                            *stored = Some(reply);
                        }
                    }
                    None => self.remember(key, ts, Some(reply))?,
                }
                Ok(None)
            }
        }
    }

    fn remember(&mut self, key: KeyExpr, ts: Option<Timestamp>, reply: Option<Reply>) -> ZResult<()> {
        self.latest
            .try_reserve(1)
            .map_err(|e| zerror!((errno::OUT_OF_MEMORY) "Unable to store reply: {}", e))?;
        self.latest.push((key, ts, reply));
        Ok(())
    }

    /// The retained replies, in order of first arrival per key.
    pub(crate) fn into_deliveries(self) -> Vec<Delivery> {
        let callback = self.callback;
        self.latest
            .into_iter()
            .filter_map(|(_, _, reply)| reply)
            .map(|reply| (callback.clone(), reply))
            .collect()
    }
}

#[derive(Default)]
pub(crate) struct PendingQueries {
    queries: HashMap<RequestId, PendingQuery>,
}

impl PendingQueries {
    pub(crate) fn register(&mut self, id: RequestId, query: PendingQuery) -> ZResult<()> {
        self.queries
            .try_reserve(1)
            .map_err(|e| zerror!((errno::OUT_OF_MEMORY) "Unable to register query {}: {}", id, e))?;
        self.queries.insert(id, query);
        Ok(())
    }

    /// Account for a data reply. Replies to unknown queries or on keys that do not match
    /// the query are dropped.
    pub(crate) fn append_partial_reply(
        &mut self,
        id: RequestId,
        reply: Reply,
    ) -> ZResult<Option<Delivery>> {
        let Some(query) = self.queries.get_mut(&id) else {
            tracing::debug!("Dropping reply to unknown query {}", id);
            return Ok(None);
        };
        if let Some(sample) = reply.sample() {
            if !query.accepts(sample.key_expr()) {
                tracing::debug!(
                    "Dropping reply on {} to query {} on {}",
                    sample.key_expr(),
                    id,
                    query.key_expr
                );
                return Ok(None);
            }
        }
        let callback = query.callback.clone();
        Ok(query.consolidate(reply)?.map(|r| (callback, r)))
    }

    /// Error replies are never consolidated.
    pub(crate) fn append_error(&mut self, id: RequestId, reply: Reply) -> Option<Delivery> {
        match self.queries.get(&id) {
            Some(query) => Some((query.callback.clone(), reply)),
            None => {
                tracing::debug!("Dropping error reply to unknown query {}", id);
                None
            }
        }
    }

    pub(crate) fn finalize(&mut self, id: RequestId) -> Option<PendingQuery> {
        let query = self.queries.remove(&id);
        if query.is_none() {
            tracing::debug!("Dropping final reply to unknown query {}", id);
        }
        query
    }

    /// Remove every query whose deadline is reached at `now`.
    pub(crate) fn drop_expired(&mut self, now: Instant) -> Vec<(RequestId, PendingQuery)> {
        let expired: Vec<RequestId> = self
            .queries
            .iter()
            .filter(|(_, q)| q.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| self.queries.remove(&id).map(|q| (id, q)))
            .collect()
    }

    pub(crate) fn drain(&mut self) -> Vec<PendingQuery> {
        self.queries.drain().map(|(_, q)| q).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.queries.len()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use zpico_buffers::ZBuf;
    use zpico_protocol::core::{Encoding, ZenohId, NTP64};

    use super::*;
    use crate::api::{query::ReplyError, sample::Sample};

    fn reply(key: &str, time: Option<u64>, payload: &str) -> Reply {
        let timestamp = time.map(|t| Timestamp::new(NTP64(t), ZenohId::rand().into()));
        Reply {
            result: Ok(Sample {
                key_expr: KeyExpr::new(key).unwrap(),
                payload: ZBuf::from(payload),
                kind: Default::default(),
                encoding: Encoding::empty(),
                timestamp,
                source_info: None,
            }),
            replier_id: None,
        }
    }

    fn payloads(replies: &[Reply]) -> Vec<Vec<u8>> {
        replies
            .iter()
            .map(|r| r.sample().unwrap().payload().to_vec())
            .collect()
    }

    fn query(mode: ConsolidationMode, parameters: &str) -> (PendingQuery, Arc<Mutex<Vec<Reply>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let r = received.clone();
        let callback = Callback::new(Arc::new(move |reply| r.lock().unwrap().push(reply)));
        let deadline = Instant::now() + Duration::from_secs(10);
        let q = PendingQuery::new(
            KeyExpr::new("demo/**").unwrap(),
            parameters.to_string(),
            mode,
            callback,
            deadline,
        );
        (q, received)
    }

    fn deliver(delivery: Option<Delivery>) {
        if let Some((cb, reply)) = delivery {
            cb.call(reply);
        }
    }

    #[test]
    fn no_consolidation() {
        let (q, received) = query(ConsolidationMode::None, "");
        let mut queries = PendingQueries::default();
        queries.register(1, q).unwrap();
        for t in [3, 1, 2] {
            deliver(queries.append_partial_reply(1, reply("demo/a", Some(t), &t.to_string())).unwrap());
        }
        assert_eq!(payloads(&received.lock().unwrap()), [b"3", b"1", b"2"]);
        assert!(queries.finalize(1).unwrap().into_deliveries().is_empty());
    }

    #[test]
    fn monotonic() {
        let (q, received) = query(ConsolidationMode::Monotonic, "");
        let mut queries = PendingQueries::default();
        queries.register(1, q).unwrap();
        for (k, t) in [("demo/a", 1), ("demo/a", 3), ("demo/a", 2), ("demo/b", 1)] {
            deliver(queries.append_partial_reply(1, reply(k, Some(t), &t.to_string())).unwrap());
        }
        assert_eq!(payloads(&received.lock().unwrap()), [b"1", b"3", b"1"]);
    }

    #[test]
    fn latest() {
        let (q, received) = query(ConsolidationMode::Latest, "");
        let mut queries = PendingQueries::default();
        queries.register(7, q).unwrap();
        for (k, t, p) in [("demo/a", 1, "a1"), ("demo/b", 5, "b5"), ("demo/a", 4, "a4"), ("demo/a", 2, "a2")] {
            assert!(queries.append_partial_reply(7, reply(k, Some(t), p)).unwrap().is_none());
        }
        assert!(received.lock().unwrap().is_empty());
        for d in queries.finalize(7).unwrap().into_deliveries() {
            deliver(Some(d));
        }
        assert_eq!(payloads(&received.lock().unwrap()), [b"a4", b"b5"]);
        assert_eq!(queries.len(), 0);
    }

    #[test]
    fn stray_and_mismatched_replies() {
        let (q, received) = query(ConsolidationMode::None, "");
        let mut queries = PendingQueries::default();
        queries.register(1, q).unwrap();
        assert!(queries.append_partial_reply(2, reply("demo/a", None, "x")).unwrap().is_none());
        assert!(queries.append_partial_reply(1, reply("other/a", None, "x")).unwrap().is_none());
        assert!(queries.finalize(2).is_none());
        assert!(received.lock().unwrap().is_empty());

        let (q, _) = query(ConsolidationMode::None, "x=1&_anyke");
        queries.register(3, q).unwrap();
        assert!(queries.append_partial_reply(3, reply("other/a", None, "x")).unwrap().is_some());
    }

    #[test]
    fn errors_are_delivered_at_once() {
        let (q, _) = query(ConsolidationMode::Latest, "");
        let mut queries = PendingQueries::default();
        queries.register(1, q).unwrap();
        let err = Reply {
            result: Err(ReplyError::new("boom", Encoding::empty())),
            replier_id: None,
        };
        assert!(queries.append_error(1, err.clone()).is_some());
        assert!(queries.append_error(2, err).is_none());
    }

    #[test]
    fn expiry() {
        let (q, _) = query(ConsolidationMode::None, "");
        let deadline = q.deadline;
        let mut queries = PendingQueries::default();
        queries.register(1, q).unwrap();
        assert!(queries.drop_expired(Instant::now()).is_empty());
        let expired = queries.drop_expired(deadline);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, 1);
        assert!(queries.finalize(1).is_none());
    }

    #[test]
    fn replies_after_finalize_are_dropped() {
        let (q, received) = query(ConsolidationMode::Latest, "");
        let mut queries = PendingQueries::default();
        queries.register(4, q).unwrap();
        assert!(queries.append_partial_reply(4, reply("demo/a", Some(1), "a1")).unwrap().is_none());
        for d in queries.finalize(4).unwrap().into_deliveries() {
            deliver(Some(d));
        }
        assert_eq!(payloads(&received.lock().unwrap()), [b"a1"]);

        assert!(queries.append_partial_reply(4, reply("demo/a", Some(2), "a2")).unwrap().is_none());
        let err = Reply {
            result: Err(ReplyError::new("late", Encoding::empty())),
            replier_id: None,
        };
        assert!(queries.append_error(4, err).is_none());
        assert!(queries.finalize(4).is_none());
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[test]
    fn latest_in_any_arrival_order() {
        use rand::seq::SliceRandom;

        let mut replies: Vec<(String, u64)> = (0..8)
            .flat_map(|k| (1..=5).map(move |t| (format!("demo/{k}"), t)))
            .collect();
        for _ in 0..16 {
            replies.shuffle(&mut rand::thread_rng());
            let (q, received) = query(ConsolidationMode::Latest, "");
            let mut queries = PendingQueries::default();
            queries.register(1, q).unwrap();
            for (k, t) in replies.iter() {
                let delivery = queries
                    .append_partial_reply(1, reply(k, Some(*t), &t.to_string()))
                    .unwrap();
                assert!(delivery.is_none());
            }
            for d in queries.finalize(1).unwrap().into_deliveries() {
                deliver(Some(d));
            }
            let received = received.lock().unwrap();
            assert_eq!(received.len(), 8);
            assert!(payloads(&received).iter().all(|p| p == b"5"));
        }
    }
}
