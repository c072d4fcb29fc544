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

//! Interests: standing registrations notified of the peer's declaration activity.
use std::collections::HashMap;

use zpico_protocol::{
    core::ZenohId,
    network::{interest::InterestId, InterestOptions},
};
use zpico_result::{errno, zerror, ZResult};

use crate::api::{handlers::Callback, key_expr::KeyExpr, Id};

use super::registry::Registered;

/// The kind of a declaration received from the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclareKind {
    Subscriber,
    Queryable,
    Token,
}

/// A declaration received from the peer, remembered so that undeclarations carrying only
/// an id can be matched against interests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclareData {
    pub kind: DeclareKind,
    pub id: u32,
    pub key_expr: KeyExpr,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterestMsgKind {
    Final = 0,
    DeclSubscriber = 1,
    DeclQueryable = 2,
    DeclToken = 3,
    UndeclSubscriber = 4,
    UndeclQueryable = 5,
    UndeclToken = 6,
    ConnectionDropped = 7,
}

impl InterestMsgKind {
    pub(crate) fn declare(kind: DeclareKind) -> Self {
        match kind {
            DeclareKind::Subscriber => Self::DeclSubscriber,
            DeclareKind::Queryable => Self::DeclQueryable,
            DeclareKind::Token => Self::DeclToken,
        }
    }

    pub(crate) fn undeclare(kind: DeclareKind) -> Self {
        match kind {
            DeclareKind::Subscriber => Self::UndeclSubscriber,
            DeclareKind::Queryable => Self::UndeclQueryable,
            DeclareKind::Token => Self::UndeclToken,
        }
    }

    fn declare_kind(self) -> Option<DeclareKind> {
        match self {
            Self::DeclSubscriber | Self::UndeclSubscriber => Some(DeclareKind::Subscriber),
            Self::DeclQueryable | Self::UndeclQueryable => Some(DeclareKind::Queryable),
            Self::DeclToken | Self::UndeclToken => Some(DeclareKind::Token),
            Self::Final | Self::ConnectionDropped => None,
        }
    }
}

/// A notification delivered to an interest callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestMsg {
    pub kind: InterestMsgKind,
    /// Id of the declaration, `0` for `Final` and `ConnectionDropped`.
    pub id: u32,
    pub key_expr: Option<KeyExpr>,
    pub peer: ZenohId,
}

impl InterestMsg {
    pub(crate) fn final_(peer: ZenohId) -> Self {
        Self {
            kind: InterestMsgKind::Final,
            id: 0,
            key_expr: None,
            peer,
        }
    }

    pub(crate) fn connection_dropped(peer: ZenohId) -> Self {
        Self {
            kind: InterestMsgKind::ConnectionDropped,
            id: 0,
            key_expr: None,
            peer,
        }
    }
}

pub(crate) struct InterestState {
    pub(crate) id: InterestId,
    /// `**` when the interest is not restricted to a key expression.
    pub(crate) key_expr: KeyExpr,
    pub(crate) restricted: bool,
    pub(crate) options: InterestOptions,
    pub(crate) callback: Callback<InterestMsg>,
}

impl InterestState {
    /// Whether `msg` concerns this interest. `Final` is addressed by id and not filtered here.
    pub(crate) fn matches(&self, msg: &InterestMsg) -> bool {
        let wanted = match msg.kind.declare_kind() {
            Some(DeclareKind::Subscriber) => self.options.subscribers(),
            Some(DeclareKind::Queryable) => self.options.queryables(),
            Some(DeclareKind::Token) => self.options.tokens(),
            None => return true,
        };
        wanted
            && match &msg.key_expr {
                Some(theirs) if self.restricted => self.key_expr.intersects(theirs),
                _ => true,
            }
    }
}

// Interests are never merged: each one gets its own id and callback.
impl Registered for InterestState {
    fn id(&self) -> Id {
        self.id
    }

    fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }
}

/// Declarations of the peer, by kind and id.
#[derive(Default)]
pub(crate) struct RemoteDeclares {
    declares: HashMap<(DeclareKind, u32), DeclareData>,
}

impl RemoteDeclares {
    pub(crate) fn insert(&mut self, data: DeclareData) -> ZResult<()> {
        self.declares
            .try_reserve(1)
            .map_err(|e| zerror!((errno::OUT_OF_MEMORY) "Unable to record declaration: {}", e))?;
        self.declares.insert((data.kind, data.id), data);
        Ok(())
    }

    pub(crate) fn remove(&mut self, kind: DeclareKind, id: u32) -> Option<DeclareData> {
        self.declares.remove(&(kind, id))
    }

    pub(crate) fn clear(&mut self) {
        self.declares.clear()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn interest(key: Option<&str>, options: InterestOptions) -> InterestState {
        InterestState {
            id: 1,
            key_expr: KeyExpr::new(key.unwrap_or("**")).unwrap(),
            restricted: key.is_some(),
            options,
            callback: Callback::new(Arc::new(|_| {})),
        }
    }

    fn msg(kind: InterestMsgKind, key: &str) -> InterestMsg {
        InterestMsg {
            kind,
            id: 3,
            key_expr: Some(KeyExpr::new(key).unwrap()),
            peer: ZenohId::rand(),
        }
    }

    #[test]
    fn matching_by_kind_and_key() {
        let subs = interest(
            Some("demo/**"),
            InterestOptions::KEYEXPRS + InterestOptions::SUBSCRIBERS,
        );
        assert!(subs.matches(&msg(InterestMsgKind::DeclSubscriber, "demo/a")));
        assert!(subs.matches(&msg(InterestMsgKind::UndeclSubscriber, "demo/a/b")));
        assert!(!subs.matches(&msg(InterestMsgKind::DeclSubscriber, "other")));
        assert!(!subs.matches(&msg(InterestMsgKind::DeclQueryable, "demo/a")));
        assert!(subs.matches(&InterestMsg::connection_dropped(ZenohId::rand())));

        let all = interest(None, InterestOptions::ALL);
        assert!(all.matches(&msg(InterestMsgKind::DeclToken, "anything")));
        assert_eq!(all.key_expr().as_str(), "**");
    }

    #[test]
    fn remote_declares() {
        let mut remote = RemoteDeclares::default();
        let data = DeclareData {
            kind: DeclareKind::Queryable,
            id: 4,
            key_expr: KeyExpr::new("demo/q").unwrap(),
        };
        remote.insert(data.clone()).unwrap();
        assert!(remote.remove(DeclareKind::Subscriber, 4).is_none());
        assert_eq!(remote.remove(DeclareKind::Queryable, 4), Some(data));
        assert!(remote.remove(DeclareKind::Queryable, 4).is_none());
    }
}
