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

//! Publisher-side write filter.
//!
//! A publisher registers an interest on its key expression and tracks the matching
//! subscribers (and queryables) declared by the peer. While none is known the filter is
//! active and publications are not sent at all.
//!
//! The filter can only err on the side of sending: targets are purged on explicit
//! undeclarations and on connection drops, never on silence.
use std::sync::{Arc, Mutex};

use zpico_core::zlock;
use zpico_protocol::{
    core::{WhatAmI, ZenohId},
    network::{interest::InterestId, InterestOptions},
};
use zpico_result::{bail, errno, zerror, ZResult};

use super::interest::{InterestMsg, InterestMsgKind};
use crate::api::{handlers::Callback, key_expr::KeyExpr, session::SessionInner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFilterState {
    /// Waiting for the peer to list the current declarations.
    Init,
    /// No interested target: publications are suppressed.
    Active,
    /// At least one interested target: publications proceed.
    Off,
}

#[derive(Debug)]
pub(crate) struct WriteFilterCtx {
    state: WriteFilterState,
    targets: Vec<(ZenohId, u32)>,
}

impl WriteFilterCtx {
    /// Only clients wait for the peer's answer; other modes start filtering right away.
    pub(crate) fn new(mode: WhatAmI) -> Self {
        let state = match mode {
            WhatAmI::Client => WriteFilterState::Init,
            WhatAmI::Peer | WhatAmI::Router => WriteFilterState::Active,
        };
        Self {
            state,
            targets: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> WriteFilterState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn targets(&self) -> &[(ZenohId, u32)] {
        &self.targets
    }

    fn push_target(&mut self, peer: ZenohId, id: u32) -> ZResult<()> {
        self.targets
            .try_reserve(1)
            .map_err(|e| zerror!((errno::OUT_OF_MEMORY) "Failed to allocate declare id: {}", e))?;
        self.targets.push((peer, id));
        Ok(())
    }

    fn release_targets<F: Fn(&(ZenohId, u32)) -> bool>(&mut self, drop_target: F) {
        self.targets.retain(|t| !drop_target(t));
        if self.targets.is_empty() {
            tracing::trace!("Write filter: no more targets, filter active");
            self.state = WriteFilterState::Active;
        }
    }

    pub(crate) fn handle(&mut self, msg: &InterestMsg) -> ZResult<()> {
        use InterestMsgKind::*;
        use WriteFilterState::*;

        if self.state == Off && self.targets.is_empty() {
            bail!((errno::FILTER_STATE_INCONSISTENT) "Write filter is off without any target");
        }

        match (self.state, msg.kind) {
            (Init, Final) => {
                tracing::trace!("Write filter: no current target, filter active");
                self.state = Active;
            }
            (Init | Active, DeclSubscriber | DeclQueryable) => {
                self.push_target(msg.peer, msg.id)?;
                tracing::trace!("Write filter: target {}:{}, filter off", msg.peer, msg.id);
                self.state = Off;
            }
            (Off, DeclSubscriber | DeclQueryable) => self.push_target(msg.peer, msg.id)?,
            (Off, UndeclSubscriber | UndeclQueryable) => {
                self.release_targets(|(peer, id)| *peer == msg.peer && *id == msg.id)
            }
            (Off, ConnectionDropped) => self.release_targets(|(peer, _)| *peer == msg.peer),
            _ => {}
        }
        Ok(())
    }
}

/// The write filter of a publisher.
pub(crate) struct WriteFilter {
    ctx: Arc<Mutex<WriteFilterCtx>>,
    interest_id: InterestId,
}

impl WriteFilter {
    pub(crate) fn new(
        session: &Arc<SessionInner>,
        key_expr: &KeyExpr,
        with_queryables: bool,
    ) -> ZResult<Self> {
        let mut options = InterestOptions::KEYEXPRS
            + InterestOptions::SUBSCRIBERS
            + InterestOptions::AGGREGATE;
        if with_queryables {
            options += InterestOptions::QUERYABLES;
        }

        let ctx = Arc::new(Mutex::new(WriteFilterCtx::new(session.mode())));
        let c = ctx.clone();
        let callback = Callback::new(Arc::new(move |msg: InterestMsg| {
            if let Err(e) = zlock!(c).handle(&msg) {
                tracing::error!("{}", e);
            }
        }));

        let interest_id = session.declare_interest_inner(Some(key_expr), options, callback)?;
        if interest_id == 0 {
            bail!((errno::GENERIC) "Invalid interest id for the write filter of {}", key_expr);
        }
        Ok(Self { ctx, interest_id })
    }

    pub(crate) fn state(&self) -> WriteFilterState {
        zlock!(self.ctx).state()
    }

    /// Whether publications must be suppressed.
    pub(crate) fn is_active(&self) -> bool {
        self.state() == WriteFilterState::Active
    }

    pub(crate) fn undeclare(&self, session: &Arc<SessionInner>) -> ZResult<()> {
        session.undeclare_interest_inner(self.interest_id)
    }
}

#[cfg(test)]
mod tests {
    use zpico_result::ErrNo;

    use super::*;

    fn msg(kind: InterestMsgKind, peer: ZenohId, id: u32) -> InterestMsg {
        InterestMsg {
            kind,
            id,
            key_expr: KeyExpr::new("demo/a").ok(),
            peer,
        }
    }

    #[test]
    fn final_activates() {
        let mut ctx = WriteFilterCtx::new(WhatAmI::Client);
        assert_eq!(ctx.state(), WriteFilterState::Init);
        ctx.handle(&InterestMsg::final_(ZenohId::rand())).unwrap();
        assert_eq!(ctx.state(), WriteFilterState::Active);
    }

    #[test]
    fn declare_then_undeclare() {
        let peer = ZenohId::rand();
        let mut ctx = WriteFilterCtx::new(WhatAmI::Client);
        ctx.handle(&msg(InterestMsgKind::DeclSubscriber, peer, 1)).unwrap();
        assert_eq!(ctx.state(), WriteFilterState::Off);
        assert_eq!(ctx.targets(), [(peer, 1)]);

        // Final after the current declarations changes nothing
        ctx.handle(&InterestMsg::final_(peer)).unwrap();
        assert_eq!(ctx.state(), WriteFilterState::Off);

        ctx.handle(&msg(InterestMsgKind::UndeclSubscriber, peer, 1)).unwrap();
        assert_eq!(ctx.state(), WriteFilterState::Active);
        assert!(ctx.targets().is_empty());
    }

    #[test]
    fn several_targets() {
        let peer = ZenohId::rand();
        let mut ctx = WriteFilterCtx::new(WhatAmI::Peer);
        assert_eq!(ctx.state(), WriteFilterState::Active);
        ctx.handle(&msg(InterestMsgKind::DeclSubscriber, peer, 1)).unwrap();
        ctx.handle(&msg(InterestMsgKind::DeclQueryable, peer, 2)).unwrap();
        ctx.handle(&msg(InterestMsgKind::UndeclSubscriber, peer, 1)).unwrap();
        assert_eq!(ctx.state(), WriteFilterState::Off);
        // Unknown target
        ctx.handle(&msg(InterestMsgKind::UndeclQueryable, peer, 9)).unwrap();
        assert_eq!(ctx.state(), WriteFilterState::Off);
        ctx.handle(&msg(InterestMsgKind::UndeclQueryable, peer, 2)).unwrap();
        assert_eq!(ctx.state(), WriteFilterState::Active);
    }

    #[test]
    fn peer_mode_ignores_early_messages() {
        let mut ctx = WriteFilterCtx::new(WhatAmI::Peer);
        ctx.handle(&InterestMsg::final_(ZenohId::rand())).unwrap();
        ctx.handle(&msg(InterestMsgKind::UndeclSubscriber, ZenohId::rand(), 1))
            .unwrap();
        ctx.handle(&msg(InterestMsgKind::DeclToken, ZenohId::rand(), 1))
            .unwrap();
        assert_eq!(ctx.state(), WriteFilterState::Active);
    }

    #[test]
    fn connection_dropped_purges_peer() {
        let (a, b) = (ZenohId::rand(), ZenohId::rand());
        let mut ctx = WriteFilterCtx::new(WhatAmI::Client);
        ctx.handle(&msg(InterestMsgKind::DeclSubscriber, a, 1)).unwrap();
        ctx.handle(&msg(InterestMsgKind::DeclSubscriber, b, 1)).unwrap();
        ctx.handle(&InterestMsg::connection_dropped(a)).unwrap();
        assert_eq!(ctx.targets(), [(b, 1)]);
        assert_eq!(ctx.state(), WriteFilterState::Off);
        ctx.handle(&InterestMsg::connection_dropped(b)).unwrap();
        assert_eq!(ctx.state(), WriteFilterState::Active);
    }

    #[test]
    fn off_without_targets_is_inconsistent() {
        let mut ctx = WriteFilterCtx {
            state: WriteFilterState::Off,
            targets: Vec::new(),
        };
        let e = ctx.handle(&InterestMsg::final_(ZenohId::rand())).unwrap_err();
        assert_eq!(e.errno().get(), errno::FILTER_STATE_INCONSISTENT);
    }
}
