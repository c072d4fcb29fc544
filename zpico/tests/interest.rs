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
    thread,
    time::{Duration, Instant},
};

use common::*;
use zpico::{
    config::Config,
    handlers::FifoChannel,
    interest::{InterestMsgKind, InterestOptions, WriteFilterState},
    key_expr::KeyExpr,
    pubsub::Publisher,
};
use zpico_protocol::{
    core::WireExpr,
    network::{
        declare::{self, common::ext::WireExprType},
        Declare, DeclareBody, DeclareFinal, DeclareSubscriber, DeclareToken, InterestMode,
        NetworkBody, NetworkMessage, UndeclareSubscriber, UndeclareToken,
    },
};

mod common;

fn declare(interest_id: Option<u32>, body: DeclareBody) -> Declare {
    Declare {
        interest_id,
        ext_qos: declare::ext::QoSType::DECLARE,
        ext_tstamp: None,
        ext_nodeid: declare::ext::NodeIdType::DEFAULT,
        body,
    }
}

fn wait_for_state(publisher: &Publisher, state: WriteFilterState) {
    let deadline = Instant::now() + TIMEOUT;
    while publisher.write_filter() != Some(state) {
        assert!(Instant::now() < deadline, "Write filter never reached {:?}", state);
        thread::sleep(Duration::from_millis(10));
    }
}

fn pushes(msgs: Vec<NetworkMessage>) -> usize {
    msgs.into_iter()
        .filter(|m| matches!(m.body, NetworkBody::Push(_)))
        .count()
}

#[test]
fn write_filter_follows_remote_subscribers() {
    let (session, peer) = open_session(Config::client());
    let publisher = session.declare_publisher("filter/key").unwrap();

    let interest = peer.expect(|m| match m.body {
        NetworkBody::Interest(i) => Some(i),
        _ => None,
    });
    assert_eq!(interest.mode, InterestMode::CurrentFuture);
    assert!(interest.options.subscribers());
    assert!(!interest.options.queryables());
    assert_eq!(publisher.write_filter(), Some(WriteFilterState::Init));

    // Nothing known yet: publications go out
    publisher.put("init").unwrap();
    assert_eq!(pushes(peer.drain(SLEEP)), 1);

    peer.send(declare(Some(interest.id), DeclareBody::DeclareFinal(DeclareFinal)));
    wait_for_state(&publisher, WriteFilterState::Active);
    publisher.put("filtered").unwrap();
    assert_eq!(pushes(peer.drain(SLEEP)), 0);

    peer.send(declare(
        None,
        DeclareBody::DeclareSubscriber(DeclareSubscriber {
            id: 5,
            wire_expr: WireExpr::from("filter/**"),
        }),
    ));
    wait_for_state(&publisher, WriteFilterState::Off);
    publisher.put("delivered").unwrap();
    assert_eq!(pushes(peer.drain(SLEEP)), 1);

    peer.send(declare(
        None,
        DeclareBody::UndeclareSubscriber(UndeclareSubscriber {
            id: 5,
            ext_wire_expr: WireExprType::null(),
        }),
    ));
    wait_for_state(&publisher, WriteFilterState::Active);

    publisher.undeclare().unwrap();
    let last = peer.expect(|m| match m.body {
        NetworkBody::Interest(i) => Some(i),
        _ => None,
    });
    assert_eq!(last.id, interest.id);
    assert_eq!(last.mode, InterestMode::Final);
}

#[test]
fn write_filter_ignores_unrelated_subscribers() {
    let (session, peer) = open_session(Config::client());
    let publisher = session.declare_publisher("filter/exact").unwrap();
    let interest = peer.expect(|m| match m.body {
        NetworkBody::Interest(i) => Some(i),
        _ => None,
    });
    peer.send(declare(
        None,
        DeclareBody::DeclareSubscriber(DeclareSubscriber {
            id: 1,
            wire_expr: WireExpr::from("somewhere/else"),
        }),
    ));
    peer.send(declare(Some(interest.id), DeclareBody::DeclareFinal(DeclareFinal)));
    wait_for_state(&publisher, WriteFilterState::Active);
}

#[test]
fn declared_interest_notifications() {
    let (session, peer) = open_session(Config::client());
    let key_expr = KeyExpr::new("watch/**").unwrap();
    let (id, notifications) = session
        .declare_interest(
            Some(&key_expr),
            InterestOptions::KEYEXPRS + InterestOptions::TOKENS,
            FifoChannel::new(16),
        )
        .unwrap();
    let sent = peer.expect(|m| match m.body {
        NetworkBody::Interest(i) => Some(i),
        _ => None,
    });
    assert_eq!(sent.id, id);

    peer.send(declare(
        Some(id),
        DeclareBody::DeclareToken(DeclareToken {
            id: 1,
            wire_expr: WireExpr::from("watch/a"),
        }),
    ));
    peer.send(declare(
        None,
        DeclareBody::DeclareToken(DeclareToken {
            id: 2,
            wire_expr: WireExpr::from("elsewhere"),
        }),
    ));
    peer.send(declare(
        None,
        DeclareBody::DeclareSubscriber(DeclareSubscriber {
            id: 3,
            wire_expr: WireExpr::from("watch/b"),
        }),
    ));
    peer.send(declare(Some(id), DeclareBody::DeclareFinal(DeclareFinal)));
    peer.send(declare(
        None,
        DeclareBody::UndeclareToken(UndeclareToken {
            id: 1,
            ext_wire_expr: WireExprType::null(),
        }),
    ));

    let msg = notifications.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(msg.kind, InterestMsgKind::DeclToken);
    assert_eq!(msg.id, 1);
    assert_eq!(msg.key_expr.as_ref().map(|k| k.as_str()), Some("watch/a"));
    assert_eq!(msg.peer, peer.zid);

    let msg = notifications.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(msg.kind, InterestMsgKind::Final);

    // The undeclaration only carries an id: its key comes from the earlier declaration
    let msg = notifications.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(msg.kind, InterestMsgKind::UndeclToken);
    assert_eq!(msg.key_expr.as_ref().map(|k| k.as_str()), Some("watch/a"));

    peer.disconnect();
    let msg = notifications.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(msg.kind, InterestMsgKind::ConnectionDropped);
    assert_eq!(msg.key_expr, None);

    let deadline = Instant::now() + TIMEOUT;
    while !session.is_closed() {
        assert!(Instant::now() < deadline);
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn undeclare_interest_sends_final() {
    let (session, peer) = open_session(Config::client());
    let (id, _notifications) = session
        .declare_interest(None, InterestOptions::ALL, FifoChannel::new(4))
        .unwrap();
    let sent = peer.expect(|m| match m.body {
        NetworkBody::Interest(i) => Some(i),
        _ => None,
    });
    assert!(sent.wire_expr.is_none());

    session.undeclare_interest(id).unwrap();
    let last = peer.expect(|m| match m.body {
        NetworkBody::Interest(i) if i.mode == InterestMode::Final => Some(i),
        _ => None,
    });
    assert_eq!(last.id, id);
    assert!(session.undeclare_interest(id).is_err());
}
