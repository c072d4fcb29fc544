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
use zpico::{config::Config, handlers::FifoChannel, query::GetOptions};
use zpico_protocol::network::NetworkBody;
use zpico_result::{errno, ErrNo};

mod common;

fn no_interests() -> Config {
    let mut config = Config::client();
    config.interests.enabled = false;
    config
}

#[test]
fn close_releases_handlers() {
    let (session, peer) = open_session(no_interests());
    let subscriber = session
        .declare_subscriber("close/**", FifoChannel::new(4))
        .unwrap();
    let queryable = session
        .declare_queryable("close/q", false, FifoChannel::new(4))
        .unwrap();
    let publisher = session.declare_publisher("close/pub").unwrap();
    let (_, replies) = session
        .get("close/**", GetOptions::default(), FifoChannel::new(4))
        .unwrap();
    peer.expect(|m| match m.body {
        NetworkBody::Request(_) => Some(()),
        _ => None,
    });

    session.close().unwrap();
    assert!(session.is_closed());
    // Closing twice is harmless
    session.close().unwrap();

    assert!(subscriber.recv_timeout(TIMEOUT).is_err());
    assert!(queryable.recv_timeout(TIMEOUT).is_err());
    assert!(replies.recv_timeout(TIMEOUT).is_err());

    let err = publisher.put("late").unwrap_err();
    assert_eq!(
        err.downcast_ref::<zpico::ZError>().map(|e| e.errno().get()),
        Some(errno::SESSION_CLOSED)
    );
    assert!(session.declare_subscriber("close/again", FifoChannel::new(4)).is_err());
    assert!(session.put("close/put", "late").is_err());

    // Undeclaring after close is a no-op
    subscriber.undeclare().unwrap();
    publisher.undeclare().unwrap();

    peer.drain(SLEEP);
    assert!(peer.got_close());
}

#[test]
fn close_with_a_full_subscriber_channel() {
    let (session, peer) = open_session(no_interests());
    let subscriber = session
        .declare_subscriber("full/a", FifoChannel::new(1))
        .unwrap();
    for i in 0..3 {
        peer.send(push("full/a", &i.to_string()));
    }
    // The read task is now waiting for room in the channel
    thread::sleep(Duration::from_millis(300));

    let (tx, rx) = flume::bounded(1);
    let closer = {
        let session = session.clone();
        thread::spawn(move || tx.send(session.close()).unwrap())
    };
    rx.recv_timeout(TIMEOUT)
        .expect("Close stayed blocked on the subscriber channel")
        .unwrap();
    closer.join().unwrap();

    let received: Vec<_> = subscriber.try_iter().collect();
    assert_eq!(received.len(), 1);
    assert!(subscriber.recv_timeout(SLEEP).is_err());
    peer.drain(SLEEP);
    assert!(peer.got_close());
}

#[test]
fn drop_closes_session() {
    let (session, peer) = open_session(no_interests());
    let token = session.declare_token("drop/token").unwrap();
    drop(session);

    peer.drain(SLEEP);
    assert!(peer.got_close());
    // The token outlives the session without effect
    token.undeclare().unwrap();
}

#[test]
fn lease_expiry() {
    let mut config = no_interests();
    config.transport.lease_ms = 200;
    config.transport.keep_alive = 4;
    let (session, peer) = open_session(config);
    let (_, replies) = session
        .get("lease/**", GetOptions::default(), FifoChannel::new(4))
        .unwrap();

    // The peer stays silent
    let deadline = Instant::now() + TIMEOUT;
    while !session.is_closed() {
        assert!(Instant::now() < deadline, "Transport never expired");
        thread::sleep(Duration::from_millis(20));
    }
    assert!(replies.recv_timeout(TIMEOUT).is_err());
    peer.drain(SLEEP);
    assert!(peer.got_close());
    session.close().unwrap();
}

#[test]
fn invalid_config_is_refused() {
    let mut config = Config::client();
    config.transport.sn_resolution = 12;
    let (link, _peer) = LoopbackLink::pair();
    let err = zpico::open(
        config,
        link,
        zpico::transport::TransportPeer {
            zid: zpico::ZenohId::rand(),
            whatami: zpico::WhatAmI::Router,
        },
    )
    .unwrap_err();
    assert_eq!(
        err.downcast_ref::<zpico::ZError>().map(|e| e.errno().get()),
        Some(errno::INVALID_CONFIG)
    );
}
