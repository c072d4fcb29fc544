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
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
};

use common::*;
use zpico::{
    config::Config,
    handlers::{Callback, FifoChannel},
    query::GetOptions,
    sample::SampleKind,
    ZBuf,
};
use zpico_protocol::{
    core::{Encoding, Reliability, WireExpr},
    network::{
        declare::ext::QoSType as DeclareQoS, interest, response, Declare, DeclareBody,
        DeclareKeyExpr, DeclareSubscriber, Interest, InterestMode, InterestOptions, NetworkBody,
        Request, Response, ResponseFinal,
    },
    zenoh::{self, ConsolidationMode, PushBody, RequestBody, ResponseBody},
};

mod common;

fn no_interests() -> Config {
    let mut config = Config::client();
    config.interests.enabled = false;
    config
}

fn reply(rid: u32, key: &str, payload: &str, time: Option<u64>) -> Response {
    let timestamp = time.map(|t| {
        zpico::Timestamp::new(zpico_protocol::core::NTP64(t), zpico::ZenohId::rand().into())
    });
    Response {
        rid,
        wire_expr: WireExpr::from(key.to_string()),
        payload: ResponseBody::Reply(zenoh::Reply {
            timestamp,
            encoding: Encoding::empty(),
            ext_sinfo: None,
            ext_consolidation: ConsolidationMode::DEFAULT,
            ext_unknown: vec![],
            payload: payload.into(),
        }),
        ext_qos: response::ext::QoSType::RESPONSE,
        ext_tstamp: None,
        ext_respid: None,
    }
}

fn response_final(rid: u32) -> ResponseFinal {
    ResponseFinal {
        rid,
        ext_qos: response::ext::QoSType::RESPONSE_FINAL,
        ext_tstamp: None,
    }
}

fn expect_request(peer: &FakePeer) -> Request {
    peer.expect(|m| match m.body {
        NetworkBody::Request(r) => Some(r),
        _ => None,
    })
}

#[test]
fn session_pubsub() {
    let (session, peer) = open_session(no_interests());

    let subscriber = session
        .declare_subscriber("test/session/**", FifoChannel::new(16))
        .unwrap();
    let declared = peer.expect(|m| match m.body {
        NetworkBody::Declare(Declare {
            body: DeclareBody::DeclareSubscriber(d),
            ..
        }) => Some(d),
        _ => None,
    });
    assert_eq!(declared.id, subscriber.id());
    assert_eq!(declared.wire_expr.suffix, "test/session/**");

    peer.send(push("test/session/a", "one"));
    peer.send(push("other/key", "ignored"));
    peer.send(push("test/session/b/c", "two"));

    let first = subscriber.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(first.key_expr().as_str(), "test/session/a");
    assert_eq!(first.payload(), &ZBuf::from("one"));
    assert_eq!(first.kind(), SampleKind::Put);
    let second = subscriber.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(second.key_expr().as_str(), "test/session/b/c");
    assert!(subscriber.try_recv().is_err());

    let id = subscriber.id();
    subscriber.undeclare().unwrap();
    peer.expect(|m| match m.body {
        NetworkBody::Declare(Declare {
            body: DeclareBody::UndeclareSubscriber(u),
            ..
        }) if u.id == id => Some(()),
        _ => None,
    });

    session.close().unwrap();
}

#[test]
fn remote_keyexpr_aliases() {
    let (session, peer) = open_session(no_interests());
    let count = Arc::new(AtomicUsize::new(0));
    let c_count = count.clone();
    let _subscriber = session
        .declare_subscriber("alias/**", move |sample: zpico::sample::Sample| {
            assert_eq!(sample.key_expr().as_str(), "alias/base/leaf");
            c_count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    peer.send(Declare {
        interest_id: None,
        ext_qos: DeclareQoS::DECLARE,
        ext_tstamp: None,
        ext_nodeid: zpico_protocol::network::declare::ext::NodeIdType::DEFAULT,
        body: DeclareBody::DeclareKeyExpr(DeclareKeyExpr {
            id: 3,
            wire_expr: WireExpr::from("alias/base"),
        }),
    });
    let mut msg = push("", "aliased");
    msg.wire_expr = WireExpr {
        scope: 3,
        suffix: "/leaf".into(),
        mapping: zpico_protocol::network::Mapping::Sender,
    };
    peer.send(msg);

    let deadline = std::time::Instant::now() + TIMEOUT;
    while count.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
        thread::sleep(SLEEP);
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn subscribers_sharing_a_callback() {
    let (session, peer) = open_session(no_interests());
    let callback = Callback::new(Arc::new(|_: zpico::sample::Sample| {}));

    let first = session
        .declare_subscriber("shared/key", callback.clone())
        .unwrap();
    let second = session
        .declare_subscriber("shared/key", callback.clone())
        .unwrap();
    assert_eq!(first.id(), second.id());

    thread::sleep(SLEEP);
    let declares = peer
        .drain(SLEEP)
        .into_iter()
        .filter(|m| {
            matches!(
                m.body,
                NetworkBody::Declare(Declare {
                    body: DeclareBody::DeclareSubscriber(_),
                    ..
                })
            )
        })
        .count();
    assert_eq!(declares, 1);

    first.undeclare().unwrap();
    let undeclared = |msgs: Vec<zpico_protocol::network::NetworkMessage>| {
        msgs.into_iter().any(|m| {
            matches!(
                m.body,
                NetworkBody::Declare(Declare {
                    body: DeclareBody::UndeclareSubscriber(_),
                    ..
                })
            )
        })
    };
    assert!(!undeclared(peer.drain(SLEEP)));
    second.undeclare().unwrap();
    assert!(undeclared(peer.drain(SLEEP)));
}

#[test]
fn publisher_uses_keyexpr_alias() {
    let (session, peer) = open_session(no_interests());
    let publisher = session.declare_publisher("test/publisher").unwrap();
    assert!(publisher.write_filter().is_none());

    let alias = peer.expect(|m| match m.body {
        NetworkBody::Declare(Declare {
            body: DeclareBody::DeclareKeyExpr(d),
            ..
        }) => Some(d),
        _ => None,
    });
    assert_eq!(alias.wire_expr.suffix, "test/publisher");

    publisher.put("21.5").unwrap();
    publisher.delete().unwrap();
    let (put, del) = (
        peer.expect(|m| match m.body {
            NetworkBody::Push(p) => Some(p),
            _ => None,
        }),
        peer.expect(|m| match m.body {
            NetworkBody::Push(p) => Some(p),
            _ => None,
        }),
    );
    assert_eq!(put.wire_expr.scope, alias.id);
    assert!(!put.wire_expr.has_suffix());
    match put.payload {
        PushBody::Put(p) => assert_eq!(p.payload, ZBuf::from("21.5")),
        PushBody::Del(_) => panic!("Expected a put"),
    }
    assert!(matches!(del.payload, PushBody::Del(_)));

    publisher.undeclare().unwrap();
    peer.expect(|m| match m.body {
        NetworkBody::Declare(Declare {
            body: DeclareBody::UndeclareKeyExpr(u),
            ..
        }) if u.id == alias.id => Some(()),
        _ => None,
    });
}

#[test]
fn session_put_with_best_effort() {
    let (session, peer) = open_session(no_interests());
    session
        .put_with(
            "test/put",
            "value",
            zpico::pubsub::PutOptions::default().reliability(Reliability::BestEffort),
        )
        .unwrap();
    let msg = peer.expect(|m| match m.body {
        NetworkBody::Push(_) => Some(m),
        _ => None,
    });
    assert_eq!(msg.reliability, Reliability::BestEffort);
}

#[test]
fn get_with_latest_consolidation() {
    let (session, peer) = open_session(no_interests());
    let (_, replies) = session
        .get("test/get/**?x=1", GetOptions::default(), FifoChannel::new(16))
        .unwrap();

    let request = expect_request(&peer);
    assert_eq!(request.wire_expr.suffix, "test/get/**");
    let RequestBody::Query(query) = &request.payload else {
        panic!("Expected a query");
    };
    assert_eq!(query.parameters, "x=1");
    assert_eq!(query.consolidation, ConsolidationMode::Latest);

    peer.send(reply(request.id, "test/get/a", "old", Some(1)));
    peer.send(reply(request.id, "test/get/b", "only", Some(5)));
    peer.send(reply(request.id, "test/get/a", "new", Some(2)));
    peer.send(reply(request.id, "outside/key", "dropped", Some(3)));
    // Replies are held until the final
    assert!(replies.recv_timeout(SLEEP).is_err());
    peer.send(response_final(request.id));

    let got: Vec<(String, ZBuf)> = replies
        .iter()
        .map(|r| {
            let sample = r.into_result().unwrap();
            (sample.key_expr().as_str().to_string(), sample.payload().clone())
        })
        .collect();
    assert_eq!(
        got,
        vec![
            ("test/get/a".to_string(), ZBuf::from("new")),
            ("test/get/b".to_string(), ZBuf::from("only")),
        ]
    );
}

#[test]
fn get_with_monotonic_consolidation() {
    let (session, peer) = open_session(no_interests());
    let options = GetOptions::default().consolidation(ConsolidationMode::Monotonic);
    let (_, replies) = session
        .get("test/mono/**", options, FifoChannel::new(16))
        .unwrap();
    let request = expect_request(&peer);

    peer.send(reply(request.id, "test/mono/a", "1", Some(1)));
    peer.send(reply(request.id, "test/mono/a", "3", Some(3)));
    peer.send(reply(request.id, "test/mono/a", "2", Some(2)));
    // Newer replies are handed over on arrival
    let first = replies.recv_timeout(TIMEOUT).unwrap().into_result().unwrap();
    assert_eq!(first.payload(), &ZBuf::from("1"));
    let second = replies.recv_timeout(TIMEOUT).unwrap().into_result().unwrap();
    assert_eq!(second.payload(), &ZBuf::from("3"));
    assert!(replies.recv_timeout(SLEEP).is_err());

    peer.send(response_final(request.id));
    peer.send(reply(request.id, "test/mono/b", "late", Some(9)));
    // The final releases the channel and the late reply is dropped
    assert!(replies.recv_timeout(TIMEOUT).is_err());
    assert!(replies.is_disconnected());
}

#[test]
fn get_without_consolidation_and_error_replies() {
    let (session, peer) = open_session(no_interests());
    let options = GetOptions::default().consolidation(ConsolidationMode::None);
    let (_, replies) = session
        .get("test/get/none", options, FifoChannel::new(16))
        .unwrap();
    let request = expect_request(&peer);

    peer.send(reply(request.id, "test/get/none", "a", None));
    peer.send(reply(request.id, "test/get/none", "b", None));
    peer.send(Response {
        payload: ResponseBody::Err(zenoh::Err {
            code: 7,
            is_infrastructure: false,
            timestamp: None,
            ext_sinfo: None,
            ext_body: Some(zenoh::err::ext::ErrBodyType {
                encoding: Encoding::empty(),
                payload: "failed".into(),
            }),
            ext_unknown: vec![],
        }),
        ..reply(request.id, "test/get/none", "", None)
    });

    let a = replies.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(a.result().unwrap().payload(), &ZBuf::from("a"));
    let b = replies.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(b.result().unwrap().payload(), &ZBuf::from("b"));
    let err = replies.recv_timeout(TIMEOUT).unwrap().into_result().unwrap_err();
    assert_eq!(err.payload(), &ZBuf::from("failed"));
    assert_eq!(err.code(), 7);

    peer.send(response_final(request.id));
    // The handler is released with the query
    assert!(replies.recv_timeout(TIMEOUT).is_err());
}

#[test]
fn get_times_out() {
    let (session, peer) = open_session(no_interests());
    let options = GetOptions::default()
        .consolidation(ConsolidationMode::Latest)
        .timeout(std::time::Duration::from_millis(50));
    let (_, replies) = session
        .get("test/get/slow", options, FifoChannel::new(16))
        .unwrap();
    let request = expect_request(&peer);
    assert_eq!(
        request.ext_timeout,
        Some(std::time::Duration::from_millis(50))
    );
    peer.send(reply(request.id, "test/get/slow", "late", None));

    thread::sleep(SLEEP * 2);
    session.process_timeouts();

    let retained = replies.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(retained.result().unwrap().payload(), &ZBuf::from("late"));
    let timeout = replies.recv_timeout(TIMEOUT).unwrap().into_result().unwrap_err();
    assert_eq!(timeout.payload(), &ZBuf::from("Timeout"));
    assert!(replies.recv_timeout(TIMEOUT).is_err());

    // A final for an expired query is ignored
    peer.send(response_final(request.id));
}

#[test]
fn queryable_replies_then_final() {
    let (session, peer) = open_session(no_interests());
    let queryable = session
        .declare_queryable("test/queryable/**", true, FifoChannel::new(4))
        .unwrap();
    let declared = peer.expect(|m| match m.body {
        NetworkBody::Declare(Declare {
            body: DeclareBody::DeclareQueryable(d),
            ..
        }) => Some(d),
        _ => None,
    });
    assert!(declared.ext_info.complete);

    peer.send(Request {
        id: 42,
        wire_expr: WireExpr::from("test/queryable/a"),
        ext_qos: zpico_protocol::network::request::ext::QoSType::REQUEST,
        ext_tstamp: None,
        ext_nodeid: zpico_protocol::network::request::ext::NodeIdType::DEFAULT,
        ext_target: Default::default(),
        ext_budget: None,
        ext_timeout: None,
        payload: RequestBody::Query(zenoh::Query {
            consolidation: ConsolidationMode::None,
            parameters: "p=v".to_string(),
            ext_sinfo: None,
            ext_body: None,
            ext_unknown: vec![],
        }),
    });

    let query = queryable.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(query.key_expr().as_str(), "test/queryable/a");
    assert_eq!(query.parameters(), "p=v");
    query.reply("test/queryable/a", "answer").unwrap();
    assert!(query.reply("elsewhere", "refused").is_err());
    drop(query);

    let responses = Arc::new(Mutex::new(Vec::new()));
    peer.expect(|m| match m.body {
        NetworkBody::Response(r) => {
            responses.lock().unwrap().push(r);
            None
        }
        NetworkBody::ResponseFinal(f) => Some(f),
        _ => None,
    });
    let responses = responses.lock().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].rid, 42);
    match &responses[0].payload {
        ResponseBody::Reply(r) => assert_eq!(r.payload, ZBuf::from("answer")),
        _ => panic!("Expected a reply"),
    }
}

#[test]
fn unmatched_query_is_finalized() {
    let (_session, peer) = open_session(no_interests());
    peer.send(Request {
        id: 9,
        wire_expr: WireExpr::from("nobody/here"),
        ext_qos: zpico_protocol::network::request::ext::QoSType::REQUEST,
        ext_tstamp: None,
        ext_nodeid: zpico_protocol::network::request::ext::NodeIdType::DEFAULT,
        ext_target: Default::default(),
        ext_budget: None,
        ext_timeout: None,
        payload: RequestBody::Query(zenoh::Query {
            consolidation: ConsolidationMode::DEFAULT,
            parameters: String::new(),
            ext_sinfo: None,
            ext_body: None,
            ext_unknown: vec![],
        }),
    });
    let rid = peer.expect(|m| match m.body {
        NetworkBody::ResponseFinal(f) => Some(f.rid),
        NetworkBody::Response(_) => panic!("No queryable should reply"),
        _ => None,
    });
    assert_eq!(rid, 9);
}

#[test]
fn answers_peer_interests_with_current_declarations() {
    let (session, peer) = open_session(no_interests());
    let _sub = session
        .declare_subscriber("interest/a", FifoChannel::new(4))
        .unwrap();
    let _tok = session.declare_token("interest/token").unwrap();
    let _other = session
        .declare_subscriber("unrelated", FifoChannel::new(4))
        .unwrap();
    peer.drain(SLEEP);

    peer.send(Interest {
        id: 11,
        mode: InterestMode::Current,
        options: InterestOptions::KEYEXPRS + InterestOptions::SUBSCRIBERS + InterestOptions::TOKENS,
        wire_expr: Some(WireExpr::from("interest/**")),
        ext_qos: interest::ext::QoSType::DECLARE,
        ext_tstamp: None,
        ext_nodeid: interest::ext::NodeIdType::DEFAULT,
    });

    let mut bodies = Vec::new();
    peer.expect(|m| match m.body {
        NetworkBody::Declare(d) => {
            assert_eq!(d.interest_id, Some(11));
            match d.body {
                DeclareBody::DeclareFinal(_) => Some(()),
                body => {
                    bodies.push(body);
                    None
                }
            }
        }
        _ => None,
    });
    assert_eq!(bodies.len(), 2);
    assert!(bodies.iter().any(|b| matches!(
        b,
        DeclareBody::DeclareSubscriber(DeclareSubscriber { wire_expr, .. }) if wire_expr.suffix == "interest/a"
    )));
    assert!(bodies
        .iter()
        .any(|b| matches!(b, DeclareBody::DeclareToken(_))));
}
