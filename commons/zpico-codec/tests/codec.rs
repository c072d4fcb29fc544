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
use rand::Rng;
use zpico_buffers::{
    reader::{HasReader, Reader},
    writer::HasWriter,
    ZBuf,
};
use zpico_codec::*;
use zpico_protocol::{
    common::*,
    core::*,
    network::{self, *},
    scouting::*,
    transport::{self, *},
    zenoh,
};

const NUM_ITER: usize = 100;

macro_rules! run_single {
    ($type:ty, $rand:expr, $wcode:expr, $rcode:expr, $buff:expr) => {
        for _ in 0..NUM_ITER {
            let x: $type = $rand;

            $buff.clear();
            let mut writer = $buff.writer();
            $wcode.write(&mut writer, &x).unwrap();

            let mut reader = $buff.reader();
            let y: $type = $rcode.read(&mut reader).unwrap();
            assert_eq!(x, y);
            assert!(!reader.can_read());
        }
    };
}

macro_rules! run {
    ($type:ty, $rand:expr) => {
        println!("Vec<u8>: codec {}", std::any::type_name::<$type>());
        let codec = Zenoh080::new();
        let mut buffer: Vec<u8> = vec![];
        run_single!($type, $rand, codec, codec, buffer);
    };
    ($type:ty, $rand:expr, $wcode:block, $rcode:block) => {
        println!("Vec<u8>: codec {}", std::any::type_name::<$type>());
        let mut buffer: Vec<u8> = vec![];
        run_single!($type, $rand, $wcode, $rcode, buffer);
    };
}

// Every strict prefix of an encoded message must fail to decode.
macro_rules! run_truncated {
    ($type:ty, $rand:expr) => {
        let codec = Zenoh080::new();
        for _ in 0..NUM_ITER / 10 {
            let x: $type = $rand;

            let mut buffer: Vec<u8> = vec![];
            let mut writer = buffer.writer();
            codec.write(&mut writer, &x).unwrap();

            for i in 0..buffer.len() {
                let mut reader = buffer[..i].reader();
                let y: Result<$type, _> = codec.read(&mut reader);
                assert!(y.is_err(), "{} decoded from {i} bytes", std::any::type_name::<$type>());
            }
        }
    };
}

// Core
#[test]
fn codec_zid() {
    run!(ZenohId, ZenohId::rand());
}

#[test]
fn codec_zid_raw() {
    let mut buffer: Vec<u8> = vec![];
    for _ in 0..NUM_ITER {
        let x = ZenohId::rand();
        let codec = Zenoh080Length::new(x.size());

        buffer.clear();
        let mut writer = buffer.writer();
        codec.write(&mut writer, &x).unwrap();
        assert_eq!(buffer.len(), x.size());

        let mut reader = buffer.reader();
        let y: ZenohId = codec.read(&mut reader).unwrap();
        assert_eq!(x, y);
    }
}

#[test]
fn codec_zbuf() {
    run!(
        ZBuf,
        ZBuf::rand(rand::thread_rng().gen_range(0..=64))
    );
}

#[test]
fn codec_timestamp() {
    run!(Timestamp, {
        let time = uhlc::NTP64(rand::thread_rng().gen());
        let id = uhlc::ID::from(ZenohId::rand());
        Timestamp::new(time, id)
    });
}

#[test]
fn codec_encoding() {
    run!(Encoding, Encoding::rand());
}

#[test]
fn codec_wire_expr() {
    let codec = Zenoh080::new();
    let mut buffer: Vec<u8> = vec![];
    for _ in 0..NUM_ITER {
        let x = WireExpr::rand();

        buffer.clear();
        let mut writer = buffer.writer();
        codec.write(&mut writer, &x).unwrap();

        // The suffix presence and the mapping travel in the enclosing message header
        let mut reader = buffer.reader();
        let y = zpico_codec::core::wire_expr::read(&mut reader, x.has_suffix()).unwrap();
        assert_eq!(x.as_id_and_suffix(), y.as_id_and_suffix());
        assert!(!reader.can_read());
    }
}

#[test]
fn codec_extension() {
    macro_rules! run_extension_single {
        ($ext:ty, $buff:expr) => {
            let codec = Zenoh080::new();
            for _ in 0..NUM_ITER {
                let more: bool = rand::random();
                let x: (&$ext, bool) = (&<$ext>::rand(), more);

                $buff.clear();
                let mut writer = $buff.writer();
                codec.write(&mut writer, x).unwrap();

                let mut reader = $buff.reader();
                let y: ($ext, bool) = codec.read(&mut reader).unwrap();
                assert!(!reader.can_read());

                assert_eq!(x.0, &y.0);
                assert_eq!(x.1, y.1);

            }
        };
    }

    macro_rules! run_extension {
        ($type:ty) => {
            let mut buff: Vec<u8> = vec![];
            run_extension_single!($type, buff);
        };
    }

    run_extension!(zpico_protocol::zextunit!(0x00, true));
    run_extension!(zpico_protocol::zextunit!(0x00, false));
    run_extension!(zpico_protocol::zextz64!(0x01, true));
    run_extension!(zpico_protocol::zextz64!(0x01, false));
    run_extension!(zpico_protocol::zextzbuf!(0x02, true));
    run_extension!(zpico_protocol::zextzbuf!(0x02, false));
}

// Scouting
#[test]
fn codec_scout() {
    run!(Scout, Scout::rand());
}

#[test]
fn codec_hello() {
    run!(Hello, Hello::rand());
}

#[test]
fn codec_scouting() {
    run!(ScoutingMessage, ScoutingMessage::rand());
}

// Transport
#[test]
fn codec_close() {
    run!(Close, Close::rand());
}

#[test]
fn codec_keep_alive() {
    run!(KeepAlive, KeepAlive::rand());
}

#[test]
fn codec_frame_header() {
    run!(FrameHeader, FrameHeader::rand());
}

#[test]
fn codec_frame() {
    run!(Frame, Frame::rand());
}

#[test]
fn codec_transport() {
    run!(TransportMessage, TransportMessage::rand());
}

#[test]
fn codec_batch() {
    for _ in 0..NUM_ITER {
        let streamed: bool = rand::random();
        let msgs: Vec<TransportMessage> = (0..rand::thread_rng().gen_range(1..4))
            .map(|_| TransportMessage::rand())
            .collect();

        let batch =
            zpico_codec::transport::batch::serialize(&msgs, streamed, batch_size::UNICAST)
                .unwrap();
        let body = if streamed {
            let len = zpico_codec::transport::batch::decode_len([batch[0], batch[1]]);
            assert_eq!(len, batch.len() - 2);
            &batch[2..]
        } else {
            &batch[..]
        };
        let decoded = zpico_codec::transport::batch::deserialize(body).unwrap();
        assert_eq!(msgs, decoded);
    }
}

// Network
#[test]
fn codec_declare() {
    run!(Declare, Declare::rand());
}

#[test]
fn codec_declare_body() {
    run!(DeclareBody, DeclareBody::rand());
}

#[test]
fn codec_declare_keyexpr() {
    run!(DeclareKeyExpr, DeclareKeyExpr::rand());
}

#[test]
fn codec_undeclare_keyexpr() {
    run!(UndeclareKeyExpr, UndeclareKeyExpr::rand());
}

#[test]
fn codec_declare_subscriber() {
    run!(DeclareSubscriber, DeclareSubscriber::rand());
}

#[test]
fn codec_undeclare_subscriber() {
    run!(UndeclareSubscriber, UndeclareSubscriber::rand());
}

#[test]
fn codec_declare_queryable() {
    run!(DeclareQueryable, DeclareQueryable::rand());
}

#[test]
fn codec_undeclare_queryable() {
    run!(UndeclareQueryable, UndeclareQueryable::rand());
}

#[test]
fn codec_declare_token() {
    run!(DeclareToken, DeclareToken::rand());
}

#[test]
fn codec_undeclare_token() {
    run!(UndeclareToken, UndeclareToken::rand());
}

#[test]
fn codec_interest() {
    run!(Interest, Interest::rand());
}

#[test]
fn codec_push() {
    run!(Push, Push::rand());
}

#[test]
fn codec_request() {
    run!(Request, Request::rand());
}

#[test]
fn codec_response() {
    run!(Response, Response::rand());
}

#[test]
fn codec_response_final() {
    run!(ResponseFinal, ResponseFinal::rand());
}

#[test]
fn codec_network_oam() {
    run!(network::Oam, network::Oam::rand());
}

#[test]
fn codec_network() {
    run!(NetworkMessage, NetworkMessage::rand());
}

#[test]
fn codec_frame_sets_reliability() {
    let codec = Zenoh080::new();
    let mut buffer: Vec<u8> = vec![];
    for reliability in [Reliability::Reliable, Reliability::BestEffort] {
        let frame = Frame {
            reliability,
            sn: 42,
            payload: (0..3).map(|_| NetworkMessage::rand()).collect(),
        };

        buffer.clear();
        let mut writer = buffer.writer();
        codec.write(&mut writer, &frame).unwrap();

        let mut reader = buffer.reader();
        let y: Frame = codec.read(&mut reader).unwrap();
        assert_eq!(y.payload.len(), 3);
        assert!(y.payload.iter().all(|m| m.reliability == reliability));
    }
}

#[test]
fn codec_frame_stops_at_next_transport_message() {
    let codec = Zenoh080::new();
    let frame: TransportMessage = Frame::rand().into();
    let keepalive: TransportMessage = KeepAlive.into();

    let mut buffer: Vec<u8> = vec![];
    let mut writer = buffer.writer();
    codec.write(&mut writer, &frame).unwrap();
    codec.write(&mut writer, &keepalive).unwrap();

    let mut reader = buffer.reader();
    let x: TransportMessage = codec.read(&mut reader).unwrap();
    let y: TransportMessage = codec.read(&mut reader).unwrap();
    assert_eq!(x, frame);
    assert_eq!(y, keepalive);
    assert!(!reader.can_read());
}

#[test]
fn codec_network_truncated() {
    run_truncated!(NetworkMessage, NetworkMessage::rand());
}

// Zenoh
#[test]
fn codec_put() {
    run!(zenoh::Put, zenoh::Put::rand());
}

#[test]
fn codec_del() {
    run!(zenoh::Del, zenoh::Del::rand());
}

#[test]
fn codec_query() {
    run!(zenoh::Query, zenoh::Query::rand());
}

#[test]
fn codec_reply() {
    run!(zenoh::Reply, zenoh::Reply::rand());
}

#[test]
fn codec_err() {
    run!(zenoh::Err, zenoh::Err::rand());
}

#[test]
fn codec_ack() {
    run!(zenoh::Ack, zenoh::Ack::rand());
}

#[test]
fn codec_pull() {
    run!(zenoh::Pull, zenoh::Pull::rand());
}

#[test]
fn codec_zenoh_truncated() {
    run_truncated!(zenoh::Put, zenoh::Put::rand());
    run_truncated!(zenoh::Query, zenoh::Query::rand());
    run_truncated!(zenoh::Reply, zenoh::Reply::rand());
    run_truncated!(zenoh::Err, zenoh::Err::rand());
    run_truncated!(Hello, Hello::rand());
}

#[test]
fn put_with_unknown_optional_extension() {
    let codec = Zenoh080::new();

    let mut x = zenoh::Put::rand();
    x.ext_unknown = vec![ZExtUnknown::new(0x0e, false, ZExtBody::Z64(42))];

    let mut buffer: Vec<u8> = vec![];
    let mut writer = buffer.writer();
    codec.write(&mut writer, &x).unwrap();

    let mut reader = buffer.reader();
    let y: zenoh::Put = codec.read(&mut reader).unwrap();
    assert_eq!(x.payload, y.payload);
    assert_eq!(y.ext_unknown.len(), 1);
}

#[test]
fn put_with_unknown_mandatory_extension() {
    let codec = Zenoh080::new();

    let mut x = zenoh::Put::rand();
    x.ext_unknown = vec![ZExtUnknown::new(0x0e, true, ZExtBody::Unit)];

    let mut buffer: Vec<u8> = vec![];
    let mut writer = buffer.writer();
    codec.write(&mut writer, &x).unwrap();

    let mut reader = buffer.reader();
    let y: Result<zenoh::Put, _> = codec.read(&mut reader);
    assert!(y.is_err());
}

#[test]
fn wrong_message_id_is_rejected() {
    let codec = Zenoh080::new();

    let x = zenoh::Del::rand();
    let mut buffer: Vec<u8> = vec![];
    let mut writer = buffer.writer();
    codec.write(&mut writer, &x).unwrap();

    let mut reader = buffer.reader();
    let y: Result<zenoh::Put, _> = codec.read(&mut reader);
    assert!(y.is_err());

    let mut reader = buffer.reader();
    let y: Result<transport::Close, _> = codec.read(&mut reader);
    assert!(y.is_err());
}
