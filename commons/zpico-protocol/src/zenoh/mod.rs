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
pub mod ack;
pub mod del;
pub mod err;
pub mod pull;
pub mod put;
pub mod query;
pub mod reply;

pub use ack::Ack;
pub use del::Del;
pub use err::Err;
pub use pull::Pull;
pub use put::Put;
pub use query::{ConsolidationMode, Query};
pub use reply::Reply;

pub mod id {
    pub const OAM: u8 = 0x00;
    pub const PUT: u8 = 0x01;
    pub const DEL: u8 = 0x02;
    pub const QUERY: u8 = 0x03;
    pub const REPLY: u8 = 0x04;
    pub const ERR: u8 = 0x05;
    pub const ACK: u8 = 0x06;
    pub const PULL: u8 = 0x07;
}

// Push
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushBody {
    Put(Put),
    Del(Del),
}

impl PushBody {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();

        match rng.gen_range(0..2) {
            0 => PushBody::Put(Put::rand()),
            1 => PushBody::Del(Del::rand()),
            _ => unreachable!(),
        }
    }
}

impl From<Put> for PushBody {
    fn from(p: Put) -> PushBody {
        PushBody::Put(p)
    }
}

impl From<Del> for PushBody {
    fn from(d: Del) -> PushBody {
        PushBody::Del(d)
    }
}

// Request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Query(Query),
    Put(Put),
    Del(Del),
    Pull(Pull),
}

impl RequestBody {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();

        match rng.gen_range(0..4) {
            0 => RequestBody::Query(Query::rand()),
            1 => RequestBody::Put(Put::rand()),
            2 => RequestBody::Del(Del::rand()),
            3 => RequestBody::Pull(Pull::rand()),
            _ => unreachable!(),
        }
    }
}

impl From<Query> for RequestBody {
    fn from(q: Query) -> RequestBody {
        RequestBody::Query(q)
    }
}

impl From<Put> for RequestBody {
    fn from(p: Put) -> RequestBody {
        RequestBody::Put(p)
    }
}

impl From<Del> for RequestBody {
    fn from(d: Del) -> RequestBody {
        RequestBody::Del(d)
    }
}

impl From<Pull> for RequestBody {
    fn from(p: Pull) -> RequestBody {
        RequestBody::Pull(p)
    }
}

// Response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Reply(Reply),
    Err(Err),
    Ack(Ack),
    Put(Put),
}

impl ResponseBody {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();

        match rng.gen_range(0..4) {
            0 => ResponseBody::Reply(Reply::rand()),
            1 => ResponseBody::Err(Err::rand()),
            2 => ResponseBody::Ack(Ack::rand()),
            3 => ResponseBody::Put(Put::rand()),
            _ => unreachable!(),
        }
    }
}

impl From<Reply> for ResponseBody {
    fn from(r: Reply) -> ResponseBody {
        ResponseBody::Reply(r)
    }
}

impl From<Err> for ResponseBody {
    fn from(r: Err) -> ResponseBody {
        ResponseBody::Err(r)
    }
}

impl From<Ack> for ResponseBody {
    fn from(r: Ack) -> ResponseBody {
        ResponseBody::Ack(r)
    }
}

pub mod ext {
    use zpico_buffers::ZBuf;

    use crate::core::{Encoding, EntityGlobalId, EntityId, ZenohId};

    /// ```text
    ///  7 6 5 4 3 2 1 0
    /// +-+-+-+-+-+-+-+-+
    /// |zid_len|X|X|X|X|
    /// +-------+-+-+---+
    /// ~      zid      ~
    /// +---------------+
    /// %      eid      %
    /// +---------------+
    /// %      sn       %
    /// +---------------+
    /// ```
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SourceInfoType<const ID: u8> {
        pub id: EntityGlobalId,
        pub sn: u32,
    }

    impl<const ID: u8> SourceInfoType<{ ID }> {
        pub fn new(zid: ZenohId, eid: EntityId, sn: u32) -> Self {
            Self {
                id: EntityGlobalId { zid, eid },
                sn,
            }
        }

        #[cfg(feature = "test")]
        pub fn rand() -> Self {
            use rand::Rng;
            let mut rng = rand::thread_rng();

            let id = EntityGlobalId::rand();
            let sn: u32 = rng.gen();
            Self { id, sn }
        }
    }

    /// ```text
    ///   7 6 5 4 3 2 1 0
    ///  +-+-+-+-+-+-+-+-+
    ///  ~   encoding    ~
    ///  +---------------+
    ///  ~ pl: <u8;z32> ~  -- Payload, with its own length
    ///  +---------------+
    /// ```
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ValueType<const ID: u8> {
        pub encoding: Encoding,
        pub payload: ZBuf,
    }

    impl<const ID: u8> ValueType<{ ID }> {
        #[cfg(feature = "test")]
        pub fn rand() -> Self {
            use rand::Rng;
            let mut rng = rand::thread_rng();

            let encoding = Encoding::rand();
            let payload = ZBuf::rand(rng.gen_range(1..=64));

            Self { encoding, payload }
        }
    }
}

#[cfg(feature = "test")]
pub(crate) fn rand_timestamp() -> crate::core::Timestamp {
    use rand::Rng;

    let time = uhlc::NTP64(rand::thread_rng().gen());
    let id = uhlc::ID::from(crate::core::ZenohId::rand());
    crate::core::Timestamp::new(time, id)
}
