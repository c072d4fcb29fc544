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
use crate::core::{WhatAmIMatcher, ZenohId};

/// # Scout message
///
/// The SCOUT message MAY be sent at any point in time to discover the available zenoh nodes in the
/// network. The SCOUT message SHOULD be sent in a multicast or broadcast fashion. Upon receiving a
/// SCOUT message, a zenoh node MUST first verify whether the matching criteria are satisfied, then
/// it SHOULD reply with a HELLO message in a unicast fashion including all the requested
/// information.
///
/// ```text
/// Header flags:
/// - X: Reserved
/// - X: Reserved
/// - Z: Extensions     If Z==1 then zenoh extensions will follow.
///
///  7 6 5 4 3 2 1 0
/// +-+-+-+-+-+-+-+-+
/// |Z|X|X|  SCOUT  |
/// +-+-+-+---------+
/// |    version    |
/// +---------------+
/// |zid_len|I| what| (#)(*)
/// +-+-+-+-+-+-+-+-+
/// ~      [u8]     ~ if Flag(I)==1 -- ZenohID
/// +---------------+
/// ~   [ScoutExt]  ~ if Flag(Z)==1
/// +---------------+
///
/// (#) what. Indicates the kind of zenoh nodes to be discovered: a bitmap of
///     Router (0b001), Peer (0b010) and Client (0b100).
///
/// (*) zid_len. Indicates the length in bytes of the ZenohID when it is present: real
///     length is zid_len + 1.
/// ```
pub mod flag {
    pub const I: u8 = 1 << 3; // 0x08 ZenohID       if I==1 then the ZenohID is present
    pub const Z: u8 = 1 << 7; // 0x80 Extensions    if Z==1 then an extension will follow
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scout {
    pub version: u8,
    pub what: WhatAmIMatcher,
    pub zid: Option<ZenohId>,
}

impl Scout {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();

        let version: u8 = rng.gen();
        let what = WhatAmIMatcher::rand();
        let zid = rng.gen_bool(0.5).then_some(ZenohId::rand());
        Self { version, what, zid }
    }
}
