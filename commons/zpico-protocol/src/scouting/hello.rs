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
use std::fmt;

use crate::core::{Locator, WhatAmI, ZenohId};

/// # Hello message
///
/// The HELLO message is sent in any of the following cases:
///     1) in response to a SCOUT message;
///     2) to (periodically) advertise (e.g., on multicast) the node and the locators it is reachable at.
///
/// ```text
/// Header flags:
/// - L: Locators       If L==1 then the list of locators is present, else the src address is the locator
/// - X: Reserved
/// - Z: Extensions     If Z==1 then zenoh extensions will follow.
///
///  7 6 5 4 3 2 1 0
/// +-+-+-+-+-+-+-+-+
/// |Z|X|L|  HELLO  |
/// +-+-+-+---------+
/// |    version    |
/// +---------------+
/// |zid_len|X|X|wai| (*)
/// +-+-+-+-+-+-+-+-+
/// ~     [u8]      ~ -- ZenohID
/// +---------------+
/// ~   <utf8;z8>   ~ if Flag(L)==1 -- List of locators
/// +---------------+
/// ~  [HelloExts]  ~ if Flag(Z)==1
/// +---------------+
///
/// (*) WhatAmI. It indicates the role of the zenoh node sending the HELLO message.
///    The valid WhatAmI values are:
///    - 0b00: Router
///    - 0b01: Peer
///    - 0b10: Client
///    - 0b11: Reserved
/// ```
pub mod flag {
    pub const L: u8 = 1 << 5; // 0x20 Locators      if L==1 then Locators are present
    // pub const X: u8 = 1 << 6; // 0x40 Reserved
    pub const Z: u8 = 1 << 7; // 0x80 Extensions    if Z==1 then an extension will follow
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    pub version: u8,
    pub whatami: WhatAmI,
    pub zid: ZenohId,
    pub locators: Vec<Locator>,
}

impl fmt::Display for Hello {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Hello")
            .field("zid", &self.zid)
            .field("whatami", &self.whatami)
            .field("locators", &self.locators)
            .finish()
    }
}

impl Hello {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();

        let version: u8 = rng.gen();
        let zid = ZenohId::rand();
        let whatami = WhatAmI::rand();
        let locators = if rng.gen_bool(0.5) {
            (0..rng.gen_range(1..4)).map(|_| Locator::rand()).collect()
        } else {
            vec![]
        };
        Self {
            version,
            zid,
            whatami,
            locators,
        }
    }
}
