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
/// # Close message
///
/// The CLOSE message is sent at any time to close the transport with the corresponding peer,
/// e.g. when the session is closed or when the peer lease expired.
///
/// ```text
/// Flags:
/// - S: Session Close  If S==1 close the whole session, close only the link otherwise
/// - X: Reserved
/// - Z: Extension      If Z==1 then at least one extension is present
///
///  7 6 5 4 3 2 1 0
/// +-+-+-+-+-+-+-+-+
/// |Z|X|S|  CLOSE  |
/// +-+-+-+---------+
/// |    Reason     |
/// +---------------+
/// ~  [CloseExts]  ~ if Z==1
/// +---------------+
/// ```
pub mod flag {
    pub const S: u8 = 1 << 5; // 0x20 Session close if S==1 close the whole session, close only the link otherwise
    // pub const X: u8 = 1 << 6; // 0x40 Reserved
    pub const Z: u8 = 1 << 7; // 0x80 Extensions    if Z==1 then an extension will follow
}

// Reason for the Close message
pub mod reason {
    pub const GENERIC: u8 = 0x00;
    pub const UNSUPPORTED: u8 = 0x01;
    pub const INVALID: u8 = 0x02;
    pub const MAX_SESSIONS: u8 = 0x03;
    pub const MAX_LINKS: u8 = 0x04;
    pub const EXPIRED: u8 = 0x05;
    pub const UNRESPONSIVE: u8 = 0x06;
}

pub fn reason_to_str(reason: u8) -> &'static str {
    match reason {
        reason::GENERIC => "GENERIC",
        reason::UNSUPPORTED => "UNSUPPORTED",
        reason::INVALID => "INVALID",
        reason::MAX_SESSIONS => "MAX_SESSIONS",
        reason::MAX_LINKS => "MAX_LINKS",
        reason::EXPIRED => "EXPIRED",
        reason::UNRESPONSIVE => "UNRESPONSIVE",
        _ => "UNKNOWN",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Close {
    pub reason: u8,
    pub session: bool,
}

impl Close {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();

        let reason: u8 = rng.gen();
        let session = rng.gen_bool(0.5);

        Self { reason, session }
    }
}
