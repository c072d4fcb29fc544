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
use crate::{common::ZExtUnknown, core::Timestamp};

/// # Err message
///
/// Answers a query with a failure. The code fits in 16 bits; larger values are refused
/// when decoding. Extensions are written source info first, then body.
///
/// ```text
///   7 6 5 4 3 2 1 0
///  +-+-+-+-+-+-+-+-+
///  |Z|I|T|   ERR   |
///  +-+-+-+---------+
///  %   code:z16    %
///  +---------------+
///  ~ ts: <u8;z16>  ~  if T==1
///  +---------------+
///  ~  [err_exts]   ~  if Z==1
///  +---------------+
/// ```
pub mod flag {
    pub const T: u8 = 1 << 5; // 0x20 Timestamp follows the code
    pub const I: u8 = 1 << 6; // 0x40 Raised by the infrastructure, not by the replying application
    pub const Z: u8 = 1 << 7; // 0x80 Extensions
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Err {
    pub code: u16,
    pub is_infrastructure: bool,
    pub timestamp: Option<Timestamp>,
    pub ext_sinfo: Option<ext::SourceInfoType>,
    pub ext_body: Option<ext::ErrBodyType>,
    pub ext_unknown: Vec<ZExtUnknown>,
}

pub mod ext {
    use crate::zextzbuf;

    pub type SourceInfo = crate::zenoh::put::ext::SourceInfo;
    pub type SourceInfoType = crate::zenoh::put::ext::SourceInfoType;

    /// Encoding and payload describing the failure.
    pub type ErrBody = zextzbuf!(0x02, false);
    pub type ErrBodyType = crate::zenoh::ext::ValueType<{ ErrBody::ID }>;
}

impl Err {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        let code: u16 = rng.gen();
        let is_infrastructure = rng.gen_bool(0.5);
        let timestamp = rng.gen_bool(0.5).then(crate::zenoh::rand_timestamp);
        let ext_sinfo = rng.gen_bool(0.5).then(ext::SourceInfoType::rand);
        let ext_body = rng.gen_bool(0.5).then(ext::ErrBodyType::rand);
        let ext_unknown = ZExtUnknown::rand_vec(&[ext::SourceInfo::ID, ext::ErrBody::ID]);

        Self {
            code,
            is_infrastructure,
            timestamp,
            ext_sinfo,
            ext_body,
            ext_unknown,
        }
    }
}
