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
use crate::common::ZExtUnknown;

/// The kind of consolidation applied to the replies of a query. The discriminant is the
/// value carried by the consolidation extension.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Copy)]
#[repr(u8)]
pub enum ConsolidationMode {
    /// Apply automatic consolidation based on the queryable's preferences
    #[default]
    Auto,
    /// No consolidation applied: multiple samples may be received for the same key-timestamp.
    None,
    /// Monotonic consolidation immediately forwards samples, except if one with an equal or
    /// more recent timestamp has already been sent with the same key.
    Monotonic,
    /// Holds back samples to only send the set of samples that had the highest timestamp
    /// for their key.
    Latest,
}

impl ConsolidationMode {
    pub const DEFAULT: Self = Self::Auto;

    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::prelude::SliceRandom;
        let mut rng = rand::thread_rng();

        *[Self::None, Self::Monotonic, Self::Latest, Self::Auto]
            .choose(&mut rng)
            .unwrap()
    }
}

/// # Query message
///
/// ```text
/// Flags:
/// - P: Parameters     If P==1 then the parameters are present
/// - X: Reserved
/// - Z: Extension      If Z==1 then at least one extension is present
///
///   7 6 5 4 3 2 1 0
///  +-+-+-+-+-+-+-+-+
///  |Z|X|P|  QUERY  |
///  +-+-+-+---------+
///  ~ ps: <u8;z16>  ~  if P==1
///  +---------------+
///  ~  [qry_exts]   ~  if Z==1
///  +---------------+
/// ```
pub mod flag {
    pub const P: u8 = 1 << 5; // 0x20 Parameters    if P==1 then the parameters are present
    // pub const X: u8 = 1 << 6; // 0x40 Reserved
    pub const Z: u8 = 1 << 7; // 0x80 Extensions    if Z==1 then an extension will follow
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub consolidation: ConsolidationMode,
    pub parameters: String,
    pub ext_sinfo: Option<ext::SourceInfoType>,
    pub ext_body: Option<ext::QueryBodyType>,
    pub ext_unknown: Vec<ZExtUnknown>,
}

pub mod ext {
    use crate::{zextz64, zextzbuf};

    /// # SourceInfo extension
    /// Used to carry additional information about the source of data
    pub type SourceInfo = crate::zenoh::put::ext::SourceInfo;
    pub type SourceInfoType = crate::zenoh::put::ext::SourceInfoType;

    /// # Consolidation extension
    /// Omitted on the wire when the mode is `Auto`.
    pub type Consolidation = zextz64!(0x2, true);

    /// Encoding and payload sent along with the query.
    pub type QueryBody = zextzbuf!(0x03, false);
    pub type QueryBodyType = crate::zenoh::ext::ValueType<{ QueryBody::ID }>;
}

impl Query {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::{
            distributions::{Alphanumeric, DistString},
            Rng,
        };
        let mut rng = rand::thread_rng();

        const MIN: usize = 2;
        const MAX: usize = 16;

        let consolidation = ConsolidationMode::rand();
        let parameters: String = if rng.gen_bool(0.5) {
            let len = rng.gen_range(MIN..MAX);
            Alphanumeric.sample_string(&mut rng, len)
        } else {
            String::new()
        };
        let ext_sinfo = rng.gen_bool(0.5).then(ext::SourceInfoType::rand);
        let ext_body = rng.gen_bool(0.5).then(ext::QueryBodyType::rand);
        let ext_unknown = ZExtUnknown::rand_vec(&[
            ext::SourceInfo::ID,
            ext::Consolidation::ID,
            ext::QueryBody::ID,
        ]);

        Self {
            consolidation,
            parameters,
            ext_sinfo,
            ext_body,
            ext_unknown,
        }
    }
}
