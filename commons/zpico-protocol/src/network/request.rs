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
use crate::{core::WireExpr, zenoh::RequestBody};

/// The resolution of a RequestId
pub type RequestId = u32;

keyexpr_flags!();

/// # Request message
///
/// ```text
///  7 6 5 4 3 2 1 0
/// +-+-+-+-+-+-+-+-+
/// |Z|M|N| Request |
/// +-+-+-+---------+
/// ~ request_id:z32~
/// +---------------+
/// ~ key_scope:z16 ~
/// +---------------+
/// ~  key_suffix   ~  if N==1 -- <u8;z16>
/// +---------------+
/// ~   [req_exts]  ~  if Z==1
/// +---------------+
/// ~  RequestBody  ~ -- Payload
/// +---------------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: RequestId,
    pub wire_expr: WireExpr<'static>,
    pub ext_qos: ext::QoSType,
    pub ext_tstamp: Option<ext::TimestampType>,
    pub ext_nodeid: ext::NodeIdType,
    pub ext_target: ext::TargetType,
    pub ext_budget: Option<ext::BudgetType>,
    pub ext_timeout: Option<ext::TimeoutType>,
    pub payload: RequestBody,
}

pub mod ext {
    use std::{num::NonZeroU32, time::Duration};

    use crate::zextz64;

    qos_and_timestamp!(nodeid);

    pub type Target = zextz64!(0x4, true);
    /// ```text
    /// - Target (0x03)
    ///     7 6 5 4 3 2 1 0
    ///    +-+-+-+-+-+-+-+-+
    ///    %     target    %
    ///    +---------------+
    /// ```
    /// The queryables that should be target of a query.
    #[repr(u8)]
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum TargetType {
        #[default]
        BestMatching = 0,
        All = 1,
        AllComplete = 2,
    }

    impl TargetType {
        pub const DEFAULT: Self = Self::BestMatching;

        #[cfg(feature = "test")]
        pub fn rand() -> Self {
            use rand::prelude::SliceRandom;
            let mut rng = rand::thread_rng();

            *[
                TargetType::All,
                TargetType::AllComplete,
                TargetType::BestMatching,
            ]
            .choose(&mut rng)
            .unwrap()
        }
    }

    impl TryFrom<u64> for TargetType {
        type Error = ();

        fn try_from(v: u64) -> Result<Self, Self::Error> {
            match v {
                0 => Ok(TargetType::BestMatching),
                1 => Ok(TargetType::All),
                2 => Ok(TargetType::AllComplete),
                _ => Err(()),
            }
        }
    }

    // The maximum number of responses
    pub type Budget = zextz64!(0x5, false);
    pub type BudgetType = NonZeroU32;

    // The timeout of the request
    pub type Timeout = zextz64!(0x6, false);
    pub type TimeoutType = Duration;
}

impl Request {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use std::time::Duration;

        use rand::Rng;

        let mut rng = rand::thread_rng();
        let wire_expr = WireExpr::rand();
        let id: RequestId = rng.gen();
        let payload = RequestBody::rand();
        let ext_qos = ext::QoSType::rand();
        let ext_tstamp = rng.gen_bool(0.5).then(ext::TimestampType::rand);
        let ext_nodeid = ext::NodeIdType::rand();
        let ext_target = ext::TargetType::rand();
        let ext_budget = if rng.gen_bool(0.5) {
            ext::BudgetType::new(rng.gen())
        } else {
            None
        };
        let ext_timeout = if rng.gen_bool(0.5) {
            Some(Duration::from_millis(rng.gen::<u32>() as u64))
        } else {
            None
        };

        Self {
            wire_expr,
            id,
            payload,
            ext_qos,
            ext_tstamp,
            ext_nodeid,
            ext_target,
            ext_budget,
            ext_timeout,
        }
    }
}
