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
//! Declarations exchanged with the router.
//!
//! Subscribers, queryables and tokens share one layout. A declaration names the entity and
//! the key expression it lives on; the matching undeclaration names the entity again and
//! may repeat the key expression in an extension.
//!
//! ```text
//!  7 6 5 4 3 2 1 0            7 6 5 4 3 2 1 0
//! +-+-+-+-+-+-+-+-+          +-+-+-+-+-+-+-+-+
//! |Z|M|N| D_xxx   |          |Z|X|X| U_xxx   |
//! +---------------+          +---------------+
//! ~   id:z32      ~          ~   id:z32      ~
//! +---------------+          +---------------+
//! ~ key_scope:z16 ~          ~  [decl_exts]  ~  if Z==1
//! +---------------+          +---------------+
//! ~  key_suffix   ~  if N==1 -- <u8;z16>
//! +---------------+
//! ~  [decl_exts]  ~  if Z==1
//! +---------------+
//! ```
use std::borrow::Cow;

pub use common::*;
pub use keyexpr::*;
pub use queryable::*;
pub use subscriber::*;
pub use token::*;

use crate::{
    core::{ExprId, WireExpr},
    network::{interest::InterestId, Mapping},
    zextz64, zextzbuf,
};

pub mod flag {
    /// The declaration answers the interest whose id follows the header.
    pub const I: u8 = 1 << 5;
    pub const Z: u8 = 1 << 7;
}

/// ```text
///  7 6 5 4 3 2 1 0
/// +-+-+-+-+-+-+-+-+
/// |Z|X|I| DECLARE |
/// +-+-+-+---------+
/// ~interest_id:z32~  if I==1
/// +---------------+
/// ~  [decl_exts]  ~  if Z==1
/// +---------------+
/// ~  declaration  ~
/// +---------------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declare {
    pub interest_id: Option<InterestId>,
    pub ext_qos: ext::QoSType,
    pub ext_tstamp: Option<ext::TimestampType>,
    pub ext_nodeid: ext::NodeIdType,
    pub body: DeclareBody,
}

pub mod ext {
    qos_and_timestamp!(nodeid);
}

pub mod id {
    pub const D_KEYEXPR: u8 = 0x00;
    pub const U_KEYEXPR: u8 = 0x01;
    pub const D_SUBSCRIBER: u8 = 0x02;
    pub const U_SUBSCRIBER: u8 = 0x03;
    pub const D_QUERYABLE: u8 = 0x04;
    pub const U_QUERYABLE: u8 = 0x05;
    pub const D_TOKEN: u8 = 0x06;
    pub const U_TOKEN: u8 = 0x07;
    pub const D_FINAL: u8 = 0x1A;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclareBody {
    DeclareKeyExpr(DeclareKeyExpr),
    UndeclareKeyExpr(UndeclareKeyExpr),
    DeclareSubscriber(DeclareSubscriber),
    UndeclareSubscriber(UndeclareSubscriber),
    DeclareQueryable(DeclareQueryable),
    UndeclareQueryable(UndeclareQueryable),
    DeclareToken(DeclareToken),
    UndeclareToken(UndeclareToken),
    DeclareFinal(DeclareFinal),
}

impl DeclareBody {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;

        match rand::thread_rng().gen_range(0..9) {
            0 => Self::DeclareKeyExpr(DeclareKeyExpr::rand()),
            1 => Self::UndeclareKeyExpr(UndeclareKeyExpr::rand()),
            2 => Self::DeclareSubscriber(DeclareSubscriber::rand()),
            3 => Self::UndeclareSubscriber(UndeclareSubscriber::rand()),
            4 => Self::DeclareQueryable(DeclareQueryable::rand()),
            5 => Self::UndeclareQueryable(UndeclareQueryable::rand()),
            6 => Self::DeclareToken(DeclareToken::rand()),
            7 => Self::UndeclareToken(UndeclareToken::rand()),
            _ => Self::DeclareFinal(DeclareFinal),
        }
    }
}

impl Declare {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        Self {
            interest_id: rng.gen_bool(0.5).then(|| rng.gen()),
            ext_qos: ext::QoSType::rand(),
            ext_tstamp: rng.gen_bool(0.5).then(ext::TimestampType::rand),
            ext_nodeid: ext::NodeIdType::rand(),
            body: DeclareBody::rand(),
        }
    }
}

pub mod common {
    use super::*;

    /// Closes the declarations sent in answer to an interest. Only a header on the wire.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct DeclareFinal;

    pub mod ext {
        use super::*;

        /// Key expression repeated in an undeclaration. The suffix is not length-prefixed,
        /// it runs to the end of the extension.
        ///
        /// ```text
        ///  7 6 5 4 3 2 1 0
        /// +-+-+-+-+-+-+-+-+
        /// |X|X|X|X|X|X|M|N|
        /// +-+-+-+---------+
        /// ~ key_scope:z16 ~
        /// +---------------+
        /// ~  key_suffix   ~  if N==1
        /// +---------------+
        /// ```
        pub type WireExprExt = zextzbuf!(0x0f, true);

        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct WireExprType {
            pub wire_expr: WireExpr<'static>,
        }

        impl WireExprType {
            /// No key expression: the extension is left out.
            pub fn null() -> Self {
                Self {
                    wire_expr: WireExpr {
                        scope: ExprId::MIN,
                        suffix: Cow::from(""),
                        mapping: Mapping::Receiver,
                    },
                }
            }

            pub fn is_null(&self) -> bool {
                self.wire_expr.is_empty()
            }

            #[cfg(feature = "test")]
            pub fn rand() -> Self {
                Self {
                    wire_expr: WireExpr::rand(),
                }
            }
        }
    }
}

// An entity id and the key expression it is declared on.
macro_rules! declaration {
    ($name:ident, $id:ty) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub id: $id,
            pub wire_expr: WireExpr<'static>,
        }

        impl $name {
            #[cfg(feature = "test")]
            pub fn rand() -> Self {
                use rand::Rng;

                Self {
                    id: rand::thread_rng().gen(),
                    wire_expr: WireExpr::rand(),
                }
            }
        }
    };
}

macro_rules! undeclaration {
    ($name:ident, $id:ty) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub id: $id,
            pub ext_wire_expr: common::ext::WireExprType,
        }

        impl $name {
            #[cfg(feature = "test")]
            pub fn rand() -> Self {
                use rand::Rng;

                Self {
                    id: rand::thread_rng().gen(),
                    ext_wire_expr: common::ext::WireExprType::rand(),
                }
            }
        }
    };
}

/// Numerical aliases for key expressions, always in the sender's mapping.
pub mod keyexpr {
    use super::*;

    pub mod flag {
        pub const N: u8 = 1 << 5;
        pub const Z: u8 = 1 << 7;
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct DeclareKeyExpr {
        pub id: ExprId,
        pub wire_expr: WireExpr<'static>,
    }

    impl DeclareKeyExpr {
        #[cfg(feature = "test")]
        pub fn rand() -> Self {
            use rand::Rng;

            let mut wire_expr = WireExpr::rand();
            wire_expr.mapping = Mapping::DEFAULT;
            Self {
                id: rand::thread_rng().gen(),
                wire_expr,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct UndeclareKeyExpr {
        pub id: ExprId,
    }

    impl UndeclareKeyExpr {
        #[cfg(feature = "test")]
        pub fn rand() -> Self {
            use rand::Rng;

            Self {
                id: rand::thread_rng().gen(),
            }
        }
    }
}

pub mod subscriber {
    use super::*;
    use crate::core::EntityId;

    pub type SubscriberId = EntityId;

    keyexpr_flags!();
    declaration!(DeclareSubscriber, SubscriberId);
    undeclaration!(UndeclareSubscriber, SubscriberId);
}

pub mod queryable {
    use super::*;
    use crate::core::EntityId;

    pub type QueryableId = EntityId;

    keyexpr_flags!();
    undeclaration!(UndeclareQueryable, QueryableId);

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct DeclareQueryable {
        pub id: QueryableId,
        pub wire_expr: WireExpr<'static>,
        pub ext_info: ext::QueryableInfoType,
    }

    impl DeclareQueryable {
        #[cfg(feature = "test")]
        pub fn rand() -> Self {
            use rand::Rng;

            Self {
                id: rand::thread_rng().gen(),
                wire_expr: WireExpr::rand(),
                ext_info: ext::QueryableInfoType::rand(),
            }
        }
    }

    pub mod ext {
        use super::*;

        /// Completeness in bit 0, distance from bit 8 on.
        pub type QueryableInfo = zextz64!(0x01, false);

        pub mod flag {
            pub const C: u8 = 1;
        }

        const DISTANCE_SHIFT: u64 = 8;

        /// Sent only when it differs from [`QueryableInfoType::DEFAULT`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct QueryableInfoType {
            /// The queryable answers for every key its expression matches.
            pub complete: bool,
            pub distance: u16,
        }

        impl QueryableInfoType {
            pub const DEFAULT: Self = Self {
                complete: false,
                distance: 0,
            };

            #[cfg(feature = "test")]
            pub fn rand() -> Self {
                use rand::Rng;
                let mut rng = rand::thread_rng();

                Self {
                    complete: rng.gen_bool(0.5),
                    distance: rng.gen(),
                }
            }
        }

        impl Default for QueryableInfoType {
            fn default() -> Self {
                Self::DEFAULT
            }
        }

        impl From<QueryableInfo> for QueryableInfoType {
            fn from(ext: QueryableInfo) -> Self {
                Self {
                    complete: ext.value & flag::C as u64 != 0,
                    distance: (ext.value >> DISTANCE_SHIFT) as u16,
                }
            }
        }

        impl From<QueryableInfoType> for QueryableInfo {
            fn from(info: QueryableInfoType) -> Self {
                QueryableInfo::new(info.complete as u64 | ((info.distance as u64) << DISTANCE_SHIFT))
            }
        }
    }
}

pub mod token {
    use super::*;
    use crate::core::EntityId;

    pub type TokenId = EntityId;

    keyexpr_flags!();
    declaration!(DeclareToken, TokenId);
    undeclaration!(UndeclareToken, TokenId);
}
