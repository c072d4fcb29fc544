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
use std::{fmt, str::FromStr};

use zpico_result::{bail, zerror, Error as ZError};

pub use uhlc::{Timestamp, NTP64};

pub mod encoding;
pub use encoding::Encoding;

pub mod whatami;
pub use whatami::{WhatAmI, WhatAmIMatcher};

pub mod wire_expr;
pub use wire_expr::{ExprId, ExprLen, WireExpr};

/// The unique Id of the [`HLC`](uhlc::HLC) that generated the concerned [`Timestamp`].
pub type TimestampId = uhlc::ID;

/// The identifier of a zenoh node: 1 to 16 bytes, never all zeros.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ZenohId(uhlc::ID);

impl ZenohId {
    pub const MAX_SIZE: usize = 16;

    /// Number of significant bytes, i.e. the length on the wire.
    #[inline]
    pub fn size(&self) -> usize {
        self.0.size()
    }

    #[inline]
    pub fn to_le_bytes(&self) -> [u8; uhlc::ID::MAX_SIZE] {
        self.0.to_le_bytes()
    }

    pub fn rand() -> ZenohId {
        ZenohId(uhlc::ID::rand())
    }
}

impl Default for ZenohId {
    fn default() -> Self {
        Self::rand()
    }
}

impl TryFrom<&[u8]> for ZenohId {
    type Error = ZError;

    fn try_from(val: &[u8]) -> Result<Self, Self::Error> {
        match uhlc::ID::try_from(val) {
            Ok(id) => Ok(Self(id)),
            Err(e) => Err(zerror!(
                "Invalid id: expected 1 to {} non-zero bytes, got {} ({})",
                Self::MAX_SIZE,
                val.len(),
                e
            )
            .into()),
        }
    }
}

impl From<uhlc::ID> for ZenohId {
    fn from(id: uhlc::ID) -> Self {
        Self(id)
    }
}

impl From<&ZenohId> for uhlc::ID {
    fn from(zid: &ZenohId) -> Self {
        zid.0
    }
}

impl From<ZenohId> for uhlc::ID {
    fn from(zid: ZenohId) -> Self {
        zid.0
    }
}

impl FromStr for ZenohId {
    type Err = ZError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(|c: char| c.is_ascii_uppercase()) {
            bail!(
                "Invalid id: {} - uppercase hexadecimal is not accepted, use lowercase",
                s
            );
        }
        let u: uhlc::ID = s
            .parse()
            .map_err(|e: uhlc::ParseIDError| zerror!("Invalid id: {} - {}", s, e.cause))?;
        Ok(ZenohId(u))
    }
}

impl fmt::Debug for ZenohId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ZenohId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl serde::Serialize for ZenohId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl<'de> serde::Deserialize<'de> for ZenohId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str> as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The entity id within a session: subscriber, queryable, publisher or querier.
pub type EntityId = u32;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityGlobalId {
    pub zid: ZenohId,
    pub eid: EntityId,
}

impl EntityGlobalId {
    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;
        Self {
            zid: ZenohId::rand(),
            eid: rand::thread_rng().gen(),
        }
    }
}

/// A transport endpoint advertised in scouting messages, kept opaque.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::{
            distributions::{Alphanumeric, DistString},
            Rng,
        };

        let mut rng = rand::thread_rng();
        let len = rng.gen_range(1..16);
        let host = Alphanumeric.sample_string(&mut rng, len);
        let port: u16 = rng.gen();
        Self(format!("tcp/{host}:{port}"))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Locator {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Priority {
    Control = 0,
    RealTime = 1,
    InteractiveHigh = 2,
    InteractiveLow = 3,
    DataHigh = 4,
    #[default]
    Data = 5,
    DataLow = 6,
    Background = 7,
}

impl Priority {
    pub const DEFAULT: Self = Self::Data;
    pub const MIN: Self = Self::Background;
    pub const MAX: Self = Self::Control;
    pub const NUM: usize = 1 + Self::MIN as usize - Self::MAX as usize;
}

impl TryFrom<u8> for Priority {
    type Error = ZError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Priority::Control),
            1 => Ok(Priority::RealTime),
            2 => Ok(Priority::InteractiveHigh),
            3 => Ok(Priority::InteractiveLow),
            4 => Ok(Priority::DataHigh),
            5 => Ok(Priority::Data),
            6 => Ok(Priority::DataLow),
            7 => Ok(Priority::Background),
            unknown => bail!(
                "{} is not a valid priority value. Admitted values are: [{}-{}].",
                unknown,
                Self::MAX as u8,
                Self::MIN as u8
            ),
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reliability {
    BestEffort,
    #[default]
    Reliable,
}

impl Reliability {
    pub const DEFAULT: Self = Self::Reliable;

    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;

        if rand::thread_rng().gen_bool(0.5) {
            Reliability::Reliable
        } else {
            Reliability::BestEffort
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CongestionControl {
    #[default]
    Drop = 0,
    Block = 1,
}

impl CongestionControl {
    pub const DEFAULT: Self = Self::Drop;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zid_from_bytes() {
        let zid = ZenohId::try_from([0x01u8, 0x02].as_slice()).unwrap();
        assert_eq!(zid.size(), 2);
        assert_eq!(&zid.to_le_bytes()[..2], &[0x01, 0x02]);

        // The all-zero id is reserved.
        assert!(ZenohId::try_from([0u8; 4].as_slice()).is_err());
        assert!(ZenohId::try_from([1u8; 17].as_slice()).is_err());
        assert!(ZenohId::try_from([0u8; 0].as_slice()).is_err());
    }

    #[test]
    fn zid_from_str() {
        let zid: ZenohId = "a1b2".parse().unwrap();
        assert_eq!(zid.to_string(), "a1b2");
        assert!("A1B2".parse::<ZenohId>().is_err());
    }
}
