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
use std::{fmt, ops::BitOr, str::FromStr};

use zpico_result::{bail, ZError};

const WAI_STR_R: &str = "router";
const WAI_STR_P: &str = "peer";
const WAI_STR_C: &str = "client";

#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhatAmI {
    Router = 0b001,
    Peer = 0b010,
    #[default]
    Client = 0b100,
}

impl WhatAmI {
    const U8_R: u8 = WhatAmI::Router as u8;
    const U8_P: u8 = WhatAmI::Peer as u8;
    const U8_C: u8 = WhatAmI::Client as u8;

    pub const fn to_str(self) -> &'static str {
        match self {
            WhatAmI::Router => WAI_STR_R,
            WhatAmI::Peer => WAI_STR_P,
            WhatAmI::Client => WAI_STR_C,
        }
    }

    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::prelude::SliceRandom;

        let mut rng = rand::thread_rng();
        *[WhatAmI::Router, WhatAmI::Peer, WhatAmI::Client]
            .choose(&mut rng)
            .unwrap()
    }
}

impl TryFrom<u8> for WhatAmI {
    type Error = ();

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            Self::U8_R => Ok(WhatAmI::Router),
            Self::U8_P => Ok(WhatAmI::Peer),
            Self::U8_C => Ok(WhatAmI::Client),
            _ => Err(()),
        }
    }
}

impl FromStr for WhatAmI {
    type Err = ZError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            WAI_STR_R => Ok(WhatAmI::Router),
            WAI_STR_P => Ok(WhatAmI::Peer),
            WAI_STR_C => Ok(WhatAmI::Client),
            _ => bail!(
                "{s} is not a valid WhatAmI value. Valid values are: {WAI_STR_R}, {WAI_STR_P}, {WAI_STR_C}."
            ),
        }
    }
}

impl fmt::Display for WhatAmI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl From<WhatAmI> for u8 {
    fn from(w: WhatAmI) -> Self {
        w as u8
    }
}

impl serde::Serialize for WhatAmI {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_str())
    }
}

impl<'de> serde::Deserialize<'de> for WhatAmI {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str> as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A set of [`WhatAmI`], as carried by scouting messages.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WhatAmIMatcher(u8);

impl WhatAmIMatcher {
    const MASK: u8 = WhatAmI::U8_R | WhatAmI::U8_P | WhatAmI::U8_C;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn router(self) -> Self {
        Self(self.0 | WhatAmI::U8_R)
    }

    pub const fn peer(self) -> Self {
        Self(self.0 | WhatAmI::U8_P)
    }

    pub const fn client(self) -> Self {
        Self(self.0 | WhatAmI::U8_C)
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn matches(&self, w: WhatAmI) -> bool {
        (self.0 & w as u8) != 0
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Build a matcher from wire bits, ignoring the reserved ones.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let mut waim = WhatAmIMatcher::empty();
        if rng.gen_bool(0.5) {
            waim = waim.router();
        }
        if rng.gen_bool(0.5) {
            waim = waim.peer();
        }
        if rng.gen_bool(0.5) {
            waim = waim.client();
        }
        waim
    }
}

impl Default for WhatAmIMatcher {
    fn default() -> Self {
        Self::empty().router().peer()
    }
}

impl BitOr<WhatAmI> for WhatAmIMatcher {
    type Output = Self;

    fn bitor(self, rhs: WhatAmI) -> Self::Output {
        Self(self.0 | rhs as u8)
    }
}

impl BitOr for WhatAmI {
    type Output = WhatAmIMatcher;

    fn bitor(self, rhs: Self) -> Self::Output {
        WhatAmIMatcher(self as u8 | rhs as u8)
    }
}

impl From<WhatAmI> for WhatAmIMatcher {
    fn from(w: WhatAmI) -> Self {
        Self(w as u8)
    }
}

impl FromStr for WhatAmIMatcher {
    type Err = ZError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut inner = 0;
        for s in s.split('|') {
            match s.trim() {
                "" => {}
                WAI_STR_R => inner |= WhatAmI::U8_R,
                WAI_STR_P => inner |= WhatAmI::U8_P,
                WAI_STR_C => inner |= WhatAmI::U8_C,
                _ => bail!("{s} is not a valid WhatAmI value."),
            }
        }
        Ok(Self(inner))
    }
}

impl fmt::Display for WhatAmIMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for w in [WhatAmI::Router, WhatAmI::Peer, WhatAmI::Client] {
            if self.matches(w) {
                write!(f, "{sep}{w}")?;
                sep = "|";
            }
        }
        Ok(())
    }
}

impl serde::Serialize for WhatAmIMatcher {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for WhatAmIMatcher {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <std::borrow::Cow<'de, str> as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matcher_strings() {
        let m: WhatAmIMatcher = "router|client".parse().unwrap();
        assert!(m.matches(WhatAmI::Router));
        assert!(!m.matches(WhatAmI::Peer));
        assert_eq!(m.to_string(), "router|client");
        assert_eq!(m, WhatAmI::Router | WhatAmI::Client);
        assert!("broker".parse::<WhatAmIMatcher>().is_err());
        assert_eq!(WhatAmIMatcher::from_bits(0xff).bits(), 0b111);
    }
}
