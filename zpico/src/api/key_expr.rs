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

//! [Key expression](https://github.com/eclipse-zenoh/roadmap/blob/main/rfcs/ALL/Key%20Expressions.md)
//! as seen by the session.
//!
//! Pattern semantics are those of `zenoh-keyexpr`. A string that is not a valid key
//! expression is still accepted as a key: it only ever matches itself.
use std::{borrow::Borrow, fmt, ops::Deref, sync::Arc};

use zenoh_keyexpr::keyexpr;
use zpico_result::{bail, ZResult};

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyExpr(Arc<str>);

impl KeyExpr {
    /// Build a key expression, rejecting only the empty string.
    pub fn new<S: AsRef<str>>(s: S) -> ZResult<Self> {
        let s = s.as_ref();
        if s.is_empty() {
            bail!("Empty key expression");
        }
        Ok(Self(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the string is a canonical `zenoh-keyexpr` key expression.
    pub fn is_valid(&self) -> bool {
        keyexpr::new(self.as_str()).is_ok()
    }

    /// Whether both key expressions match at least one common key.
    pub fn intersects(&self, other: &KeyExpr) -> bool {
        match (keyexpr::new(self.as_str()), keyexpr::new(other.as_str())) {
            (Ok(l), Ok(r)) => l.intersects(r),
            _ => self.0 == other.0,
        }
    }

    /// Append `suffix` to this key expression, as done when expanding a scoped wire
    /// expression.
    pub fn join_suffix(&self, suffix: &str) -> KeyExpr {
        if suffix.is_empty() {
            self.clone()
        } else {
            Self([self.as_str(), suffix].concat().into())
        }
    }
}

impl Deref for KeyExpr {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for KeyExpr {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for KeyExpr {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for KeyExpr {
    type Error = zpico_result::Error;

    fn try_from(s: &str) -> ZResult<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for KeyExpr {
    type Error = zpico_result::Error;

    fn try_from(s: String) -> ZResult<Self> {
        Self::new(s)
    }
}

impl TryFrom<&String> for KeyExpr {
    type Error = zpico_result::Error;

    fn try_from(s: &String) -> ZResult<Self> {
        Self::new(s)
    }
}

impl TryFrom<&KeyExpr> for KeyExpr {
    type Error = zpico_result::Error;

    fn try_from(k: &KeyExpr) -> ZResult<Self> {
        Ok(k.clone())
    }
}

impl fmt::Display for KeyExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for KeyExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ke(s: &str) -> KeyExpr {
        KeyExpr::new(s).unwrap()
    }

    #[test]
    fn wildcards_intersect() {
        assert!(ke("demo/*").intersects(&ke("demo/a")));
        assert!(ke("demo/**").intersects(&ke("demo/a/b")));
        assert!(ke("demo/a").intersects(&ke("demo/a")));
        assert!(!ke("demo/a").intersects(&ke("demo/b")));
        assert!(!ke("demo/*").intersects(&ke("demo/a/b")));
    }

    #[test]
    fn invalid_keys_match_themselves() {
        let odd = ke("demo//a");
        assert!(!odd.is_valid());
        assert!(odd.intersects(&ke("demo//a")));
        assert!(!odd.intersects(&ke("demo/**")));
        assert!(KeyExpr::new("").is_err());
    }

    #[test]
    fn join() {
        assert_eq!(ke("demo").join_suffix("/a").as_str(), "demo/a");
        assert_eq!(ke("demo").join_suffix(""), ke("demo"));
    }
}
