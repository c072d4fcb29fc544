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
//! ⚠️ WARNING ⚠️
//!
//! This crate is intended for zpico's internal use.
//!
//! Every failure of the client is a [`ZError`]: a message, the place it was raised and a
//! negative error number that callers match on.
use core::fmt;

use anyhow::Error as AnyError;

pub use anyhow::anyhow;

/// Error numbers carried by [`ZError`], negative so they map one to one onto the return
/// codes of the C client.
pub mod errno {
    pub const GENERIC: i8 = -1;
    pub const MALFORMED_MESSAGE: i8 = -2;
    pub const UNKNOWN_EXTENSION: i8 = -3;
    pub const REGISTRY_NOT_FOUND: i8 = -4;
    pub const OUT_OF_MEMORY: i8 = -5;
    pub const FILTER_STATE_INCONSISTENT: i8 = -6;
    pub const SESSION_CLOSED: i8 = -7;
    pub const LINK_ERROR: i8 = -8;
    pub const INVALID_CONFIG: i8 = -9;
}

pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type ZResult<T> = core::result::Result<T, Error>;

/// An error number. Zero and positive values are rejected at construction.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NegativeI8(i8);

impl NegativeI8 {
    /// Number of errors raised without one.
    pub const MIN: Self = Self::new(i8::MIN);

    pub const fn new(v: i8) -> Self {
        assert!(v < 0, "error numbers are negative");
        Self(v)
    }

    pub const fn get(self) -> i8 {
        self.0
    }
}

pub struct ZError {
    error: AnyError,
    file: &'static str,
    line: u32,
    errno: NegativeI8,
    source: Option<Error>,
}

impl ZError {
    pub fn new<E: Into<AnyError>>(
        error: E,
        file: &'static str,
        line: u32,
        errno: NegativeI8,
    ) -> Self {
        Self {
            error: error.into(),
            file,
            line,
            errno,
            source: None,
        }
    }

    pub fn set_source<S: Into<Error>>(self, source: S) -> Self {
        Self {
            source: Some(source.into()),
            ..self
        }
    }
}

impl std::error::Error for ZError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

impl fmt::Display for ZError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}.", self.error, self.file, self.line)?;
        match &self.source {
            Some(source) => write!(f, " - Caused by {source}"),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ZError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Recovers the error number of an error, [`NegativeI8::MIN`] when it is not a [`ZError`].
pub trait ErrNo {
    fn errno(&self) -> NegativeI8;
}

impl ErrNo for ZError {
    fn errno(&self) -> NegativeI8 {
        self.errno
    }
}

impl ErrNo for dyn std::error::Error + Send + Sync {
    fn errno(&self) -> NegativeI8 {
        self.downcast_ref::<ZError>()
            .map_or(NegativeI8::MIN, ZError::errno)
    }
}

/// Builds a [`ZError`] at the call site.
///
/// `zerror!((errno::LINK_ERROR) e => "Unable to write to {}", peer)` tags the error with a
/// number and chains `e` as its source; both parts are optional.
#[macro_export]
macro_rules! zerror {
    (($errno:expr) $source:expr => $($t:tt)*) => {
        $crate::zerror!(($errno) $($t)*).set_source($source)
    };
    (($errno:expr) $($t:tt)*) => {
        $crate::ZError::new(
            $crate::anyhow!($($t)*),
            file!(),
            line!(),
            $crate::NegativeI8::new($errno as i8),
        )
    };
    ($source:expr => $($t:tt)*) => {
        $crate::zerror!($($t)*).set_source($source)
    };
    ($($t:tt)*) => {
        $crate::ZError::new($crate::anyhow!($($t)*), file!(), line!(), $crate::NegativeI8::MIN)
    };
}

/// Returns early with a [`zerror!`].
#[macro_export]
macro_rules! bail {
    ($($t:tt)*) => {
        return Err($crate::zerror!($($t)*).into())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> ZResult<()> {
        bail!((errno::REGISTRY_NOT_FOUND) "Subscriber {} not found", 7)
    }

    #[test]
    fn errno_survives_boxing() {
        let e = not_found().unwrap_err();
        assert_eq!(e.errno().get(), errno::REGISTRY_NOT_FOUND);
        assert!(e.to_string().starts_with("Subscriber 7 not found"));
    }

    #[test]
    fn source_is_chained() {
        let inner = zerror!((errno::MALFORMED_MESSAGE) "bad header");
        let outer = zerror!((errno::LINK_ERROR) inner => "read failed");
        let text = outer.to_string();
        assert!(text.contains("read failed"));
        assert!(text.contains("Caused by bad header"));
        assert_eq!(outer.errno().get(), errno::LINK_ERROR);
        assert!(std::error::Error::source(&outer).is_some());
    }

    #[test]
    fn untagged_errors_use_min() {
        let e: Error = zerror!("plain").into();
        assert_eq!(e.errno(), NegativeI8::MIN);
    }

    #[test]
    #[should_panic]
    fn positive_errno_is_rejected() {
        NegativeI8::new(1);
    }
}
