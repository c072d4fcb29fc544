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

/// Lock a [`std::sync::Mutex`], panicking if it was poisoned by a panicking holder.
#[macro_export]
macro_rules! zlock {
    ($var:expr) => {
        $var.lock().unwrap()
    };
}

#[macro_export]
macro_rules! zread {
    ($var:expr) => {
        $var.read().unwrap()
    };
}

#[macro_export]
macro_rules! zwrite {
    ($var:expr) => {
        $var.write().unwrap()
    };
}

/// Declare a static whose default can be overridden at build time by an
/// environment variable of the same name.
#[macro_export]
macro_rules! zconfigurable {
    ($(#[$attr:meta])* static ref $N:ident : $T:ty = $e:expr; $($t:tt)*) => {
        $(#[$attr])* $crate::lazy_static!(static ref $N : $T = match option_env!(stringify!($N)) {
            Some(value) => {value.parse().unwrap()}
            None => {$e}
        };) ;
        $crate::zconfigurable!($($t)*);
    };
    ($(#[$attr:meta])* pub static ref $N:ident : $T:ty = $e:expr; $($t:tt)*) => {
        $(#[$attr])* $crate::lazy_static!(pub static ref $N : $T = match option_env!(stringify!($N)) {
            Some(value) => {value.parse().unwrap()}
            None => {$e}
        };) ;
        $crate::zconfigurable!($($t)*);
    };
    ($(#[$attr:meta])* pub ($($vis:tt)+) static ref $N:ident : $T:ty = $e:expr; $($t:tt)*) => {
        $(#[$attr])* $crate::lazy_static!(pub ($($vis)+) static ref $N : $T = match option_env!(stringify!($N)) {
            Some(value) => {value.parse().unwrap()}
            None => {$e}
        };) ;
        $crate::zconfigurable!($($t)*);
    };
    () => ()
}

/// Parse a configuration value, logging and returning a [`zerror`] on failure.
#[macro_export]
macro_rules! zparse {
    ($str:expr) => {
        $str.parse().map_err(|_| {
            let e = $crate::zerror!(
                ($crate::zresult::errno::INVALID_CONFIG)
                "Failed to read configuration: {} is not a valid value",
                $str
            );
            $crate::tracing::warn!("{}", e);
            e
        })
    };
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, RwLock};

    use crate::Result as ZResult;

    crate::zconfigurable! {
        static ref ZPICO_TEST_KNOB: usize = 42;
    }

    #[test]
    fn lock_macros() {
        let m = Mutex::new(1u8);
        *zlock!(m) += 1;
        assert_eq!(*zlock!(m), 2);

        let rw = RwLock::new(vec![1u8]);
        zwrite!(rw).push(2);
        assert_eq!(zread!(rw).len(), 2);
    }

    #[test]
    fn configurable_default() {
        assert_eq!(*ZPICO_TEST_KNOB, 42);
    }

    #[test]
    fn parse_errors_are_zerrors() {
        let ok: ZResult<u16> = zparse!("1500").map_err(Into::into);
        assert_eq!(ok.unwrap(), 1500);
        let ko: ZResult<u16> = zparse!("seventy").map_err(Into::into);
        assert!(ko.is_err());
    }
}
