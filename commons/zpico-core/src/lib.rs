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
pub use lazy_static::lazy_static;
#[doc(hidden)]
pub use tracing;
pub mod macros;
pub use macros::*;

pub use zpico_result as zresult;
pub use zresult::{bail, zerror, Error, ZResult as Result};
