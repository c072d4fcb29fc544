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
use std::fmt;

use zpico_buffers::ZSlice;

pub type EncodingId = u16;

/// [`Encoding`] is a metadata that indicates how the data payload should be interpreted.
///
/// ```text
///  7 6 5 4 3 2 1 0
/// +-+-+-+-+-+-+-+-+
/// ~   id: z16   |S~
/// +---------------+
/// ~schema: <u8;z8>~  -- if S==1
/// +---------------+
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Encoding {
    pub id: EncodingId,
    pub schema: Option<ZSlice>,
}

/// # Encoding field
pub mod flag {
    pub const S: u32 = 1; // 0x01 Suffix    if S==1 then schema is present
}

impl Encoding {
    /// Returns a new [`Encoding`] object with default empty prefix ID.
    pub const fn empty() -> Self {
        Self {
            id: 0,
            schema: None,
        }
    }

    pub fn new(id: EncodingId, schema: Option<&[u8]>) -> Self {
        Self {
            id,
            schema: schema.map(ZSlice::from),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id == 0 && self.schema.is_none()
    }

    #[cfg(feature = "test")]
    pub fn rand() -> Self {
        use rand::{
            distributions::{Alphanumeric, DistString},
            Rng,
        };

        const MIN: usize = 2;
        const MAX: usize = 16;

        let mut rng = rand::thread_rng();

        let id: EncodingId = rng.gen();
        let schema = rng
            .gen_bool(0.5)
            .then_some({
                let len = rng.gen_range(MIN..MAX);
                Alphanumeric.sample_string(&mut rng, len).into_bytes()
            })
            .map(ZSlice::from);
        Encoding { id, schema }
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(schema) = self.schema.as_ref() {
            write!(f, ";{}", String::from_utf8_lossy(schema))?;
        }
        Ok(())
    }
}
