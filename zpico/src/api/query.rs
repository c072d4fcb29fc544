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
use std::time::Duration;

use zpico_buffers::ZBuf;
use zpico_protocol::core::{Encoding, EntityGlobalId};
pub use zpico_protocol::{
    network::request::ext::TargetType as QueryTarget, zenoh::ConsolidationMode,
};

use super::sample::Sample;

/// An error reply, either sent by a queryable or generated locally on timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyError {
    pub(crate) payload: ZBuf,
    pub(crate) encoding: Encoding,
    pub(crate) code: u16,
}

impl ReplyError {
    pub(crate) fn new<P: Into<ZBuf>>(payload: P, encoding: Encoding) -> Self {
        Self {
            payload: payload.into(),
            encoding,
            code: 0,
        }
    }

    pub(crate) fn timeout() -> Self {
        Self::new("Timeout", Encoding::empty())
    }

    #[inline]
    pub fn payload(&self) -> &ZBuf {
        &self.payload
    }

    #[inline]
    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    #[inline]
    pub fn code(&self) -> u16 {
        self.code
    }
}

/// A reply to a `get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub(crate) result: Result<Sample, ReplyError>,
    pub(crate) replier_id: Option<EntityGlobalId>,
}

impl Reply {
    pub fn result(&self) -> Result<&Sample, &ReplyError> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Result<Sample, ReplyError> {
        self.result
    }

    /// The entity that replied, when it identified itself.
    pub fn replier_id(&self) -> Option<EntityGlobalId> {
        self.replier_id
    }

    pub(crate) fn sample(&self) -> Option<&Sample> {
        self.result.as_ref().ok()
    }
}

impl From<Reply> for Result<Sample, ReplyError> {
    fn from(value: Reply) -> Self {
        value.into_result()
    }
}

/// Options of a `get`.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub target: QueryTarget,
    pub consolidation: ConsolidationMode,
    /// Falls back to the configured default timeout when `None`.
    pub timeout: Option<Duration>,
    pub payload: Option<ZBuf>,
    pub encoding: Encoding,
}

impl GetOptions {
    pub fn target(mut self, target: QueryTarget) -> Self {
        self.target = target;
        self
    }

    pub fn consolidation(mut self, consolidation: ConsolidationMode) -> Self {
        self.consolidation = consolidation;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn payload<P: Into<ZBuf>>(mut self, payload: P) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}
