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

//! Sample primitives
use std::fmt;

use zpico_buffers::ZBuf;
use zpico_protocol::{
    core::{Encoding, EntityGlobalId, Timestamp},
    zenoh::{self, ext::SourceInfoType},
};

use crate::api::key_expr::KeyExpr;

/// The kind of a `Sample`.
#[repr(u8)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum SampleKind {
    /// if the `Sample` was issued by a `put` operation.
    #[default]
    Put = 0,
    /// if the `Sample` was issued by a `delete` operation.
    Delete = 1,
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleKind::Put => write!(f, "PUT"),
            SampleKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// Where a sample comes from, when the publisher told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub source_id: EntityGlobalId,
    pub source_sn: u32,
}

impl<const ID: u8> From<SourceInfoType<ID>> for SourceInfo {
    fn from(ext: SourceInfoType<ID>) -> Self {
        Self {
            source_id: ext.id,
            source_sn: ext.sn,
        }
    }
}

impl<const ID: u8> From<SourceInfo> for SourceInfoType<ID> {
    fn from(info: SourceInfo) -> Self {
        SourceInfoType {
            id: info.source_id,
            sn: info.source_sn,
        }
    }
}

/// A zpico sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    pub(crate) key_expr: KeyExpr,
    pub(crate) payload: ZBuf,
    pub(crate) kind: SampleKind,
    pub(crate) encoding: Encoding,
    pub(crate) timestamp: Option<Timestamp>,
    pub(crate) source_info: Option<SourceInfo>,
}

impl Sample {
    pub(crate) fn from_put(key_expr: KeyExpr, put: zenoh::Put) -> Self {
        Self {
            key_expr,
            payload: put.payload,
            kind: SampleKind::Put,
            encoding: put.encoding,
            timestamp: put.timestamp,
            source_info: put.ext_sinfo.map(Into::into),
        }
    }

    pub(crate) fn from_del(key_expr: KeyExpr, del: zenoh::Del) -> Self {
        Self {
            key_expr,
            payload: ZBuf::empty(),
            kind: SampleKind::Delete,
            encoding: Encoding::empty(),
            timestamp: del.timestamp,
            source_info: del.ext_sinfo.map(Into::into),
        }
    }

    pub(crate) fn from_reply(key_expr: KeyExpr, reply: zenoh::Reply) -> Self {
        Self {
            key_expr,
            payload: reply.payload,
            kind: SampleKind::Put,
            encoding: reply.encoding,
            timestamp: reply.timestamp,
            source_info: reply.ext_sinfo.map(Into::into),
        }
    }

    #[inline]
    pub fn key_expr(&self) -> &KeyExpr {
        &self.key_expr
    }

    #[inline]
    pub fn payload(&self) -> &ZBuf {
        &self.payload
    }

    #[inline]
    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    #[inline]
    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    #[inline]
    pub fn timestamp(&self) -> Option<&Timestamp> {
        self.timestamp.as_ref()
    }

    #[inline]
    pub fn source_info(&self) -> Option<&SourceInfo> {
        self.source_info.as_ref()
    }
}
