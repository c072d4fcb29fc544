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
use zpico_buffers::{
    reader::{DidntRead, Reader},
    writer::{DidntWrite, Writer},
};
use zpico_protocol::{
    common::{iext, imsg},
    zenoh::{
        id,
        query::{ext, flag, Query},
        ConsolidationMode,
    },
};

use crate::{
    common::extension::{self, ExtChain},
    RCodec, WCodec, Zenoh080, Zenoh080Header,
};

// Wire values, indexed by the mode discriminant
const MODES: [ConsolidationMode; 4] = [
    ConsolidationMode::Auto,
    ConsolidationMode::None,
    ConsolidationMode::Monotonic,
    ConsolidationMode::Latest,
];

impl<W> WCodec<(ConsolidationMode, bool), &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, (x, more): (ConsolidationMode, bool)) -> Self::Output {
        self.write(&mut *writer, (&ext::Consolidation::new(x as u64), more))
    }
}

impl<R> RCodec<(ConsolidationMode, bool), &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<(ConsolidationMode, bool), Self::Error> {
        let (ext, more): (ext::Consolidation, bool) = self.read(&mut *reader)?;
        let mode = usize::try_from(ext.value)
            .ok()
            .and_then(|i| MODES.get(i))
            .ok_or(DidntRead)?;
        Ok((*mode, more))
    }
}

impl<W> WCodec<&Query, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &Query) -> Self::Output {
        let consolidation =
            (x.consolidation != ConsolidationMode::Auto).then_some(x.consolidation);
        let mut exts = ExtChain::new(
            &[x.ext_body.is_some(), consolidation.is_some(), x.ext_sinfo.is_some()],
            &x.ext_unknown,
        );
        let header = id::QUERY
            | imsg::flag_if(!x.parameters.is_empty(), flag::P)
            | exts.flag(flag::Z);
        self.write(&mut *writer, header)?;

        if !x.parameters.is_empty() {
            self.write(&mut *writer, x.parameters.as_str())?;
        }
        exts.write_opt(&mut *writer, x.ext_body.as_ref())?;
        exts.write_opt(&mut *writer, consolidation)?;
        exts.write_opt(&mut *writer, x.ext_sinfo.as_ref())?;
        exts.finish(writer, &x.ext_unknown)
    }
}

impl<R> RCodec<Query, &mut R> for Zenoh080Header
where
    R: Reader,
{
    type Error = DidntRead;

    fn read(self, reader: &mut R) -> Result<Query, Self::Error> {
        self.expect(id::QUERY)?;
        let parameters: Option<String> = self.read_if(flag::P, &mut *reader)?;

        let mut ext_body: Option<ext::QueryBodyType> = None;
        let mut consolidation: Option<ConsolidationMode> = None;
        let mut ext_sinfo: Option<ext::SourceInfoType> = None;
        let mut ext_unknown = Vec::new();
        extension::read_chain(reader, "Query", self.has(flag::Z), &mut ext_unknown, |h, r| {
            match iext::eid(h.header) {
                ext::QueryBody::ID => Ok(extension::store(&mut ext_body, h.read(&mut *r)?)),
                ext::Consolidation::ID => {
                    Ok(extension::store(&mut consolidation, h.read(&mut *r)?))
                }
                ext::SourceInfo::ID => Ok(extension::store(&mut ext_sinfo, h.read(&mut *r)?)),
                _ => Ok(None),
            }
        })?;

        Ok(Query {
            consolidation: consolidation.unwrap_or(ConsolidationMode::Auto),
            parameters: parameters.unwrap_or_default(),
            ext_sinfo,
            ext_body,
            ext_unknown,
        })
    }
}

read_after_header!(Query);

#[cfg(test)]
mod tests {
    use zpico_buffers::{reader::HasReader, writer::HasWriter, ZBuf};
    use zpico_protocol::core::Encoding;

    use super::*;

    fn query(consolidation: ConsolidationMode, ext_body: Option<ext::QueryBodyType>) -> Query {
        Query {
            consolidation,
            parameters: String::new(),
            ext_sinfo: None,
            ext_body,
            ext_unknown: vec![],
        }
    }

    fn encode(x: &Query) -> Vec<u8> {
        let mut buffer = vec![];
        let mut writer = buffer.writer();
        Zenoh080::new().write(&mut writer, x).unwrap();
        buffer
    }

    #[test]
    fn auto_consolidation_is_not_sent() {
        let x = query(ConsolidationMode::Auto, None);
        let buffer = encode(&x);
        assert_eq!(buffer, vec![id::QUERY]);

        let y: Query = Zenoh080::new().read(&mut buffer.reader()).unwrap();
        assert_eq!(y.consolidation, ConsolidationMode::Auto);
    }

    #[test]
    fn consolidation_wire_values() {
        for (mode, value) in [
            (ConsolidationMode::None, 1),
            (ConsolidationMode::Monotonic, 2),
            (ConsolidationMode::Latest, 3),
        ] {
            let buffer = encode(&query(mode, None));
            let ext = ext::Consolidation::ID;
            assert_eq!(buffer, vec![id::QUERY | flag::Z, ext, value]);

            let y: Query = Zenoh080::new().read(&mut buffer.reader()).unwrap();
            assert_eq!(y.consolidation, mode);
        }
    }

    #[test]
    fn unknown_consolidation_is_rejected() {
        let ext = ext::Consolidation::ID;
        let buffer = vec![id::QUERY | flag::Z, ext, 4];
        let r: Result<Query, _> = Zenoh080::new().read(&mut buffer.reader());
        assert!(r.is_err());
    }

    #[test]
    fn body_payload_is_length_prefixed() {
        let body = ext::QueryBodyType {
            encoding: Encoding::empty(),
            payload: ZBuf::from(&b"hi"[..]),
        };
        let x = query(ConsolidationMode::Auto, Some(body));
        let buffer = encode(&x);
        let ext = ext::QueryBody::ID;
        assert_eq!(
            buffer,
            vec![id::QUERY | flag::Z, ext, 4, 0, 2, b'h', b'i']
        );

        let y: Query = Zenoh080::new().read(&mut buffer.reader()).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn body_length_must_match_its_content() {
        let ext = ext::QueryBody::ID;
        let buffer = vec![id::QUERY | flag::Z, ext, 5, 0, 2, b'h', b'i', 0];
        let r: Result<Query, _> = Zenoh080::new().read(&mut buffer.reader());
        assert!(r.is_err());
    }
}
