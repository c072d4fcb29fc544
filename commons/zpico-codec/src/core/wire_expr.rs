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
    core::{ExprId, ExprLen, WireExpr},
    network::Mapping,
};

use crate::{LCodec, RCodec, WCodec, Zenoh080, Zenoh080Bounded};

impl LCodec<&WireExpr<'_>> for Zenoh080 {
    fn w_len(self, x: &WireExpr<'_>) -> usize {
        let mut len = self.w_len(x.scope);
        if x.has_suffix() {
            len += self.w_len(x.suffix.as_ref());
        }
        len
    }
}

impl<W> WCodec<&WireExpr<'_>, &mut W> for Zenoh080
where
    W: Writer,
{
    type Output = Result<(), DidntWrite>;

    fn write(self, writer: &mut W, x: &WireExpr<'_>) -> Self::Output {
        Zenoh080Bounded::<ExprId>::new().write(&mut *writer, x.scope)?;
        if x.has_suffix() {
            Zenoh080Bounded::<ExprLen>::new().write(&mut *writer, x.suffix.as_ref())?;
        }
        Ok(())
    }
}

/// Reads a key expression whose suffix is present only when `has_suffix` is set.
pub fn read<R>(reader: &mut R, has_suffix: bool) -> Result<WireExpr<'static>, DidntRead>
where
    R: Reader,
{
    let scope: ExprId = Zenoh080Bounded::<ExprId>::new().read(&mut *reader)?;
    let suffix: String = if has_suffix {
        Zenoh080Bounded::<ExprLen>::new().read(&mut *reader)?
    } else {
        String::new()
    };
    Ok(WireExpr {
        scope,
        suffix: suffix.into(),
        mapping: Mapping::DEFAULT,
    })
}
