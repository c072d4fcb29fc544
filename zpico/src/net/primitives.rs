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
use zpico_protocol::{
    core::Reliability,
    network::{interest::Interest, Declare, Push, Request, Response, ResponseFinal},
};
use zpico_result::ZResult;

/// The outgoing side of a session: every network message it emits goes through here.
pub(crate) trait Primitives: Send + Sync {
    fn send_interest(&self, msg: Interest) -> ZResult<()>;

    fn send_declare(&self, msg: Declare) -> ZResult<()>;

    fn send_push(&self, msg: Push, reliability: Reliability) -> ZResult<()>;

    fn send_request(&self, msg: Request) -> ZResult<()>;

    fn send_response(&self, msg: Response) -> ZResult<()>;

    fn send_response_final(&self, msg: ResponseFinal) -> ZResult<()>;
}
