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

//! Callback handler trait.
mod callback;
mod fifo;
mod ring;

pub use callback::*;
pub use fifo::*;
pub use ring::*;

use zpico_core::zconfigurable;

zconfigurable! {
    pub(crate) static ref API_DATA_RECEPTION_CHANNEL_SIZE: usize = 256;
    pub(crate) static ref API_DATA_RECEPTION_SEND_RETRY_MS: u64 = 10;
}

/// A type that can be converted into a [`Callback`]-handler pair.
///
/// Declarations only keep the [`Callback`]; the handler is handed back to the caller,
/// typically the receiving end of a channel. Any closure accepting `T` converts into
/// itself paired with `()`.
pub trait IntoHandler<T> {
    type Handler;

    fn into_handler(self) -> (Callback<T>, Self::Handler);
}

/// The handler used when none is given: a [`FifoChannel`] with default capacity.
#[repr(transparent)]
#[derive(Default)]
pub struct DefaultHandler(FifoChannel);

impl<T: Send + 'static> IntoHandler<T> for DefaultHandler {
    type Handler = <FifoChannel as IntoHandler<T>>::Handler;

    fn into_handler(self) -> (Callback<T>, Self::Handler) {
        self.0.into_handler()
    }
}
