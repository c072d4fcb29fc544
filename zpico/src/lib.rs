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

//! [Zenoh](https://zenoh.io) edge client for constrained devices.
//!
//! A zpico [`Session`] talks to a single peer, usually a router, over an established
//! [`Link`](transport::Link). On top of it applications publish data, subscribe to key
//! expressions, serve and issue queries, and announce liveliness tokens.
//!
//! # Examples
//! ### Publishing
//! ```no_run
//! # fn run(link: impl zpico::transport::Link + 'static, peer: zpico::transport::TransportPeer) -> zpico::ZResult<()> {
//! let session = zpico::open(zpico::config::Config::client(), link, peer)?;
//! session.put("key/expression", "value")?;
//! session.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Subscribing
//! ```no_run
//! # fn run(session: zpico::Session) -> zpico::ZResult<()> {
//! let subscriber = session.declare_subscriber("key/expression", session.ring_channel())?;
//! while let Ok(sample) = subscriber.recv() {
//!     println!("Received: {} {:?}", sample.key_expr(), sample.payload());
//! }
//! # Ok(())
//! # }
//! ```
mod api;
mod net;

pub mod config;

use tracing_subscriber::EnvFilter;
pub use zpico_buffers::ZBuf;
pub use zpico_protocol::core::{Encoding, EntityGlobalId, Reliability, Timestamp, WhatAmI, ZenohId};
pub use zpico_result::{ZError, ZResult};

pub use crate::api::session::Session;

/// Handlers to deliver samples, queries and replies to the application.
pub mod handlers {
    pub use crate::api::handlers::*;
}

pub mod key_expr {
    pub use crate::api::key_expr::KeyExpr;
}

pub mod sample {
    pub use crate::api::sample::{Sample, SampleKind, SourceInfo};
}

/// Publishers and subscribers.
pub mod pubsub {
    pub use crate::api::{
        publisher::{PutOptions, Publisher},
        subscriber::Subscriber,
    };
}

/// Queryables, queries and replies.
pub mod query {
    pub use crate::api::{
        query::{ConsolidationMode, GetOptions, QueryTarget, Reply, ReplyError},
        queryable::{Query, Queryable},
    };
}

/// Liveliness tokens.
pub mod liveliness {
    pub use crate::api::token::Token;
}

/// Interests in the declarations of the peer, and the write filters built on them.
pub mod interest {
    pub use zpico_protocol::network::{InterestId, InterestOptions};

    pub use crate::net::{
        filtering::WriteFilterState,
        interest::{InterestMsg, InterestMsgKind},
    };
}

pub mod transport {
    pub use crate::net::transport::{Link, TransportPeer};
}

/// Open a session with `peer` over `link`.
///
/// The link must already be established. The read and lease tasks are started before this
/// function returns.
pub fn open<L>(config: config::Config, link: L, peer: transport::TransportPeer) -> ZResult<Session>
where
    L: transport::Link + 'static,
{
    Session::new(config, link, peer)
}

/// Enable the tracing formatting subscriber from the `RUST_LOG` environment variable.
/// Logging stays disabled if `RUST_LOG` is not set.
pub fn try_init_log_from_env() {
    if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        init_env_filter(env_filter);
    }
}

/// Enable the tracing formatting subscriber from the `RUST_LOG` environment variable, or
/// from the `fallback` directives when it is not set.
pub fn init_log_from_env_or<S>(fallback: S)
where
    S: AsRef<str>,
{
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    init_env_filter(env_filter);
}

fn init_env_filter(env_filter: EnvFilter) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_level(true)
        .with_target(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
