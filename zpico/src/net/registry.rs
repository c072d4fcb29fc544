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

//! Session-side bookkeeping of declarations.
//!
//! A [`Registry`] holds one kind of entity (subscribers, queryables, tokens or interests).
//! Entries are addressed by their session-unique id and reference counted: declaring an
//! equivalent entity on the same key shares the existing entry instead of duplicating it.
//! Mutations allocate before linking, so a failed declaration leaves the registry
//! unchanged.
use std::{collections::HashMap, sync::Arc};

use zpico_protocol::{
    core::{wire_expr::EMPTY_EXPR_ID, ExprId, WireExpr},
    network::Mapping,
};
use zpico_result::{bail, errno, zerror, ZResult};

use crate::api::{key_expr::KeyExpr, Id};

/// An entity that can be stored in a [`Registry`].
pub(crate) trait Registered {
    fn id(&self) -> Id;
    fn key_expr(&self) -> &KeyExpr;
}

/// The outcome of [`Registry::declare`].
pub(crate) enum Declared<T> {
    /// A new entry was linked; it must be announced to the remote side.
    New(Arc<T>),
    /// An equivalent entry already existed and its reference count was bumped.
    Shared(Arc<T>),
}

impl<T> Declared<T> {
    pub(crate) fn state(&self) -> &Arc<T> {
        match self {
            Declared::New(s) | Declared::Shared(s) => s,
        }
    }
}

struct Entry<T> {
    refcount: u16,
    state: Arc<T>,
}

pub(crate) struct Registry<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Registered> Registry<T> {
    /// Declare an entity on `key_expr`.
    ///
    /// An existing entry on the same key for which `equivalent` holds is shared. Otherwise
    /// `make` builds the new entity; it is only called once room has been reserved.
    pub(crate) fn declare<E, M>(
        &mut self,
        key_expr: &KeyExpr,
        equivalent: E,
        make: M,
    ) -> ZResult<Declared<T>>
    where
        E: Fn(&T) -> bool,
        M: FnOnce() -> T,
    {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.state.key_expr() == key_expr && equivalent(e.state.as_ref()))
        {
            entry.refcount = entry.refcount.checked_add(1).ok_or_else(|| {
                zerror!((errno::OUT_OF_MEMORY) "Too many references to declaration {}", entry.state.id())
            })?;
            return Ok(Declared::Shared(entry.state.clone()));
        }

        self.entries
            .try_reserve(1)
            .map_err(|e| zerror!((errno::OUT_OF_MEMORY) "Unable to declare on {}: {}", key_expr, e))?;
        let state = Arc::new(make());
        self.entries.push(Entry {
            refcount: 1,
            state: state.clone(),
        });
        Ok(Declared::New(state))
    }

    /// Release one reference to the entry `id`.
    ///
    /// Returns the removed entity when the last reference is released. The caller drops it
    /// after releasing the session lock, which runs the entity's dropper.
    pub(crate) fn undeclare(&mut self, id: Id) -> ZResult<Option<Arc<T>>> {
        let Some(idx) = self.entries.iter().position(|e| e.state.id() == id) else {
            bail!((errno::REGISTRY_NOT_FOUND) "Declaration {} not found", id);
        };
        let entry = &mut self.entries[idx];
        entry.refcount -= 1;
        if entry.refcount == 0 {
            Ok(Some(self.entries.remove(idx).state))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn get(&self, id: Id) -> Option<&Arc<T>> {
        self.entries
            .iter()
            .find(|e| e.state.id() == id)
            .map(|e| &e.state)
    }

    pub(crate) fn refcount(&self, id: Id) -> Option<u16> {
        self.entries
            .iter()
            .find(|e| e.state.id() == id)
            .map(|e| e.refcount)
    }

    /// Every entry whose key expression intersects `key_expr`, in declaration order.
    pub(crate) fn lookup_by_key(&self, key_expr: &KeyExpr) -> Vec<Arc<T>> {
        self.entries
            .iter()
            .filter(|e| e.state.key_expr().intersects(key_expr))
            .map(|e| e.state.clone())
            .collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<T>> + '_ {
        self.entries.iter().map(|e| &e.state)
    }

    /// Remove every entry regardless of its reference count.
    pub(crate) fn drain(&mut self) -> Vec<Arc<T>> {
        self.entries.drain(..).map(|e| e.state).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

struct LocalResource {
    key_expr: KeyExpr,
    refcount: u16,
}

/// Numerical aliases of key expressions, in both directions.
///
/// Local resources are declared by this session and referenced by the remote side with
/// [`Mapping::Receiver`]; remote resources are declared by the peer and referenced with
/// [`Mapping::Sender`].
pub(crate) struct Resources {
    local: HashMap<ExprId, LocalResource>,
    remote: HashMap<ExprId, KeyExpr>,
    next_id: ExprId,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            local: HashMap::new(),
            remote: HashMap::new(),
            next_id: 1, // 0 is reserved for the empty scope
        }
    }
}

impl Resources {
    /// Declare a local alias for `key_expr`. Returns its id and whether it is new.
    pub(crate) fn declare_local(&mut self, key_expr: &KeyExpr) -> ZResult<(ExprId, bool)> {
        if let Some((id, res)) = self
            .local
            .iter_mut()
            .find(|(_, r)| &r.key_expr == key_expr)
        {
            res.refcount = res.refcount.checked_add(1).ok_or_else(|| {
                zerror!((errno::OUT_OF_MEMORY) "Too many references to resource {}", id)
            })?;
            return Ok((*id, false));
        }

        if self.local.len() >= usize::from(ExprId::MAX) {
            bail!((errno::OUT_OF_MEMORY) "No resource id left for {}", key_expr);
        }
        let mut id = self.next_id;
        while id == EMPTY_EXPR_ID || self.local.contains_key(&id) {
            id = id.wrapping_add(1);
        }
        self.local
            .try_reserve(1)
            .map_err(|e| zerror!((errno::OUT_OF_MEMORY) "Unable to declare {}: {}", key_expr, e))?;
        self.local.insert(
            id,
            LocalResource {
                key_expr: key_expr.clone(),
                refcount: 1,
            },
        );
        self.next_id = id.wrapping_add(1);
        Ok((id, true))
    }

    /// Release one reference to the local resource `id`. Returns `true` once it is removed.
    pub(crate) fn undeclare_local(&mut self, id: ExprId) -> ZResult<bool> {
        let Some(res) = self.local.get_mut(&id) else {
            bail!((errno::REGISTRY_NOT_FOUND) "Resource {} not found", id);
        };
        res.refcount -= 1;
        if res.refcount == 0 {
            self.local.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub(crate) fn declare_remote(&mut self, id: ExprId, key_expr: KeyExpr) -> ZResult<()> {
        self.remote
            .try_reserve(1)
            .map_err(|e| zerror!((errno::OUT_OF_MEMORY) "Unable to map resource {}: {}", id, e))?;
        if let Some(old) = self.remote.insert(id, key_expr) {
            tracing::debug!("Remote resource {} redeclared (was {})", id, old);
        }
        Ok(())
    }

    pub(crate) fn undeclare_remote(&mut self, id: ExprId) -> ZResult<()> {
        match self.remote.remove(&id) {
            Some(_) => Ok(()),
            None => bail!((errno::REGISTRY_NOT_FOUND) "Remote resource {} not found", id),
        }
    }

    pub(crate) fn local_id(&self, key_expr: &KeyExpr) -> Option<ExprId> {
        self.local
            .iter()
            .find(|(_, r)| &r.key_expr == key_expr)
            .map(|(id, _)| *id)
    }

    /// Expand a wire expression received from the peer into a full key expression.
    pub(crate) fn expand(&self, wire_expr: &WireExpr) -> ZResult<KeyExpr> {
        if wire_expr.scope == EMPTY_EXPR_ID {
            return KeyExpr::new(&*wire_expr.suffix);
        }
        let base = match wire_expr.mapping {
            Mapping::Receiver => self.local.get(&wire_expr.scope).map(|r| &r.key_expr),
            Mapping::Sender => self.remote.get(&wire_expr.scope),
        };
        match base {
            Some(base) => Ok(base.join_suffix(wire_expr.suffix.as_ref())),
            None => bail!(
                (errno::REGISTRY_NOT_FOUND)
                "Resource {} ({:?} mapping) not found",
                wire_expr.scope,
                wire_expr.mapping
            ),
        }
    }

    /// The wire expression under which this session sends `key_expr`: its local alias when
    /// one is declared, the full string otherwise.
    pub(crate) fn wire_expr(&self, key_expr: &KeyExpr) -> WireExpr<'static> {
        match self.local_id(key_expr) {
            Some(id) => WireExpr {
                scope: id,
                suffix: "".into(),
                mapping: Mapping::Sender,
            },
            None => WireExpr {
                scope: EMPTY_EXPR_ID,
                suffix: key_expr.to_string().into(),
                mapping: Mapping::Sender,
            },
        }
    }

    pub(crate) fn clear(&mut self) {
        self.local.clear();
        self.remote.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use zpico_result::ErrNo;

    use super::*;

    #[derive(Debug)]
    struct Entity {
        id: Id,
        key_expr: KeyExpr,
        tag: u8,
        dropped: Arc<AtomicUsize>,
    }

    impl Registered for Entity {
        fn id(&self) -> Id {
            self.id
        }

        fn key_expr(&self) -> &KeyExpr {
            &self.key_expr
        }
    }

    impl Drop for Entity {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn ke(s: &str) -> KeyExpr {
        KeyExpr::new(s).unwrap()
    }

    fn declare(
        reg: &mut Registry<Entity>,
        id: Id,
        key: &str,
        tag: u8,
        dropped: &Arc<AtomicUsize>,
    ) -> Declared<Entity> {
        let key_expr = ke(key);
        reg.declare(
            &key_expr,
            |e| e.tag == tag,
            || Entity {
                id,
                key_expr: key_expr.clone(),
                tag,
                dropped: dropped.clone(),
            },
        )
        .unwrap()
    }

    #[test]
    fn equal_declarations_are_refcounted() {
        let dropped = Arc::new(AtomicUsize::new(0));
        let mut reg = Registry::default();

        assert!(matches!(declare(&mut reg, 1, "demo/a", 0, &dropped), Declared::New(_)));
        let shared = declare(&mut reg, 2, "demo/a", 0, &dropped);
        assert!(matches!(shared, Declared::Shared(_)));
        assert_eq!(shared.state().id, 1);
        drop(shared);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.refcount(1), Some(2));

        assert!(reg.undeclare(1).unwrap().is_none());
        assert_eq!(dropped.load(Ordering::SeqCst), 0);
        let removed = reg.undeclare(1).unwrap().unwrap();
        assert_eq!(reg.len(), 0);
        assert!(reg.lookup_by_key(&ke("demo/a")).is_empty());
        assert_eq!(dropped.load(Ordering::SeqCst), 0);
        drop(removed);
        assert_eq!(dropped.load(Ordering::SeqCst), 1);

        let e = reg.undeclare(1).unwrap_err();
        assert_eq!(e.errno().get(), errno::REGISTRY_NOT_FOUND);
    }

    #[test]
    fn different_declarations_are_distinct() {
        let dropped = Arc::new(AtomicUsize::new(0));
        let mut reg = Registry::default();
        declare(&mut reg, 1, "demo/a", 0, &dropped);
        declare(&mut reg, 2, "demo/a", 1, &dropped);
        declare(&mut reg, 3, "demo/b", 0, &dropped);
        assert_eq!(reg.len(), 3);

        let ids: Vec<Id> = reg.lookup_by_key(&ke("demo/*")).iter().map(|e| e.id).collect();
        assert_eq!(ids, [1, 2, 3]);
        let ids: Vec<Id> = reg.lookup_by_key(&ke("demo/b")).iter().map(|e| e.id).collect();
        assert_eq!(ids, [3]);
        assert!(reg.get(2).is_some());

        let drained = reg.drain();
        assert_eq!(drained.len(), 3);
        drop(drained);
        assert_eq!(dropped.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn local_resources() {
        let mut res = Resources::default();
        let (a, new) = res.declare_local(&ke("demo/a")).unwrap();
        assert!(new);
        assert_eq!(a, 1);
        assert_eq!(res.declare_local(&ke("demo/a")).unwrap(), (1, false));
        let (b, _) = res.declare_local(&ke("demo/b")).unwrap();
        assert_eq!(b, 2);

        assert_eq!(res.wire_expr(&ke("demo/a")).as_id_and_suffix(), (1, ""));
        assert_eq!(res.wire_expr(&ke("demo/c")).as_id_and_suffix(), (0, "demo/c"));

        assert!(!res.undeclare_local(a).unwrap());
        assert!(res.undeclare_local(a).unwrap());
        assert!(res.local_id(&ke("demo/a")).is_none());
        assert_eq!(
            res.undeclare_local(a).unwrap_err().errno().get(),
            errno::REGISTRY_NOT_FOUND
        );
    }

    #[test]
    fn expand_by_mapping() {
        let mut res = Resources::default();
        let (local, _) = res.declare_local(&ke("local")).unwrap();
        res.declare_remote(7, ke("remote")).unwrap();

        let we = WireExpr {
            scope: local,
            suffix: "/x".into(),
            mapping: Mapping::Receiver,
        };
        assert_eq!(res.expand(&we).unwrap(), ke("local/x"));

        let we = WireExpr {
            scope: 7,
            suffix: "".into(),
            mapping: Mapping::Sender,
        };
        assert_eq!(res.expand(&we).unwrap(), ke("remote"));

        let we = WireExpr {
            scope: 7,
            suffix: "".into(),
            mapping: Mapping::Receiver,
        };
        assert!(res.expand(&we).is_err());
        assert_eq!(res.expand(&WireExpr::from("plain/key")).unwrap(), ke("plain/key"));

        res.undeclare_remote(7).unwrap();
        assert!(res.undeclare_remote(7).is_err());
    }
}
