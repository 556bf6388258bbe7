//! Scope tree and register allocation.
//!
//! # Design
//!
//! Scopes live in an arena and point at their parent by [`ScopeId`]. All
//! scopes of one function share one register file, so the high-water mark
//! per register class is a single counter on the tree rather than a value
//! copied into every scope and pushed back up.
//!
//! A slot is owned by the scope that allocated it. Releasing a slot puts it
//! on the owner's free list; exiting a scope releases everything it still
//! owns and hands its free lists to the parent. Allocation reuses cancelled
//! slots first, then freed ones, searching from the current scope outwards,
//! and only then mints a new index.

use rustc_hash::{FxHashMap, FxHashSet};
use viuact_ir::Name;
use viuact_types::Type;

use crate::{RegisterClass, Slot};

/// Register allocator invariant violations.
///
/// The emitter never produces these for valid input; seeing one means a
/// slot's lifecycle was mismanaged.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("slot {0} deallocated twice")]
    DoubleDeallocation(Slot),
    #[error("slot {0} deallocated after being cancelled")]
    DeallocationOfCancelled(Slot),
    #[error("slot {0} cancelled twice")]
    DoubleCancel(Slot),
    #[error("slot {0} cancelled after being deallocated")]
    CancelOfDeallocated(Slot),
    #[error("slot {0} is not allocated in any enclosing scope")]
    NotAllocated(Slot),
    #[error("cannot exit the outermost scope")]
    ExitRoot,
}

/// Index into a [`ScopeTree`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);

    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Default)]
struct ScopeData {
    parent: Option<ScopeId>,
    allocated: Vec<Slot>,
    freed: Vec<Slot>,
    cancelled: Vec<Slot>,
    names: FxHashMap<Name, Slot>,
}

/// Bindings and liveness saved before the first arm of a branching construct.
pub struct ScopeSnapshot {
    scopes: Vec<ScopeData>,
    types: FxHashMap<Slot, Type>,
}

/// Nested scopes of one function together with its register file.
pub struct ScopeTree {
    scopes: Vec<ScopeData>,
    current: ScopeId,
    /// Next unminted index per allocatable class.
    next: [u32; 3],
    permanent: FxHashSet<Slot>,
    types: FxHashMap<Slot, Type>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![ScopeData::default()],
            current: ScopeId::ROOT,
            next: RegisterClass::ALLOCATABLE.map(RegisterClass::first_index),
            permanent: FxHashSet::default(),
            types: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn current(&self) -> ScopeId {
        self.current
    }

    fn data(&self, id: ScopeId) -> &ScopeData {
        &self.scopes[id.index()]
    }

    fn data_mut(&mut self, id: ScopeId) -> &mut ScopeData {
        &mut self.scopes[id.index()]
    }

    /// Scopes from the current one out to the root.
    fn chain(&self) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(self.current), |id| self.data(*id).parent)
    }

    // ── Scope lifetime ──────────────────────────────────────────────

    /// Open a child of the current scope and make it current.
    pub fn enter(&mut self) -> ScopeId {
        let id = ScopeId(u32::try_from(self.scopes.len()).unwrap_or(u32::MAX));
        self.scopes.push(ScopeData {
            parent: Some(self.current),
            ..ScopeData::default()
        });
        self.current = id;
        id
    }

    /// Release every slot the current scope still owns, hand its free lists
    /// to the parent, and make the parent current.
    pub fn exit(&mut self) -> Result<(), ScopeError> {
        let parent = self.data(self.current).parent.ok_or(ScopeError::ExitRoot)?;

        let owned: Vec<Slot> = self.data(self.current).allocated.clone();
        for slot in owned {
            if !self.permanent.contains(&slot) {
                self.deallocate(slot)?;
            }
        }

        let scope = self.data_mut(self.current);
        let freed = std::mem::take(&mut scope.freed);
        let cancelled = std::mem::take(&mut scope.cancelled);
        scope.names.clear();

        let parent_data = self.data_mut(parent);
        parent_data.freed.extend(freed);
        parent_data.cancelled.extend(cancelled);
        self.current = parent;
        Ok(())
    }

    // ── Allocation ──────────────────────────────────────────────────

    fn mint(&mut self, class: RegisterClass) -> u32 {
        let counter = &mut self.next[class.ordinal()];
        let index = *counter;
        *counter += 1;
        index
    }

    fn take_free(&mut self, class: RegisterClass) -> Option<Slot> {
        let chain: Vec<ScopeId> = self.chain().collect();
        for id in chain {
            let scope = self.data_mut(id);
            for list in [&mut scope.cancelled, &mut scope.freed] {
                if let Some(pos) = list.iter().position(|s| s.class == class) {
                    return Some(list.remove(pos));
                }
            }
        }
        None
    }

    /// Allocate an anonymous slot of `class` in the current scope.
    pub fn allocate(&mut self, class: RegisterClass) -> Slot {
        let index = match self.take_free(class) {
            Some(reused) => reused.index,
            None => self.mint(class),
        };
        let slot = Slot::new(index, class);
        self.data_mut(self.current).allocated.push(slot);
        tracing::trace!(%slot, scope = self.current.0, "allocate slot");
        slot
    }

    /// Anonymous local temporary.
    pub fn anonymous(&mut self) -> Slot {
        self.allocate(RegisterClass::Local)
    }

    /// Local temporary the receiving expression may cancel.
    pub fn disposable(&mut self) -> Slot {
        self.anonymous().as_disposable(true)
    }

    /// Fresh local slot bound to `name` in the current scope.
    pub fn named(&mut self, name: Name) -> Slot {
        let slot = self.anonymous().named(name);
        self.data_mut(self.current).names.insert(name, slot);
        slot
    }

    /// Local slot with an index never used before in this function, bound
    /// to `name` in the outermost scope. Captured values are copied into
    /// such slots before the function body runs, so no earlier instruction
    /// may have written them.
    pub fn pristine(&mut self, name: Name) -> Slot {
        let slot = Slot::local(self.mint(RegisterClass::Local)).named(name);
        let root = self.data_mut(ScopeId::ROOT);
        root.allocated.push(slot);
        root.names.insert(name, slot);
        slot
    }

    /// Register a slot that lives for the whole function and is never
    /// released, such as the result register.
    pub fn insert_permanent(&mut self, slot: Slot) {
        let counter = &mut self.next[slot.class.ordinal()];
        *counter = (*counter).max(slot.index + 1);
        self.data_mut(ScopeId::ROOT).allocated.push(slot);
        self.permanent.insert(slot);
    }

    /// Scope in the current chain that owns `slot`.
    fn owner(&self, slot: Slot) -> Option<ScopeId> {
        self.chain()
            .find(|id| self.data(*id).allocated.contains(&slot))
    }

    fn in_chain_lists(&self, slot: Slot, cancelled: bool) -> bool {
        self.chain().any(|id| {
            let scope = self.data(id);
            if cancelled {
                scope.cancelled.contains(&slot)
            } else {
                scope.freed.contains(&slot)
            }
        })
    }

    fn detach(&mut self, owner: ScopeId, slot: Slot) {
        let scope = self.data_mut(owner);
        scope.allocated.retain(|s| *s != slot);
        scope.names.retain(|_, s| *s != slot);
        self.types.remove(&slot);
    }

    /// Return `slot` to its owner's free list.
    pub fn deallocate(&mut self, slot: Slot) -> Result<(), ScopeError> {
        if slot.is_void() || self.permanent.contains(&slot) {
            return Ok(());
        }
        if self.in_chain_lists(slot, false) {
            return Err(ScopeError::DoubleDeallocation(slot));
        }
        if self.in_chain_lists(slot, true) {
            return Err(ScopeError::DeallocationOfCancelled(slot));
        }
        let owner = self.owner(slot).ok_or(ScopeError::NotAllocated(slot))?;
        self.detach(owner, slot);
        self.data_mut(owner)
            .freed
            .push(Slot::new(slot.index, slot.class));
        tracing::trace!(%slot, "deallocate slot");
        Ok(())
    }

    pub fn deallocate_if_anonymous(&mut self, slot: Slot) -> Result<(), ScopeError> {
        if slot.is_anonymous() {
            self.deallocate(slot)?;
        }
        Ok(())
    }

    /// Give back a slot that was never written.
    pub fn cancel(&mut self, slot: Slot) -> Result<(), ScopeError> {
        if slot.is_void() {
            return Ok(());
        }
        if self.in_chain_lists(slot, true) {
            return Err(ScopeError::DoubleCancel(slot));
        }
        if self.in_chain_lists(slot, false) {
            return Err(ScopeError::CancelOfDeallocated(slot));
        }
        if self.permanent.contains(&slot) {
            return Ok(());
        }
        let owner = self.owner(slot).ok_or(ScopeError::NotAllocated(slot))?;
        self.detach(owner, slot);
        self.data_mut(owner)
            .cancelled
            .push(Slot::new(slot.index, slot.class));
        tracing::trace!(%slot, "cancel slot");
        Ok(())
    }

    // ── Names ───────────────────────────────────────────────────────

    /// Slot bound to `name`, searching from the current scope outwards.
    pub fn slot_of(&self, name: Name) -> Option<Slot> {
        self.chain()
            .find_map(|id| self.data(id).names.get(&name).copied())
    }

    /// Bind `name` to an allocated slot in the scope that owns it. Any other
    /// name the slot carried there is dropped.
    pub fn name_slot(&mut self, slot: Slot, name: Name) -> Result<Slot, ScopeError> {
        let owner = self.owner(slot).ok_or(ScopeError::NotAllocated(slot))?;
        let named = slot.named(name);
        let scope = self.data_mut(owner);
        scope.names.retain(|_, s| *s != slot);
        scope.names.insert(name, named);
        if let Some(entry) = scope.allocated.iter_mut().find(|s| **s == slot) {
            entry.name = Some(name);
        }
        Ok(named)
    }

    /// Every name visible from the current scope with its slot; inner
    /// bindings shadow outer ones.
    pub fn visible(&self) -> Vec<(Name, Slot)> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for id in self.chain() {
            let mut names: Vec<(Name, Slot)> = self
                .data(id)
                .names
                .iter()
                .map(|(n, s)| (*n, *s))
                .collect();
            names.sort_by_key(|(_, s)| s.index);
            for (name, slot) in names {
                if seen.insert(name) {
                    out.push((name, slot));
                }
            }
        }
        out
    }

    // ── Types ───────────────────────────────────────────────────────

    pub fn set_type(&mut self, slot: Slot, ty: Type) {
        if !slot.is_void() {
            self.types.insert(slot, ty);
        }
    }

    pub fn type_of(&self, slot: Slot) -> Option<&Type> {
        self.types.get(&slot)
    }

    // ── Branches ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> ScopeSnapshot {
        ScopeSnapshot {
            scopes: self.scopes.clone(),
            types: self.types.clone(),
        }
    }

    /// Roll names, types and liveness back to `snapshot`, so the next arm
    /// starts where the previous one did. Slots the previous arm freed that
    /// were not live at the snapshot stay on the free lists.
    pub fn restore(&mut self, snapshot: &ScopeSnapshot) {
        let key = |slot: &Slot| (slot.index, slot.class);
        let live: FxHashSet<(u32, RegisterClass)> = snapshot
            .scopes
            .iter()
            .flat_map(|scope| scope.allocated.iter().map(key))
            .collect();
        let mut listed: FxHashSet<(u32, RegisterClass)> = snapshot
            .scopes
            .iter()
            .flat_map(|scope| scope.freed.iter().chain(&scope.cancelled).map(key))
            .collect();

        let mut scopes = snapshot.scopes.clone();
        for (saved, now) in scopes.iter_mut().zip(&self.scopes) {
            for slot in &now.freed {
                if !live.contains(&key(slot)) && listed.insert(key(slot)) {
                    saved.freed.push(*slot);
                }
            }
            for slot in &now.cancelled {
                if !live.contains(&key(slot)) && listed.insert(key(slot)) {
                    saved.cancelled.push(*slot);
                }
            }
        }
        self.scopes = scopes;
        self.types.clone_from(&snapshot.types);
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Registers of `class` the function needs.
    pub fn pressure(&self, class: RegisterClass) -> u32 {
        match class {
            RegisterClass::Void => 0,
            other => self.next[other.ordinal()],
        }
    }
}
