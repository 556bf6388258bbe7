//! Register slots.

use std::fmt;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use viuact_ir::Name;

bitflags! {
    /// How a slot is accessed and who may reclaim it.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct SlotFlags: u8 {
        /// Accessed through the `*` sigil.
        const POINTER = 1 << 0;
        /// Temporary the receiving expression may cancel and replace with a
        /// slot it already owns.
        const DISPOSABLE = 1 << 1;
        /// The value stored here should be a pointer, not a copy.
        const INHIBIT_DEREF = 1 << 2;
    }
}

/// Partition of the register file with its own index space.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RegisterClass {
    Local,
    Parameters,
    Arguments,
    /// The discard target; never holds a value.
    Void,
}

impl RegisterClass {
    pub const ALLOCATABLE: [RegisterClass; 3] = [
        RegisterClass::Local,
        RegisterClass::Parameters,
        RegisterClass::Arguments,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegisterClass::Local => "local",
            RegisterClass::Parameters => "parameters",
            RegisterClass::Arguments => "arguments",
            RegisterClass::Void => "void",
        }
    }

    /// First index handed out for this class. Local register 0 holds the
    /// function's result.
    pub(crate) fn first_index(self) -> u32 {
        u32::from(self == RegisterClass::Local)
    }

    pub(crate) fn ordinal(self) -> usize {
        match self {
            RegisterClass::Local => 0,
            RegisterClass::Parameters => 1,
            RegisterClass::Arguments => 2,
            RegisterClass::Void => 3,
        }
    }
}

/// A numbered register within a class.
///
/// Equality and hashing look only at `(index, class)`; the name and flags
/// are metadata carried along by the emitter.
#[derive(Copy, Clone, Debug)]
pub struct Slot {
    pub name: Option<Name>,
    pub index: u32,
    pub class: RegisterClass,
    pub flags: SlotFlags,
}

impl Slot {
    pub const VOID: Slot = Slot {
        name: None,
        index: 0,
        class: RegisterClass::Void,
        flags: SlotFlags::empty(),
    };

    pub const fn new(index: u32, class: RegisterClass) -> Self {
        Slot {
            name: None,
            index,
            class,
            flags: SlotFlags::empty(),
        }
    }

    pub const fn local(index: u32) -> Self {
        Slot::new(index, RegisterClass::Local)
    }

    pub const fn parameter(index: u32) -> Self {
        Slot::new(index, RegisterClass::Parameters)
    }

    pub const fn argument(index: u32) -> Self {
        Slot::new(index, RegisterClass::Arguments)
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        self.class == RegisterClass::Void
    }

    #[inline]
    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    #[inline]
    pub fn is_disposable(&self) -> bool {
        self.flags.contains(SlotFlags::DISPOSABLE)
    }

    #[inline]
    pub fn is_pointer(&self) -> bool {
        self.flags.contains(SlotFlags::POINTER)
    }

    #[inline]
    pub fn inhibits_deref(&self) -> bool {
        self.flags.contains(SlotFlags::INHIBIT_DEREF)
    }

    #[must_use]
    pub fn named(mut self, name: Name) -> Self {
        self.name = Some(name);
        self
    }

    #[must_use]
    pub fn as_pointer(mut self) -> Self {
        self.flags.insert(SlotFlags::POINTER);
        self
    }

    #[must_use]
    pub fn as_disposable(mut self, disposable: bool) -> Self {
        self.flags.set(SlotFlags::DISPOSABLE, disposable);
        self
    }

    #[must_use]
    pub fn with_inhibit(mut self, inhibit: bool) -> Self {
        if !self.is_void() {
            self.flags.set(SlotFlags::INHIBIT_DEREF, inhibit);
        }
        self
    }

    pub(crate) fn key(&self) -> (u32, RegisterClass) {
        (self.index, self.class)
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Slot {}

impl Hash for Slot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_void() {
            return f.write_str("void");
        }
        let sigil = if self.is_pointer() { '*' } else { '%' };
        write!(f, "{sigil}{} {}", self.index, self.class.as_str())
    }
}
