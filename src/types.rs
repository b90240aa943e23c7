//! Type-safe identifiers for model entities and fault-tree nodes.
//!
//! Every entity of a [`System`][crate::model::System] lives in an arena owned
//! by the system and is addressed by one of these newtypes, so an id of one
//! kind can never be passed where another kind is expected.
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Creates an identifier from a raw arena index.
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            /// Returns the raw identifier.
            pub const fn id(self) -> u32 {
                self.0
            }

            /// Returns the arena index as a `usize`.
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                $name(u32::try_from(index).unwrap_or(u32::MAX))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a fault mode inside a [`FaultRegistry`][crate::fault::FaultRegistry].
    ///
    /// A fault-mode name always resolves to the same id within one registry,
    /// which is what makes repeated mentions of a name the same leaf.
    FaultModeId,
    "fm"
);

define_id!(
    /// Identifier of a failure mode of a system.
    FailureModeId,
    "fl"
);

define_id!(
    /// Identifier of an error mode of a system.
    ErrorModeId,
    "em"
);

define_id!(
    /// Identifier of a component of a system.
    ComponentId,
    "c"
);

define_id!(
    /// Identifier of a propagation port of a system.
    PortId,
    "pp"
);

define_id!(
    /// Index of a node inside a [`FaultTree`][crate::tree::FaultTree] arena.
    ///
    /// For basic events this is also the stable identity used by cut sets:
    /// two mentions of the same basic event share one `NodeId`.
    NodeId,
    "n"
);

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let f = FaultModeId::new(3);
        assert_eq!(f.id(), 3);
        assert_eq!(f.index(), 3);
        assert_eq!(u32::from(f), 3);
        assert_eq!(FaultModeId::from_index(3), f);
    }

    #[test]
    fn test_id_ordering() {
        assert!(NodeId::new(1) < NodeId::new(2));
        assert_eq!(ErrorModeId::new(7), ErrorModeId::new(7));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(FaultModeId::new(1).to_string(), "fm1");
        assert_eq!(NodeId::new(4).to_string(), "n4");
        assert_eq!(ComponentId::new(0).to_string(), "c0");
    }
}
