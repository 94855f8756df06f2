//! Identity types for the graph.
//!
//! IDs are newtypes over `u32` that serve as direct array indices
//! into their respective storage vectors, providing O(1) lookup.

use crate::graph::port::PortDirection;
use std::fmt;

/// Index into `Graph::components`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComponentId(pub u32);

impl ComponentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Output port `index` of this component.
    #[inline]
    pub fn output(self, index: usize) -> PortRef {
        PortRef {
            component: self,
            direction: PortDirection::Output,
            index,
        }
    }

    /// Input port `index` of this component.
    #[inline]
    pub fn input(self, index: usize) -> PortRef {
        PortRef {
            component: self,
            direction: PortDirection::Input,
            index,
        }
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Index into `Graph::connections`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u32);

impl ConnectionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// A port addressed by owning component, direction and position.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub component: ComponentId,
    pub direction: PortDirection,
    pub index: usize,
}

impl fmt::Debug for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PortRef(component={}, {:?}#{})",
            self.component.0, self.direction, self.index
        )
    }
}
