//! Port tables for graph components.
//!
//! Every component owns two ordered port sequences (inputs and outputs).
//! Ports are addressed strictly by position; a port holds at most one
//! connection.

use crate::graph::error::{GraphError, GraphResult};
use crate::graph::id::ConnectionId;

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

/// A single attachment point on a component.
#[derive(Debug, Clone)]
pub struct Port {
    pub name: String,
    pub direction: PortDirection,
    pub index: usize,
    pub connection: Option<ConnectionId>,
}

impl Port {
    pub fn input(index: usize) -> Self {
        Self {
            name: format!("in{index}"),
            direction: PortDirection::Input,
            index,
            connection: None,
        }
    }

    pub fn output(index: usize) -> Self {
        Self {
            name: format!("out{index}"),
            direction: PortDirection::Output,
            index,
            connection: None,
        }
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

/// Ordered port sequence of one direction.
#[derive(Debug, Clone)]
pub struct PortTable {
    direction: PortDirection,
    ports: Vec<Port>,
}

impl PortTable {
    pub fn new(direction: PortDirection, count: usize) -> GraphResult<Self> {
        let mut table = Self {
            direction,
            ports: Vec::new(),
        };
        table.grow_to(count)?;
        Ok(table)
    }

    /// Append ports until the table holds `count` of them. Never shrinks.
    ///
    /// Fails with [`GraphError::Allocation`] when the table cannot be grown.
    pub fn grow_to(&mut self, count: usize) -> GraphResult<()> {
        let missing = count.saturating_sub(self.ports.len());
        self.ports.try_reserve_exact(missing).map_err(|e| {
            GraphError::Allocation(format!("{:?} port table of {}: {e}", self.direction, count))
        })?;
        while self.ports.len() < count {
            let index = self.ports.len();
            self.ports.push(match self.direction {
                PortDirection::Input => Port::input(index),
                PortDirection::Output => Port::output(index),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Port> {
        self.ports.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Port> {
        self.ports.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    /// Number of ports currently holding a connection.
    pub fn connected_count(&self) -> usize {
        self.ports.iter().filter(|p| p.is_connected()).count()
    }
}
