/// Generational handle to a node in a [`crate::Scene`].
///
/// A handle outlives its node: once the node is freed the slot's generation moves on, and the
/// stale handle is rejected instead of aliasing whatever reuses the slot.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl From<(u32, u32)> for NodeId {
    fn from((index, generation): (u32, u32)) -> Self {
        Self { index, generation }
    }
}

impl From<NodeId> for (u32, u32) {
    fn from(id: NodeId) -> Self {
        (id.index, id.generation)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index)?;
        if self.generation != 0 {
            write!(f, "v{}", self.generation)?;
        }
        Ok(())
    }
}
