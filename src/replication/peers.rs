use std::fmt;

/// NodeId is stable across restarts. It is the identity votes and acknowledgements are tallied
/// under.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeId(u16);

impl NodeId {
    pub fn new(id: u16) -> Self {
        NodeId(id)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    pub(crate) fn as_u32(&self) -> u32 {
        self.0 as u32
    }

    /// None if `id` is out of range, e.g. from a malformed message.
    pub(crate) fn from_u32(id: u32) -> Option<Self> {
        if id <= u16::MAX as u32 {
            Some(NodeId(id as u16))
        } else {
            None
        }
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
