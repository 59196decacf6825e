//! Downstream client lifecycle states.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownstreamState {
    Starting,
    Initializing,
    Ready,
    Closing,
    Dead,
}

impl DownstreamState {
    pub fn accepts_requests(self) -> bool {
        matches!(self, DownstreamState::Ready)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DownstreamState::Closing | DownstreamState::Dead)
    }
}
