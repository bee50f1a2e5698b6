// Action Queue - Pending transport commands, drained once per period

use std::collections::VecDeque;

/// Transport command queued by the control thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Stop,
    PlaySong,
    PlayTrack,
    PlayBB,
    PlayPattern,
    Pause,
    ResumeFromPause,
}

impl Action {
    /// True for the actions that start playback in some mode
    pub fn starts_playback(&self) -> bool {
        matches!(
            self,
            Action::PlaySong | Action::PlayTrack | Action::PlayBB | Action::PlayPattern
        )
    }
}

/// FIFO of pending actions
///
/// Capacity is reserved up front so that enqueueing under the transport
/// lock does not allocate in the common case.
#[derive(Debug, Clone)]
pub struct ActionQueue {
    actions: VecDeque<Action>,
}

impl ActionQueue {
    pub const DEFAULT_CAPACITY: usize = 32;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            actions: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an action at the tail
    pub fn enqueue(&mut self, action: Action) {
        self.actions.push_back(action);
    }

    /// Remove the oldest action
    pub fn pop(&mut self) -> Option<Action> {
        self.actions.pop_front()
    }

    pub fn peek(&self) -> Option<&Action> {
        self.actions.front()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = ActionQueue::new();
        queue.enqueue(Action::Stop);
        queue.enqueue(Action::PlaySong);
        queue.enqueue(Action::Pause);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek(), Some(&Action::Stop));
        assert_eq!(queue.pop(), Some(Action::Stop));
        assert_eq!(queue.pop(), Some(Action::PlaySong));
        assert_eq!(queue.pop(), Some(Action::Pause));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_starts_playback() {
        assert!(Action::PlaySong.starts_playback());
        assert!(Action::PlayPattern.starts_playback());
        assert!(!Action::Stop.starts_playback());
        assert!(!Action::ResumeFromPause.starts_playback());
    }

    #[test]
    fn test_clear() {
        let mut queue = ActionQueue::with_capacity(4);
        queue.enqueue(Action::PlayBB);
        queue.clear();
        assert!(queue.is_empty());
    }
}
