use std::collections::VecDeque;

/// One queued slot. `None` marks a message boundary under length-prefixed framing.
pub type Slot = Option<String>;

/// Ordered buffer of tokens awaiting decode.
///
/// Reads advance a cursor instead of removing slots, so a partially decoded
/// message can be rewound with [`TokenQueue::rollback`] or dropped for good with
/// [`TokenQueue::commit`].
#[derive(Debug, Default)]
pub struct TokenQueue {
    slots: VecDeque<Slot>,
    cursor: usize,
}

impl TokenQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one framed message, wrapped in start/end boundary markers.
    pub fn push_message<I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.slots.push_back(None);
        self.slots.extend(tokens.into_iter().map(Some));
        self.slots.push_back(None);
    }

    /// Append raw tokens with no boundary markers (legacy framing).
    pub fn push_tokens<I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.slots.extend(tokens.into_iter().map(Some));
    }

    /// Number of slots not yet read.
    pub fn len(&self) -> usize {
        self.slots.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the next slot is a boundary marker.
    pub fn at_boundary(&self) -> bool {
        matches!(self.slots.get(self.cursor), Some(None))
    }

    /// Pop the next slot. The outer `None` means the queue is exhausted.
    pub fn shift(&mut self) -> Option<Option<&str>> {
        let slot = self.slots.get(self.cursor)?;
        self.cursor += 1;
        Some(slot.as_deref())
    }

    /// Tokens left before the next boundary marker, without consuming them.
    pub fn peek_until_boundary(&self) -> Vec<&str> {
        self.slots
            .iter()
            .skip(self.cursor)
            .map_while(|slot| slot.as_deref())
            .collect()
    }

    /// Skip every token up to and including the next boundary marker.
    pub fn skip_past_boundary(&mut self) {
        while let Some(slot) = self.slots.get(self.cursor) {
            self.cursor += 1;
            if slot.is_none() {
                break;
            }
        }
    }

    /// Forget everything read so far.
    pub fn commit(&mut self) {
        self.slots.drain(..self.cursor);
        self.cursor = 0;
    }

    /// Rewind to the last commit point.
    pub fn rollback(&mut self) {
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_push_message_wraps_in_markers() {
        let mut q = TokenQueue::new();
        q.push_message(tokens(&["9", "1", "7"]));
        assert_eq!(q.len(), 5);
        assert!(q.at_boundary());
        assert_eq!(q.shift(), Some(None));
        assert_eq!(q.shift(), Some(Some("9")));
        assert_eq!(q.peek_until_boundary(), vec!["1", "7"]);
    }

    #[test]
    fn test_shift_on_empty_queue() {
        let mut q = TokenQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.shift(), None);
    }

    #[test]
    fn test_rollback_restores_consumed_tokens() {
        let mut q = TokenQueue::new();
        q.push_tokens(tokens(&["1", "2", "3"]));
        q.shift();
        q.shift();
        assert_eq!(q.len(), 1);
        q.rollback();
        assert_eq!(q.len(), 3);
        assert_eq!(q.shift(), Some(Some("1")));
    }

    #[test]
    fn test_commit_drops_consumed_tokens() {
        let mut q = TokenQueue::new();
        q.push_tokens(tokens(&["1", "2", "3"]));
        q.shift();
        q.commit();
        q.rollback();
        assert_eq!(q.len(), 2);
        assert_eq!(q.shift(), Some(Some("2")));
    }

    #[test]
    fn test_skip_past_boundary_stops_after_end_marker() {
        let mut q = TokenQueue::new();
        q.push_message(tokens(&["4", "2"]));
        q.push_message(tokens(&["9"]));
        q.shift(); // start marker
        q.shift(); // "4"
        q.skip_past_boundary();
        assert!(q.at_boundary());
        q.shift();
        assert_eq!(q.shift(), Some(Some("9")));
    }

    #[test]
    fn test_skip_past_boundary_without_markers_drains_everything() {
        let mut q = TokenQueue::new();
        q.push_tokens(tokens(&["1", "2"]));
        q.skip_past_boundary();
        assert!(q.is_empty());
    }
}
