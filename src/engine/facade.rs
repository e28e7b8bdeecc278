use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::tws::{Event, EventName};

/// Where a published event is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// The event's own name, e.g. `tickPrice`.
    Event(EventName),
    /// Every decoded result, excluding lifecycle, error and raw I/O events.
    Result,
    /// Everything.
    All,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Event(name) => write!(f, "{name}"),
            Channel::Result => f.write_str("result"),
            Channel::All => f.write_str("all"),
        }
    }
}

/// Receiver of everything the controller emits.
pub trait EventSink: Send {
    fn publish(&mut self, channel: Channel, event: &Event);
}

type Handler = Box<dyn FnMut(&Event) + Send>;

/// Observer registry keyed by channel.
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<Channel, Vec<Handler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, channel: Channel, handler: impl FnMut(&Event) + Send + 'static) {
        self.handlers.entry(channel).or_default().push(Box::new(handler));
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.handlers.get(&channel).map_or(0, Vec::len)
    }
}

impl EventSink for EventBus {
    fn publish(&mut self, channel: Channel, event: &Event) {
        if let Some(handlers) = self.handlers.get_mut(&channel) {
            for handler in handlers {
                handler(event);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub channel: Channel,
    pub event: Event,
}

/// Sink that keeps every publication. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<Published>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Published>> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn published(&self) -> Vec<Published> {
        self.lock().clone()
    }

    /// Events delivered on one channel, in order.
    pub fn on(&self, channel: Channel) -> Vec<Event> {
        self.lock()
            .iter()
            .filter(|p| p.channel == channel)
            .map(|p| p.event.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl EventSink for Recorder {
    fn publish(&mut self, channel: Channel, event: &Event) {
        self.lock().push(Published {
            channel,
            event: event.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_routes_by_channel() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        let s = Arc::clone(&seen);
        bus.subscribe(Channel::Event(EventName::Connected), move |e| {
            s.lock().unwrap().push(e.clone());
        });
        assert_eq!(bus.subscriber_count(Channel::Event(EventName::Connected)), 1);
        assert_eq!(bus.subscriber_count(Channel::All), 0);

        bus.publish(Channel::All, &Event::Connected);
        bus.publish(Channel::Event(EventName::Connected), &Event::Connected);
        assert_eq!(*seen.lock().unwrap(), vec![Event::Connected]);
    }

    #[test]
    fn test_recorder_clones_share_log() {
        let recorder = Recorder::new();
        let mut sink = recorder.clone();
        sink.publish(Channel::All, &Event::Disconnected);
        assert_eq!(recorder.on(Channel::All), vec![Event::Disconnected]);
        assert!(recorder.on(Channel::Result).is_empty());
        recorder.clear();
        assert!(recorder.published().is_empty());
    }

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::Event(EventName::TickPrice).to_string(), "tickPrice");
        assert_eq!(Channel::Result.to_string(), "result");
        assert_eq!(Channel::All.to_string(), "all");
    }
}
