use std::sync::Arc;

use parking_lot::RwLock;

use crate::field::Field;

/// Notifications a field publishes about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldEvent {
    ValueChanged,
    HiddenChanged,
    OptionalChanged,
    Validated,
    Saved,
}

impl FieldEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldEvent::ValueChanged => "valueChanged",
            FieldEvent::HiddenChanged => "hiddenChanged",
            FieldEvent::OptionalChanged => "optionalChanged",
            FieldEvent::Validated => "validated",
            FieldEvent::Saved => "saved",
        }
    }
}

pub type Subscriber = Arc<dyn Fn(&Field, FieldEvent) + Send + Sync>;

/// Per-field subscriber list keyed by event.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<(FieldEvent, Subscriber)>>,
}

impl EventBus {
    pub fn subscribe(&self, event: FieldEvent, subscriber: Subscriber) {
        self.subscribers.write().push((event, subscriber));
    }

    /// Calls every subscriber of `event`. Subscribers may subscribe further
    /// callbacks; those only see later events.
    pub fn publish(&self, field: &Field, event: FieldEvent) {
        let matching: Vec<Subscriber> = self
            .subscribers
            .read()
            .iter()
            .filter(|(registered, _)| *registered == event)
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        for subscriber in matching {
            subscriber(field, event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}
