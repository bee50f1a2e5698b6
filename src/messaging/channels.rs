// Lock-free event channel

use crate::messaging::event::TransportEvent;
use ringbuf::{HeapRb, traits::Split};

pub type EventProducer = ringbuf::HeapProd<TransportEvent>;
pub type EventConsumer = ringbuf::HeapCons<TransportEvent>;

pub fn create_event_channel(capacity: usize) -> (EventProducer, EventConsumer) {
    let rb = HeapRb::<TransportEvent>::new(capacity.max(1));
    rb.split()
}

/// Push without blocking; the event is dropped when the consumer lags behind
pub fn emit(tx: &mut EventProducer, event: TransportEvent) -> bool {
    ringbuf::traits::Producer::try_push(tx, event).is_ok()
}

/// Collect every pending event
pub fn drain(rx: &mut EventConsumer) -> Vec<TransportEvent> {
    let mut events = Vec::new();
    while let Some(event) = ringbuf::traits::Consumer::try_pop(rx) {
        events.push(event);
    }
    events
}
