//! Timed external commands injected into a simulation run.

use super::event::{Event, EventKind, Payload};
use super::time::SimTime;

/// An ordered list of control events aimed at one model.
///
/// Plays the role of the user or controller pressing buttons on a device.
/// Commands are kept in [`Event::compare`] order, so co-timed commands are
/// already sorted by priority when the scheduler injects them.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandScript<K: EventKind> {
    commands: Vec<Event<K>>,
}

impl<K: EventKind> Default for CommandScript<K> {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
        }
    }
}

impl<K: EventKind> CommandScript<K> {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command without payload.
    pub fn push(&mut self, at: SimTime, kind: K) -> &mut Self {
        self.insert(Event::new(at, kind))
    }

    /// Adds a command carrying `payload`.
    pub fn push_with_payload(&mut self, at: SimTime, kind: K, payload: Payload) -> &mut Self {
        self.insert(Event::with_payload(at, kind, payload))
    }

    fn insert(&mut self, event: Event<K>) -> &mut Self {
        let pos = self
            .commands
            .partition_point(|queued| queued.compare(&event).is_le());
        self.commands.insert(pos, event);
        self
    }

    /// Commands in application order.
    pub fn commands(&self) -> &[Event<K>] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Timestamp of the last command, if any.
    pub fn last_time(&self) -> Option<SimTime> {
        self.commands.last().map(Event::timestamp)
    }

    /// Consumes the script, yielding commands in application order.
    pub fn into_events(self) -> Vec<Event<K>> {
        self.commands
    }
}

impl<K: EventKind> FromIterator<(SimTime, K)> for CommandScript<K> {
    fn from_iter<I: IntoIterator<Item = (SimTime, K)>>(iter: I) -> Self {
        let mut script = Self::new();
        for (at, kind) in iter {
            script.push(at, kind);
        }
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::heater::HeaterEvent;

    #[test]
    fn keeps_time_order() {
        let script: CommandScript<HeaterEvent> = [
            (SimTime::from_secs(9), HeaterEvent::SwitchOff),
            (SimTime::from_secs(1), HeaterEvent::SwitchOn),
        ]
        .into_iter()
        .collect();
        let kinds: Vec<_> = script.commands().iter().map(Event::kind).collect();
        assert_eq!(kinds, vec![HeaterEvent::SwitchOn, HeaterEvent::SwitchOff]);
        assert_eq!(script.last_time(), Some(SimTime::from_secs(9)));
    }

    #[test]
    fn co_timed_commands_sorted_by_priority() {
        let mut script = CommandScript::new();
        script
            .push(SimTime::from_secs(5), HeaterEvent::SwitchOff)
            .push(SimTime::from_secs(5), HeaterEvent::BeginHeat);
        let kinds: Vec<_> = script.commands().iter().map(Event::kind).collect();
        assert_eq!(kinds, vec![HeaterEvent::BeginHeat, HeaterEvent::SwitchOff]);
    }

    #[test]
    fn empty_script() {
        let script = CommandScript::<HeaterEvent>::new();
        assert!(script.is_empty());
        assert_eq!(script.len(), 0);
        assert_eq!(script.last_time(), None);
    }
}
