//! Event journal: the receiving end of the tail pipeline
//!
//! Owns the redundancy window (last accepted hit) and the event counters,
//! runs every parsed hit through the [`Classifier`], and forwards accepted
//! hits to an external [`EventSink`] such as a display or an export buffer.

use log::debug;

use crate::classify::{Classifier, Verdict};
use crate::models::{ClassifiedHit, Direction, EventCounters, Hit};

/// Consumer of accepted hits (display, recorder, exporter)
pub trait EventSink: Send {
    /// Receive an accepted hit; return whether it was taken
    fn on_event(&mut self, hit: &ClassifiedHit) -> bool;

    /// A one-shot reload read the whole log
    fn on_reload_complete(&mut self) {}

    /// The journal was cleared ahead of a reload
    fn on_clear(&mut self) {}
}

/// Sink that keeps every hit in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub hits: Vec<ClassifiedHit>,
    pub reloads_completed: usize,
}

impl EventSink for MemorySink {
    fn on_event(&mut self, hit: &ClassifiedHit) -> bool {
        self.hits.push(hit.clone());
        true
    }

    fn on_reload_complete(&mut self) {
        self.reloads_completed += 1;
    }

    fn on_clear(&mut self) {
        self.hits.clear();
    }
}

/// Redundancy window, counters and sink behind one classifier
#[derive(Debug)]
pub struct HitJournal<S> {
    classifier: Classifier,
    sink: S,
    last_hit: Option<Hit>,
    counters: EventCounters,
}

impl<S: EventSink> HitJournal<S> {
    pub fn new(classifier: Classifier, sink: S) -> Self {
        Self {
            classifier,
            sink,
            last_hit: None,
            counters: EventCounters::default(),
        }
    }

    /// Classify a hit and, if accepted, count it, remember it and hand it
    /// to the sink. Returns the sink's answer, `false` when suppressed.
    pub fn append(&mut self, hit: Hit) -> bool {
        let classified = match self.classifier.classify(hit, self.last_hit.as_ref()) {
            Verdict::Accept(classified) => classified,
            verdict => {
                debug!("Hit filtered: {:?}", verdict);
                return false;
            }
        };

        self.count(&classified);
        self.last_hit = Some(classified.hit.clone());
        self.sink.on_event(&classified)
    }

    fn count(&mut self, classified: &ClassifiedHit) {
        let outbound = classified.kind == Direction::Outbound;

        // Broadcast coloring takes precedence over the serious tag
        if classified.serious && !classified.broadcast {
            if outbound {
                self.counters.serious_outbound += 1;
            } else {
                self.counters.serious_inbound += 1;
            }
        }

        match classified.kind {
            Direction::Inbound => self.counters.inbound += 1,
            Direction::Outbound => self.counters.outbound += 1,
            Direction::Unknown => {}
        }
    }

    /// Forget the last hit and reset the counters
    pub fn clear(&mut self) {
        self.last_hit = None;
        self.counters = EventCounters::default();
        self.sink.on_clear();
    }

    pub fn reload_complete(&mut self) {
        self.sink.on_reload_complete();
    }

    pub fn last_hit(&self) -> Option<&Hit> {
        self.last_hit.as_ref()
    }

    pub fn counters(&self) -> EventCounters {
        self.counters
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FilterSettings;

    const FIREWALL: &str = "198.51.100.9";

    fn hit(direction: &str, destination: &str, port: &str) -> Hit {
        Hit {
            direction: direction.to_string(),
            source: "203.0.113.5".to_string(),
            destination: destination.to_string(),
            protocol: "TCP".to_string(),
            port: port.to_string(),
            ..Hit::default()
        }
    }

    fn journal(skip_redundant: bool) -> HitJournal<MemorySink> {
        let filters = FilterSettings {
            skip_redundant,
            skip_not_for_firewall: false,
        };
        HitJournal::new(
            Classifier::new(filters, Some(FIREWALL.to_string())),
            MemorySink::default(),
        )
    }

    #[test]
    fn test_redundant_hit_suppressed_once_window_set() {
        let mut journal = journal(true);

        assert!(journal.append(hit("Inbound", FIREWALL, "22")));
        // Same key fields, different direction: still a duplicate
        assert!(!journal.append(hit("Outbound", FIREWALL, "22")));
        assert_eq!(journal.sink().hits.len(), 1);
        assert_eq!(journal.last_hit().map(|h| h.direction.as_str()), Some("Inbound"));
    }

    #[test]
    fn test_window_updates_on_every_accept() {
        let mut journal = journal(true);

        assert!(journal.append(hit("Inbound", FIREWALL, "22")));
        assert!(journal.append(hit("Inbound", FIREWALL, "23")));
        assert!(journal.append(hit("Inbound", FIREWALL, "22")));
        assert_eq!(journal.sink().hits.len(), 3);
    }

    #[test]
    fn test_counters() {
        let mut journal = journal(false);

        journal.append(hit("Inbound", FIREWALL, "22"));
        journal.append(hit("Inbound", "192.0.2.1", "22"));
        journal.append(hit("Outbound", FIREWALL, "80"));
        journal.append(hit("Unknown-prefix", FIREWALL, "8080"));
        journal.append(hit("Inbound", "192.0.2.255", "137"));

        let counters = journal.counters();
        assert_eq!(counters.inbound, 3);
        assert_eq!(counters.outbound, 1);
        assert_eq!(counters.serious_inbound, 1);
        assert_eq!(counters.serious_outbound, 1);
        assert_eq!(journal.sink().hits.len(), 5);
    }

    #[test]
    fn test_clear_resets_window_and_counters() {
        let mut journal = journal(true);
        journal.append(hit("Inbound", FIREWALL, "22"));
        journal.clear();

        assert!(journal.last_hit().is_none());
        assert_eq!(journal.counters(), EventCounters::default());
        assert!(journal.sink().hits.is_empty());

        // The same hit is no longer redundant after a clear
        assert!(journal.append(hit("Inbound", FIREWALL, "22")));
    }

    #[test]
    fn test_sink_refusal_is_reported() {
        struct Refusing;
        impl EventSink for Refusing {
            fn on_event(&mut self, _hit: &ClassifiedHit) -> bool {
                false
            }
        }

        let mut journal = HitJournal::new(Classifier::default(), Refusing);
        assert!(!journal.append(hit("Inbound", FIREWALL, "22")));
        // Refused by the sink but still accepted by the classifier
        assert_eq!(journal.counters().inbound, 1);
        assert!(journal.last_hit().is_some());
    }
}
