//! Downstream notification seam.
//!
//! The service emits events at window transitions and grade posts; what
//! happens next (push, email, chat bots) is someone else's problem. The
//! dispatcher never feeds back into grading.

use crate::models::{Outcome, PickId, WeekId};

#[derive(Debug, Clone, PartialEq)]
pub enum PickemEvent {
    WeekOpened(WeekId),
    WeekLocked(WeekId),
    GradePosted { pick: PickId, outcome: Outcome },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: &PickemEvent);
}

/// Swallows everything. The default wiring.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &PickemEvent) {}
}

/// Writes events to the log, one info line each.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &PickemEvent) {
        match event {
            PickemEvent::WeekOpened(week) => tracing::info!("week {} opened for picks", week),
            PickemEvent::WeekLocked(week) => tracing::info!("week {} locked", week),
            PickemEvent::GradePosted { pick, outcome } => {
                tracing::info!("pick {} graded: {}", pick, outcome)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    /// Test double that records every event in order.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub events: Mutex<Vec<PickemEvent>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, event: &PickemEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    impl RecordingNotifier {
        pub fn take(&self) -> Vec<PickemEvent> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }
}
