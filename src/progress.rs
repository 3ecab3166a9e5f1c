use log::debug;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A `(fraction, status)` notification for whoever renders progress
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Overall completion in [0, 1]
    pub fraction: f64,
    pub status: String,
}

/// Sending side of the progress channel
///
/// A reporter can be narrowed to a sub-range with [`Progress::scoped`] so that
/// each folder reports its own 0..1 completion while the receiver sees one
/// monotonic value for the whole run.
#[derive(Debug, Clone)]
pub struct Progress {
    sender: Option<UnboundedSender<ProgressUpdate>>,
    start: f64,
    span: f64,
}

impl Progress {
    pub fn channel() -> (Self, UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Progress {
                sender: Some(tx),
                start: 0.0,
                span: 1.0,
            },
            rx,
        )
    }

    /// Reporter that drops every update
    pub fn disabled() -> Self {
        Progress {
            sender: None,
            start: 0.0,
            span: 1.0,
        }
    }

    /// Reporter for the sub-range `[start, start + span]` of this one,
    /// both expressed as fractions of this reporter's range
    pub fn scoped(&self, start: f64, span: f64) -> Self {
        Progress {
            sender: self.sender.clone(),
            start: self.start + start.clamp(0.0, 1.0) * self.span,
            span: span.clamp(0.0, 1.0) * self.span,
        }
    }

    /// Report local completion `fraction` of this reporter's range
    pub fn report(&self, fraction: f64, status: impl Into<String>) {
        let Some(sender) = &self.sender else {
            return;
        };
        let overall = (self.start + fraction.clamp(0.0, 1.0) * self.span).clamp(0.0, 1.0);
        let update = ProgressUpdate {
            fraction: overall,
            status: status.into(),
        };
        if sender.send(update).is_err() {
            debug!("Récepteur de progression fermé, mise à jour ignorée");
        }
    }
}
