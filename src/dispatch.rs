//! Best-effort broadcast of one event over a snapshot of subscribers.

use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;

use log::debug;
use log::error;

use crate::error::BlackboardError;
use crate::error::HandlerPanic;
use crate::event::Event;
use crate::registration::Registration;
use crate::registry::Subscriber;

/// Receives handler failures. Dispatch never stops because of them.
#[cfg_attr(test, mockall::automock)]
pub trait ErrorSink: Send + Sync {
    /// Called with a [`BlackboardError::HandlerInvocationFailed`].
    fn report(&self, failure: &BlackboardError);
}

/// Default sink, logging each failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, failure: &BlackboardError) {
        error!("{failure}");
    }
}

/// Outcome of one `fire`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that returned successfully.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
    /// Snapshot entries whose listener had already been dropped.
    pub unreachable: usize,
}

pub(crate) fn dispatch(
    registration: &Registration,
    subscribers: &[Subscriber],
    event: &dyn Event,
    sink: &dyn ErrorSink,
    verbose: bool,
) -> DispatchReport {
    let capability = registration.capability();
    let handler = registration.handler();
    let mut report = DispatchReport::default();

    for subscriber in subscribers {
        let Some(view) = subscriber.upgrade(capability) else {
            report.unreachable += 1;
            continue;
        };
        if verbose {
            debug!("  triggering {} on listener {}", handler.method_name(), subscriber.id());
        }

        let source: Box<dyn std::error::Error + Send + Sync> =
            match panic::catch_unwind(AssertUnwindSafe(|| handler.invoke(&view, event))) {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(e)) => e.into(),
                Err(payload) => Box::new(HandlerPanic {
                    message: panic_message(payload.as_ref()),
                }),
            };

        report.failed += 1;
        sink.report(&BlackboardError::HandlerInvocationFailed {
            capability: capability.key(),
            method: handler.method_name(),
            event: event.event_name(),
            listener: subscriber.id(),
            source,
        });
    }
    report
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
