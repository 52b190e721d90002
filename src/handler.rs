//! Routes incoming responses to the collector that was queued for the
//! request that produced them: a FIFO of in-flight collectors is matched
//! against replies read off the wire in send order.

use std::collections::VecDeque;

use crate::collector::Collector;
use crate::error::Error;
use crate::message::Response;

/// What happened as a result of handling one [`Response`].
pub enum Outcome {
    /// A `RECORD` was routed to the head collector; it stays at the head.
    RecordRouted,
    /// The head collector reached a terminal callback and was popped.
    Terminal {
        collector: Box<dyn Collector>,
        failure: Option<Error>,
    },
}

#[derive(Default)]
pub struct ResponseHandler {
    queue: VecDeque<Box<dyn Collector>>,
}

impl ResponseHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the collector for the next response that will arrive, in
    /// send order.
    pub fn queue(&mut self, collector: Box<dyn Collector>) {
        self.queue.push_back(collector);
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Dispatches one decoded [`Response`] to the head of the FIFO.
    pub fn handle(&mut self, response: Response) -> crate::error::Result<Outcome> {
        match response {
            Response::Record(fields) => {
                let collector = self
                    .queue
                    .front_mut()
                    .ok_or_else(|| Error::from_debug("RECORD arrived with no pending collector"))?;
                collector.on_record(&fields);
                Ok(Outcome::RecordRouted)
            }
            Response::Success(metadata) => {
                let mut collector = self.pop()?;
                collector.on_success(&metadata);
                collector.on_complete();
                Ok(Outcome::Terminal {
                    collector,
                    failure: None,
                })
            }
            Response::Ignored => {
                let mut collector = self.pop()?;
                collector.on_ignored();
                collector.on_complete();
                Ok(Outcome::Terminal {
                    collector,
                    failure: None,
                })
            }
            Response::Failure { code, message } => {
                let mut collector = self.pop()?;
                collector.on_failure(&code, &message);
                collector.on_complete();
                let failure = Error::ServerFailure { code, message };
                Ok(Outcome::Terminal {
                    collector,
                    failure: Some(failure),
                })
            }
        }
    }

    fn pop(&mut self) -> crate::error::Result<Box<dyn Collector>> {
        self.queue
            .pop_front()
            .ok_or_else(|| Error::from_debug("terminal response arrived with no pending collector"))
    }
}
