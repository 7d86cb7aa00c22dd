//! Scripted bridge and recording clock for engine tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use bridge_proto::{Command, Progress, Request};

use crate::clock::Clock;
use crate::error::TransportError;
use crate::transport::ControlTransport;

/// Everything the engine did, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trace {
    Out(Request, Vec<u8>),
    In(Request),
    Sleep(Duration),
}

pub type TraceLog = Rc<RefCell<Vec<Trace>>>;

/// Simulated bridge.
///
/// Each accepted write leaves the device busy for `busy_polls` progress
/// queries. Read responses are served from `reads`, then empty.
pub struct MockBridge {
    pub log: TraceLog,
    pub busy_polls: u32,
    pub never_idle: bool,
    pub accept_limit: Option<usize>,
    pub fail_on: Option<Command>,
    pub reads: VecDeque<Vec<u8>>,
    busy_remaining: u32,
}

impl MockBridge {
    pub fn new(log: TraceLog) -> Self {
        Self {
            log,
            busy_polls: 0,
            never_idle: false,
            accept_limit: None,
            fail_on: None,
            reads: VecDeque::new(),
            busy_remaining: 0,
        }
    }

    pub fn with_reads<I, B>(mut self, responses: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        self.reads = responses.into_iter().map(|r| r.as_ref().to_vec()).collect();
        self
    }

    fn check_failure(&self, request: Request) -> Result<(), TransportError> {
        if self.fail_on == Some(request.command()) {
            Err(TransportError::Disconnected)
        } else {
            Ok(())
        }
    }
}

impl ControlTransport for MockBridge {
    fn control_out(&mut self, request: Request, data: &[u8]) -> Result<usize, TransportError> {
        self.log.borrow_mut().push(Trace::Out(request, data.to_vec()));
        self.check_failure(request)?;
        if request == Request::WriteUart {
            self.busy_remaining = self.busy_polls;
        }
        Ok(self.accept_limit.map_or(data.len(), |limit| data.len().min(limit)))
    }

    fn control_in(&mut self, request: Request, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.log.borrow_mut().push(Trace::In(request));
        self.check_failure(request)?;
        match request {
            Request::GetProgress => {
                let busy = self.never_idle || self.busy_remaining > 0;
                self.busy_remaining = self.busy_remaining.saturating_sub(1);
                let progress = if busy { Progress::Busy } else { Progress::Idle };
                buf[0] = progress.to_byte();
                Ok(1)
            }
            Request::ReadUart => {
                let response = self.reads.pop_front().unwrap_or_default();
                let n = response.len().min(buf.len());
                buf[..n].copy_from_slice(&response[..n]);
                Ok(n)
            }
            other => panic!("unexpected IN request {other:?}"),
        }
    }
}

/// Records sleeps into the shared trace instead of sleeping.
pub struct RecordingClock {
    pub log: TraceLog,
}

impl Clock for RecordingClock {
    fn sleep(&mut self, duration: Duration) {
        self.log.borrow_mut().push(Trace::Sleep(duration));
    }
}

pub fn new_log() -> TraceLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Total time slept so far.
pub fn slept(log: &TraceLog) -> Duration {
    log.borrow()
        .iter()
        .filter_map(|t| match t {
            Trace::Sleep(d) => Some(*d),
            _ => None,
        })
        .sum()
}

/// Number of USB transfers so far.
pub fn transfers(log: &TraceLog) -> usize {
    log.borrow()
        .iter()
        .filter(|t| !matches!(t, Trace::Sleep(_)))
        .count()
}

/// Payloads of every `WriteUart`, in order.
pub fn written_chunks(log: &TraceLog) -> Vec<Vec<u8>> {
    log.borrow()
        .iter()
        .filter_map(|t| match t {
            Trace::Out(Request::WriteUart, data) => Some(data.clone()),
            _ => None,
        })
        .collect()
}
