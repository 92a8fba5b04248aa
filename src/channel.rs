//! Bounded producer/consumer channel between an import worker and its consumer
//!
//! The producer blocks when the queue is full. The consumer polls without blocking and
//! gets one of three answers: an item, nothing yet, or the end of the stream. The end is
//! only reported once the producer is gone (finished, failed or panicked) and every queued
//! record has been taken.

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};

use crate::records::Record;

/// Default number of records buffered between the worker and the consumer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Result of a non-blocking poll
#[derive(Debug, PartialEq)]
pub enum Poll {
    /// The producer is still running, but no record is available yet
    Pending,
    Item(Record),
    /// The producer has exited and the queue is drained
    Done,
}

/// The receiving side is gone
#[derive(Debug, PartialEq, Eq)]
pub struct Disconnected;

/// Destination of the records produced by an import
pub trait RecordSink {
    /// Push a record, waiting for room if needed
    fn push(&mut self, record: Record) -> Result<(), Disconnected>;
}

impl RecordSink for Vec<Record> {
    fn push(&mut self, record: Record) -> Result<(), Disconnected> {
        Vec::push(self, record);
        Ok(())
    }
}

/// Producer side of the channel
#[derive(Clone, Debug)]
pub struct RecordSender {
    tx: SyncSender<Record>,
}

impl RecordSender {
    /// Send a record, blocking while the channel is full
    pub fn send(&self, record: Record) -> Result<(), Disconnected> {
        self.tx.send(record).map_err(|_| Disconnected)
    }
}

impl RecordSink for RecordSender {
    fn push(&mut self, record: Record) -> Result<(), Disconnected> {
        self.send(record)
    }
}

/// Consumer side of the channel
#[derive(Debug)]
pub struct RecordReceiver {
    rx: Receiver<Record>,
}

impl RecordReceiver {
    pub fn poll(&self) -> Poll {
        match self.rx.try_recv() {
            Ok(record) => Poll::Item(record),
            Err(TryRecvError::Empty) => Poll::Pending,
            Err(TryRecvError::Disconnected) => Poll::Done,
        }
    }

    /// Wait for the next record. Returns `None` once the stream is finished.
    pub fn recv(&self) -> Option<Record> {
        self.rx.recv().ok()
    }
}

/// Create a bounded channel holding at most `capacity` records
///
/// A capacity of 0 is raised to 1: the producer always hands records over through the queue.
pub fn bounded(capacity: usize) -> (RecordSender, RecordReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    (RecordSender { tx }, RecordReceiver { rx })
}
