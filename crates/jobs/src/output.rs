// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The [`hvfleet_transport::AgentOutputSink`] implementation the job
//! service attaches to each envelope round-trip.
//!
//! [`RemoteAgent::invoke`](hvfleet_transport::RemoteAgent::invoke) runs
//! synchronously on a scheduler worker thread and calls `on_stdout`/
//! `on_stderr` inline as the agent emits bytes. [`JobOutputSink`] only
//! forwards those raw chunks through an unbounded channel — decoding
//! (CLIXML unwrapping, line splitting) and the job-output append/broadcast
//! happen on the async side, in [`crate::service::JobService`]'s output
//! pump task, which is the only place allowed to touch `job.output`.

use hvfleet_transport::AgentOutputSink;
use tokio::sync::mpsc::UnboundedSender;

pub struct OutputChunk {
    pub bytes: Vec<u8>,
    pub is_stderr: bool,
}

pub struct JobOutputSink {
    tx: UnboundedSender<OutputChunk>,
}

impl JobOutputSink {
    pub fn new(tx: UnboundedSender<OutputChunk>) -> Self {
        Self { tx }
    }
}

impl AgentOutputSink for JobOutputSink {
    fn on_stdout(&self, chunk: &[u8]) {
        // An unbounded sender only errs once the receiver (the output pump
        // task) has dropped, which only happens after the round-trip this
        // sink belongs to has already finished — a late chunk is simply
        // discarded rather than propagated as an error the agent call has
        // no way to act on.
        let _ = self.tx.send(OutputChunk { bytes: chunk.to_vec(), is_stderr: false });
    }

    fn on_stderr(&self, chunk: &[u8]) {
        let _ = self.tx.send(OutputChunk { bytes: chunk.to_vec(), is_stderr: true });
    }
}
