//! Violation delivery.
//!
//! The emitter turns analyzer decisions into records, hands each record to
//! every registered sink, and keeps a bounded history for statistics and
//! acknowledgement. It makes no deduplication decisions.

use anyhow::{anyhow, Context, Result};
use rand::RngCore;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::io::Write;

use crate::violation::{Severity, Violation, ViolationDecision, ViolationType};

const SESSION_TAG_BYTES: usize = 4;

/// Consumer of emitted violations (transport, persistence, UI feed).
pub trait ViolationSink {
    fn deliver(&mut self, violation: &Violation) -> Result<()>;
}

impl<F> ViolationSink for F
where
    F: FnMut(&Violation) -> Result<()>,
{
    fn deliver(&mut self, violation: &Violation) -> Result<()> {
        self(violation)
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ViolationSink for JsonLinesSink<W> {
    fn deliver(&mut self, violation: &Violation) -> Result<()> {
        let line = serde_json::to_string(violation).context("serialize violation")?;
        writeln!(self.writer, "{}", line).context("write violation")?;
        self.writer.flush().context("flush violation sink")?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationStats {
    pub total: usize,
    pub unresolved: usize,
    pub by_type: BTreeMap<ViolationType, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
}

pub struct ViolationEmitter {
    session_tag: String,
    next_seq: u64,
    sinks: Vec<Box<dyn ViolationSink>>,
    history: VecDeque<Violation>,
    history_capacity: usize,
}

impl ViolationEmitter {
    pub fn new(history_capacity: usize) -> Self {
        let mut tag = [0u8; SESSION_TAG_BYTES];
        rand::thread_rng().fill_bytes(&mut tag);
        Self {
            session_tag: hex::encode(tag),
            next_seq: 1,
            sinks: Vec::new(),
            history: VecDeque::with_capacity(history_capacity.min(1024)),
            history_capacity: history_capacity.max(1),
        }
    }

    pub fn session_tag(&self) -> &str {
        &self.session_tag
    }

    pub fn add_sink<S>(&mut self, sink: S)
    where
        S: ViolationSink + 'static,
    {
        self.sinks.push(Box::new(sink));
    }

    /// Package `decision` as a record and deliver it. A failing sink is
    /// logged and does not block the others.
    pub fn emit(&mut self, decision: ViolationDecision) -> Violation {
        let id = format!("vio-{}-{}", self.session_tag, self.next_seq);
        self.next_seq += 1;
        let violation = Violation::from_decision(id, decision);

        log::info!(
            "violation {} {} ({}) in {} at ({:.1}, {:.1}) confidence {:.2}",
            violation.id,
            violation.violation_type,
            violation.severity.as_str(),
            violation.zone_id,
            violation.position.x,
            violation.position.y,
            violation.confidence
        );

        for (index, sink) in self.sinks.iter_mut().enumerate() {
            if let Err(err) = sink.deliver(&violation) {
                log::warn!("sink #{} failed to take {}: {:#}", index, violation.id, err);
            }
        }

        while self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(violation.clone());
        violation
    }

    /// Retained records, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Violation> {
        self.history.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Violation> {
        self.history.iter().find(|v| v.id == id)
    }

    /// Resolve a retained record. Returns `Ok(false)` if it was already
    /// acknowledged.
    pub fn acknowledge(&mut self, id: &str, by: &str, at: f64) -> Result<bool> {
        let violation = self
            .history
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| anyhow!("unknown violation id {}", id))?;
        let changed = violation.acknowledge(by, at);
        if changed {
            log::info!("violation {} acknowledged by {}", id, by);
        }
        Ok(changed)
    }

    pub fn stats(&self) -> ViolationStats {
        let mut stats = ViolationStats::default();
        for v in &self.history {
            stats.total += 1;
            if !v.resolved {
                stats.unresolved += 1;
            }
            *stats.by_type.entry(v.violation_type).or_default() += 1;
            *stats.by_severity.entry(v.severity).or_default() += 1;
        }
        stats
    }
}
