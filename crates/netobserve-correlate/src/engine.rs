use crate::arena::{Arena, Handle};
use crate::record::RequestRecord;

const SOURCE_PORT_RANGE: usize = 1 << 16;
const TIME_WHEEL_SLOTS: i64 = 60_000;
const TIME_RANGE_MILLIS: i64 = 60_000;

/// A stable reference to a pending request, returned by [`CorrelationEngine::get_request`]
/// and consumed by [`CorrelationEngine::set_response`]. Opaque outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHandle(Handle);

/// Pairs captured requests with their responses.
///
/// Two indices sit over a shared [`Arena`] of [`RequestRecord`]s: a
/// by-source-port index (one list per possible TCP source port, for
/// `get_request`/`add_request` duplicate scans) and a time wheel (one list
/// per millisecond-mod-60000 slot, walked in insertion order to evict
/// records older than [`TIME_RANGE_MILLIS`] lazily, on the next insert that
/// lands in the same slot).
///
/// Mirrors `TrafficManager` (`allRequests[65536]`, `allPackets[60000]`);
/// the source's two intrusive pointer chains (`TrafficInfo.Next` and
/// `packetNode.Next`) become `port_next`/`wheel_next` fields on the same
/// arena slot, since every `packetNode` here wraps exactly one `TrafficInfo`.
pub struct CorrelationEngine {
    arena: Arena,
    by_source_port: Vec<Option<Handle>>,
    time_wheel: Vec<Option<Handle>>,
    refire_on_repair: bool,
}

impl Default for CorrelationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: Arena::default(),
            by_source_port: vec![None; SOURCE_PORT_RANGE],
            time_wheel: vec![None; TIME_WHEEL_SLOTS as usize],
            refire_on_repair: true,
        }
    }

    /// Controls whether [`Self::get_request`] may return an already-paired
    /// request as a last-resort match when no unpaired candidate exists.
    /// Defaults to `true`, matching the source's behavior; set to `false`
    /// to require a fresh, unpaired candidate (see Open Question in DESIGN.md).
    #[must_use]
    pub fn with_refire_on_repair(mut self, refire_on_repair: bool) -> Self {
        self.refire_on_repair = refire_on_repair;
        self
    }

    /// Index a captured request. Silently drops it if a record with the
    /// same source port already carries a byte-identical TCP request
    /// timestamp (retransmission/recapture), or if `record.src_port`
    /// exceeds the 16-bit port range (should not occur; the field is widened
    /// from the classifier's `u16` but kept as `u32` to carry this check).
    pub fn add_request(&mut self, record: RequestRecord) {
        if record.src_port > u32::from(u16::MAX) {
            tracing::error!(port = record.src_port, "source port outside 16-bit range");
            return;
        }
        let port = record.src_port as usize;
        if self.port_list_contains_timestamp(port, &record.tcp_request_timestamp) {
            tracing::debug!(port, "duplicate request, dropped");
            return;
        }

        let handle = self.arena.insert(record);
        self.prepend_port_list(port, handle);
        self.insert_time_wheel(handle);
    }

    fn port_list_contains_timestamp(&self, port: usize, tcp_request_timestamp: &[u8]) -> bool {
        let mut current = self.by_source_port[port];
        while let Some(handle) = current {
            let slot = self.arena.get(handle).expect("indexed handle is live");
            let record = slot.record.as_ref().unwrap();
            if record.tcp_request_timestamp == tcp_request_timestamp {
                return true;
            }
            current = slot.port_next;
        }
        false
    }

    fn prepend_port_list(&mut self, port: usize, handle: Handle) {
        let old_head = self.by_source_port[port];
        self.arena.get_mut(handle).unwrap().port_next = old_head;
        self.by_source_port[port] = Some(handle);
    }

    fn insert_time_wheel(&mut self, handle: Handle) {
        let timestamp = self.arena.timestamp_millis(handle).unwrap();
        let slot_index = timestamp.rem_euclid(TIME_WHEEL_SLOTS) as usize;

        let mut head = self.time_wheel[slot_index];
        while let Some(candidate) = head {
            let candidate_ts = self.arena.timestamp_millis(candidate).unwrap();
            if candidate_ts + TIME_RANGE_MILLIS > timestamp {
                break;
            }
            let next = self.arena.get(candidate).unwrap().wheel_next;
            self.unpair(candidate);
            self.arena.remove(candidate);
            head = next;
        }

        match head {
            Some(first) if self.arena.timestamp_millis(first).unwrap() <= timestamp => {
                self.time_wheel[slot_index] = Some(first);
                let mut cursor = first;
                loop {
                    let next = self.arena.get(cursor).unwrap().wheel_next;
                    match next {
                        Some(candidate) if self.arena.timestamp_millis(candidate).unwrap() <= timestamp => {
                            cursor = candidate;
                        }
                        _ => break,
                    }
                }
                let after = self.arena.get(cursor).unwrap().wheel_next;
                self.arena.get_mut(handle).unwrap().wheel_next = after;
                self.arena.get_mut(cursor).unwrap().wheel_next = Some(handle);
            }
            _ => {
                self.arena.get_mut(handle).unwrap().wheel_next = head;
                self.time_wheel[slot_index] = Some(handle);
            }
        }
    }

    /// Unlink `handle` from its by-source-port list. Does not touch the
    /// time wheel; callers walking the time wheel advance past the node
    /// themselves. Warns and does nothing if the node is already unlinked
    /// (double-eviction, should not happen but is tolerated per the source).
    fn unpair(&mut self, handle: Handle) {
        let Some(port) = self.arena.port_of(handle) else {
            return;
        };
        let port = port as usize;
        match self.by_source_port[port] {
            Some(head) if head == handle => {
                self.by_source_port[port] = self.arena.get(handle).unwrap().port_next;
            }
            Some(mut cursor) => loop {
                let next = self.arena.get(cursor).unwrap().port_next;
                match next {
                    Some(candidate) if candidate == handle => {
                        let after = self.arena.get(handle).unwrap().port_next;
                        self.arena.get_mut(cursor).unwrap().port_next = after;
                        break;
                    }
                    Some(candidate) => cursor = candidate,
                    None => {
                        tracing::warn!(port, "could not unpair request, already unlinked");
                        break;
                    }
                }
            },
            None => {
                tracing::warn!(port, "could not unpair request, already unlinked");
            }
        }
    }

    /// Find the request a captured response pairs with.
    ///
    /// `src_ip`/`src_port`/`dst_ip`/`dst_port` mirror the source's own
    /// `GetRequest` parameter positions exactly: the by-source-port bucket
    /// scanned is keyed by `src_port`, and a candidate matches when its own
    /// `dst_port`/`dst_ip` equal the `dst_port`/`dst_ip` arguments. Callers
    /// (attribution) pass the captured response packet's *destination*
    /// address as `src_ip`/`src_port` and its *source* address as
    /// `dst_ip`/`dst_port` — the response's destination is the original
    /// request's source, which is what this index is keyed on.
    ///
    /// Returns `(Some(handle), false)` for a fresh pairing, `(None, true)`
    /// if the incoming TCP response timestamp duplicates one already
    /// recorded against a candidate (retransmitted response), or
    /// `(None, false)` if nothing matches.
    #[must_use]
    pub fn get_request(
        &self,
        src_ip: &str,
        src_port: u32,
        dst_ip: &str,
        dst_port: u32,
        tcp_response_timestamp: &[u8],
    ) -> (Option<RequestHandle>, bool) {
        if src_port as usize >= self.by_source_port.len() {
            return (None, false);
        }

        let mut current = self.by_source_port[src_port as usize];
        let mut first_match = None;
        while let Some(handle) = current {
            let slot = self.arena.get(handle).expect("indexed handle is live");
            let record = slot.record.as_ref().unwrap();
            if record.dst_port == dst_port && record.dst_ip == dst_ip {
                if let Some(existing) = &record.tcp_response_timestamp {
                    if existing.as_slice() == tcp_response_timestamp {
                        return (None, true);
                    }
                    if first_match.is_none() {
                        first_match = Some(handle);
                    }
                } else if (src_ip.is_empty() && record.src.is_empty()) || src_ip == record.src_ip {
                    return (Some(RequestHandle(handle)), false);
                }
            }
            current = slot.port_next;
        }

        match first_match {
            Some(handle) if self.refire_on_repair => {
                tracing::debug!("re-pairing already-paired request, no unpaired candidate found");
                (Some(RequestHandle(handle)), false)
            }
            _ => (None, false),
        }
    }

    /// Attach a response to a previously matched request. No-op (with a
    /// warning) if `handle` no longer points to a live record — it was
    /// evicted between the `get_request` call and this one.
    pub fn set_response(
        &mut self,
        handle: RequestHandle,
        status: impl Into<String>,
        response_timestamp_nanos: i64,
        tcp_response_timestamp: Vec<u8>,
    ) -> bool {
        let Some(slot) = self.arena.get_mut(handle.0) else {
            tracing::warn!("set_response on evicted request");
            return false;
        };
        let record = slot.record.as_mut().unwrap();
        record.status = Some(status.into());
        record.response_timestamp_nanos = Some(response_timestamp_nanos);
        record.tcp_response_timestamp = Some(tcp_response_timestamp);
        true
    }

    /// Read a record by handle, e.g. to publish metrics after pairing.
    #[must_use]
    pub fn record(&self, handle: RequestHandle) -> Option<&RequestRecord> {
        self.arena.get(handle.0).map(|slot| slot.record.as_ref().unwrap())
    }
}
