//! IPv4 fragment reassembly
//!
//! Fragments are grouped by (source address, identification). Each fragment payload is
//! copied at its offset in a growable buffer. The buffer is handed back once the fragment
//! without the More Fragments flag was seen and every byte up to the end of the datagram
//! was received. A datagram with holes is never returned.
//!
//! The number of incomplete sets is bounded: when a new set would exceed the limit, the
//! least recently updated set is discarded.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use tracing::{debug, trace};

const MF_FLAG: u16 = 0x2000;
const OFFSET_MASK: u16 = 0x1fff;

/// Fragmentation fields of an IPv4 header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentInfo {
    pub more_fragments: bool,
    /// Offset of this fragment in the datagram, in bytes
    pub offset: usize,
}

impl FragmentInfo {
    /// Decode the flags / fragment offset word (bytes 6..8 of the IPv4 header)
    pub fn from_word(w: u16) -> FragmentInfo {
        FragmentInfo {
            more_fragments: w & MF_FLAG != 0,
            offset: usize::from(w & OFFSET_MASK) << 3,
        }
    }

    #[inline]
    pub fn is_fragment(&self) -> bool {
        self.more_fragments || self.offset != 0
    }
}

/// Identifies the datagram a fragment belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    pub src: Ipv4Addr,
    pub id: u16,
}

#[derive(Debug, Default)]
struct FragmentBuffer {
    data: Vec<u8>,
    /// Received byte ranges `[start, end)`, sorted and merged
    covered: Vec<(usize, usize)>,
    /// Set when the final fragment arrived
    final_seen: bool,
    last_access: u64,
}

impl FragmentBuffer {
    fn write(&mut self, offset: usize, payload: &[u8]) {
        let end = offset + payload.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(payload);
        self.cover(offset, end);
    }

    fn cover(&mut self, start: usize, end: usize) {
        if start == end {
            return;
        }
        let mut merged = (start, end);
        let mut ranges = Vec::with_capacity(self.covered.len() + 1);
        for &(s, e) in &self.covered {
            if e < merged.0 || s > merged.1 {
                ranges.push((s, e));
            } else {
                merged = (merged.0.min(s), merged.1.max(e));
            }
        }
        ranges.push(merged);
        ranges.sort_unstable();
        self.covered = ranges;
    }

    /// Number of bytes not received yet, below the current end of the buffer
    fn missing(&self) -> usize {
        let received: usize = self.covered.iter().map(|(s, e)| e - s).sum();
        self.data.len() - received
    }

    fn is_complete(&self) -> bool {
        self.final_seen && self.covered == [(0, self.data.len())]
    }
}

/// Result of feeding one IP payload to the [`Reassembler`]
#[derive(Debug, PartialEq, Eq)]
pub enum Reassembly<'a> {
    /// Not a fragment: the payload is used as is
    Unfragmented(&'a [u8]),
    /// Fragment stored, datagram still incomplete
    Pending,
    /// All fragments received: the reassembled datagram payload
    Complete(Vec<u8>),
}

/// Tracks in-flight fragment sets for one import
#[derive(Debug)]
pub struct Reassembler {
    sets: HashMap<FragmentKey, FragmentBuffer>,
    max_sets: usize,
    access_counter: u64,
    evicted: u64,
}

impl Reassembler {
    /// Creates a reassembler tracking at most `max_sets` incomplete datagrams
    pub fn new(max_sets: usize) -> Reassembler {
        Reassembler {
            sets: HashMap::new(),
            max_sets: max_sets.max(1),
            access_counter: 0,
            evicted: 0,
        }
    }

    /// Number of incomplete datagrams currently tracked
    pub fn in_flight(&self) -> usize {
        self.sets.len()
    }

    /// Number of incomplete datagrams dropped because of the size limit
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Feed the payload of one IPv4 packet (bytes after the IP header)
    pub fn push<'a>(
        &mut self,
        key: FragmentKey,
        info: FragmentInfo,
        payload: &'a [u8],
    ) -> Reassembly<'a> {
        if !info.is_fragment() {
            return Reassembly::Unfragmented(payload);
        }
        if !self.sets.contains_key(&key) && self.sets.len() >= self.max_sets {
            self.evict_lru();
        }
        self.access_counter += 1;
        let access = self.access_counter;
        let buffer = self.sets.entry(key).or_default();
        buffer.last_access = access;
        buffer.write(info.offset, payload);
        if !info.more_fragments {
            buffer.final_seen = true;
        }
        trace!(
            "fragment id={} src={} offset={} len={} mf={}",
            key.id,
            key.src,
            info.offset,
            payload.len(),
            info.more_fragments
        );
        if !buffer.is_complete() {
            if buffer.final_seen && !info.more_fragments {
                debug!(
                    "datagram id={} src={}: final fragment received, {} of {} bytes missing",
                    key.id,
                    key.src,
                    buffer.missing(),
                    buffer.data.len()
                );
            }
            return Reassembly::Pending;
        }
        match self.sets.remove(&key) {
            Some(buffer) => Reassembly::Complete(buffer.data),
            None => Reassembly::Pending,
        }
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .sets
            .iter()
            .min_by_key(|(_, b)| b.last_access)
            .map(|(k, _)| *k);
        if let Some(key) = oldest {
            self.sets.remove(&key);
            self.evicted += 1;
            debug!(
                "fragment set limit ({}) reached, dropping datagram id={} src={}",
                self.max_sets, key.id, key.src
            );
        }
    }
}
