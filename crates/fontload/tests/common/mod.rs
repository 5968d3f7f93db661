//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use fontload::{HttpResponse, Transport, TransportError};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

type Outcome = Result<HttpResponse, TransportError>;

/// Transport answering from a per-URL script
///
/// Each URL holds a queue of outcomes; the last one repeats forever. Unknown
/// URLs answer 404. Every call is recorded with its `verify_tls` flag.
#[derive(Default)]
pub struct MockTransport {
    routes: RefCell<HashMap<String, VecDeque<Outcome>>>,
    calls: RefCell<Vec<(String, bool)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.push(url, Ok(HttpResponse::new(status, body)))
    }

    pub fn fail(self, url: &str, err: TransportError) -> Self {
        self.push(url, Err(err))
    }

    fn push(self, url: &str, outcome: Outcome) -> Self {
        self.routes
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|(u, _)| u == url).count()
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str, verify_tls: bool) -> Result<HttpResponse, TransportError> {
        self.calls.borrow_mut().push((url.to_string(), verify_tls));

        let mut routes = self.routes.borrow_mut();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Ok(HttpResponse::new(404, b"Not Found".to_vec())),
        }
    }
}

/// Counts WARN events seen while installed
struct WarnCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Run `f` and return its result with the number of warnings it logged
pub fn count_warnings<R>(f: impl FnOnce() -> R) -> (R, usize) {
    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(count.clone()));
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, count.load(Ordering::SeqCst))
}

/// Smallest TrueType file the parser accepts: head, hhea, maxp and a name
/// table carrying `family` and `style`
pub fn minimal_ttf(family: &str, style: &str) -> Vec<u8> {
    let mut tables: Vec<([u8; 4], Vec<u8>)> =
        vec![(*b"head", head()), (*b"hhea", vec![0u8; 36]), (*b"maxp", maxp()), (*b"name", name(family, style))];
    tables.sort_by(|a, b| a.0.cmp(&b.0));

    let num_tables = tables.len() as u16;
    let mut out = Vec::new();
    out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    out.extend_from_slice(&num_tables.to_be_bytes());
    out.extend_from_slice(&64u16.to_be_bytes()); // searchRange for 4 tables
    out.extend_from_slice(&2u16.to_be_bytes()); // entrySelector
    out.extend_from_slice(&0u16.to_be_bytes()); // rangeShift

    let mut offset = 12 + tables.len() * 16;
    let mut body = Vec::new();
    for (tag, data) in &tables {
        out.extend_from_slice(tag);
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());

        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + tables.len() * 16 + body.len();
    }
    out.extend_from_slice(&body);
    out
}

fn head() -> Vec<u8> {
    let mut head = vec![0u8; 54];
    head[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
    head[18..20].copy_from_slice(&1000u16.to_be_bytes()); // unitsPerEm
    head
}

fn maxp() -> Vec<u8> {
    let mut maxp = Vec::new();
    maxp.extend_from_slice(&0x0000_5000u32.to_be_bytes());
    maxp.extend_from_slice(&1u16.to_be_bytes());
    maxp
}

fn name(family: &str, style: &str) -> Vec<u8> {
    let strings: Vec<(u16, Vec<u8>)> = [(1u16, family), (2u16, style)]
        .iter()
        .map(|(id, s)| (*id, s.encode_utf16().flat_map(u16::to_be_bytes).collect()))
        .collect();

    let mut table = Vec::new();
    table.extend_from_slice(&0u16.to_be_bytes());
    table.extend_from_slice(&(strings.len() as u16).to_be_bytes());
    table.extend_from_slice(&(6 + 12 * strings.len() as u16).to_be_bytes());

    let mut storage = Vec::new();
    for (id, bytes) in &strings {
        for field in [3u16, 1, 0x0409, *id, bytes.len() as u16, storage.len() as u16] {
            table.extend_from_slice(&field.to_be_bytes());
        }
        storage.extend_from_slice(bytes);
    }
    table.extend_from_slice(&storage);
    table
}

/// Wrap an sfnt in a WOFF1 container with every table zlib-compressed
pub fn woff_from_sfnt(sfnt: &[u8]) -> Vec<u8> {
    let be_u16 = |o: usize| u16::from_be_bytes([sfnt[o], sfnt[o + 1]]);
    let be_u32 = |o: usize| u32::from_be_bytes([sfnt[o], sfnt[o + 1], sfnt[o + 2], sfnt[o + 3]]);

    let num_tables = be_u16(4) as usize;
    let mut tables = Vec::new();
    for i in 0..num_tables {
        let dir = 12 + i * 16;
        let tag = &sfnt[dir..dir + 4];
        let offset = be_u32(dir + 8) as usize;
        let length = be_u32(dir + 12) as usize;

        let raw = &sfnt[offset..offset + length];
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(raw).unwrap();
        let packed = enc.finish().unwrap();
        // Tables that do not shrink are stored as-is
        let stored = if packed.len() < raw.len() { packed } else { raw.to_vec() };
        tables.push((tag.to_vec(), length, stored));
    }

    let mut out = vec![0u8; 44 + num_tables * 20];
    let mut entries = Vec::new();
    for (tag, orig_len, stored) in &tables {
        let offset = out.len();
        out.extend_from_slice(stored);
        while out.len() % 4 != 0 {
            out.push(0);
        }
        entries.push((tag.clone(), offset, stored.len(), *orig_len));
    }

    let total = out.len() as u32;
    out[0..4].copy_from_slice(b"wOFF");
    out[4..8].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    out[8..12].copy_from_slice(&total.to_be_bytes());
    out[12..14].copy_from_slice(&(num_tables as u16).to_be_bytes());
    for (i, (tag, offset, comp, orig)) in entries.iter().enumerate() {
        let base = 44 + i * 20;
        out[base..base + 4].copy_from_slice(tag);
        out[base + 4..base + 8].copy_from_slice(&(*offset as u32).to_be_bytes());
        out[base + 8..base + 12].copy_from_slice(&(*comp as u32).to_be_bytes());
        out[base + 12..base + 16].copy_from_slice(&(*orig as u32).to_be_bytes());
    }
    out
}

/// Wrap an sfnt in a WOFF2 container, every table stored untransformed in
/// one Brotli stream
pub fn woff2_from_sfnt(sfnt: &[u8]) -> Vec<u8> {
    // Known-tag indices used by `minimal_ttf`; anything else is spelled out
    const KNOWN: [(&[u8; 4], u8); 4] = [(b"head", 1), (b"hhea", 2), (b"maxp", 4), (b"name", 5)];

    let be_u16 = |o: usize| u16::from_be_bytes([sfnt[o], sfnt[o + 1]]);
    let be_u32 = |o: usize| u32::from_be_bytes([sfnt[o], sfnt[o + 1], sfnt[o + 2], sfnt[o + 3]]);

    let num_tables = be_u16(4);
    let mut directory = Vec::new();
    let mut stream = Vec::new();
    for i in 0..num_tables as usize {
        let dir = 12 + i * 16;
        let tag = &sfnt[dir..dir + 4];
        let offset = be_u32(dir + 8) as usize;
        let length = be_u32(dir + 12);

        match KNOWN.iter().find(|(known, _)| known.as_slice() == tag) {
            // glyf and loca are absent, so version 0 means untransformed here
            Some((_, index)) => directory.push(*index),
            None => {
                directory.push(0x3F);
                directory.extend_from_slice(tag);
            }
        }
        directory.extend(base128(length));
        stream.extend_from_slice(&sfnt[offset..offset + length as usize]);
    }

    let mut compressed = brotli::CompressorWriter::new(Vec::new(), 4096, 9, 22);
    compressed.write_all(&stream).unwrap();
    let compressed = compressed.into_inner();

    let mut out = vec![0u8; 48];
    out.extend_from_slice(&directory);
    out.extend_from_slice(&compressed);
    while out.len() % 4 != 0 {
        out.push(0);
    }

    let total = out.len() as u32;
    out[0..4].copy_from_slice(b"wOF2");
    out[4..8].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    out[8..12].copy_from_slice(&total.to_be_bytes());
    out[12..14].copy_from_slice(&num_tables.to_be_bytes());
    out[16..20].copy_from_slice(&(sfnt.len() as u32).to_be_bytes());
    out[20..24].copy_from_slice(&(compressed.len() as u32).to_be_bytes());
    out
}

fn base128(mut value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.insert(0, (value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    bytes
}
