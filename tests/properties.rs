//! Tests de propiedades
//! tests/properties.rs
//!
//! Invariantes de la cola de conexiones y del framer HTTP sobre entradas
//! generadas con proptest.

use proptest::prelude::*;
use std::io::{self, Read, Write};
use std::time::Duration;
use tcp_server::http::framer::{FrameStatus, RequestFramer};
use tcp_server::http::{HttpServerSession, Request};
use tcp_server::server::{ConnectionQueue, Notification};

// ==================== Generadores ====================

/// Request con body por Content-Length
fn content_length_request(path: &str, body: &[u8]) -> Vec<u8> {
    let mut raw = format!(
        "POST {} HTTP/1.1\r\nHost: test\r\nContent-Length: {}\r\n\r\n",
        path,
        body.len()
    )
    .into_bytes();
    raw.extend_from_slice(body);
    raw
}

/// Request chunked; `sizes` reparte el body en chunks
fn chunked_request(path: &str, body: &[u8], sizes: &[usize]) -> Vec<u8> {
    let mut raw = format!("POST {} HTTP/1.1\r\nHost: test\r\nTransfer-Encoding: chunked\r\n\r\n", path).into_bytes();

    let mut rest = body;
    let mut sizes = sizes.iter().cycle();
    while !rest.is_empty() {
        let size = sizes.next().copied().unwrap_or(rest.len()).clamp(1, rest.len());
        let (chunk, tail) = rest.split_at(size);
        raw.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        raw.extend_from_slice(chunk);
        raw.extend_from_slice(b"\r\n");
        rest = tail;
    }
    raw.extend_from_slice(b"0\r\n\r\n");
    raw
}

/// (bytes del request, body esperado)
fn arb_request() -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    (
        "/[a-z]{1,8}",
        prop::collection::vec(any::<u8>(), 0..200),
        prop::collection::vec(1usize..32, 1..6),
        any::<bool>(),
    )
        .prop_map(|(path, body, sizes, chunked)| {
            let raw = if chunked {
                chunked_request(&path, &body, &sizes)
            } else {
                content_length_request(&path, &body)
            };
            (raw, body)
        })
}

/// Socket que entrega como máximo `step` bytes por lectura
struct Trickle {
    data: Vec<u8>,
    pos: usize,
    step: usize,
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for Trickle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

proptest! {
    // ==================== Cola ====================

    #[test]
    fn prop_queue_is_fifo_and_bounded(max_queued in 1usize..16, items in prop::collection::vec(any::<u32>(), 0..32)) {
        let queue = ConnectionQueue::new(max_queued);

        let accepted: Vec<u32> = items.iter().copied().filter(|&item| queue.enqueue(item)).collect();

        prop_assert_eq!(accepted.len(), items.len().min(max_queued));
        prop_assert_eq!(&accepted[..], &items[..accepted.len()]);
        prop_assert_eq!(queue.refused(), (items.len() - accepted.len()) as u64);
        prop_assert_eq!(queue.len(), accepted.len());

        let mut drained = Vec::new();
        while let Some(Notification::Connection { socket, .. }) = queue.dequeue_timeout(Duration::from_millis(1)) {
            drained.push(socket);
        }
        prop_assert_eq!(drained, accepted);
        prop_assert!(queue.is_empty());
    }

    // ==================== Framer ====================

    #[test]
    fn prop_framer_prefix_is_incomplete((raw, _body) in arb_request(), cut in any::<prop::sample::Index>()) {
        let cut = cut.index(raw.len());

        let mut framer = RequestFramer::new();
        prop_assert_eq!(framer.check(&raw[..cut]).unwrap(), FrameStatus::Incomplete);
        prop_assert_eq!(framer.check(&raw[..cut]).unwrap(), FrameStatus::Incomplete);

        // El mismo framer sigue desde donde quedó
        prop_assert_eq!(framer.check(&raw).unwrap(), FrameStatus::Complete(raw.len()));
        prop_assert_eq!(framer.check(&raw).unwrap(), FrameStatus::Complete(raw.len()));
    }

    #[test]
    fn prop_framer_ignores_trailing_bytes((raw, _body) in arb_request(), extra in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut buf = raw.clone();
        buf.extend_from_slice(&extra);

        let mut framer = RequestFramer::new();
        prop_assert_eq!(framer.check(&buf).unwrap(), FrameStatus::Complete(raw.len()));
    }

    // ==================== Sesión ====================

    #[test]
    fn prop_pipelined_requests_round_trip(requests in prop::collection::vec(arb_request(), 1..5), step in 1usize..64) {
        let data: Vec<u8> = requests.iter().flat_map(|(raw, _)| raw.iter().copied()).collect();
        let socket = Trickle { data, pos: 0, step };

        let mut buf = Vec::new();
        let mut session = HttpServerSession::new(socket, &mut buf);
        let mut bodies = Vec::new();

        loop {
            if session.check_request_complete() {
                let request = Request::parse(session.completed_request().unwrap()).unwrap();
                bodies.push(request.body().to_vec());
                session.pop_completed_request();
                continue;
            }
            prop_assert!(session.framing_error().is_none());
            if session.receive().unwrap() == 0 {
                break;
            }
        }

        let expected: Vec<Vec<u8>> = requests.into_iter().map(|(_, body)| body).collect();
        prop_assert_eq!(session.requests_served(), expected.len());
        prop_assert!(session.buffer().is_empty());
        prop_assert_eq!(bodies, expected);
    }
}
