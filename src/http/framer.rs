//! # Framing Incremental de Requests
//! src/http/framer.rs
//!
//! Decide si el buffer acumulado de una conexión ya contiene un request HTTP
//! completo (headers + body) y dónde termina. No hace I/O ni modifica el
//! buffer: solo guarda offsets, así que se puede reanudar después de cada
//! lectura parcial del socket.
//!
//! ## Estados
//!
//! ```text
//! Headers ──► ChunkSize ◄──► ChunkData
//!    │            │
//!    │            └──(chunk 0)──► Complete
//!    ├──► Body ─────────────────► Complete
//!    └──(sin body)──────────────► Complete
//! ```
//!
//! - `Transfer-Encoding: chunked` tiene prioridad sobre `Content-Length`.
//! - Después del chunk `0`, si el request anunció `Trailer:` se espera el
//!   bloque de trailers hasta `\r\n\r\n`; si no, se espera `\r\n`.
//!
//! El buffer solo debe crecer entre llamadas hasta el próximo `reset`.

/// Máximo de headers que acepta el escáner
const MAX_HEADERS: usize = 100;

/// Errores de framing
///
/// El request no se puede completar; quien llama debe cerrar la conexión.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    #[error("malformed header block: {0}")]
    MalformedHeaders(String),

    #[error("invalid content-length: {0}")]
    InvalidContentLength(String),

    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("missing CRLF after chunk data at offset {0}")]
    MissingChunkTerminator(usize),

    #[error("message length overflows")]
    Overflow,
}

/// Resultado de una pasada del framer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Faltan bytes
    Incomplete,

    /// El request ocupa `[0, end)` del buffer
    Complete(usize),
}

/// Estado interno del framer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Buscando el fin de los headers
    Headers,

    /// Esperando la línea de tamaño que empieza en `pos`
    ChunkSize { pos: usize },

    /// Esperando `size` bytes de datos desde `pos` más el CRLF final
    ChunkData { pos: usize, size: usize },

    /// Esperando que el buffer llegue a `end`
    Body { end: usize },

    /// Request completo en `[0, end)`
    Complete { end: usize },
}

/// Información de framing extraída de los headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadInfo {
    /// Offset del primer byte después de `\r\n\r\n`
    pub body_start: usize,

    pub content_length: Option<u64>,

    pub chunked: bool,

    /// El request anunció un header `Trailer`
    pub trailer: bool,
}

/// Escanea los headers del request al inicio de `buf`
///
/// Retorna `Ok(None)` si todavía no llegó el fin de los headers.
pub fn scan_headers(buf: &[u8]) -> Result<Option<HeadInfo>, FramingError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);

    let body_start = match req.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(FramingError::MalformedHeaders(e.to_string())),
    };

    head_info(req.headers, body_start).map(Some)
}

/// Framing según los headers ya escaneados
///
/// Lo comparten el framer y `Request::parse` para que ambos vean el mismo
/// body. Varios `Content-Length` solo se aceptan si coinciden.
pub(crate) fn head_info(
    headers: &[httparse::Header<'_>],
    body_start: usize,
) -> Result<HeadInfo, FramingError> {
    let mut info = HeadInfo {
        body_start,
        content_length: None,
        chunked: false,
        trailer: false,
    };

    for h in headers {
        if h.name.eq_ignore_ascii_case("Content-Length") {
            let length = parse_content_length(h.value)?;
            match info.content_length {
                Some(previous) if previous != length => {
                    return Err(FramingError::InvalidContentLength(format!(
                        "conflicting values {} and {}",
                        previous, length
                    )));
                }
                _ => info.content_length = Some(length),
            }
        } else if h.name.eq_ignore_ascii_case("Transfer-Encoding") {
            let value = String::from_utf8_lossy(h.value);
            if value.split(',').any(|coding| coding.trim().eq_ignore_ascii_case("chunked")) {
                info.chunked = true;
            }
        } else if h.name.eq_ignore_ascii_case("Trailer") {
            info.trailer = true;
        }
    }

    Ok(info)
}

/// Solo dígitos decimales (sin signo ni espacios internos)
fn parse_content_length(value: &[u8]) -> Result<u64, FramingError> {
    let text = String::from_utf8_lossy(value);
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FramingError::InvalidContentLength(text.to_string()));
    }

    trimmed
        .parse::<u64>()
        .map_err(|_| FramingError::InvalidContentLength(text.to_string()))
}

/// Parsea la línea de tamaño de un chunk (hex, ignora extensiones `;...`)
pub(crate) fn parse_chunk_size(line: &[u8]) -> Result<usize, FramingError> {
    let size_part = match line.iter().position(|&b| b == b';') {
        Some(semi) => &line[..semi],
        None => line,
    };

    let text = String::from_utf8_lossy(size_part);
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FramingError::InvalidChunkSize(text.to_string()));
    }

    usize::from_str_radix(trimmed, 16).map_err(|_| FramingError::InvalidChunkSize(text.to_string()))
}

/// Busca `needle` en `data` a partir de `from`
fn find(data: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

/// Máquina de estados que detecta el fin de un request
#[derive(Debug, Clone)]
pub struct RequestFramer {
    state: FrameState,
    body_start: usize,
    content_length: u64,
    chunk_size: usize,
    chunked: bool,
    trailer: bool,
}

impl Default for RequestFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestFramer {
    pub fn new() -> Self {
        Self {
            state: FrameState::Headers,
            body_start: 0,
            content_length: 0,
            chunk_size: 0,
            chunked: false,
            trailer: false,
        }
    }

    /// Avanza sobre `buf` todo lo posible
    ///
    /// Llamarlo otra vez con el mismo buffer da el mismo resultado.
    ///
    /// # Ejemplo
    /// ```
    /// use tcp_server::http::framer::{FrameStatus, RequestFramer};
    ///
    /// let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nHel";
    /// let mut framer = RequestFramer::new();
    /// assert_eq!(framer.check(raw).unwrap(), FrameStatus::Incomplete);
    ///
    /// let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nHello";
    /// assert_eq!(framer.check(raw).unwrap(), FrameStatus::Complete(raw.len()));
    /// ```
    pub fn check(&mut self, buf: &[u8]) -> Result<FrameStatus, FramingError> {
        loop {
            match self.state {
                FrameState::Headers => {
                    let head = match scan_headers(buf)? {
                        Some(head) => head,
                        None => return Ok(FrameStatus::Incomplete),
                    };
                    self.enter_body(head)?;
                }
                FrameState::ChunkSize { pos } => {
                    let line_end = match find(buf, pos, b"\r\n") {
                        Some(idx) => idx,
                        None => return Ok(FrameStatus::Incomplete),
                    };

                    let size = parse_chunk_size(&buf[pos..line_end])?;
                    self.chunk_size = size;

                    if size == 0 {
                        match self.final_chunk_end(buf, line_end) {
                            Some(end) => self.state = FrameState::Complete { end },
                            None => return Ok(FrameStatus::Incomplete),
                        }
                    } else {
                        self.state = FrameState::ChunkData { pos: line_end + 2, size };
                    }
                }
                FrameState::ChunkData { pos, size } => {
                    let end = pos
                        .checked_add(size)
                        .and_then(|e| e.checked_add(2))
                        .ok_or(FramingError::Overflow)?;
                    if buf.len() < end {
                        return Ok(FrameStatus::Incomplete);
                    }
                    if &buf[end - 2..end] != b"\r\n" {
                        return Err(FramingError::MissingChunkTerminator(end - 2));
                    }
                    self.state = FrameState::ChunkSize { pos: end };
                }
                FrameState::Body { end } => {
                    if buf.len() < end {
                        return Ok(FrameStatus::Incomplete);
                    }
                    self.state = FrameState::Complete { end };
                }
                FrameState::Complete { end } => return Ok(FrameStatus::Complete(end)),
            }
        }
    }

    /// Transición desde `Headers` según los headers de framing
    fn enter_body(&mut self, head: HeadInfo) -> Result<(), FramingError> {
        self.body_start = head.body_start;
        self.chunked = head.chunked;
        self.trailer = head.trailer;
        self.content_length = head.content_length.unwrap_or(0);

        self.state = if head.chunked {
            FrameState::ChunkSize { pos: head.body_start }
        } else if self.content_length > 0 {
            let end = usize::try_from(self.content_length)
                .ok()
                .and_then(|len| head.body_start.checked_add(len))
                .ok_or(FramingError::Overflow)?;
            FrameState::Body { end }
        } else {
            FrameState::Complete { end: head.body_start }
        };

        Ok(())
    }

    /// Fin del mensaje después del chunk `0` cuya línea termina en `line_end`
    ///
    /// Sin `Trailer` anunciado, bytes que no sean CRLF después de `0\r\n`
    /// quedan como inicio del siguiente mensaje.
    fn final_chunk_end(&self, buf: &[u8], line_end: usize) -> Option<usize> {
        if self.trailer {
            return find(buf, line_end, b"\r\n\r\n").map(|idx| idx + 4);
        }

        let after = line_end + 2;
        if buf.len() < after + 2 {
            return None;
        }
        if &buf[after..after + 2] == b"\r\n" {
            Some(after + 2)
        } else {
            Some(after)
        }
    }

    /// Vuelve al estado inicial para framear el siguiente request
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Offset donde termina el request, si ya está completo
    pub fn end(&self) -> Option<usize> {
        match self.state {
            FrameState::Complete { end } => Some(end),
            _ => None,
        }
    }

    pub fn body_start(&self) -> usize {
        self.body_start
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    pub fn has_trailer(&self) -> bool {
        self.trailer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(raw: &[u8]) -> Result<FrameStatus, FramingError> {
        RequestFramer::new().check(raw)
    }

    const CHUNKED: &[u8] =
        b"GET / HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nHello\r\n5\r\nWorld\r\n0\r\n\r\n";

    #[test]
    fn test_headers_only() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
        assert_eq!(frame(raw).unwrap(), FrameStatus::Complete(raw.len()));
    }

    #[test]
    fn test_content_length_zero() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n";
        assert_eq!(frame(raw).unwrap(), FrameStatus::Complete(raw.len()));
    }

    #[test]
    fn test_incomplete_headers() {
        assert_eq!(frame(b"GET / HTTP/1.1\r\nHost: loc").unwrap(), FrameStatus::Incomplete);
        assert_eq!(frame(b"").unwrap(), FrameStatus::Incomplete);
    }

    #[test]
    fn test_content_length_body() {
        let raw = b"POST / HTTP/1.1\r\ncontent-length: 5\r\n\r\nHello";
        let mut framer = RequestFramer::new();

        assert_eq!(framer.check(raw).unwrap(), FrameStatus::Complete(raw.len()));
        assert_eq!(framer.content_length(), 5);
        assert_eq!(framer.body_start(), raw.len() - 5);
        assert!(!framer.is_chunked());
    }

    #[test]
    fn test_content_length_incomplete() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nHel";
        let mut framer = RequestFramer::new();

        assert_eq!(framer.check(raw).unwrap(), FrameStatus::Incomplete);
        assert!(matches!(framer.state(), FrameState::Body { .. }));
    }

    #[test]
    fn test_chunked_waits_for_body() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\n\r\n";
        let mut framer = RequestFramer::new();

        assert_eq!(framer.check(raw).unwrap(), FrameStatus::Incomplete);
        assert!(framer.is_chunked());
        assert_eq!(framer.state(), FrameState::ChunkSize { pos: raw.len() });
    }

    #[test]
    fn test_chunked_body() {
        let mut framer = RequestFramer::new();
        assert_eq!(framer.check(CHUNKED).unwrap(), FrameStatus::Complete(CHUNKED.len()));
        assert_eq!(framer.chunk_size(), 0);
    }

    #[test]
    fn test_chunked_with_trailer() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\nTransfer-Encoding: chunked\r\nTrailer: Content-MD5\r\n\r\n0\r\nContent-MD5:xxxxx\r\n\r\n";
        let mut framer = RequestFramer::new();

        assert_eq!(framer.check(raw).unwrap(), FrameStatus::Complete(raw.len()));
        assert!(framer.has_trailer());
    }

    #[test]
    fn test_chunked_trailer_announced_but_pending() {
        let raw = b"GET / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nTrailer: Content-MD5\r\n\r\n0\r\nContent-MD5:xx";
        assert_eq!(frame(raw).unwrap(), FrameStatus::Incomplete);
    }

    #[test]
    fn test_chunked_trailer_announced_but_empty() {
        let raw = b"GET / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nTrailer: Content-MD5\r\n\r\n0\r\n\r\n";
        assert_eq!(frame(raw).unwrap(), FrameStatus::Complete(raw.len()));
    }

    #[test]
    fn test_unannounced_trailer_starts_next_message() {
        let head = b"GET / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n";
        let mut raw = head.to_vec();
        raw.extend_from_slice(b"X-Late: 1\r\n\r\n");

        assert_eq!(frame(&raw).unwrap(), FrameStatus::Complete(head.len()));
    }

    #[test]
    fn test_chunked_wins_over_content_length() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 100\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\n";
        let mut framer = RequestFramer::new();

        assert_eq!(framer.check(raw).unwrap(), FrameStatus::Complete(raw.len()));
        assert!(framer.is_chunked());
    }

    #[test]
    fn test_chunk_extension_ignored() {
        let raw = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\na;name=value\r\n0123456789\r\n0\r\n\r\n";
        assert_eq!(frame(raw).unwrap(), FrameStatus::Complete(raw.len()));
    }

    #[test]
    fn test_pipelined_only_first_message() {
        let mut raw = CHUNKED.to_vec();
        raw.extend_from_slice(CHUNKED);

        assert_eq!(frame(&raw).unwrap(), FrameStatus::Complete(CHUNKED.len()));
    }

    #[test]
    fn test_resumes_byte_by_byte() {
        let mut framer = RequestFramer::new();

        for len in 0..CHUNKED.len() {
            assert_eq!(framer.check(&CHUNKED[..len]).unwrap(), FrameStatus::Incomplete, "prefix {}", len);
        }
        assert_eq!(framer.check(CHUNKED).unwrap(), FrameStatus::Complete(CHUNKED.len()));
    }

    #[test]
    fn test_check_is_idempotent() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nHe";
        let mut framer = RequestFramer::new();

        let first = framer.check(raw).unwrap();
        let state = framer.state();
        assert_eq!(framer.check(raw).unwrap(), first);
        assert_eq!(framer.state(), state);
    }

    #[test]
    fn test_reset() {
        let mut framer = RequestFramer::new();
        framer.check(CHUNKED).unwrap();
        assert!(framer.end().is_some());

        framer.reset();
        assert_eq!(framer.state(), FrameState::Headers);
        assert_eq!(framer.end(), None);
        assert!(!framer.is_chunked());
    }

    #[test]
    fn test_invalid_content_length() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n";
        assert!(matches!(frame(raw), Err(FramingError::InvalidContentLength(_))));
    }

    #[test]
    fn test_invalid_chunk_size() {
        let raw = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n";
        assert!(matches!(frame(raw), Err(FramingError::InvalidChunkSize(_))));
    }

    #[test]
    fn test_signed_numbers_rejected() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: +5\r\n\r\nHello";
        assert!(matches!(frame(raw), Err(FramingError::InvalidContentLength(_))));

        let raw = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n+a\r\n";
        assert!(matches!(frame(raw), Err(FramingError::InvalidChunkSize(_))));
    }

    #[test]
    fn test_conflicting_content_lengths() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 3\r\n\r\nHello";
        assert!(matches!(frame(raw), Err(FramingError::InvalidContentLength(_))));
    }

    #[test]
    fn test_repeated_equal_content_length() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 5\r\nContent-Length: 5\r\n\r\nHello";
        assert_eq!(frame(raw).unwrap(), FrameStatus::Complete(raw.len()));
    }

    #[test]
    fn test_chunked_in_any_transfer_encoding_header() {
        let raw = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nTransfer-Encoding: identity\r\n\r\n5\r\nHello\r\n0\r\n\r\n";
        let mut framer = RequestFramer::new();

        assert_eq!(framer.check(raw).unwrap(), FrameStatus::Complete(raw.len()));
        assert!(framer.is_chunked());
    }

    #[test]
    fn test_bare_lf_head() {
        let raw = b"GET /status HTTP/1.1\nHost: x\n\n";
        assert_eq!(frame(raw).unwrap(), FrameStatus::Complete(raw.len()));
    }

    #[test]
    fn test_missing_chunk_terminator() {
        let raw = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabcXY0\r\n\r\n";
        assert!(matches!(frame(raw), Err(FramingError::MissingChunkTerminator(_))));
    }

    #[test]
    fn test_malformed_headers() {
        let raw = b"GET / HTTP/1.1\r\nBad Header\r\n\r\n";
        assert!(matches!(frame(raw), Err(FramingError::MalformedHeaders(_))));
    }

    #[test]
    fn test_error_is_stable() {
        let raw = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n";
        let mut framer = RequestFramer::new();

        let first = framer.check(raw);
        assert!(first.is_err());
        assert_eq!(framer.check(raw), first);
    }
}
