//! Tagged envelope codec.
//!
//! Every message on the wire is wrapped as `{"Tag": <method>, "Payload": <payload>}`. Decoding
//! is two-phase: the tag is read first, then the payload is decoded as the concrete type
//! registered for that tag in the request or response registry.

use crate::{
    error::{DecodeError, DecodeResult},
    BitswapWriteProviderRequest, BitswapWriteProviderResponse, GetP2PProvideRequest,
    GetP2PProvideResponse, ProvideRequestWire, ProvideResponse,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

/// Methods registered with the envelope codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Find the providers of a content id.
    GetP2PProvide,
    /// Publish a signed provider advertisement.
    Provide,
    /// Publish a signed bitswap provider record.
    BitswapWriteProvider,
}

impl Method {
    /// All registered methods.
    pub const ALL: [Method; 3] = [Self::GetP2PProvide, Self::Provide, Self::BitswapWriteProvider];

    /// The tag string used on the wire.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::GetP2PProvide => "GetP2PProvide",
            Self::Provide => "Provide",
            Self::BitswapWriteProvider => "BitswapWriteProvider",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Method {
    type Err = DecodeError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.tag() == tag)
            .ok_or_else(|| DecodeError::UnknownMethod(tag.to_string()))
    }
}

/// A payload registry for one message direction.
///
/// Implementors are closed unions with exactly one variant per [Method].
pub trait Payload: Sized {
    /// The method this payload belongs to.
    fn method(&self) -> Method;

    /// Decode the payload registered for `method`.
    fn decode_payload(method: Method, payload: Value) -> Result<Self, serde_json::Error>;

    /// Encode the payload as a JSON value.
    fn encode_payload(&self) -> Result<Value, serde_json::Error>;
}

/// Decode `payload` as `T`.
fn decode_as<T: DeserializeOwned>(payload: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(payload)
}

/// Request payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingRequest {
    /// Find providers.
    GetP2PProvide(GetP2PProvideRequest),
    /// Provider advertisement.
    Provide(ProvideRequestWire),
    /// Bitswap provider record.
    BitswapWriteProvider(BitswapWriteProviderRequest),
}

impl Payload for RoutingRequest {
    fn method(&self) -> Method {
        match self {
            Self::GetP2PProvide(_) => Method::GetP2PProvide,
            Self::Provide(_) => Method::Provide,
            Self::BitswapWriteProvider(_) => Method::BitswapWriteProvider,
        }
    }

    fn decode_payload(method: Method, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match method {
            Method::GetP2PProvide => Self::GetP2PProvide(decode_as(payload)?),
            Method::Provide => Self::Provide(decode_as(payload)?),
            Method::BitswapWriteProvider => Self::BitswapWriteProvider(decode_as(payload)?),
        })
    }

    fn encode_payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::GetP2PProvide(req) => serde_json::to_value(req),
            Self::Provide(req) => serde_json::to_value(req),
            Self::BitswapWriteProvider(req) => serde_json::to_value(req),
        }
    }
}

/// Response payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingResponse {
    /// Provider addresses.
    GetP2PProvide(GetP2PProvideResponse),
    /// Advertisement accepted.
    Provide(ProvideResponse),
    /// Bitswap record accepted.
    BitswapWriteProvider(BitswapWriteProviderResponse),
}

impl Payload for RoutingResponse {
    fn method(&self) -> Method {
        match self {
            Self::GetP2PProvide(_) => Method::GetP2PProvide,
            Self::Provide(_) => Method::Provide,
            Self::BitswapWriteProvider(_) => Method::BitswapWriteProvider,
        }
    }

    fn decode_payload(method: Method, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match method {
            Method::GetP2PProvide => Self::GetP2PProvide(decode_as(payload)?),
            Method::Provide => Self::Provide(decode_as(payload)?),
            Method::BitswapWriteProvider => Self::BitswapWriteProvider(decode_as(payload)?),
        })
    }

    fn encode_payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::GetP2PProvide(res) => serde_json::to_value(res),
            Self::Provide(res) => serde_json::to_value(res),
            Self::BitswapWriteProvider(res) => serde_json::to_value(res),
        }
    }
}

/// The envelope as it appears on the wire.
#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(rename = "Tag")]
    tag: String,
    #[serde(rename = "Payload", default)]
    payload: Value,
}

/// A typed envelope.
///
/// The tag is derived from the payload variant, so a constructed envelope always agrees with
/// itself. Disagreement can only arrive from the wire and is reported as a decode error.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<P> {
    payload: P,
}

/// Envelope carrying a request.
pub type RequestEnvelope = Envelope<RoutingRequest>;
/// Envelope carrying a response.
pub type ResponseEnvelope = Envelope<RoutingResponse>;

impl<P: Payload> Envelope<P> {
    /// Wrap a payload.
    pub fn new(payload: P) -> Self {
        Self { payload }
    }

    /// The method tag.
    pub fn method(&self) -> Method {
        self.payload.method()
    }

    /// Reference to the payload.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Consume and return the payload.
    pub fn into_payload(self) -> P {
        self.payload
    }

    /// Encode the envelope as JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        let wire = WireEnvelope {
            tag: self.method().tag().to_string(),
            payload: self.payload.encode_payload()?,
        };
        serde_json::to_vec(&wire)
    }

    /// Decode an envelope from JSON bytes.
    pub fn decode(bytes: &[u8]) -> DecodeResult<Self> {
        let wire: WireEnvelope = serde_json::from_slice(bytes)?;
        Self::from_wire(wire)
    }

    /// Decode an envelope from an already-parsed JSON value.
    pub fn from_value(value: Value) -> DecodeResult<Self> {
        let wire: WireEnvelope = serde_json::from_value(value)?;
        Self::from_wire(wire)
    }

    fn from_wire(wire: WireEnvelope) -> DecodeResult<Self> {
        let method: Method = wire.tag.parse()?;
        let payload = P::decode_payload(method, wire.payload)
            .map_err(|e| DecodeError::PayloadMismatch { method, reason: e.to_string() })?;
        Ok(Self { payload })
    }
}

impl<P: Payload> From<P> for Envelope<P> {
    fn from(payload: P) -> Self {
        Self::new(payload)
    }
}

/// Largest partial envelope [EnvelopeStreamDecoder] buffers by default.
pub const DEFAULT_MAX_PENDING_BYTES: usize = 4 * 1024 * 1024;

/// Incremental decoder for a delimiter-free concatenation of JSON envelopes.
///
/// Bytes are pushed as they arrive. Each complete envelope is yielded once; a partial envelope
/// stays buffered until more bytes arrive. A syntax error poisons the decoder because the
/// stream cannot be resynchronised. So does a partial envelope larger than the pending limit.
///
/// Pushed bytes are scanned once for the end of the current top-level value. JSON is only
/// parsed when a value is complete.
#[derive(Debug)]
pub struct EnvelopeStreamDecoder<P> {
    /// Bytes received but not yet decoded.
    buffer: Vec<u8>,
    /// Largest partial envelope kept before giving up.
    max_pending: usize,
    /// Progress through `buffer` towards the end of the first value.
    scan: ValueScan,
    /// Set after an unrecoverable syntax error.
    poisoned: bool,
    _payload: std::marker::PhantomData<P>,
}

impl<P> Default for EnvelopeStreamDecoder<P> {
    fn default() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING_BYTES)
    }
}

impl<P> EnvelopeStreamDecoder<P> {
    /// Create a decoder that fails once a partial envelope exceeds `max_pending` bytes.
    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_pending,
            scan: ValueScan::default(),
            poisoned: false,
            _payload: std::marker::PhantomData,
        }
    }
}

impl<P: Payload> EnvelopeStreamDecoder<P> {
    /// Create a new instance of Self.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        if !self.poisoned {
            self.buffer.extend_from_slice(bytes);
        }
    }

    /// True once a syntax error made the rest of the stream undecodable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Decode the next complete envelope, if any.
    ///
    /// Returns `None` when more bytes are needed. Tag and payload errors are per-envelope and
    /// leave the decoder usable.
    pub fn next_envelope(&mut self) -> Option<DecodeResult<Envelope<P>>> {
        if self.poisoned {
            return None;
        }

        let Some(end) = self.scan.advance(&self.buffer) else {
            if self.scan.is_blank() {
                self.buffer.clear();
                self.scan = ValueScan::default();
            } else if self.buffer.len() > self.max_pending {
                return Some(Err(self.poison(DecodeError::TooLarge(self.max_pending))));
            }
            return None;
        };

        let mut values =
            serde_json::Deserializer::from_slice(&self.buffer[..end]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => {
                let consumed = values.byte_offset();
                self.buffer.drain(..consumed);
                self.scan = ValueScan::default();
                Some(Envelope::from_value(value))
            }
            // a bare scalar may continue in the next chunk
            Some(Err(e)) if e.is_eof() && end == self.buffer.len() => None,
            Some(Err(e)) => Some(Err(self.poison(DecodeError::Json(e)))),
            None => Some(Err(self.poison(DecodeError::Truncated(end)))),
        }
    }

    /// Signal the end of input.
    ///
    /// Returns an error if an incomplete envelope is still buffered.
    pub fn finish(&mut self) -> DecodeResult<()> {
        let leftover = self.buffer.iter().filter(|b| !b.is_ascii_whitespace()).count();
        self.buffer.clear();
        self.scan = ValueScan::default();
        if leftover > 0 && !self.poisoned {
            return Err(DecodeError::Truncated(leftover));
        }
        Ok(())
    }

    fn poison(&mut self, error: DecodeError) -> DecodeError {
        self.poisoned = true;
        self.buffer.clear();
        self.scan = ValueScan::default();
        error
    }
}

/// Incremental search for the end of the first JSON value in a buffer.
#[derive(Debug, Default)]
struct ValueScan {
    /// Bytes already examined.
    offset: usize,
    /// Open objects and arrays.
    depth: usize,
    /// Inside a string literal.
    in_string: bool,
    /// The previous string byte was a backslash.
    escaped: bool,
    /// A non-whitespace byte has been seen.
    started: bool,
}

impl ValueScan {
    /// Examine bytes past the last call. Returns the end of the first value once it is known.
    ///
    /// A value that does not open with a bracket ends at the buffer end, leaving its validity
    /// to the parser.
    fn advance(&mut self, buffer: &[u8]) -> Option<usize> {
        while self.offset < buffer.len() {
            let byte = buffer[self.offset];
            self.offset += 1;

            if self.in_string {
                match byte {
                    _ if self.escaped => self.escaped = false,
                    b'\\' => self.escaped = true,
                    b'"' => self.in_string = false,
                    _ => {}
                }
                continue;
            }

            match byte {
                b if b.is_ascii_whitespace() => {}
                b'"' => {
                    self.started = true;
                    self.in_string = true;
                }
                b'{' | b'[' => {
                    self.started = true;
                    self.depth += 1;
                }
                b'}' | b']' => {
                    self.started = true;
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Some(self.offset);
                    }
                }
                _ if self.depth == 0 => {
                    self.started = true;
                    return Some(buffer.len());
                }
                _ => {}
            }
        }
        None
    }

    /// Only whitespace has been seen.
    fn is_blank(&self) -> bool {
        !self.started
    }
}
