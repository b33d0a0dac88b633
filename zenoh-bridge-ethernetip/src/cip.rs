//! EtherNet/IP encapsulation and CIP explicit messaging.
//!
//! Only the subset the bridge needs: session registration, unconnected
//! `SendRRData`, the Logix Read Tag / Write Tag services and symbol
//! enumeration through the Symbol object. All multi-byte fields are
//! little-endian.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Default EtherNet/IP TCP port.
pub const DEFAULT_PORT: u16 = 44818;

/// Length of the encapsulation header.
pub const HEADER_LEN: usize = 24;

pub const CMD_REGISTER_SESSION: u16 = 0x0065;
pub const CMD_UNREGISTER_SESSION: u16 = 0x0066;
pub const CMD_SEND_RR_DATA: u16 = 0x006F;

const SERVICE_READ_TAG: u8 = 0x4C;
const SERVICE_WRITE_TAG: u8 = 0x4D;
const SERVICE_GET_INSTANCE_ATTRIBUTE_LIST: u8 = 0x55;
const REPLY_FLAG: u8 = 0x80;

const CLASS_SYMBOL: u8 = 0x6B;
const SEGMENT_CLASS_8: u8 = 0x20;
const SEGMENT_INSTANCE_16: u8 = 0x25;
const SEGMENT_INSTANCE_32: u8 = 0x26;
const SEGMENT_SYMBOLIC: u8 = 0x91;

const ITEM_NULL_ADDRESS: u16 = 0x0000;
const ITEM_UNCONNECTED_DATA: u16 = 0x00B2;

/// CIP general status: success.
pub const STATUS_SUCCESS: u8 = 0x00;
/// CIP general status: partial transfer, more data follows.
pub const STATUS_PARTIAL_TRANSFER: u8 = 0x06;

const SYMBOL_STRUCT_FLAG: u16 = 0x8000;
const SYMBOL_SYSTEM_FLAG: u16 = 0x1000;
const SYMBOL_DIMS_MASK: u16 = 0x6000;
const SYMBOL_DIMS_SHIFT: u16 = 13;
const SYMBOL_TYPE_MASK: u16 = 0x0FFF;

/// Type code a device reports for structures (followed by a 2-byte handle).
const TYPE_STRUCT: u16 = 0x00A0;
const TYPE_STRUCT_ABBREVIATED: u16 = 0x02A0;

/// Errors raised talking to an EtherNet/IP device.
#[derive(Debug, Error)]
pub enum CipError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to resolve {host}: {message}")]
    Resolve { host: String, message: String },

    #[error("Device operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Encapsulation error: status 0x{0:08X}")]
    Encapsulation(u32),

    #[error("CIP error 0x{status:02X}: {message}")]
    Status { status: u8, message: &'static str },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid tag path '{0}'")]
    InvalidPath(String),

    #[error("Request too large: {0} bytes")]
    TooLarge(usize),

    #[error("Device session closed")]
    SessionClosed,
}

impl CipError {
    /// Status code to report to callers: the CIP general status or the
    /// encapsulation status when the device reported one, 0 otherwise.
    pub fn status_code(&self) -> u32 {
        match self {
            CipError::Status { status, .. } => u32::from(*status),
            CipError::Encapsulation(status) => *status,
            _ => 0,
        }
    }

    /// Whether the connection should be dropped after this error.
    pub fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            CipError::Io(_)
                | CipError::Timeout(_)
                | CipError::Encapsulation(_)
                | CipError::Malformed(_)
        )
    }

    fn status(status: u8) -> Self {
        CipError::Status {
            status,
            message: status_message(status),
        }
    }
}

/// Describe a CIP general status code.
pub fn status_message(status: u8) -> &'static str {
    match status {
        0x00 => "Success",
        0x01 => "Connection failure",
        0x02 => "Resource unavailable",
        0x03 => "Invalid parameter value",
        0x04 => "Path segment error",
        0x05 => "Path destination unknown",
        0x06 => "Partial transfer",
        0x08 => "Service not supported",
        0x09 => "Invalid attribute value",
        0x0A => "Attribute list error",
        0x0C => "Object state conflict",
        0x0E => "Attribute not settable",
        0x0F => "Privilege violation",
        0x10 => "Device state conflict",
        0x13 => "Not enough data",
        0x14 => "Attribute not supported",
        0x15 => "Too much data",
        0x1E => "Embedded service error",
        0x20 => "Invalid parameter",
        0x26 => "Invalid path size",
        0xFF => "General error",
        _ => "Unknown status",
    }
}

/// Declared data type of a tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Null,
    Bool,
    Sint,
    Int,
    Dint,
    Lint,
    Usint,
    Uint,
    Udint,
    Ulint,
    Real,
    Lreal,
    String,
    /// Structure or array marker.
    Structured,
    Unknown(u16),
}

impl WireType {
    /// Map an elementary type code.
    pub fn from_code(code: u16) -> Self {
        match code {
            0x00 => WireType::Null,
            0xC1 => WireType::Bool,
            0xC2 => WireType::Sint,
            0xC3 => WireType::Int,
            0xC4 => WireType::Dint,
            0xC5 => WireType::Lint,
            0xC6 => WireType::Usint,
            0xC7 => WireType::Uint,
            0xC8 => WireType::Udint,
            0xC9 => WireType::Ulint,
            0xCA => WireType::Real,
            0xCB => WireType::Lreal,
            0xD0 => WireType::String,
            TYPE_STRUCT | TYPE_STRUCT_ABBREVIATED => WireType::Structured,
            other => WireType::Unknown(other),
        }
    }

    /// The numeric type code.
    pub fn code(self) -> u16 {
        match self {
            WireType::Null => 0x00,
            WireType::Bool => 0xC1,
            WireType::Sint => 0xC2,
            WireType::Int => 0xC3,
            WireType::Dint => 0xC4,
            WireType::Lint => 0xC5,
            WireType::Usint => 0xC6,
            WireType::Uint => 0xC7,
            WireType::Udint => 0xC8,
            WireType::Ulint => 0xC9,
            WireType::Real => 0xCA,
            WireType::Lreal => 0xCB,
            WireType::String => 0xD0,
            WireType::Structured => TYPE_STRUCT,
            WireType::Unknown(code) => code,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WireType::Null => "NULL",
            WireType::Bool => "BOOL",
            WireType::Sint => "SINT",
            WireType::Int => "INT",
            WireType::Dint => "DINT",
            WireType::Lint => "LINT",
            WireType::Usint => "USINT",
            WireType::Uint => "UINT",
            WireType::Udint => "UDINT",
            WireType::Ulint => "ULINT",
            WireType::Real => "REAL",
            WireType::Lreal => "LREAL",
            WireType::String => "STRING",
            WireType::Structured => "STRUCT",
            WireType::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} ({})", self.code(), self.name())
    }
}

/// A tag value as read from the device, before conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    pub wire_type: WireType,
    pub data: Vec<u8>,
}

/// An encoded value ready for a Write Tag request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireValue {
    pub wire_type: WireType,
    pub elements: u16,
    pub data: Vec<u8>,
}

/// One entry of the controller symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub instance_id: u32,
    pub name: String,
    pub symbol_type: u16,
}

impl SymbolEntry {
    /// Controller-internal symbols (system flag, `__` prefix, program and
    /// module scopes) that cannot be addressed as plain tags.
    pub fn is_system(&self) -> bool {
        self.symbol_type & SYMBOL_SYSTEM_FLAG != 0
            || self.name.starts_with("__")
            || self.name.contains(':')
    }

    /// Element type; [`WireType::Structured`] for structures.
    pub fn wire_type(&self) -> WireType {
        if self.symbol_type & SYMBOL_STRUCT_FLAG != 0 {
            WireType::Structured
        } else {
            WireType::from_code(self.symbol_type & SYMBOL_TYPE_MASK)
        }
    }

    /// Number of array dimensions (0 for scalars).
    pub fn dimensions(&self) -> u8 {
        ((self.symbol_type & SYMBOL_DIMS_MASK) >> SYMBOL_DIMS_SHIFT) as u8
    }
}

/// One page of a symbol enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolPage {
    pub entries: Vec<SymbolEntry>,
    /// The device answered with a partial transfer; continue after the last instance.
    pub more: bool,
}

/// Encapsulation header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncapsulationHeader {
    pub command: u16,
    pub length: u16,
    pub session_handle: u32,
    pub status: u32,
    pub sender_context: [u8; 8],
}

impl EncapsulationHeader {
    pub fn decode(buf: &[u8]) -> Result<Self, CipError> {
        let mut cursor = Cursor::new(buf);
        let command = cursor.u16()?;
        let length = cursor.u16()?;
        let session_handle = cursor.u32()?;
        let status = cursor.u32()?;
        let mut sender_context = [0u8; 8];
        sender_context.copy_from_slice(cursor.take(8)?);
        // options
        cursor.u32()?;

        Ok(Self {
            command,
            length,
            session_handle,
            status,
            sender_context,
        })
    }
}

/// Frame `data` behind an encapsulation header.
pub fn encapsulate(command: u16, session_handle: u32, data: &[u8]) -> Result<Vec<u8>, CipError> {
    let length = u16::try_from(data.len()).map_err(|_| CipError::TooLarge(data.len()))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + data.len());
    frame.extend_from_slice(&command.to_le_bytes());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&session_handle.to_le_bytes());
    frame.extend_from_slice(&0u32.to_le_bytes());
    frame.extend_from_slice(&[0u8; 8]);
    frame.extend_from_slice(&0u32.to_le_bytes());
    frame.extend_from_slice(data);
    Ok(frame)
}

/// RegisterSession payload: protocol version 1, no options.
pub fn register_session_data() -> [u8; 4] {
    [0x01, 0x00, 0x00, 0x00]
}

/// Wrap a CIP request in the SendRRData common packet format.
pub fn send_rr_data(cip: &[u8]) -> Result<Vec<u8>, CipError> {
    let length = u16::try_from(cip.len()).map_err(|_| CipError::TooLarge(cip.len()))?;

    let mut data = Vec::with_capacity(16 + cip.len());
    // interface handle, timeout
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&2u16.to_le_bytes());
    data.extend_from_slice(&ITEM_NULL_ADDRESS.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&ITEM_UNCONNECTED_DATA.to_le_bytes());
    data.extend_from_slice(&length.to_le_bytes());
    data.extend_from_slice(cip);
    Ok(data)
}

/// Extract the unconnected data item from a SendRRData reply.
pub fn unwrap_rr_data(data: &[u8]) -> Result<&[u8], CipError> {
    let mut cursor = Cursor::new(data);
    cursor.take(6)?;
    let items = cursor.u16()?;

    for _ in 0..items {
        let item_type = cursor.u16()?;
        let length = cursor.u16()? as usize;
        let body = cursor.take(length)?;
        if item_type == ITEM_UNCONNECTED_DATA {
            return Ok(body);
        }
    }

    Err(CipError::Malformed(
        "no unconnected data item in reply".to_string(),
    ))
}

/// Encode a tag name as ANSI extended symbolic segments, one per `.` member.
pub fn symbolic_path(name: &str) -> Result<Vec<u8>, CipError> {
    let mut path = Vec::with_capacity(name.len() + 4);

    for segment in name.split('.') {
        let len = u8::try_from(segment.len())
            .ok()
            .filter(|len| *len > 0)
            .ok_or_else(|| CipError::InvalidPath(name.to_string()))?;

        path.push(SEGMENT_SYMBOLIC);
        path.push(len);
        path.extend_from_slice(segment.as_bytes());
        if len % 2 == 1 {
            path.push(0);
        }
    }

    Ok(path)
}

fn request(service: u8, path: &[u8], data: &[u8]) -> Result<Vec<u8>, CipError> {
    let words = u8::try_from(path.len() / 2).map_err(|_| CipError::TooLarge(path.len()))?;

    let mut req = Vec::with_capacity(2 + path.len() + data.len());
    req.push(service);
    req.push(words);
    req.extend_from_slice(path);
    req.extend_from_slice(data);
    Ok(req)
}

/// Read Tag request for `elements` elements of `name`.
pub fn read_tag_request(name: &str, elements: u16) -> Result<Vec<u8>, CipError> {
    request(
        SERVICE_READ_TAG,
        &symbolic_path(name)?,
        &elements.to_le_bytes(),
    )
}

/// Write Tag request carrying an encoded value.
pub fn write_tag_request(name: &str, value: &WireValue) -> Result<Vec<u8>, CipError> {
    let mut data = Vec::with_capacity(4 + value.data.len());
    data.extend_from_slice(&value.wire_type.code().to_le_bytes());
    data.extend_from_slice(&value.elements.to_le_bytes());
    data.extend_from_slice(&value.data);

    request(SERVICE_WRITE_TAG, &symbolic_path(name)?, &data)
}

/// Get Instance Attribute List on the Symbol class, starting at `start_instance`,
/// asking for attribute 1 (name) and 2 (type).
pub fn list_symbols_request(start_instance: u32) -> Result<Vec<u8>, CipError> {
    let mut path = vec![SEGMENT_CLASS_8, CLASS_SYMBOL];
    match u16::try_from(start_instance) {
        Ok(instance) => {
            path.extend_from_slice(&[SEGMENT_INSTANCE_16, 0x00]);
            path.extend_from_slice(&instance.to_le_bytes());
        }
        Err(_) => {
            path.extend_from_slice(&[SEGMENT_INSTANCE_32, 0x00]);
            path.extend_from_slice(&start_instance.to_le_bytes());
        }
    }

    let mut data = Vec::with_capacity(6);
    data.extend_from_slice(&2u16.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&2u16.to_le_bytes());

    request(SERVICE_GET_INSTANCE_ATTRIBUTE_LIST, &path, &data)
}

/// A decoded CIP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipReply<'a> {
    pub service: u8,
    pub status: u8,
    pub data: &'a [u8],
}

impl<'a> CipReply<'a> {
    pub fn decode(buf: &'a [u8]) -> Result<Self, CipError> {
        let mut cursor = Cursor::new(buf);
        let service = cursor.u8()?;
        cursor.u8()?;
        let status = cursor.u8()?;
        let extended_words = cursor.u8()? as usize;
        cursor.take(extended_words * 2)?;

        Ok(Self {
            service,
            status,
            data: cursor.rest(),
        })
    }

    fn expect_service(buf: &'a [u8], service: u8, allow_partial: bool) -> Result<Self, CipError> {
        let reply = Self::decode(buf)?;

        if reply.service != service | REPLY_FLAG {
            return Err(CipError::Malformed(format!(
                "unexpected reply service 0x{:02X} (expected 0x{:02X})",
                reply.service,
                service | REPLY_FLAG
            )));
        }

        match reply.status {
            STATUS_SUCCESS => Ok(reply),
            STATUS_PARTIAL_TRANSFER if allow_partial => Ok(reply),
            status => Err(CipError::status(status)),
        }
    }
}

/// Parse a Read Tag reply into its type code and value bytes.
pub fn parse_read_tag_reply(buf: &[u8]) -> Result<RawValue, CipError> {
    let reply = CipReply::expect_service(buf, SERVICE_READ_TAG, false)?;
    let mut cursor = Cursor::new(reply.data);
    let code = cursor.u16()?;

    if code == TYPE_STRUCT || code == TYPE_STRUCT_ABBREVIATED {
        // structure handle
        cursor.u16()?;
    }

    Ok(RawValue {
        wire_type: WireType::from_code(code),
        data: cursor.rest().to_vec(),
    })
}

/// Parse a Write Tag reply, returning the general status.
pub fn parse_write_tag_reply(buf: &[u8]) -> Result<u8, CipError> {
    CipReply::expect_service(buf, SERVICE_WRITE_TAG, false).map(|reply| reply.status)
}

/// Parse one page of a symbol enumeration.
pub fn parse_list_symbols_reply(buf: &[u8]) -> Result<SymbolPage, CipError> {
    let reply = CipReply::expect_service(buf, SERVICE_GET_INSTANCE_ATTRIBUTE_LIST, true)?;
    let mut cursor = Cursor::new(reply.data);
    let mut entries = Vec::new();

    while !cursor.is_empty() {
        let instance_id = cursor.u32()?;
        let name_len = cursor.u16()? as usize;
        let name = String::from_utf8_lossy(cursor.take(name_len)?).into_owned();
        let symbol_type = cursor.u16()?;

        entries.push(SymbolEntry {
            instance_id,
            name,
            symbol_type,
        });
    }

    Ok(SymbolPage {
        entries,
        more: reply.status == STATUS_PARTIAL_TRANSFER,
    })
}

/// Bounds-checked little-endian reader.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CipError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.buf.len());
        match end {
            Some(end) => {
                let slice = &self.buf[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(CipError::Malformed(format!(
                "need {} bytes at offset {}, only {} available",
                n,
                self.pos,
                self.buf.len().saturating_sub(self.pos)
            ))),
        }
    }

    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos.min(self.buf.len())..];
        self.pos = self.buf.len();
        slice
    }

    fn u8(&mut self) -> Result<u8, CipError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, CipError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, CipError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbolic_path_padding() {
        // odd length gets a pad byte
        assert_eq!(
            symbolic_path("Tmp").unwrap(),
            vec![0x91, 0x03, b'T', b'm', b'p', 0x00]
        );
        assert_eq!(symbolic_path("Ab").unwrap(), vec![0x91, 0x02, b'A', b'b']);
    }

    #[test]
    fn test_symbolic_path_members() {
        let path = symbolic_path("Motor.Speed").unwrap();
        assert_eq!(
            path,
            vec![
                0x91, 0x05, b'M', b'o', b't', b'o', b'r', 0x00, 0x91, 0x05, b'S', b'p', b'e',
                b'e', b'd', 0x00
            ]
        );
    }

    #[test]
    fn test_symbolic_path_rejects_empty_segment() {
        assert!(matches!(
            symbolic_path("Motor..Speed"),
            Err(CipError::InvalidPath(_))
        ));
        assert!(matches!(symbolic_path(""), Err(CipError::InvalidPath(_))));
    }

    #[test]
    fn test_read_tag_request_layout() {
        let req = read_tag_request("Count", 1).unwrap();
        assert_eq!(req[0], 0x4C);
        // "Count" is 5 chars: 2 header bytes + 5 + pad = 8 bytes = 4 words
        assert_eq!(req[1], 4);
        assert_eq!(&req[req.len() - 2..], &[0x01, 0x00]);
    }

    #[test]
    fn test_write_tag_request_layout() {
        let value = WireValue {
            wire_type: WireType::Dint,
            elements: 1,
            data: 1500i32.to_le_bytes().to_vec(),
        };
        let req = write_tag_request("SetPoint", &value).unwrap();

        assert_eq!(req[0], 0x4D);
        assert_eq!(req[1], 5);
        let data = &req[2 + 10..];
        assert_eq!(data, &[0xC4, 0x00, 0x01, 0x00, 0xDC, 0x05, 0x00, 0x00]);
    }

    #[test]
    fn test_list_symbols_request_instance_segments() {
        let req = list_symbols_request(0x0102).unwrap();
        assert_eq!(
            req,
            vec![0x55, 0x03, 0x20, 0x6B, 0x25, 0x00, 0x02, 0x01, 0x02, 0x00, 0x01, 0x00, 0x02, 0x00]
        );

        let req = list_symbols_request(0x0001_0000).unwrap();
        assert_eq!(req[1], 4);
        assert_eq!(&req[4..10], &[0x26, 0x00, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_encapsulation_roundtrip() {
        let frame = encapsulate(CMD_REGISTER_SESSION, 0, &register_session_data()).unwrap();
        assert_eq!(frame.len(), HEADER_LEN + 4);

        let header = EncapsulationHeader::decode(&frame[..HEADER_LEN]).unwrap();
        assert_eq!(header.command, CMD_REGISTER_SESSION);
        assert_eq!(header.length, 4);
        assert_eq!(header.session_handle, 0);
    }

    #[test]
    fn test_send_rr_data_unwraps() {
        let cip = [0xCC, 0x00, 0x00, 0x00, 0xC4, 0x00, 0x2A, 0x00, 0x00, 0x00];
        let data = send_rr_data(&cip).unwrap();
        assert_eq!(unwrap_rr_data(&data).unwrap(), &cip);
    }

    #[test]
    fn test_unwrap_rr_data_without_data_item() {
        let data = [0u8, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0];
        assert!(matches!(unwrap_rr_data(&data), Err(CipError::Malformed(_))));
    }

    #[test]
    fn test_parse_read_reply_dint() {
        let reply = [0xCC, 0x00, 0x00, 0x00, 0xC4, 0x00, 0x2A, 0x00, 0x00, 0x00];
        let raw = parse_read_tag_reply(&reply).unwrap();
        assert_eq!(raw.wire_type, WireType::Dint);
        assert_eq!(raw.data, vec![0x2A, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_parse_read_reply_struct_skips_handle() {
        let reply = [0xCC, 0x00, 0x00, 0x00, 0xA0, 0x02, 0xCE, 0x0F, 0x03, 0x00];
        let raw = parse_read_tag_reply(&reply).unwrap();
        assert_eq!(raw.wire_type, WireType::Structured);
        assert_eq!(raw.data, vec![0x03, 0x00]);
    }

    #[test]
    fn test_parse_read_reply_error_status() {
        // path destination unknown, one extended status word
        let reply = [0xCC, 0x00, 0x05, 0x01, 0x00, 0x00];
        let err = parse_read_tag_reply(&reply).unwrap_err();
        assert_eq!(err.status_code(), 0x05);
        assert!(err.to_string().contains("Path destination unknown"));
        assert!(!err.is_connection_fault());
    }

    #[test]
    fn test_parse_reply_wrong_service() {
        let reply = [0xCD, 0x00, 0x00, 0x00];
        assert!(matches!(
            parse_read_tag_reply(&reply),
            Err(CipError::Malformed(_))
        ));
        assert_eq!(parse_write_tag_reply(&reply).unwrap(), STATUS_SUCCESS);
    }

    #[test]
    fn test_parse_symbol_page() {
        let mut reply = vec![0xD5, 0x00, STATUS_PARTIAL_TRANSFER, 0x00];
        for (id, name, ty) in [(1u32, "Temperature", 0x00D0u16), (7, "Counts", 0x20C4)] {
            reply.extend_from_slice(&id.to_le_bytes());
            reply.extend_from_slice(&(name.len() as u16).to_le_bytes());
            reply.extend_from_slice(name.as_bytes());
            reply.extend_from_slice(&ty.to_le_bytes());
        }

        let page = parse_list_symbols_reply(&reply).unwrap();
        assert!(page.more);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].name, "Temperature");
        assert_eq!(page.entries[0].wire_type(), WireType::String);
        assert_eq!(page.entries[1].instance_id, 7);
        assert_eq!(page.entries[1].wire_type(), WireType::Dint);
        assert_eq!(page.entries[1].dimensions(), 1);
    }

    #[test]
    fn test_truncated_symbol_page() {
        let reply = [0xD5, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x09, 0x00, b'A'];
        assert!(matches!(
            parse_list_symbols_reply(&reply),
            Err(CipError::Malformed(_))
        ));
    }

    #[test]
    fn test_symbol_classification() {
        let symbol = |name: &str, symbol_type: u16| SymbolEntry {
            instance_id: 1,
            name: name.to_string(),
            symbol_type,
        };

        assert!(symbol("__Internal", 0x00C4).is_system());
        assert!(symbol("Program:MainProgram", 0x1068).is_system());
        assert!(symbol("Flag", 0x10C1).is_system());
        assert!(!symbol("Flag", 0x00C1).is_system());
        assert_eq!(symbol("Recipe", 0x8FCE).wire_type(), WireType::Structured);
        assert_eq!(symbol("Odd", 0x00E3).wire_type(), WireType::Unknown(0xE3));
    }

    #[test]
    fn test_wire_type_codes() {
        for code in [0x00, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xCB, 0xD0] {
            assert_eq!(WireType::from_code(code).code(), code);
        }
        assert_eq!(WireType::from_code(0x02A0), WireType::Structured);
        assert_eq!(WireType::Real.to_string(), "0xCA (REAL)");
    }
}
