//! Tagged response value and RESP (text protocol) command encoding.
//!
//! Mirrors the abstract callback-driven KV client contract: every completed call
//! resolves to one of these variants, never a raw byte stream.

use super::error::StoreError;

/// Result of one store call, as delivered to the caller of [`super::client::KvClient::call`].
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    Integer(i64),
    BulkString(Vec<u8>),
    SimpleString(Vec<u8>),
    Array(Vec<RespValue>),
    Null,
    Error(StoreError),
}

impl RespValue {
    pub fn as_bulk_str(&self) -> Option<&str> {
        match self {
            RespValue::BulkString(b) | RespValue::SimpleString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(i) => Some(*i),
            RespValue::BulkString(b) => std::str::from_utf8(b).ok()?.parse().ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }
}

/// Stringify one command argument the way the canonical value formatter does:
/// integers decimal, floats with default precision, strings as-is.
pub fn format_arg(arg: &CommandArg) -> String {
    match arg {
        CommandArg::Str(s) => s.clone(),
        CommandArg::Int(i) => i.to_string(),
        CommandArg::Float(f) => f.to_string(),
    }
}

#[derive(Debug, Clone)]
pub enum CommandArg {
    Str(String),
    Int(i64),
    Float(f64),
}

impl From<&str> for CommandArg {
    fn from(s: &str) -> Self {
        CommandArg::Str(s.to_string())
    }
}
impl From<String> for CommandArg {
    fn from(s: String) -> Self {
        CommandArg::Str(s)
    }
}
impl From<i64> for CommandArg {
    fn from(i: i64) -> Self {
        CommandArg::Int(i)
    }
}

/// Encode a command as an array of bulk strings, standard RESP text protocol:
/// `*N\r\n$len\r\n<bytes>\r\n...`.
pub fn encode_command(args: &[CommandArg]) -> Vec<u8> {
    let formatted: Vec<String> = args.iter().map(format_arg).collect();
    let mut out = format!("*{}\r\n", formatted.len()).into_bytes();
    for arg in &formatted {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_get_as_bulk_string_array() {
        let cmd = encode_command(&[CommandArg::from("GET"), CommandArg::from("chat_quota:u1")]);
        assert_eq!(
            cmd,
            b"*2\r\n$3\r\nGET\r\n$13\r\nchat_quota:u1\r\n".to_vec()
        );
    }

    #[test]
    fn encodes_integer_args_decimal() {
        let cmd = encode_command(&[CommandArg::from("INCRBY"), CommandArg::from(42i64)]);
        assert_eq!(cmd, b"*2\r\n$6\r\nINCRBY\r\n$2\r\n42\r\n".to_vec());
    }

    #[test]
    fn as_integer_parses_bulk_string() {
        let v = RespValue::BulkString(b"17".to_vec());
        assert_eq!(v.as_integer(), Some(17));
    }

    #[test]
    fn null_is_null() {
        assert!(RespValue::Null.is_null());
        assert!(!RespValue::Integer(0).is_null());
    }
}
