//! Wire-format packet types (spec section 4).
//!
//! Each submodule owns one packet or packet family: encode for
//! client-to-server packets, decode for server-to-client ones, both where a
//! packet can flow either way (e.g. `AuthSwitchResponse`/`Request`).

pub mod auth;

mod auth_switch;
mod capabilities;
mod column_count;
mod column_def;
mod com_init_db;
mod com_ping;
mod com_query;
mod com_quit;
mod com_set_option;
mod com_stmt_close;
mod com_stmt_execute;
mod com_stmt_fetch;
mod com_stmt_prepare;
mod com_stmt_prepare_ok;
mod com_stmt_reset;
mod com_stmt_send_long_data;
mod eof;
mod err;
mod field;
mod handshake;
mod handshake_response;
mod local_infile_request;
mod ok;
mod row;
mod ssl_request;
mod status;
mod type_id;

pub use auth_switch::{AuthSwitchRequest, AuthSwitchResponse};
pub use capabilities::Capabilities;
pub use column_count::ColumnCount;
pub use column_def::ColumnDef;
pub use com_init_db::ComInitDb;
pub use com_ping::ComPing;
pub use com_query::ComQuery;
pub use com_quit::ComQuit;
pub use com_set_option::{ComSetOption, SetOption};
pub use com_stmt_close::ComStmtClose;
pub use com_stmt_execute::ComStmtExecute;
pub use com_stmt_fetch::ComStmtFetch;
pub use com_stmt_prepare::ComStmtPrepare;
pub use com_stmt_prepare_ok::ComStmtPrepareOk;
pub use com_stmt_reset::ComStmtReset;
pub use com_stmt_send_long_data::ComStmtSendLongData;
pub use eof::EofPacket;
pub use err::ErrPacket;
pub use field::FieldFlags;
pub use handshake::Handshake;
pub use handshake_response::HandshakeResponse;
pub use local_infile_request::LocalInfileRequest;
pub use ok::OkPacket;
pub use row::{decode_binary_row, decode_text_row};
pub use ssl_request::SslRequest;
pub use status::Status;
pub use type_id::TypeId;

/// The three terminal responses a command phase can end in (spec 4.4).
#[derive(Debug)]
pub enum GenericResponse {
    Ok(OkPacket),
    Err(ErrPacket),
    Eof(EofPacket),
}

/// Peek at the first byte of a packet payload and classify it without
/// consuming the buffer, used to dispatch the `Command` state's first
/// response byte (spec 4.4).
pub fn classify_response_header(first_byte: u8, payload_len: usize, deprecate_eof: bool) -> ResponseKind {
    match first_byte {
        0x00 => ResponseKind::Ok,
        0xff => ResponseKind::Err,
        0xfe if payload_len < 9 && deprecate_eof => ResponseKind::Ok,
        0xfe if payload_len < 9 => ResponseKind::Eof,
        0xfb => ResponseKind::LocalInfile,
        _ => ResponseKind::ColumnCount,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Ok,
    Err,
    Eof,
    LocalInfile,
    ColumnCount,
}
