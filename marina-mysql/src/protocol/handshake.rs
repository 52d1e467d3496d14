use bytes::{Buf, Bytes};

use crate::error::{protocol_err, Error};
use crate::io::{BufExt, Decode};
use crate::protocol::auth::AuthPlugin;
use crate::protocol::capabilities::Capabilities;

/// The initial handshake packet (protocol version 10) sent by the server
/// immediately after the TCP connection is established.
#[derive(Debug)]
pub struct Handshake {
    pub protocol_version: u8,
    pub server_version: String,
    pub connection_id: u32,
    pub server_capabilities: Capabilities,
    pub server_default_collation: u8,
    pub status: u16,
    pub auth_plugin: Option<AuthPlugin>,
    pub auth_plugin_data: Bytes,
}

impl<'de> Decode<'de> for Handshake {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let protocol_version = buf.get_u8();

        if protocol_version != 10 {
            return Err(protocol_err!(
                "unsupported handshake protocol version {}; only protocol 10 is supported",
                protocol_version
            ));
        }

        let server_version = buf.get_str_nul()?;
        let connection_id = buf.get_u32_le();

        let mut auth_plugin_data = buf.get_bytes(8)?.to_vec();

        // filler
        buf.advance(1);

        let capabilities_1 = buf.get_u16_le() as u64;
        let server_default_collation = buf.get_u8();
        let status = buf.get_u16_le();
        let capabilities_2 = buf.get_u16_le() as u64;

        let auth_plugin_data_len = buf.get_u8();

        // 10 reserved bytes
        buf.advance(10);

        let capabilities_bits = capabilities_1 | (capabilities_2 << 16);
        let capabilities = Capabilities::from_bits_truncate(capabilities_bits);

        if capabilities.contains(Capabilities::PLUGIN_AUTH) || capabilities.contains(Capabilities::SECURE_CONNECTION) {
            let len = std::cmp::max(13, auth_plugin_data_len as i32 - 8) as usize;
            let part_2 = buf.get_bytes(len)?;
            auth_plugin_data.extend_from_slice(&part_2);
            // the last byte of the second part is a NUL terminator, not scramble data
            auth_plugin_data.truncate(auth_plugin_data.len().saturating_sub(1));
        }

        let auth_plugin = if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            let name = buf.get_str_nul().unwrap_or_default();
            AuthPlugin::from_name(&name)
        } else {
            None
        };

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            server_capabilities: Capabilities::from_bits_truncate(capabilities_bits),
            server_default_collation,
            status,
            auth_plugin,
            auth_plugin_data: Bytes::from(auth_plugin_data),
        })
    }
}
