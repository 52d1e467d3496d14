use crate::io::{BufMutExt, Encode};
use crate::protocol::auth::AuthPlugin;
use crate::protocol::capabilities::Capabilities;

/// The client's reply to the initial handshake: username, scrambled auth
/// response, optional default database, and the plugin name that produced
/// the response.
#[derive(Debug)]
pub struct HandshakeResponse<'a> {
    pub collation: u8,
    pub max_packet_size: u32,
    pub username: &'a str,
    pub database: Option<&'a str>,
    pub auth_plugin: Option<AuthPlugin>,
    pub auth_response: Option<&'a [u8]>,
    pub connect_attrs: &'a [(String, String)],
}

impl<'en> Encode<'en, Capabilities> for HandshakeResponse<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, capabilities: Capabilities) {
        buf.put_uint_le(capabilities.bits() as u64, 4);
        buf.put_uint_le(self.max_packet_size as u64, 4);
        buf.put_u8(self.collation);

        // 19 reserved bytes
        buf.extend_from_slice(&[0u8; 19]);

        if !capabilities.contains(Capabilities::MYSQL) {
            buf.put_uint_le((capabilities.bits() >> 32) as u64, 4);
        }

        buf.put_str_nul(self.username);

        if let Some(response) = self.auth_response {
            if capabilities.contains(Capabilities::PLUGIN_AUTH_LENENC_CLIENT_DATA) {
                buf.put_bytes_lenenc(response);
            } else if capabilities.contains(Capabilities::SECURE_CONNECTION) {
                buf.push(response.len() as u8);
                buf.extend_from_slice(response);
            } else {
                buf.extend_from_slice(response);
                buf.push(0);
            }
        } else {
            buf.push(0);
        }

        if capabilities.contains(Capabilities::CONNECT_WITH_DB) {
            buf.put_str_nul(self.database.unwrap_or_default());
        }

        if capabilities.contains(Capabilities::PLUGIN_AUTH) {
            buf.put_str_nul(self.auth_plugin.map(AuthPlugin::name).unwrap_or("mysql_native_password"));
        }

        if capabilities.contains(Capabilities::CONNECT_ATTRS) {
            let mut attrs_buf = Vec::new();
            for (k, v) in self.connect_attrs {
                attrs_buf.put_str_lenenc(k);
                attrs_buf.put_str_lenenc(v);
            }
            buf.put_bytes_lenenc(&attrs_buf);
        }
    }
}
