use bytes::{Buf, Bytes};

use crate::error::{protocol_err, Error};
use crate::io::{BufExt, Decode, Encode};
use crate::protocol::auth::AuthPlugin;

/// `0xFE` sent mid-authentication: the server asks the client to restart
/// authentication using a different plugin and a fresh scramble.
#[derive(Debug)]
pub struct AuthSwitchRequest {
    pub plugin: AuthPlugin,
    pub data: Bytes,
}

impl<'de> Decode<'de> for AuthSwitchRequest {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let header = buf.get_u8();

        if header != 0xfe {
            return Err(protocol_err!(
                "expected AuthSwitchRequest (0xfe); received 0x{:x}",
                header
            ));
        }

        let plugin_name = buf.get_str_nul()?;
        let plugin = AuthPlugin::from_name(&plugin_name)
            .ok_or_else(|| protocol_err!("unsupported auth plugin: {}", plugin_name))?;

        // remaining bytes are the new seed, optionally NUL-terminated
        let data = buf.copy_to_bytes(buf.remaining());

        Ok(Self { plugin, data })
    }
}

/// The client's response to an `AuthSwitchRequest`: the raw scrambled token,
/// with no length prefix or NUL terminator.
#[derive(Debug)]
pub struct AuthSwitchResponse(pub Vec<u8>);

impl<'en> Encode<'en> for AuthSwitchResponse {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.extend_from_slice(&self.0);
    }
}
