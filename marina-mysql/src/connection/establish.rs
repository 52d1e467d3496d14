//! The connection phase state machine (spec 4.4: `Connecting` →
//! `Authenticating` → `Idle`) plus TLS upgrade (spec 4.3) and auth-plugin
//! dispatch, including the `caching_sha2_password`/`sha256_password`
//! RSA full-auth path.

use bytes::Bytes;

use crate::error::{protocol_err, Error, MySqlDatabaseError};
use crate::io::{read_u24_le, BufStream, Decode, Encode};
use crate::net::{MaybeTlsStream, Socket};
use crate::options::{Compression, MySqlConnectOptions, MySqlSslMode};
use crate::protocol::auth::{rsa as auth_rsa, AuthPlugin, RsaPublicKeyCache};
use crate::protocol::{
    AuthSwitchRequest, AuthSwitchResponse, Capabilities, ErrPacket, Handshake, HandshakeResponse, OkPacket, SslRequest,
};

use super::stream::MySqlStream;

pub(crate) struct Established {
    pub(crate) stream: MySqlStream,
    pub(crate) server_version: String,
    pub(crate) connection_id: u32,
}

pub(crate) async fn establish(options: &MySqlConnectOptions, rsa_cache: &RsaPublicKeyCache) -> Result<Established, Error> {
    let socket = Socket::connect(options).await?;
    let mut pre = BufStream::new(socket);
    let mut seq = 0u8;

    let handshake: Handshake = Handshake::decode_with(read_packet_raw(&mut pre, &mut seq).await?, ())?;

    let mut wanted = Capabilities::default() | options.extra_client_flags;
    if options.database.is_some() {
        wanted |= Capabilities::CONNECT_WITH_DB;
    }
    if options.local_infile {
        wanted |= Capabilities::LOCAL_FILES;
    }
    if !options.connect_attrs.is_empty() {
        wanted |= Capabilities::CONNECT_ATTRS;
    }
    if !matches!(options.compression, Compression::None) {
        wanted |= Capabilities::COMPRESS;
    }
    if options.ssl_mode != MySqlSslMode::Disabled {
        wanted |= Capabilities::SSL;
    }

    let mut capabilities = (wanted & handshake.server_capabilities) | Capabilities::PROTOCOL_41;

    if !handshake.server_capabilities.contains(Capabilities::PROTOCOL_41) {
        return Err(protocol_err!("server does not support CLIENT_PROTOCOL_41"));
    }

    let wants_tls = options.ssl_mode != MySqlSslMode::Disabled;
    let server_has_ssl = handshake.server_capabilities.contains(Capabilities::SSL);

    if wants_tls && !server_has_ssl {
        if options.ssl_mode == MySqlSslMode::Preferred {
            capabilities.remove(Capabilities::SSL);
        } else {
            return Err(protocol_err!("server does not support TLS but ssl-mode requires it"));
        }
    }

    let maybe_tls = if capabilities.contains(Capabilities::SSL) {
        let mut payload = Vec::new();
        SslRequest { max_packet_size: 0xFF_FFFF, collation: options.collation }.encode_with(&mut payload, capabilities);
        write_packet_raw(&mut pre, &payload, &mut seq);
        pre.flush().await?;

        let socket = pre.into_inner();
        crate::net::tls::upgrade(socket, &options.host, options.ssl_mode, options.ssl_ca.as_deref()).await?
    } else {
        MaybeTlsStream::Plain(pre.into_inner())
    };

    let mut stream = MySqlStream::new(maybe_tls);
    stream.capabilities = capabilities;
    stream.set_seq(seq);
    stream.set_timeouts(options.read_timeout, options.write_timeout);

    let mut plugin = handshake.auth_plugin.unwrap_or(AuthPlugin::MySqlNativePassword);
    if let Some(name) = &options.auth_plugin_override {
        plugin = AuthPlugin::from_name(name).ok_or_else(|| protocol_err!("unsupported auth plugin override: {}", name))?;
    }
    let password = options.password.as_deref().unwrap_or("");
    let initial_response = plugin.initial_response(password, &handshake.auth_plugin_data);

    stream.write_packet(&HandshakeResponse {
        collation: options.collation,
        max_packet_size: 0xFF_FFFF,
        username: &options.username,
        database: options.database.as_deref(),
        auth_plugin: Some(plugin),
        auth_response: Some(&initial_response),
        connect_attrs: &options.connect_attrs,
    });
    stream.flush().await?;

    authenticate(&mut stream, options, rsa_cache, plugin, handshake.auth_plugin_data.clone()).await?;

    if capabilities.contains(Capabilities::COMPRESS) {
        stream.enable_compression(options.compression);
    }

    Ok(Established {
        server_version: handshake.server_version,
        connection_id: handshake.connection_id,
        stream,
    })
}

async fn read_packet_raw<S>(stream: &mut BufStream<S>, seq: &mut u8) -> Result<Bytes, Error>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let header = stream.read_raw(4).await?;
    let len = read_u24_le(&header[..3]) as usize;
    let got_seq = header[3];

    if got_seq != *seq {
        return Err(protocol_err!("packet sequence id desync during handshake: expected {}, received {}", seq, got_seq));
    }
    *seq = seq.wrapping_add(1);

    Ok(stream.read_raw(len).await?.freeze())
}

fn write_packet_raw<S>(stream: &mut BufStream<S>, payload: &[u8], seq: &mut u8)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    stream.wbuf.push(payload.len() as u8);
    stream.wbuf.push((payload.len() >> 8) as u8);
    stream.wbuf.push((payload.len() >> 16) as u8);
    stream.wbuf.push(*seq);
    stream.wbuf.extend_from_slice(payload);
    *seq = seq.wrapping_add(1);
}

async fn authenticate(
    stream: &mut MySqlStream,
    options: &MySqlConnectOptions,
    rsa_cache: &RsaPublicKeyCache,
    mut plugin: AuthPlugin,
    mut seed: Bytes,
) -> Result<(), Error> {
    let password = options.password.as_deref().unwrap_or("");

    loop {
        let packet = stream.recv_packet().await?;
        match packet.first().copied() {
            Some(0x00) => {
                let _ok = OkPacket::decode_with(packet, stream.capabilities)?;
                return Ok(());
            }
            Some(0xff) => {
                let err = ErrPacket::decode_with(packet, stream.capabilities)?;
                return Err(Error::Database(MySqlDatabaseError::from(err)));
            }
            Some(0xfe) => {
                let switch = AuthSwitchRequest::decode_with(packet, ())?;
                plugin = switch.plugin;
                seed = switch.data;

                let response = plugin.initial_response(password, &seed);
                stream.write_packet(&AuthSwitchResponse(response));
                stream.flush().await?;
            }
            Some(0x01) => match packet.get(1).copied() {
                Some(0x03) => continue,
                Some(0x04) => full_auth(stream, options, rsa_cache, plugin, &seed).await?,
                _ => {
                    let key = rsa_cache.insert(options.rsa_cache_key(), auth_more_data_payload(&packet))?;
                    send_encrypted_password(stream, plugin, password, &seed, &key).await?;
                }
            },
            other => {
                return Err(protocol_err!("unexpected byte {:?} during authentication", other));
            }
        }
    }
}

async fn full_auth(
    stream: &mut MySqlStream,
    options: &MySqlConnectOptions,
    rsa_cache: &RsaPublicKeyCache,
    plugin: AuthPlugin,
    seed: &[u8],
) -> Result<(), Error> {
    let password = options.password.as_deref().unwrap_or("");

    if stream.is_tls() {
        let mut payload = password.as_bytes().to_vec();
        payload.push(0);
        stream.write_raw(&payload);
        stream.flush().await?;
        return Ok(());
    }

    let key = match rsa_cache.get(&options.rsa_cache_key()) {
        Some(key) => key,
        None => {
            stream.write_raw(&[0x02]);
            stream.flush().await?;

            // the server's reply is itself an AuthMoreData packet (`0x01` tag
            // + PEM), same shape as the unprompted key push handled above
            let pem = stream.recv_packet().await?;
            rsa_cache.insert(options.rsa_cache_key(), auth_more_data_payload(&pem))?
        }
    };

    send_encrypted_password(stream, plugin, password, seed, &key).await
}

async fn send_encrypted_password(
    stream: &mut MySqlStream,
    plugin: AuthPlugin,
    password: &str,
    seed: &[u8],
    key: &rsa::RsaPublicKey,
) -> Result<(), Error> {
    let encrypted = match plugin {
        AuthPlugin::Sha256Password => auth_rsa::encrypt_pkcs1v15(password, seed, key)?,
        _ => auth_rsa::encrypt_oaep(password, seed, key)?,
    };

    stream.write_raw(&encrypted);
    stream.flush().await?;
    Ok(())
}

/// Strips the `0x01` AuthMoreData tag byte off a packet, leaving the actual
/// payload (here, a PEM-encoded RSA public key) behind.
fn auth_more_data_payload(packet: &[u8]) -> &[u8] {
    &packet[1..]
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::net::{MaybeTlsStream, Socket};
    use crate::options::MySqlConnectOptions;
    use crate::protocol::auth::{scramble_sha1, AuthPlugin};

    #[test]
    fn auth_more_data_payload_strips_leading_tag_byte() {
        let packet = b"\x01-----BEGIN PUBLIC KEY-----fake-----END PUBLIC KEY-----";
        let stripped = auth_more_data_payload(packet);

        assert!(!stripped.starts_with(b"\x01"));
        assert_eq!(stripped, &packet[1..]);
    }

    fn framed(seq: u8, payload: &[u8]) -> Vec<u8> {
        let len = payload.len();
        let mut out = vec![len as u8, (len >> 8) as u8, (len >> 16) as u8, seq];
        out.extend_from_slice(payload);
        out
    }

    fn mock_stream() -> (MySqlStream, tokio::io::DuplexStream) {
        let (socket, peer) = Socket::mock_pair();
        let mut stream = MySqlStream::new(MaybeTlsStream::Plain(socket));
        stream.capabilities = Capabilities::PROTOCOL_41 | Capabilities::SECURE_CONNECTION | Capabilities::PLUGIN_AUTH;
        (stream, peer)
    }

    #[tokio::test]
    async fn authenticate_returns_ok_on_ok_packet() {
        let (mut stream, mut peer) = mock_stream();

        let mut ok_payload = vec![0x00, 0x00, 0x00];
        ok_payload.extend_from_slice(&2u16.to_le_bytes());
        ok_payload.extend_from_slice(&0u16.to_le_bytes());
        peer.write_all(&framed(0, &ok_payload)).await.unwrap();

        let rsa_cache = RsaPublicKeyCache::default();
        let options = MySqlConnectOptions::new();
        let seed = Bytes::from_static(b"01234567890123456789");

        authenticate(&mut stream, &options, &rsa_cache, AuthPlugin::MySqlNativePassword, seed)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn authenticate_surfaces_err_packet_as_database_error() {
        let (mut stream, mut peer) = mock_stream();

        let mut err_payload = vec![0xff];
        err_payload.extend_from_slice(&1045u16.to_le_bytes());
        err_payload.push(b'#');
        err_payload.extend_from_slice(b"28000");
        err_payload.extend_from_slice(b"Access denied");
        peer.write_all(&framed(0, &err_payload)).await.unwrap();

        let rsa_cache = RsaPublicKeyCache::default();
        let options = MySqlConnectOptions::new();
        let seed = Bytes::from_static(b"01234567890123456789");

        let result = authenticate(&mut stream, &options, &rsa_cache, AuthPlugin::MySqlNativePassword, seed).await;
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[tokio::test]
    async fn authenticate_follows_auth_switch_request_and_rescrambles() {
        let (mut stream, mut peer) = mock_stream();

        let new_seed = b"abcdefghijklmnopqrst".to_vec();
        let mut switch_payload = vec![0xfe];
        switch_payload.extend_from_slice(b"mysql_native_password");
        switch_payload.push(0);
        switch_payload.extend_from_slice(&new_seed);
        peer.write_all(&framed(0, &switch_payload)).await.unwrap();

        let rsa_cache = RsaPublicKeyCache::default();
        let options = MySqlConnectOptions::new().password("hunter2");
        let initial_seed = Bytes::from_static(b"01234567890123456789");

        let handle = tokio::spawn(async move {
            authenticate(&mut stream, &options, &rsa_cache, AuthPlugin::MySqlNativePassword, initial_seed).await
        });

        // read the framed AuthSwitchResponse the client writes back and check
        // it rescrambled against the new seed, not the initial handshake one
        let mut header = [0u8; 4];
        peer.read_exact(&mut header).await.unwrap();
        let len = header[0] as usize | ((header[1] as usize) << 8) | ((header[2] as usize) << 16);
        let mut response = vec![0u8; len];
        peer.read_exact(&mut response).await.unwrap();

        assert_eq!(response, scramble_sha1("hunter2", &new_seed));

        // header.3 carries the response packet's own sequence id; the next
        // packet from the server must be stamped one past it
        let next_seq = header[3].wrapping_add(1);
        let mut ok_payload = vec![0x00, 0x00, 0x00];
        ok_payload.extend_from_slice(&2u16.to_le_bytes());
        ok_payload.extend_from_slice(&0u16.to_le_bytes());
        peer.write_all(&framed(next_seq, &ok_payload)).await.unwrap();

        handle.await.unwrap().unwrap();
    }
}
