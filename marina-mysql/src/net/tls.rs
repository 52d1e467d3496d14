//! TLS upgrade (spec 4.3 "TLS upgrade"): sent after reading the initial
//! handshake and before the real `HandshakeResponse`, per the server's
//! advertised `CLIENT_SSL` capability and the caller's `MySqlSslMode`.

use crate::error::{tls_err, Error};
use crate::net::{MaybeTlsStream, Socket};
use crate::options::MySqlSslMode;

pub(crate) async fn upgrade(
    socket: Socket,
    host: &str,
    mode: MySqlSslMode,
    ca_file: Option<&std::path::Path>,
) -> Result<MaybeTlsStream, Error> {
    let accept_invalid_certs = matches!(mode, MySqlSslMode::Preferred | MySqlSslMode::Required);
    let accept_invalid_hostnames = !matches!(mode, MySqlSslMode::VerifyIdentity);

    #[cfg(feature = "tls-native-tls")]
    {
        let mut builder = native_tls::TlsConnector::builder();
        builder
            .danger_accept_invalid_certs(accept_invalid_certs)
            .danger_accept_invalid_hostnames(accept_invalid_hostnames);

        if let Some(ca_file) = ca_file {
            let pem = tokio::fs::read(ca_file).await?;
            let cert = native_tls::Certificate::from_pem(&pem).map_err(|e| tls_err!(e))?;
            builder.add_root_certificate(cert);
        }

        let connector: tokio_native_tls::TlsConnector =
            builder.build().map_err(|e| tls_err!(e))?.into();

        let stream = connector.connect(host, socket).await.map_err(|e| tls_err!(e))?;
        return Ok(MaybeTlsStream::NativeTls(Box::new(stream)));
    }

    #[cfg(all(feature = "tls-rustls", not(feature = "tls-native-tls")))]
    {
        use std::sync::Arc;

        use rustls::client::WebPkiServerVerifier;
        use rustls::{ClientConfig, RootCertStore};
        use rustls_pemfile::certs;
        use tokio_rustls::TlsConnector;

        use self::rustls_verify::{AcceptAnyServerCert, IgnoreHostname};

        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        if let Some(ca_file) = ca_file {
            let pem = tokio::fs::read(ca_file).await?;
            let mut reader = std::io::Cursor::new(pem);
            for cert in certs(&mut reader) {
                let cert = cert.map_err(|e| tls_err!(e))?;
                roots.add(cert).map_err(|e| tls_err!(e))?;
            }
        }

        let builder = ClientConfig::builder();

        // `disabled`/`preferred`/`required` accept any certificate chain;
        // `verify_ca` checks the chain but not the hostname it was issued
        // for; `verify_identity` is rustls's normal, fully-verified default
        // (spec 6: "verify modes {disabled, preferred, required, verify_ca,
        // verify_identity}").
        let config = if accept_invalid_certs {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
                .with_no_client_auth()
        } else if accept_invalid_hostnames {
            let verifier = WebPkiServerVerifier::builder(Arc::new(roots)).build().map_err(|e| tls_err!(e))?;
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(IgnoreHostname { verifier }))
                .with_no_client_auth()
        } else {
            builder.with_root_certificates(roots).with_no_client_auth()
        };

        let connector = TlsConnector::from(Arc::new(config));
        let server_name = rustls::pki_types::ServerName::try_from(host.to_owned())
            .map_err(|e| tls_err!(e))?;

        let stream = connector.connect(server_name, socket).await.map_err(|e| tls_err!(e))?;
        return Ok(MaybeTlsStream::Rustls(Box::new(stream)));
    }

    #[cfg(not(any(feature = "tls-native-tls", feature = "tls-rustls")))]
    {
        let _ = (socket, host, accept_invalid_certs, accept_invalid_hostnames, ca_file);
        Err(Error::Tls(
            "TLS was requested but marina was built without a `tls-native-tls`/`tls-rustls` feature".into(),
        ))
    }
}

/// Custom `rustls` server-certificate verifiers backing `ssl-mode=preferred`
/// (accept any chain) and `ssl-mode=verify_ca` (check the chain, ignore the
/// hostname). Grounded on `sqlx-core`'s own `DummyTlsVerifier`/
/// `NoHostnameTlsVerifier` (`sqlx-core/src/net/tls/tls_rustls.rs`); `rustls`
/// has no built-in equivalent of `native-tls`'s
/// `danger_accept_invalid_certs`/`danger_accept_invalid_hostnames` flags.
#[cfg(all(feature = "tls-rustls", not(feature = "tls-native-tls")))]
mod rustls_verify {
    use std::sync::Arc;

    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::client::WebPkiServerVerifier;
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{CertificateError, DigitallySignedStruct, Error as TlsError, SignatureScheme};

    #[derive(Debug)]
    pub(super) struct AcceptAnyServerCert;

    impl ServerCertVerifier for AcceptAnyServerCert {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, TlsError> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, TlsError> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, TlsError> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            Vec::new()
        }
    }

    #[derive(Debug)]
    pub(super) struct IgnoreHostname {
        pub(super) verifier: Arc<WebPkiServerVerifier>,
    }

    impl ServerCertVerifier for IgnoreHostname {
        fn verify_server_cert(
            &self,
            end_entity: &CertificateDer<'_>,
            intermediates: &[CertificateDer<'_>],
            server_name: &ServerName<'_>,
            ocsp_response: &[u8],
            now: UnixTime,
        ) -> Result<ServerCertVerified, TlsError> {
            match self.verifier.verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now) {
                Err(TlsError::InvalidCertificate(reason)) if reason == CertificateError::NotValidForName => {
                    Ok(ServerCertVerified::assertion())
                }
                other => other,
            }
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, TlsError> {
            self.verifier.verify_tls12_signature(message, cert, dss)
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, TlsError> {
            self.verifier.verify_tls13_signature(message, cert, dss)
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.verifier.supported_verify_schemes()
        }
    }
}
