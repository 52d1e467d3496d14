bitflags::bitflags! {
    /// Client/server capability flags exchanged during the handshake.
    ///
    /// The negotiated capability set is the bitwise AND of what the client requests
    /// and what the server advertises in the initial handshake packet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u64 {
        const LONG_PASSWORD = 1;
        const FOUND_ROWS = 2;
        const LONG_FLAG = 4;
        const CONNECT_WITH_DB = 8;
        const NO_SCHEMA = 16;
        const COMPRESS = 32;
        const ODBC = 64;
        const LOCAL_FILES = 128;
        const IGNORE_SPACE = 256;
        const PROTOCOL_41 = 512;
        const INTERACTIVE = 1024;
        const SSL = 2048;
        const IGNORE_SIGPIPE = 4096;
        const TRANSACTIONS = 8192;
        const RESERVED = 16384;
        const SECURE_CONNECTION = 32768;
        const MULTI_STATEMENTS = 1 << 16;
        const MULTI_RESULTS = 1 << 17;
        const PS_MULTI_RESULTS = 1 << 18;
        const PLUGIN_AUTH = 1 << 19;
        const CONNECT_ATTRS = 1 << 20;
        const PLUGIN_AUTH_LENENC_CLIENT_DATA = 1 << 21;
        const CAN_HANDLE_EXPIRED_PASSWORDS = 1 << 22;
        const SESSION_TRACK = 1 << 23;
        const DEPRECATE_EOF = 1 << 24;
        const ZSTD_COMPRESSION_ALGORITHM = 1 << 26;
        const SSL_VERIFY_SERVER_CERT = 1 << 30;
        const REMEMBER_OPTIONS = 1 << 31;

        /// Set on the historical "MySQL" protocol variant, which lacks the high 32
        /// capability bits entirely (contrast with MariaDB's own extended flags).
        const MYSQL = 1 << 32;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::PROTOCOL_41
            | Capabilities::IGNORE_SPACE
            | Capabilities::FOUND_ROWS
            | Capabilities::TRANSACTIONS
            | Capabilities::SECURE_CONNECTION
            | Capabilities::PLUGIN_AUTH
            | Capabilities::PLUGIN_AUTH_LENENC_CLIENT_DATA
            | Capabilities::MULTI_STATEMENTS
            | Capabilities::MULTI_RESULTS
            | Capabilities::PS_MULTI_RESULTS
            | Capabilities::DEPRECATE_EOF
            | Capabilities::SESSION_TRACK
    }
}
