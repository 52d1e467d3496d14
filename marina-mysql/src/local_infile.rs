//! `LOAD DATA LOCAL INFILE` streaming (spec 4.7).

use tokio::io::AsyncReadExt;

use crate::connection::stream::MySqlStream;
use crate::error::Error;
use crate::options::MySqlConnectOptions;

/// Packets are capped well under the 16 MiB frame boundary; there's no
/// benefit to pushing closer to the limit and it keeps memory use modest
/// for large files.
const CHUNK_SIZE: usize = 1 << 20;

/// Responds to a server's `0xFB filename` request.
///
/// Policy is opt-in per connection (spec 4.7: "implementations must require
/// explicit opt-in per connection"). When disabled, the empty terminator is
/// sent immediately without touching the filesystem; the server then reports
/// the failure as an `ERR_Packet`.
pub(crate) async fn handle(stream: &mut MySqlStream, options: &MySqlConnectOptions, filename: &str) -> Result<(), Error> {
    if !options.local_infile {
        stream.write_raw(&[]);
        stream.flush().await?;
        return Ok(());
    }

    let mut file = tokio::fs::File::open(filename).await?;
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        stream.write_raw(&buf[..n]);
        stream.flush().await?;
    }

    stream.write_raw(&[]);
    stream.flush().await?;
    Ok(())
}
