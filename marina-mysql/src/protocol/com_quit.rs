use crate::io::Encode;

/// `COM_QUIT`: tells the server to close the connection cleanly. The server
/// does not reply.
#[derive(Debug)]
pub struct ComQuit;

impl<'en> Encode<'en> for ComQuit {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.push(0x01);
    }
}
