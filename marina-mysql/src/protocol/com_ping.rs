use crate::io::Encode;

/// `COM_PING`: checks whether the server is alive; always answered with OK.
#[derive(Debug)]
pub struct ComPing;

impl<'en> Encode<'en> for ComPing {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.push(0x0e);
    }
}
