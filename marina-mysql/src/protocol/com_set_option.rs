use crate::io::{BufMutExt, Encode};

#[derive(Debug, Clone, Copy)]
#[repr(u16)]
pub enum SetOption {
    MultiStatementsOn = 0,
    MultiStatementsOff = 1,
}

/// `COM_SET_OPTION`: toggles a per-connection option, currently only
/// multi-statement support.
#[derive(Debug)]
pub struct ComSetOption {
    pub option: SetOption,
}

impl<'en> Encode<'en> for ComSetOption {
    fn encode_with(&self, buf: &mut Vec<u8>, _: ()) {
        buf.put_u8(0x1b);
        buf.put_u16_le(self.option as u16);
    }
}
