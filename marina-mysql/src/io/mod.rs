mod buf_ext;
mod buf_stream;
mod decode;
mod encode;

pub use buf_ext::{BufExt, BufMutExt};
pub use buf_stream::BufStream;
pub(crate) use buf_stream::{patch_u24_le, read_u24_le};
pub use decode::Decode;
pub use encode::Encode;
