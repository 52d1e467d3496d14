/// Encode a value into a packet payload buffer, given some context `C`.
///
/// Mirrors the teacher's `Encode<'en, C>` trait.
pub trait Encode<'en, C = ()> {
    fn encode_with(&self, buf: &mut Vec<u8>, context: C);

    fn encode(&self, buf: &mut Vec<u8>)
    where
        C: Default,
    {
        self.encode_with(buf, C::default())
    }
}
