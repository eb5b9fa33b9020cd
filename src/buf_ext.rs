use bytes::Buf;

macro_rules! get_try_impl {
    ($try_getter: ident, $ty:ty, $getter: ident) => {
        fn $try_getter(&mut self) -> anyhow::Result<$ty> {
            if self.remaining() < size_of::<$ty>() {
                return Err(anyhow::anyhow!("buffer underflow"));
            }
            Ok(self.$getter())
        }
    }
}

/// Fallible getters for the wire format's fixed-width little-endian fields;
///  `bytes::Buf` itself only offers the panicking variants.
pub trait BufExt: Buf {
    get_try_impl!(try_get_u8, u8, get_u8);
    get_try_impl!(try_get_u32_le, u32, get_u32_le);
    get_try_impl!(try_get_f64_le, f64, get_f64_le);
}

impl<T: Buf> BufExt for T {}
