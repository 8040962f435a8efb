//! # Little-endian field access
//!
//! ACPI structures are byte-packed and little-endian. Instead of casting
//! pointers onto `#[repr(C, packed)]` structs, records are read field by field
//! from owned buffers with explicit bounds checks. Use
//! `#[derive(LeLayout)]` (from `utils-layout-derive`) to describe a record by
//! field offsets.

pub use utils_layout_derive::LeLayout;

/// A single fixed-width value stored little-endian at a byte offset.
pub trait LeField: Sized {
    /// Width of the value in bytes.
    const SIZE: usize;

    /// Read the value at `offset`; `None` if it does not fit in `bytes`.
    fn read_le(bytes: &[u8], offset: usize) -> Option<Self>;

    /// Write the value at `offset`; `None` if it does not fit in `out`.
    fn write_le(&self, out: &mut [u8], offset: usize) -> Option<()>;
}

/// A fixed-layout record made of [`LeField`]s.
pub trait LeLayout: Sized {
    /// Encoded size: the end of the furthest field.
    const LEN: usize;

    /// Decode from the start of `bytes`.
    fn read_le(bytes: &[u8]) -> Option<Self>;

    /// Encode into the start of `out`.
    fn write_le(&self, out: &mut [u8]) -> Option<()>;

    /// Encode into a freshly allocated buffer of exactly [`Self::LEN`] bytes.
    fn to_le_vec(&self) -> Vec<u8> {
        let mut out = vec![0; Self::LEN];
        // LEN covers every field end, so this cannot run out of room.
        let written = self.write_le(&mut out);
        debug_assert!(written.is_some());
        out
    }
}

macro_rules! le_int {
    ($($t:ty),* $(,)?) => {$(
        impl LeField for $t {
            const SIZE: usize = size_of::<$t>();

            #[inline]
            fn read_le(bytes: &[u8], offset: usize) -> Option<Self> {
                let end = offset.checked_add(Self::SIZE)?;
                let s = bytes.get(offset..end)?;
                Some(<$t>::from_le_bytes(s.try_into().ok()?))
            }

            #[inline]
            fn write_le(&self, out: &mut [u8], offset: usize) -> Option<()> {
                let end = offset.checked_add(Self::SIZE)?;
                out.get_mut(offset..end)?.copy_from_slice(&self.to_le_bytes());
                Some(())
            }
        }
    )*};
}

le_int!(u8, u16, u32, u64);

impl<const N: usize> LeField for [u8; N] {
    const SIZE: usize = N;

    #[inline]
    fn read_le(bytes: &[u8], offset: usize) -> Option<Self> {
        let end = offset.checked_add(N)?;
        bytes.get(offset..end)?.try_into().ok()
    }

    #[inline]
    fn write_le(&self, out: &mut [u8], offset: usize) -> Option<()> {
        let end = offset.checked_add(N)?;
        out.get_mut(offset..end)?.copy_from_slice(self);
        Some(())
    }
}

/// Implement [`LeField`] for a `bitfield-struct` type through its backing integer.
macro_rules! le_bits {
    ($t:ty, $repr:ty) => {
        impl $crate::le::LeField for $t {
            const SIZE: usize = size_of::<$repr>();

            #[inline]
            fn read_le(bytes: &[u8], offset: usize) -> Option<Self> {
                <$repr as $crate::le::LeField>::read_le(bytes, offset).map(<$t>::from_bits)
            }

            #[inline]
            fn write_le(&self, out: &mut [u8], offset: usize) -> Option<()> {
                $crate::le::LeField::write_le(&self.into_bits(), out, offset)
            }
        }
    };
}

pub(crate) use le_bits;
