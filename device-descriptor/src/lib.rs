#![cfg_attr(not(test), no_std)]

//! Declarative register map descriptions for memory-mapped peripheral devices.
//!
//! The [`device!`] macro turns a register listing into typed register structs
//! whose fields are read and written through [`Field`] accessors, so that bit
//! positions, widths and enum encodings live in a single place.

use core::{convert::TryFrom, marker::PhantomData};

pub trait RegisterWidthType: Copy {
    const WIDTH: u8;

    fn from_32(data: u32) -> Self;
    fn to_32(self) -> u32;
}

impl RegisterWidthType for u8 {
    const WIDTH: u8 = 8;

    fn from_32(data: u32) -> Self {
        debug_assert!(data <= u8::MAX as u32);
        data as u8
    }

    fn to_32(self) -> u32 {
        self as u32
    }
}

impl RegisterWidthType for u16 {
    const WIDTH: u8 = 16;

    fn from_32(data: u32) -> Self {
        debug_assert!(data <= u16::MAX as u32);
        data as u16
    }

    fn to_32(self) -> u32 {
        self as u32
    }
}

/// A register that can at least be read from the device.
pub trait ReadOnlyRegister<RWT: RegisterWidthType>: Proxy<RWT> + Copy {
    const ADDRESS: u8;
    const NAME: &'static str;
}

/// A register that may also be written. Writes go through a writer proxy so
/// that field updates compose before the result is sent to the device.
pub trait Register<RWT: RegisterWidthType>: ReadOnlyRegister<RWT> {
    type Writer: WriterProxy<RWT>;

    const DEFAULT_VALUE: RWT;

    /// Builds a register value starting from the hardware reset value.
    fn new(f: impl Fn(Self::Writer) -> Self::Writer) -> Self {
        Self::from_bits(f(Self::Writer::from_bits(Self::DEFAULT_VALUE)).bits())
    }

    /// Applies field updates on top of the current value.
    fn modify(self, f: impl Fn(Self::Writer) -> Self::Writer) -> Self {
        Self::from_bits(f(Self::Writer::from_bits(self.bits())).bits())
    }
}

pub trait Proxy<RWT: RegisterWidthType> {
    fn bits(&self) -> RWT;
    fn from_bits(bits: RWT) -> Self;
}

pub trait WriterProxy<RWT: RegisterWidthType>: Proxy<RWT> {
    fn write_bits(self, bits: RWT) -> Self;
    fn reset(self) -> Self;
}

/// A bit range of a register, bound to the data type that encodes it.
pub struct Field<const POS: u8, const WIDTH: u8, DataType, P, RWT> {
    _marker: PhantomData<(DataType, RWT)>,
    reg: P,
}

impl<const POS: u8, const WIDTH: u8, DataType, P, RWT> Field<POS, WIDTH, DataType, P, RWT>
where
    DataType: TryFrom<RWT> + Into<RWT>,
    P: Proxy<RWT>,
    RWT: RegisterWidthType,
{
    const _FIELD_IN_RANGE: () = assert!(POS + WIDTH <= RWT::WIDTH);

    pub const fn new(reg: P) -> Self {
        Field {
            _marker: PhantomData,
            reg,
        }
    }

    /// Extracts the raw field bits, shifted down to position 0.
    #[inline(always)]
    pub fn read_field_bits(&self) -> RWT {
        RWT::from_32((self.reg.bits().to_32() >> POS as u32) & ((1 << WIDTH) - 1))
    }

    /// Decodes the field. Returns `None` if the bit pattern has no
    /// representation in `DataType`.
    #[inline(always)]
    pub fn read(&self) -> Option<DataType> {
        DataType::try_from(self.read_field_bits()).ok()
    }
}

impl<const POS: u8, const WIDTH: u8, DataType, P, RWT> Field<POS, WIDTH, DataType, P, RWT>
where
    DataType: TryFrom<RWT> + Into<RWT>,
    P: WriterProxy<RWT>,
    RWT: RegisterWidthType,
{
    #[inline(always)]
    fn update_field(data: RWT, value: RWT) -> RWT {
        // value must fit the field
        debug_assert!(value.to_32() <= ((1 << WIDTH) - 1));

        let shifted_mask = ((1 << WIDTH) - 1) << POS;
        let masked_data = data.to_32() & !shifted_mask;

        RWT::from_32(masked_data | (value.to_32() << POS as u32))
    }

    /// Writes the field, returning the writer proxy for chaining.
    #[inline(always)]
    pub fn write(self, value: DataType) -> P {
        let bits = self.reg.bits();

        self.reg.write_bits(Self::update_field(bits, value.into()))
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! impl_fields {
    ($rwt:ty, $( $(#[$attr:meta])* $field:ident @ $start:literal .. $end:literal => $type:ty ),* $(,)?) => {
        $(
            $(#[$attr])*
            #[inline(always)]
            pub fn $field(self) -> $crate::Field<$start, { $end - $start }, $type, Self, $rwt> {
                $crate::Field::new(self)
            }
        )*
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! register {
    ($(#[$rattr:meta])* $reg:ident ($rwt:ident @ $addr:literal) {
        $( $(#[$fattr:meta])* $field:ident @ $start:literal .. $end:literal => $type:ty ),* $(,)?
    }) => {
        $(#[$rattr])*
        #[derive(Debug, Copy, Clone)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[must_use]
        pub struct $reg {
            value: $rwt,
        }

        impl $crate::ReadOnlyRegister<$rwt> for $reg {
            const ADDRESS: u8 = $addr;
            const NAME: &'static str = stringify!($reg);
        }

        impl $crate::Proxy<$rwt> for $reg {
            #[inline(always)]
            fn from_bits(bits: $rwt) -> Self {
                Self { value: bits }
            }

            #[inline(always)]
            fn bits(&self) -> $rwt {
                self.value
            }
        }

        impl $reg {
            $crate::impl_fields! { $rwt, $( $(#[$fattr])* $field @ $start .. $end => $type ),* }
        }
    };

    ($(#[$rattr:meta])* $reg:ident ($rwt:ident @ $addr:literal, default = $default:literal) {
        $( $(#[$fattr:meta])* $field:ident @ $start:literal .. $end:literal => $type:ty ),* $(,)?
    }) => {
        $crate::register!($(#[$rattr])* $reg ($rwt @ $addr) {
            $( $(#[$fattr])* $field @ $start .. $end => $type ),*
        });

        impl Default for $reg {
            #[inline(always)]
            fn default() -> Self {
                <$reg as $crate::Proxy<$rwt>>::from_bits($default)
            }
        }

        impl $crate::Register<$rwt> for $reg {
            type Writer = writer_proxies::$reg;

            const DEFAULT_VALUE: $rwt = $default;
        }

        impl writer_proxies::$reg {
            $crate::impl_fields! { $rwt, $( $(#[$fattr])* $field @ $start .. $end => $type ),* }
        }
    };

    ($(#[$rattr:meta])* $reg:ident $proto:tt {
        $( $(#[$fattr:meta])* $field:ident @ $start:literal .. $end:literal => $type:ident $({
            $( $(#[$vattr:meta])* $name:ident = $value:literal ),+ $(,)?
        })? ),* $(,)?
    }) => {
        $( $(
            #[derive(Debug, PartialEq, Eq, Copy, Clone)]
            #[cfg_attr(feature = "defmt", derive(defmt::Format))]
            pub enum $type {
                $( $(#[$vattr])* $name = $value ),+
            }

            impl core::convert::TryFrom<u16> for $type {
                type Error = u16;

                fn try_from(data: u16) -> Result<Self, Self::Error> {
                    match data {
                        $( $value => Ok($type::$name), )+
                        _ => Err(data),
                    }
                }
            }

            impl From<$type> for u16 {
                fn from(data: $type) -> u16 {
                    data as u16
                }
            }
        )? )*
        $crate::register!($(#[$rattr])* $reg $proto {
            $( $(#[$fattr])* $field @ $start .. $end => $type ),*
        });
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! writer_proxy {
    ($(#[$rattr:meta])* $reg:ident ($rwt:ident @ $addr:literal) {
        $( $(#[$fattr:meta])* $field:ident @ $start:literal .. $end:literal => $type:ty ),* $(,)?
    }) => {};

    ($(#[$rattr:meta])* $reg:ident ($rwt:ident @ $addr:literal, default = $default:literal) {
        $( $(#[$fattr:meta])* $field:ident @ $start:literal .. $end:literal => $type:ty ),* $(,)?
    }) => {
        #[must_use]
        pub struct $reg {
            bits: $rwt,
        }

        impl $crate::Proxy<$rwt> for $reg {
            #[inline(always)]
            fn from_bits(bits: $rwt) -> Self {
                Self { bits }
            }

            #[inline(always)]
            fn bits(&self) -> $rwt {
                self.bits
            }
        }

        impl $crate::WriterProxy<$rwt> for $reg {
            #[inline(always)]
            fn write_bits(self, bits: $rwt) -> Self {
                Self { bits }
            }

            #[inline(always)]
            fn reset(self) -> Self {
                Self { bits: $default }
            }
        }
    };

    ($(#[$rattr:meta])* $reg:ident $proto:tt {
        $( $(#[$fattr:meta])* $field:ident @ $start:literal .. $end:literal => $type:ident $({
            $( $(#[$vattr:meta])* $name:ident = $value:literal ),+ $(,)?
        })? ),* $(,)?
    }) => {
        $crate::writer_proxy!($(#[$rattr])* $reg $proto {
            $( $(#[$fattr])* $field @ $start .. $end => $type ),*
        });
    };
}

/// Declares the register map of a device.
///
/// Registers carry their width and address (`Status(u16 @ 0x00)`); registers
/// that may be written also carry their hardware reset value
/// (`default = 0x0002`). Fields are bit ranges bound to a primitive or to an
/// enum declared inline at the field's first use.
#[macro_export]
macro_rules! device {
    (
        $( $(#[$attr:meta])* $reg:ident ( $($proto:tt)* ) {
            $($fields:tt)*
        } )+
    ) => {
        #[doc(hidden)]
        pub mod writer_proxies {
            $(
                $crate::writer_proxy!( $reg ( $($proto)* ) { $($fields)* } );
            )+
        }

        $(
            $crate::register!( $(#[$attr])* $reg ( $($proto)* ) { $($fields)* } );
        )+
    };
}
