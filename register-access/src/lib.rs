#![no_std]

//! Register transfer traits that connect a [`device_descriptor`] register map
//! to a concrete bus implementation.

use device_descriptor::{ReadOnlyRegister, Register, RegisterWidthType};

/// Moves register values between the driver and the device.
pub trait RegisterAccess<RWT: RegisterWidthType> {
    type Error;

    fn read_register<R: ReadOnlyRegister<RWT>>(&mut self) -> Result<R, Self::Error>;

    fn write_register<R: Register<RWT>>(&mut self, reg: R) -> Result<(), Self::Error>;
}

/// Convenience extension to read a register from any [`RegisterAccess`]
/// implementation.
pub trait RegisterReader<RWT: RegisterWidthType>: ReadOnlyRegister<RWT> {
    fn read<A>(iface: &mut A) -> Result<Self, A::Error>
    where
        A: RegisterAccess<RWT>;
}

impl<RWT, R> RegisterReader<RWT> for R
where
    RWT: RegisterWidthType,
    R: ReadOnlyRegister<RWT>,
{
    fn read<A>(iface: &mut A) -> Result<Self, A::Error>
    where
        A: RegisterAccess<RWT>,
    {
        iface.read_register()
    }
}

/// Convenience extension to write a register value through any
/// [`RegisterAccess`] implementation.
pub trait RegisterWriter<RWT: RegisterWidthType>: Register<RWT> {
    fn write<A>(self, iface: &mut A) -> Result<(), A::Error>
    where
        A: RegisterAccess<RWT>;
}

impl<RWT, R> RegisterWriter<RWT> for R
where
    RWT: RegisterWidthType,
    R: Register<RWT>,
{
    fn write<A>(self, iface: &mut A) -> Result<(), A::Error>
    where
        A: RegisterAccess<RWT>,
    {
        iface.write_register(self)
    }
}
