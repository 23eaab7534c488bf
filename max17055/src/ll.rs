use device_descriptor::{ReadOnlyRegister, Register};
use embedded_hal::i2c::I2c;
use register_access::RegisterAccess;

/// Low level register transport. Registers are 16 bits wide and are
/// transferred least significant byte first, addressed by a single register
/// byte.
pub struct Max17055Interface<I> {
    pub i2c: I,
}

impl<I> Max17055Interface<I> {
    pub const DEVICE_ADDR: u8 = 0x36;

    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }
}

impl<I> RegisterAccess<u16> for Max17055Interface<I>
where
    I: I2c,
{
    type Error = I::Error;

    fn read_register<R: ReadOnlyRegister<u16>>(&mut self) -> Result<R, Self::Error> {
        let mut buffer = [0; 2];
        self.i2c
            .write_read(Self::DEVICE_ADDR, &[R::ADDRESS], &mut buffer)
            .map(|_| R::from_bits(u16::from_le_bytes(buffer)))
    }

    fn write_register<R: Register<u16>>(&mut self, reg: R) -> Result<(), Self::Error> {
        let [low, high] = reg.bits().to_le_bytes();
        self.i2c.write(Self::DEVICE_ADDR, &[R::ADDRESS, low, high])
    }
}
