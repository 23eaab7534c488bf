#![cfg_attr(not(test), no_std)]

//! MAX17055 fuel gauge driver.
//!
//! The driver talks to the gauge over I2C, loads the EZ battery model after a
//! power-on reset and converts raw register readings into physical units
//! scaled by the sense resistor value.

pub mod descriptors;
pub mod ll;

use embedded_hal::{delay::DelayNs, i2c::I2c};

use device_descriptor::{Proxy, Register};
use register_access::{RegisterReader, RegisterWriter};

use crate::{descriptors::*, ll::Max17055Interface};

pub use crate::descriptors::{ModelId, VChg};

/// Number of polls before giving up on a gauge state transition.
const POLL_ATTEMPTS: u32 = 100;
const POLL_INTERVAL_MS: u32 = 10;

/// Time for the gauge to settle after restoring learned capacity values.
const RESTORE_SETTLE_MS: u32 = 350;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigIssue {
    /// Empty voltage does not fit the 10mV/LSB VEmpty field.
    VEmptyRange,
    /// Recovery voltage does not fit the 40mV/LSB VEmpty field.
    VRecoveryRange,
    /// The sense resistor value is zero or negative.
    SenseResistor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C communication error
    Transfer(E),
    /// The gauge did not reach the expected state in time
    Timeout,
    /// The battery configuration is not representable
    Config(ConfigIssue),
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Transfer(error)
    }
}

/// Conversion factors between raw register values and physical units.
///
/// Capacity and current scale with the sense resistor, the other factors are
/// fixed by the register LSB weights.
///
/// ```rust
/// use max17055::Scaling;
///
/// let scaling = Scaling::new(0.01);
///
/// assert_eq!(scaling.capacity_to_mah(12000), 6000.0);
/// assert_eq!(scaling.mah_to_capacity(6000.0), 12000);
/// assert_eq!(scaling.current_to_ma(640), 640.0 * (1.5625e-3 / 0.01));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Scaling {
    /// mAh per capacity LSB
    pub capacity_mah: f32,
    /// mA per current LSB
    pub current_ma: f32,
    /// V per voltage LSB
    pub voltage_v: f32,
    /// hours per time LSB
    pub time_hours: f32,
    /// % per percentage LSB
    pub percentage: f32,
}

impl Scaling {
    pub fn new(r_sense_ohms: f32) -> Self {
        Self {
            capacity_mah: 5e-3 / r_sense_ohms,
            current_ma: 1.5625e-3 / r_sense_ohms,
            voltage_v: 7.8125e-5,
            time_hours: 5.625 / 3600.0,
            percentage: 1.0 / 256.0,
        }
    }

    pub fn capacity_to_mah(self, raw: u16) -> f32 {
        raw as f32 * self.capacity_mah
    }

    pub fn mah_to_capacity(self, mah: f32) -> u16 {
        (mah / self.capacity_mah) as u16
    }

    pub fn current_to_ma(self, raw: u16) -> f32 {
        (raw as i16) as f32 * self.current_ma
    }

    pub fn ma_to_current(self, ma: f32) -> u16 {
        ((ma / self.current_ma) as i16) as u16
    }

    pub fn voltage_to_v(self, raw: u16) -> f32 {
        raw as f32 * self.voltage_v
    }

    pub fn time_to_hours(self, raw: u16) -> f32 {
        raw as f32 * self.time_hours
    }

    pub fn percentage(self, raw: u16) -> f32 {
        raw as f32 * self.percentage
    }

    pub fn temperature_to_c(self, raw: u16) -> f32 {
        (raw as i16) as f32 * self.percentage
    }

    /// Converts one byte of the MaxMinCurr register. The peak current LSB is
    /// 256 times the current register LSB.
    pub fn peak_current_to_ma(self, raw: u8) -> f32 {
        (raw as i8) as f32 * self.current_ma * 256.0
    }
}

/// Battery parameters the EZ model is configured from.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryConfig {
    pub capacity_mah: u16,
    pub v_empty_mv: u16,
    pub v_recovery_mv: u16,
    pub model: ModelId,
    /// Set for cells charged above 4.275V.
    pub high_voltage_charge: bool,
    pub r_sense_ohms: f32,
}

impl BatteryConfig {
    pub const DEFAULT: Self = Self {
        capacity_mah: 2000,
        v_empty_mv: 3300,
        v_recovery_mv: 3880,
        model: ModelId::Generic,
        high_voltage_charge: false,
        r_sense_ohms: 0.01,
    };
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Raw values of the registers the gauge learns over charge cycles. Save
/// these periodically and restore them after a power loss to avoid restarting
/// the learning from scratch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LearnedParams {
    pub rcomp0: u16,
    pub temp_co: u16,
    pub full_cap_rep: u16,
    pub cycles: u16,
    pub full_cap_nom: u16,
}

pub struct Max17055<I> {
    iface: Max17055Interface<I>,
    config: BatteryConfig,
    scaling: Scaling,
}

impl<I> Max17055<I> {
    /// Creates a driver with the default 2000mAh battery configuration.
    pub fn new(i2c: I) -> Self {
        Self::with_config(i2c, BatteryConfig::DEFAULT)
    }

    /// Creates a driver with the default configuration and the given design
    /// capacity.
    pub fn with_capacity(i2c: I, capacity_mah: u16) -> Self {
        Self::with_config(
            i2c,
            BatteryConfig {
                capacity_mah,
                ..BatteryConfig::DEFAULT
            },
        )
    }

    pub fn with_config(i2c: I, config: BatteryConfig) -> Self {
        Self {
            iface: Max17055Interface::new(i2c),
            scaling: Scaling::new(config.r_sense_ohms),
            config,
        }
    }

    pub fn config(&self) -> &BatteryConfig {
        &self.config
    }

    pub fn scaling(&self) -> Scaling {
        self.scaling
    }

    /// Releases the I2C bus.
    pub fn free(self) -> I {
        self.iface.i2c
    }

    fn validate_config(&self) -> Result<(), ConfigIssue> {
        if self.config.v_empty_mv / 10 > 0x1FF {
            return Err(ConfigIssue::VEmptyRange);
        }
        if self.config.v_recovery_mv / 40 > 0x7F {
            return Err(ConfigIssue::VRecoveryRange);
        }
        if !(self.config.r_sense_ohms > 0.0) {
            return Err(ConfigIssue::SenseResistor);
        }

        Ok(())
    }
}

impl<I> Max17055<I>
where
    I: I2c,
{
    fn read_reg<R: RegisterReader<u16>>(&mut self) -> Result<R, Error<I::Error>> {
        R::read(&mut self.iface).map_err(Error::Transfer)
    }

    fn write_reg<R: RegisterWriter<u16>>(&mut self, reg: R) -> Result<(), Error<I::Error>> {
        reg.write(&mut self.iface).map_err(Error::Transfer)
    }

    /// Loads the battery model if the gauge has gone through a power-on
    /// reset since the model was last loaded.
    ///
    /// Returns whether the model was loaded. When the gauge has remained
    /// powered, its learned state is better than a fresh model and the
    /// register writes are skipped entirely.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<I::Error>> {
        self.validate_config().map_err(Error::Config)?;

        let status = self.read_reg::<Status>()?;
        if status.por().read() != Some(PowerOnReset::Reset) {
            logger::debug!("No power-on reset, keeping gauge state");
            return Ok(false);
        }

        logger::info!("Power-on reset detected, loading battery model");
        self.wait_data_ready(delay)?;

        let hib_cfg = self.force_exit_hibernation()?;

        self.write_ez_config()?;
        self.wait_model_refresh(delay)?;

        self.write_reg(FilterCfg::default())?;
        self.write_reg(RelaxCfg::default())?;

        self.write_reg(hib_cfg)?;
        self.reset_por()?;

        Ok(true)
    }

    fn wait_data_ready(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<I::Error>> {
        for _ in 0..POLL_ATTEMPTS {
            let fstat = self.read_reg::<FStat>()?;
            if fstat.dnr().read() == Some(DataNotReady::Ready) {
                return Ok(());
            }
            delay.delay_ms(POLL_INTERVAL_MS);
        }

        logger::warn!("Timeout waiting for first measurements");
        Err(Error::Timeout)
    }

    /// Wakes the gauge so that model registers can be written, returning the
    /// hibernate configuration to restore afterwards.
    fn force_exit_hibernation(&mut self) -> Result<HibCfg, Error<I::Error>> {
        let hib_cfg = self.read_reg::<HibCfg>()?;

        self.write_reg(Command::new(|w| w.command().write(CommandKind::SoftWakeup)))?;
        self.write_reg(HibCfg::new(|w| {
            w.en_hib().write(Bit::NotSet).hib_config().write(0)
        }))?;
        self.write_reg(Command::new(|w| w.command().write(CommandKind::Clear)))?;

        Ok(hib_cfg)
    }

    fn write_ez_config(&mut self) -> Result<(), Error<I::Error>> {
        // dPAcc value paired with a dQAcc of DesignCap/32
        const CHG_V_LOW: u16 = 44138;
        const CHG_V_HIGH: u16 = 51200;

        let config = self.config;
        let design_cap = self.scaling.mah_to_capacity(config.capacity_mah as f32);

        logger::debug!("Writing EZ config, design capacity {}", design_cap);

        self.write_reg(VEmpty::new(|w| {
            w.ve()
                .write(config.v_empty_mv / 10)
                .vr()
                .write(config.v_recovery_mv / 40)
        }))?;
        self.write_reg(DesignCap::new(|w| w.capacity().write(design_cap)))?;
        self.write_reg(DQAcc::new(|w| w.capacity().write(design_cap / 32)))?;
        self.write_reg(IChgTerm::new(|w| w.current().write(design_cap / 32)))?;

        let chg_v = if config.high_voltage_charge {
            CHG_V_HIGH
        } else {
            CHG_V_LOW
        };
        self.write_reg(DPAcc::new(|w| w.percentage().write(chg_v / 32)))?;

        let v_chg = if config.high_voltage_charge {
            VChg::_4_4V
        } else {
            VChg::_4_2V
        };
        self.write_reg(ModelCfg::new(|w| {
            w.refresh()
                .write(Bit::Set)
                .v_chg()
                .write(v_chg)
                .model_id()
                .write(config.model)
        }))?;

        Ok(())
    }

    fn wait_model_refresh(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<I::Error>> {
        for _ in 0..POLL_ATTEMPTS {
            let model_cfg = self.read_reg::<ModelCfg>()?;
            if model_cfg.refresh().read() == Some(Bit::NotSet) {
                return Ok(());
            }
            delay.delay_ms(POLL_INTERVAL_MS);
        }

        logger::warn!("Timeout waiting for the model refresh");
        Err(Error::Timeout)
    }

    /// Whether the gauge has gone through a power-on reset that has not yet
    /// been acknowledged.
    pub fn por(&mut self) -> Result<bool, Error<I::Error>> {
        let status = self.read_reg::<Status>()?;
        Ok(status.por().read() == Some(PowerOnReset::Reset))
    }

    /// Acknowledges a power-on reset.
    pub fn reset_por(&mut self) -> Result<(), Error<I::Error>> {
        let status = self.read_reg::<Status>()?;
        self.write_reg(status.modify(|w| w.por().write(PowerOnReset::NoReset)))
    }

    /// Cell voltage in volts.
    pub fn cell_voltage(&mut self) -> Result<f32, Error<I::Error>> {
        let vcell = self.read_reg::<VCell>()?;
        Ok(self.scaling.voltage_to_v(vcell.voltage().read_field_bits()))
    }

    /// Cell voltage in volts, averaged by the gauge.
    pub fn average_cell_voltage(&mut self) -> Result<f32, Error<I::Error>> {
        let vcell = self.read_reg::<AvgVCell>()?;
        Ok(self.scaling.voltage_to_v(vcell.voltage().read_field_bits()))
    }

    /// Battery current in mA. Positive while charging.
    pub fn current(&mut self) -> Result<f32, Error<I::Error>> {
        let current = self.read_reg::<Current>()?;
        Ok(self.scaling.current_to_ma(current.current().read_field_bits()))
    }

    /// Battery current in mA, averaged by the gauge.
    pub fn average_current(&mut self) -> Result<f32, Error<I::Error>> {
        let current = self.read_reg::<AvgCurrent>()?;
        Ok(self.scaling.current_to_ma(current.current().read_field_bits()))
    }

    /// Largest current reading since the last peak reset, in mA.
    pub fn max_current(&mut self) -> Result<f32, Error<I::Error>> {
        let peaks = self.read_reg::<MaxMinCurr>()?;
        let raw = peaks.max_current().read_field_bits() as u8;
        Ok(self.scaling.peak_current_to_ma(raw))
    }

    /// Smallest current reading since the last peak reset, in mA.
    pub fn min_current(&mut self) -> Result<f32, Error<I::Error>> {
        let peaks = self.read_reg::<MaxMinCurr>()?;
        let raw = peaks.min_current().read_field_bits() as u8;
        Ok(self.scaling.peak_current_to_ma(raw))
    }

    /// Resets the current peak tracking to its power-up state.
    pub fn reset_max_min_current(&mut self) -> Result<(), Error<I::Error>> {
        self.write_reg(MaxMinCurr::default())
    }

    /// Reported state of charge, in percent.
    pub fn soc(&mut self) -> Result<f32, Error<I::Error>> {
        let soc = self.read_reg::<RepSOC>()?;
        Ok(self.scaling.percentage(soc.percentage().read_field_bits()))
    }

    /// Reported remaining capacity in mAh.
    pub fn reported_capacity(&mut self) -> Result<f32, Error<I::Error>> {
        let cap = self.read_reg::<RepCap>()?;
        Ok(self.scaling.capacity_to_mah(cap.capacity().read_field_bits()))
    }

    /// Design capacity in mAh as the gauge sees it.
    pub fn design_capacity(&mut self) -> Result<f32, Error<I::Error>> {
        let cap = self.read_reg::<DesignCap>()?;
        Ok(self.scaling.capacity_to_mah(cap.capacity().read_field_bits()))
    }

    pub fn set_design_capacity(&mut self, capacity_mah: u16) -> Result<(), Error<I::Error>> {
        let raw = self.scaling.mah_to_capacity(capacity_mah as f32);
        self.write_reg(DesignCap::new(|w| w.capacity().write(raw)))?;
        self.config.capacity_mah = capacity_mah;
        Ok(())
    }

    /// Estimated time to empty, in hours.
    pub fn time_to_empty(&mut self) -> Result<f32, Error<I::Error>> {
        let tte = self.read_reg::<TTE>()?;
        Ok(self.scaling.time_to_hours(tte.time().read_field_bits()))
    }

    /// Die temperature in degrees Celsius.
    pub fn temperature(&mut self) -> Result<f32, Error<I::Error>> {
        let temp = self.read_reg::<Temp>()?;
        Ok(self
            .scaling
            .temperature_to_c(temp.temperature().read_field_bits()))
    }

    /// Battery wear in percent of the design capacity.
    pub fn age(&mut self) -> Result<f32, Error<I::Error>> {
        let age = self.read_reg::<Age>()?;
        Ok(self.scaling.percentage(age.percentage().read_field_bits()))
    }

    /// Accumulated charge/discharge cycles, in percent of a full cycle.
    pub fn charge_cycles(&mut self) -> Result<u16, Error<I::Error>> {
        let cycles = self.read_reg::<Cycles>()?;
        Ok(cycles.cycles_percentage().read_field_bits())
    }

    /// The configured empty voltage threshold, in mV.
    pub fn empty_voltage(&mut self) -> Result<u16, Error<I::Error>> {
        let vempty = self.read_reg::<VEmpty>()?;
        Ok(vempty.ve().read_field_bits() * 10)
    }

    pub fn set_empty_voltage(&mut self, v_empty_mv: u16) -> Result<(), Error<I::Error>> {
        if v_empty_mv / 10 > 0x1FF {
            return Err(Error::Config(ConfigIssue::VEmptyRange));
        }

        let vempty = self.read_reg::<VEmpty>()?;
        self.write_reg(vempty.modify(|w| w.ve().write(v_empty_mv / 10)))?;
        self.config.v_empty_mv = v_empty_mv;
        Ok(())
    }

    pub fn set_recovery_voltage(&mut self, v_recovery_mv: u16) -> Result<(), Error<I::Error>> {
        if v_recovery_mv / 40 > 0x7F {
            return Err(Error::Config(ConfigIssue::VRecoveryRange));
        }

        let vempty = self.read_reg::<VEmpty>()?;
        self.write_reg(vempty.modify(|w| w.vr().write(v_recovery_mv / 40)))?;
        self.config.v_recovery_mv = v_recovery_mv;
        Ok(())
    }

    /// Raw value of the model configuration register.
    pub fn model_config(&mut self) -> Result<u16, Error<I::Error>> {
        let model_cfg = self.read_reg::<ModelCfg>()?;
        Ok(model_cfg.bits())
    }

    /// Selects a new battery model and commands a model refresh.
    pub fn set_model_config(
        &mut self,
        model: ModelId,
        high_voltage_charge: bool,
    ) -> Result<(), Error<I::Error>> {
        let v_chg = if high_voltage_charge {
            VChg::_4_4V
        } else {
            VChg::_4_2V
        };
        self.write_reg(ModelCfg::new(|w| {
            w.refresh()
                .write(Bit::Set)
                .v_chg()
                .write(v_chg)
                .model_id()
                .write(model)
        }))?;

        self.config.model = model;
        self.config.high_voltage_charge = high_voltage_charge;
        Ok(())
    }

    /// Whether a battery is attached. Only meaningful in host-side
    /// applications.
    pub fn battery_present(&mut self) -> Result<bool, Error<I::Error>> {
        let status = self.read_reg::<Status>()?;
        Ok(status.bst().read() == Some(BatteryStatus::Present))
    }

    /// The state of charge below which 0% is reported, in percent.
    pub fn empty_soc_hold(&mut self) -> Result<f32, Error<I::Error>> {
        let hold = self.read_reg::<SOCHold>()?;
        Ok(hold.empty_soc_hold().read_field_bits() as f32 * 0.5)
    }

    pub fn set_empty_soc_hold(&mut self, percent: f32) -> Result<(), Error<I::Error>> {
        // 0.5%/LSB, 5 bit field
        let raw = ((percent * 2.0) as u16).min(0x1F) as u8;

        let hold = self.read_reg::<SOCHold>()?;
        self.write_reg(hold.modify(|w| w.empty_soc_hold().write(raw)))
    }

    pub fn sense_resistor(&self) -> f32 {
        self.config.r_sense_ohms
    }

    /// Changes the sense resistor value the conversions are scaled by.
    pub fn set_sense_resistor(&mut self, r_sense_ohms: f32) -> Result<(), Error<I::Error>> {
        if !(r_sense_ohms > 0.0) {
            return Err(Error::Config(ConfigIssue::SenseResistor));
        }

        self.config.r_sense_ohms = r_sense_ohms;
        self.scaling = Scaling::new(r_sense_ohms);
        Ok(())
    }

    /// Reads the learned battery characterization values from the gauge.
    pub fn learned_params(&mut self) -> Result<LearnedParams, Error<I::Error>> {
        Ok(LearnedParams {
            rcomp0: self.read_reg::<RComp0>()?.bits(),
            temp_co: self.read_reg::<TempCo>()?.bits(),
            full_cap_rep: self.read_reg::<FullCapRep>()?.bits(),
            cycles: self.read_reg::<Cycles>()?.bits(),
            full_cap_nom: self.read_reg::<FullCapNom>()?.bits(),
        })
    }

    /// Writes back previously saved characterization values, following the
    /// capacity restore sequence from the datasheet.
    pub fn restore_learned_params(
        &mut self,
        delay: &mut impl DelayNs,
        params: &LearnedParams,
    ) -> Result<(), Error<I::Error>> {
        logger::info!("Restoring learned battery parameters");

        self.write_reg(RComp0::from_bits(params.rcomp0))?;
        self.write_reg(TempCo::from_bits(params.temp_co))?;
        self.write_reg(FullCapNom::from_bits(params.full_cap_nom))?;

        delay.delay_ms(RESTORE_SETTLE_MS);

        let full_cap_nom = self.read_reg::<FullCapNom>()?.capacity().read_field_bits();
        let mix_soc = self.read_reg::<MixSOC>()?.percentage().read_field_bits();

        // MixCap = MixSOC * FullCapNom / 100, with MixSOC on the 1/256 scale
        let mix_cap = ((mix_soc as u32 * full_cap_nom as u32) / 25600) as u16;
        self.write_reg(MixCap::new(|w| w.capacity().write(mix_cap)))?;
        self.write_reg(FullCapRep::from_bits(params.full_cap_rep))?;

        // Restore the accumulators at a 200% rate to make sure they are
        // counted above the FullCapNom value.
        self.write_reg(DPAcc::new(|w| w.percentage().write(0x0C80)))?;
        self.write_reg(DQAcc::new(|w| w.capacity().write(params.full_cap_nom / 16)))?;

        delay.delay_ms(RESTORE_SETTLE_MS);

        self.write_reg(Cycles::from_bits(params.cycles))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        i2c::{Mock, Transaction},
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct FakeBusError;

    impl embedded_hal::i2c::Error for FakeBusError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    /// Register-backed bus double that simulates the data-ready and model
    /// refresh handshakes.
    struct FakeChip {
        regs: [u16; 256],
        dnr_polls: u32,
        refresh_polls: u32,
        refresh_sticky: bool,
        model_cfg_reads: u32,
        writes: Vec<(u8, u16)>,
        fail: bool,
        selected: u8,
    }

    impl FakeChip {
        fn new() -> Self {
            let mut regs = [0; 256];
            regs[0x00] = 0x0002; // fresh POR
            regs[0xBA] = 0x870C; // HibCfg hardware reset value

            Self {
                regs,
                dnr_polls: 0,
                refresh_polls: 0,
                refresh_sticky: false,
                model_cfg_reads: 0,
                writes: Vec::new(),
                fail: false,
                selected: 0,
            }
        }

        fn read16(&mut self, addr: u8) -> u16 {
            match addr {
                0x3D => {
                    if self.dnr_polls > 0 {
                        self.dnr_polls -= 1;
                        0x0001
                    } else {
                        0x0000
                    }
                }
                0xDB => {
                    self.model_cfg_reads += 1;
                    if self.refresh_sticky {
                        self.regs[0xDB]
                    } else if self.refresh_polls > 0 {
                        self.refresh_polls -= 1;
                        self.regs[0xDB]
                    } else {
                        self.regs[0xDB] & !0x8000
                    }
                }
                _ => self.regs[addr as usize],
            }
        }
    }

    impl ErrorType for FakeChip {
        type Error = FakeBusError;
    }

    impl I2c for FakeChip {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            assert_eq!(address, 0x36);

            if self.fail {
                return Err(FakeBusError);
            }

            for op in operations {
                match op {
                    Operation::Write(bytes) => match bytes {
                        [addr] => self.selected = *addr,
                        [addr, low, high] => {
                            let value = u16::from_le_bytes([*low, *high]);
                            self.regs[*addr as usize] = value;
                            self.writes.push((*addr, value));
                        }
                        _ => panic!("unexpected write length {}", bytes.len()),
                    },
                    Operation::Read(buffer) => {
                        let value = self.read16(self.selected);
                        buffer.copy_from_slice(&value.to_le_bytes());
                    }
                }
            }

            Ok(())
        }
    }

    fn lifepo4_config() -> BatteryConfig {
        BatteryConfig {
            capacity_mah: 6000,
            v_empty_mv: 3000,
            v_recovery_mv: 3880,
            model: ModelId::LiFePO4,
            high_voltage_charge: false,
            r_sense_ohms: 0.01,
        }
    }

    #[test]
    fn init_skips_model_load_without_por() {
        let mut chip = FakeChip::new();
        chip.regs[0x00] = 0x0000;

        let mut gauge = Max17055::new(chip);
        let loaded = gauge.init(&mut NoopDelay).unwrap();

        assert!(!loaded);
        assert!(gauge.free().writes.is_empty());
    }

    #[test]
    fn init_loads_model_after_por() {
        let mut chip = FakeChip::new();
        chip.dnr_polls = 3;
        chip.refresh_polls = 2;

        let mut gauge = Max17055::with_config(chip, lifepo4_config());
        let loaded = gauge.init(&mut NoopDelay).unwrap();
        assert!(loaded);

        let chip = gauge.free();
        assert_eq!(
            chip.writes,
            vec![
                (0x60, 0x0090), // soft wakeup
                (0xBA, 0x0000),
                (0x60, 0x0000),
                (0x3A, 0x9661), // 3000mV empty, 3880mV recovery
                (0x18, 12000),  // 6000mAh at 0.5mAh/LSB
                (0x45, 375),
                (0x1E, 375),
                (0x46, 1379),
                (0xDB, 0x8060), // refresh + LiFePO4
                (0x29, 0xCEA4),
                (0x2A, 0x2039),
                (0xBA, 0x870C), // hibernate config restored
                (0x00, 0x0000), // POR acknowledged
            ]
        );
    }

    #[test]
    fn init_times_out_when_refresh_never_clears() {
        let mut chip = FakeChip::new();
        chip.refresh_sticky = true;

        let mut gauge = Max17055::with_config(chip, lifepo4_config());
        assert_eq!(gauge.init(&mut NoopDelay), Err(Error::Timeout));

        assert_eq!(gauge.free().model_cfg_reads, 100);
    }

    #[test]
    fn init_rejects_invalid_config_before_touching_the_bus() {
        let mut chip = FakeChip::new();
        chip.fail = true;

        let mut gauge = Max17055::with_config(
            chip,
            BatteryConfig {
                v_empty_mv: 6000,
                ..BatteryConfig::DEFAULT
            },
        );

        assert_eq!(
            gauge.init(&mut NoopDelay),
            Err(Error::Config(ConfigIssue::VEmptyRange))
        );
    }

    #[test]
    fn bus_errors_are_propagated() {
        let mut chip = FakeChip::new();
        chip.fail = true;

        let mut gauge = Max17055::new(chip);
        assert_eq!(gauge.init(&mut NoopDelay), Err(Error::Transfer(FakeBusError)));
        assert_eq!(gauge.cell_voltage(), Err(Error::Transfer(FakeBusError)));
    }

    #[test]
    fn reset_por_clears_the_flag() {
        let chip = FakeChip::new();
        let mut gauge = Max17055::new(chip);

        assert!(gauge.por().unwrap());
        gauge.reset_por().unwrap();
        assert!(!gauge.por().unwrap());
    }

    #[test]
    fn learned_params_round_trip() {
        let mut chip = FakeChip::new();
        chip.regs[0x38] = 0x0041;
        chip.regs[0x39] = 0x1234;
        chip.regs[0x10] = 0x1700;
        chip.regs[0x17] = 0x0123;
        chip.regs[0x23] = 0x1770;

        let mut gauge = Max17055::new(chip);
        let params = gauge.learned_params().unwrap();

        assert_eq!(
            params,
            LearnedParams {
                rcomp0: 0x0041,
                temp_co: 0x1234,
                full_cap_rep: 0x1700,
                cycles: 0x0123,
                full_cap_nom: 0x1770,
            }
        );
    }

    #[test]
    fn restore_follows_the_capacity_sequence() {
        let mut chip = FakeChip::new();
        chip.regs[0x0D] = 0x3200; // MixSOC 50%

        let params = LearnedParams {
            rcomp0: 0x0041,
            temp_co: 0x1234,
            full_cap_rep: 0x1700,
            cycles: 0x0123,
            full_cap_nom: 0x1770,
        };

        let mut gauge = Max17055::new(chip);
        gauge.restore_learned_params(&mut NoopDelay, &params).unwrap();

        let chip = gauge.free();
        assert_eq!(
            chip.writes,
            vec![
                (0x38, 0x0041),
                (0x39, 0x1234),
                (0x23, 0x1770),
                (0x0F, 0x0BB8), // 50% of 6000 raw
                (0x10, 0x1700),
                (0x46, 0x0C80),
                (0x45, 0x0177),
                (0x17, 0x0123),
            ]
        );
    }

    #[test]
    fn peak_currents_decode_as_signed_halves() {
        let mut chip = FakeChip::new();
        chip.regs[0x1C] = 0x807F;

        let mut gauge = Max17055::new(chip);

        // 0x7F * 40mA, 0x80 * -40mA at 10mOhm
        assert!((gauge.max_current().unwrap() - 5080.0).abs() < 1.0);
        assert!((gauge.min_current().unwrap() + 5120.0).abs() < 1.0);

        gauge.reset_max_min_current().unwrap();
        assert_eq!(gauge.free().writes, vec![(0x1C, 0x807F)]);
    }

    #[test]
    fn cell_voltage_scales_from_raw() {
        let i2c = Mock::new(&[Transaction::write_read(
            0x36,
            vec![0x09],
            vec![0x00, 0xB4],
        )]);

        let mut gauge = Max17055::new(i2c);
        let voltage = gauge.cell_voltage().unwrap();
        assert!((voltage - 3.6).abs() < 0.001);

        gauge.free().done();
    }

    #[test]
    fn soc_scales_from_raw() {
        let i2c = Mock::new(&[Transaction::write_read(
            0x36,
            vec![0x06],
            vec![0x00, 0x64],
        )]);

        let mut gauge = Max17055::new(i2c);
        assert_eq!(gauge.soc().unwrap(), 100.0);

        gauge.free().done();
    }

    #[test]
    fn temperature_is_signed() {
        let i2c = Mock::new(&[Transaction::write_read(
            0x36,
            vec![0x08],
            vec![0x00, 0xE7],
        )]);

        let mut gauge = Max17055::new(i2c);
        assert_eq!(gauge.temperature().unwrap(), -25.0);

        gauge.free().done();
    }

    #[test]
    fn scaling_round_trips_within_one_lsb() {
        let scaling = Scaling::new(0.02);

        let raw = scaling.mah_to_capacity(1234.5);
        assert!((scaling.capacity_to_mah(raw) - 1234.5).abs() <= scaling.capacity_mah);

        let raw = scaling.ma_to_current(-250.0);
        assert!((scaling.current_to_ma(raw) + 250.0).abs() <= scaling.current_ma);
    }

    #[test]
    fn capacity_and_current_scale_with_the_sense_resistor() {
        let base = Scaling::new(0.01);
        let double = Scaling::new(0.02);

        assert_eq!(base.capacity_mah, 2.0 * double.capacity_mah);
        assert_eq!(base.current_ma, 2.0 * double.current_ma);
        assert_eq!(base.voltage_v, double.voltage_v);
    }
}
