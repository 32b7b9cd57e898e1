//! TMC2209 register addresses and bit fields.

use bitfield::bitfield;

pub const GCONF: u8 = 0x00;
pub const IOIN: u8 = 0x06;
pub const IHOLD_IRUN: u8 = 0x10;
pub const TCOOLTHRS: u8 = 0x14;
pub const SGTHRS: u8 = 0x40;
pub const SG_RESULT: u8 = 0x41;
pub const COOLCONF: u8 = 0x42;
pub const CHOPCONF: u8 = 0x6C;

bitfield! {
    /// Global Configuration Register (GCONF)
    pub struct GConf(u32);
    impl Debug;
    pub pdn_disable, set_pdn_disable: 6;
    /// Microstep resolution comes from CHOPCONF.MRES instead of MS pins.
    pub mstep_reg_select, set_mstep_reg_select: 7;
}

bitfield! {
    /// Driver Current Control Register (IHOLD_IRUN)
    pub struct IholdIrun(u32);
    impl Debug;
    pub u8, ihold, set_ihold: 4, 0;
    pub u8, irun, set_irun: 12, 8;
    pub u8, ihold_delay, set_ihold_delay: 19, 16;
}

bitfield! {
    /// Chopper Configuration Register (CHOPCONF)
    pub struct ChopConf(u32);
    impl Debug;
    /// 0 = 256 microsteps ... 8 = full step.
    pub u8, mres, set_mres: 27, 24;
}

/// SG_RESULT is a 10-bit load measurement in bits [9:0].
pub const SG_RESULT_MASK: u32 = 0x3FF;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chopconf_mres_field() {
        let mut chopconf = ChopConf(0x1000_0053);
        assert_eq!(chopconf.mres(), 1);
        chopconf.set_mres(3);
        assert_eq!(chopconf.0, 0x0300_0053);
    }

    #[test]
    fn ihold_irun_packing() {
        let mut reg = IholdIrun(0);
        reg.set_irun(9);
        reg.set_ihold_delay(10);
        assert_eq!(reg.0, (10 << 16) | (9 << 8));
    }
}
