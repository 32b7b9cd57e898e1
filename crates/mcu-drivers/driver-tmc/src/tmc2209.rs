//! Register driver for the TMC2209 over the single-wire bus.

use crate::datagram::{
    decode_reply, encode_read_request, encode_write_request, ReplyError, REPLY_LEN,
};
use crate::registers::{self, ChopConf, GConf, IholdIrun};
use crate::Error;
use core::fmt::Write as _;
use embedded_hal::delay::DelayNs;

/// Guard time after each transaction so the shared bus returns to idle.
const BUS_IDLE_GUARD_MS: u32 = 10;

/// Half-duplex byte transport to one stepper driver on the shared bus.
///
/// `send` masters the line for a request; `recv` releases it and captures
/// the device's reply. Implementations typically multiplex several pins
/// over one tick engine and return a busy error on concurrent use.
pub trait TmcUart {
    type Error;
    fn send(&mut self, data: &[u8]) -> Result<(), Self::Error>;
    fn recv(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Driver for one TMC2209 stepper chip.
pub struct Tmc2209<U, D> {
    uart: U,
    delay: D,
    node_addr: u8,
}

impl<U, D> Tmc2209<U, D>
where
    U: TmcUart,
    D: DelayNs,
{
    /// Creates a driver for the (sole) device on its pin, node address 0.
    pub fn new(uart: U, delay: D) -> Self {
        Self {
            uart,
            delay,
            node_addr: 0,
        }
    }

    /// Reads a register. Any bus, CRC, or reply-field failure surfaces as
    /// an error; callers that need the original all-zeroes fallback apply
    /// it themselves.
    pub fn reg_read(&mut self, reg: u8) -> Result<u32, Error<U::Error>> {
        let request = encode_read_request(self.node_addr, reg);
        self.uart.send(&request).map_err(Error::Bus)?;

        let mut reply = [0u8; REPLY_LEN];
        self.uart.recv(&mut reply).map_err(Error::Bus)?;
        let value = decode_reply(&reply, reg).map_err(|e| match e {
            ReplyError::InvalidCrc => Error::InvalidCrc,
            ReplyError::WrongReply => Error::WrongReply,
        })?;

        self.delay.delay_ms(BUS_IDLE_GUARD_MS);
        Ok(value)
    }

    /// Writes a register.
    pub fn reg_write(&mut self, reg: u8, value: u32) -> Result<(), Error<U::Error>> {
        let request = encode_write_request(self.node_addr, reg, value);
        self.uart.send(&request).map_err(Error::Bus)?;
        self.delay.delay_ms(BUS_IDLE_GUARD_MS);
        Ok(())
    }

    /// Sets the microstep resolution (power of two in 1..=256).
    pub fn set_microstep(&mut self, microstep: u32) -> Result<(), Error<U::Error>> {
        if !(1..=256).contains(&microstep) || !microstep.is_power_of_two() {
            return Err(Error::InvalidParam);
        }

        // Route MRES from the register instead of the MS pins.
        let mut gconf = GConf(self.reg_read(registers::GCONF)?);
        gconf.set_mstep_reg_select(true);
        self.reg_write(registers::GCONF, gconf.0)?;

        // MRES: 0 = 256 microsteps ... 8 = full step.
        let mres = 8 - microstep.trailing_zeros() as u8;
        let mut chopconf = ChopConf(self.reg_read(registers::CHOPCONF)?);
        chopconf.set_mres(mres);
        self.reg_write(registers::CHOPCONF, chopconf.0)
    }

    /// Sets run/hold current as percentages, quantised to the 32-step
    /// register scale.
    pub fn set_current(&mut self, run_percent: u8, hold_percent: u8) -> Result<(), Error<U::Error>> {
        if run_percent > 100 || hold_percent > 100 {
            return Err(Error::InvalidParam);
        }
        let mut reg = IholdIrun(0);
        reg.set_irun(((run_percent as u32 * 31 + 50) / 100) as u8);
        reg.set_ihold(((hold_percent as u32 * 31 + 50) / 100) as u8);
        reg.set_ihold_delay(10);
        self.reg_write(registers::IHOLD_IRUN, reg.0)
    }

    /// Sets the StallGuard threshold (higher = more sensitive).
    pub fn set_stallguard_threshold(&mut self, threshold: u8) -> Result<(), Error<U::Error>> {
        self.reg_write(registers::SGTHRS, threshold as u32)
    }

    /// Sets TCOOLTHRS, the lower velocity bound for StallGuard/CoolStep.
    pub fn set_tcoolthrs(&mut self, value: u32) -> Result<(), Error<U::Error>> {
        if !(1..(1 << 20)).contains(&value) {
            return Err(Error::InvalidParam);
        }
        self.reg_write(registers::TCOOLTHRS, value)
    }

    /// Reads the 10-bit StallGuard load measurement (0 = highest load).
    pub fn sg_result(&mut self) -> Result<u16, Error<U::Error>> {
        Ok((self.reg_read(registers::SG_RESULT)? & registers::SG_RESULT_MASK) as u16)
    }

    /// Reads the diagnostic registers into a status line.
    pub fn dump_regs(&mut self) -> Result<heapless::String<128>, Error<U::Error>> {
        let gconf = self.reg_read(registers::GCONF)?;
        let ioin = self.reg_read(registers::IOIN)?;
        let sg_result = self.reg_read(registers::SG_RESULT)?;
        let chopconf = self.reg_read(registers::CHOPCONF)?;

        let mut out = heapless::String::new();
        // Cannot fail: the formatted text fits the fixed capacity.
        let _ = write!(
            out,
            "GCONF:0x{gconf:08x} IOIN:0x{ioin:08x} SG_RESULT:0x{sg_result:08x} CHOPCONF:0x{chopconf:08x}"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datagram::crc8;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use std::vec::Vec;

    /// Scripted byte-level transport: records sent frames, replays queued
    /// replies.
    #[derive(Default)]
    struct ScriptedUart {
        sent: Vec<Vec<u8>>,
        replies: Vec<Vec<u8>>,
    }

    impl ScriptedUart {
        fn reply_for(reg: u8, value: u32) -> Vec<u8> {
            let mut frame = std::vec![0x05, 0xFF, reg & 0x7F];
            frame.extend_from_slice(&value.to_be_bytes());
            frame.push(crc8(&frame));
            frame
        }
    }

    impl TmcUart for &mut ScriptedUart {
        type Error = ();

        fn send(&mut self, data: &[u8]) -> Result<(), ()> {
            self.sent.push(data.to_vec());
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8]) -> Result<(), ()> {
            let reply = self.replies.remove(0);
            buf.copy_from_slice(&reply);
            Ok(())
        }
    }

    #[test]
    fn reg_read_round_trip() {
        let mut uart = ScriptedUart::default();
        uart.replies.push(ScriptedUart::reply_for(0x41, 0x1F4));
        let mut tmc = Tmc2209::new(&mut uart, NoopDelay);
        assert_eq!(tmc.sg_result(), Ok(0x1F4));
        assert_eq!(uart.sent[0], std::vec![0x05, 0x00, 0x41, 0xCF]);
    }

    #[test]
    fn reg_read_rejects_corrupt_reply() {
        let mut uart = ScriptedUart::default();
        let mut reply = ScriptedUart::reply_for(0x00, 0x40);
        reply[4] ^= 0x10;
        uart.replies.push(reply);
        let mut tmc = Tmc2209::new(&mut uart, NoopDelay);
        assert_eq!(tmc.reg_read(0x00), Err(Error::InvalidCrc));
    }

    #[test]
    fn set_microstep_programs_mres() {
        let mut uart = ScriptedUart::default();
        uart.replies.push(ScriptedUart::reply_for(0x00, 0x0000_0040));
        uart.replies.push(ScriptedUart::reply_for(0x6C, 0x1000_0053));
        let mut tmc = Tmc2209::new(&mut uart, NoopDelay);
        tmc.set_microstep(32).unwrap();

        // GCONF write gains mstep_reg_select (bit 7).
        assert_eq!(uart.sent[1][2], 0x80);
        assert_eq!(&uart.sent[1][3..7], &0x0000_00C0u32.to_be_bytes());
        // CHOPCONF write carries MRES = 8 - log2(32) = 3.
        assert_eq!(uart.sent[3][2], 0x6C | 0x80);
        assert_eq!(&uart.sent[3][3..7], &0x0300_0053u32.to_be_bytes());
    }

    #[test]
    fn set_microstep_validates_argument() {
        let mut uart = ScriptedUart::default();
        let mut tmc = Tmc2209::new(&mut uart, NoopDelay);
        assert_eq!(tmc.set_microstep(0), Err(Error::InvalidParam));
        assert_eq!(tmc.set_microstep(3), Err(Error::InvalidParam));
        assert_eq!(tmc.set_microstep(512), Err(Error::InvalidParam));
    }

    #[test]
    fn set_current_quantises_percentages() {
        let mut uart = ScriptedUart::default();
        let mut tmc = Tmc2209::new(&mut uart, NoopDelay);
        tmc.set_current(30, 0).unwrap();
        assert_eq!(tmc.set_current(101, 0), Err(Error::InvalidParam));
        // irun = (30*31+50)/100 = 9, ihold = 0, iholddelay = 10.
        let expected: u32 = (10 << 16) | (9 << 8);
        assert_eq!(&uart.sent[0][3..7], &expected.to_be_bytes());
    }

    #[test]
    fn set_tcoolthrs_range() {
        let mut uart = ScriptedUart::default();
        let mut tmc = Tmc2209::new(&mut uart, NoopDelay);
        tmc.set_tcoolthrs(750_000).unwrap();
        assert_eq!(tmc.set_tcoolthrs(0), Err(Error::InvalidParam));
        assert_eq!(tmc.set_tcoolthrs(1 << 20), Err(Error::InvalidParam));
        assert_eq!(
            uart.sent[0],
            std::vec![0x05, 0x00, 0x94, 0x00, 0x0B, 0x71, 0xB0, 0x58]
        );
    }
}
