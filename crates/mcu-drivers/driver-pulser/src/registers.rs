//! Pulser board register map.

/// RW: 0 = off, 1 = tool-positive, 2 = tool-negative.
pub const POLARITY: u8 = 0x01;
/// RW: pulse current in 100 mA units (1-200).
pub const PULSE_CURRENT: u8 = 0x02;
/// R: heatsink temperature in °C.
pub const TEMPERATURE: u8 = 0x03;
/// RW: pulse duration in 10 µs units (5-100).
pub const PULSE_DUR: u8 = 0x04;
/// RW: max duty factor in percent (1-95).
pub const MAX_DUTY: u8 = 0x05;
/// R: number of pulses since last checkpoint read.
pub const CKP_N_PULSE: u8 = 0x10;
/// R: average ignition time in 5 µs units.
pub const T_IGNITION: u8 = 0x11;
/// R: std dev of ignition time in 5 µs units.
pub const T_IGNITION_SD: u8 = 0x12;
/// R: ratio of window spent discharging (0-255).
pub const R_PULSE: u8 = 0x13;
/// R: ratio of window spent shorted (0-255).
pub const R_SHORT: u8 = 0x14;
/// R: ratio of window spent waiting (0-255).
pub const R_OPEN: u8 = 0x15;
