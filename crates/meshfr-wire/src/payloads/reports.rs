//! Sensor and power-status report payloads.

use crate::error::ProtocolError;
use crate::opcode::Opcode;

fn too_short(opcode: Opcode, got: usize, need: usize) -> ProtocolError {
    ProtocolError::PayloadTooShort {
        opcode: opcode.to_byte(),
        got,
        need,
    }
}

/// A paired time-of-flight distance sample, embedded in [`SensReport`].
/// 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TfPairSample {
    /// Distance in millimeters from the first sensor in the pair.
    pub distance_a_mm: u16,
    /// Distance in millimeters from the second sensor in the pair.
    pub distance_b_mm: u16,
    /// Monotonic sample sequence, local to the sensor.
    pub pair_seq: u16,
    /// Bitfield; semantics beyond detection-present bits are
    /// deployment-specific and not interpreted by this codec.
    pub flags: u16,
}

const TF_PAIR_SAMPLE_LEN: usize = 8;

impl TfPairSample {
    fn to_bytes(self) -> [u8; TF_PAIR_SAMPLE_LEN] {
        let mut out = [0u8; TF_PAIR_SAMPLE_LEN];
        out[0..2].copy_from_slice(&self.distance_a_mm.to_le_bytes());
        out[2..4].copy_from_slice(&self.distance_b_mm.to_le_bytes());
        out[4..6].copy_from_slice(&self.pair_seq.to_le_bytes());
        out[6..8].copy_from_slice(&self.flags.to_le_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            distance_a_mm: u16::from_le_bytes([bytes[0], bytes[1]]),
            distance_b_mm: u16::from_le_bytes([bytes[2], bytes[3]]),
            pair_seq: u16::from_le_bytes([bytes[4], bytes[5]]),
            flags: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }
}

/// A sensor node's periodic report (spec.md §3, §6). 30 bytes.
///
/// Open Question (spec.md §9, preserved): `present_flags`/`health_flags`
/// semantics beyond bits 0/1 are undefined in the source this was
/// distilled from; only the low two bits are named here, the rest are
/// carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensReport {
    /// Virtual endpoint index for emulator disambiguation, or
    /// [`crate::header::VIRT_ID_PHYSICAL`].
    pub virt_id_echo: u8,
    /// Bit 0 = primary sample present, bit 1 = secondary sample present;
    /// remaining bits undefined.
    pub present_flags: u8,
    /// Bit 0 = sensor self-test ok, bit 1 = low battery; remaining bits
    /// undefined.
    pub health_flags: u8,
    /// Ambient temperature in hundredths of a degree Celsius.
    pub temp_centidegrees: i16,
    /// Relative humidity in hundredths of a percent.
    pub humidity_centipercent: u16,
    /// Barometric pressure in pascals.
    pub pressure_pa: u32,
    /// Ambient illuminance in hundredths of a lux.
    pub lux_centilux: u32,
    /// Battery voltage in millivolts.
    pub battery_mv: u16,
    /// Monotonic sample sequence, local to the sensor.
    pub sample_seq: u16,
    /// Paired time-of-flight reading.
    pub tof: TfPairSample,
}

/// Wire size of [`SensReport`].
pub const SENS_REPORT_LEN: usize = 30;

impl SensReport {
    /// Serialize to the 30-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; SENS_REPORT_LEN] {
        let mut out = [0u8; SENS_REPORT_LEN];
        out[0] = self.virt_id_echo;
        out[1] = self.present_flags;
        out[2] = self.health_flags;
        out[3] = 0; // reserved
        out[4..6].copy_from_slice(&self.temp_centidegrees.to_le_bytes());
        out[6..8].copy_from_slice(&self.humidity_centipercent.to_le_bytes());
        out[8..12].copy_from_slice(&self.pressure_pa.to_le_bytes());
        out[12..16].copy_from_slice(&self.lux_centilux.to_le_bytes());
        out[16..18].copy_from_slice(&self.battery_mv.to_le_bytes());
        out[18..20].copy_from_slice(&self.sample_seq.to_le_bytes());
        out[20..28].copy_from_slice(&self.tof.to_bytes());
        out
    }

    /// Parse from at least [`SENS_REPORT_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < SENS_REPORT_LEN {
            return Err(too_short(Opcode::SensReport, bytes.len(), SENS_REPORT_LEN));
        }
        Ok(Self {
            virt_id_echo: bytes[0],
            present_flags: bytes[1],
            health_flags: bytes[2],
            temp_centidegrees: i16::from_le_bytes([bytes[4], bytes[5]]),
            humidity_centipercent: u16::from_le_bytes([bytes[6], bytes[7]]),
            pressure_pa: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            lux_centilux: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            battery_mv: u16::from_le_bytes([bytes[16], bytes[17]]),
            sample_seq: u16::from_le_bytes([bytes[18], bytes[19]]),
            tof: TfPairSample::decode(&bytes[20..28]),
        })
    }

    /// Bit 0 of `present_flags`: primary sample present.
    #[must_use]
    pub fn primary_present(&self) -> bool {
        self.present_flags & 0b01 != 0
    }

    /// Bit 1 of `present_flags`: secondary sample present.
    #[must_use]
    pub fn secondary_present(&self) -> bool {
        self.present_flags & 0b10 != 0
    }
}

/// Power-management node telemetry (spec.md §6). 17 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmsStatus {
    /// Bus voltage in millivolts.
    pub voltage_mv: u16,
    /// Bus current in milliamps; negative indicates reverse flow.
    pub current_ma: i16,
    /// Instantaneous power draw in milliwatts.
    pub power_mw: u32,
    /// Cumulative energy in watt-hours since boot.
    pub energy_wh: u32,
    /// Board temperature in tenths of a degree Celsius.
    pub temp_tenths_c: i16,
    /// Status bitfield (overcurrent, undervoltage, etc).
    pub flags: u8,
}

/// Wire size of [`PmsStatus`].
pub const PMS_STATUS_LEN: usize = 17;

impl PmsStatus {
    /// Serialize to the 17-byte wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; PMS_STATUS_LEN] {
        let mut out = [0u8; PMS_STATUS_LEN];
        out[0..2].copy_from_slice(&self.voltage_mv.to_le_bytes());
        out[2..4].copy_from_slice(&self.current_ma.to_le_bytes());
        out[4..8].copy_from_slice(&self.power_mw.to_le_bytes());
        out[8..12].copy_from_slice(&self.energy_wh.to_le_bytes());
        out[12..14].copy_from_slice(&self.temp_tenths_c.to_le_bytes());
        out[14] = self.flags;
        out
    }

    /// Parse from at least [`PMS_STATUS_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < PMS_STATUS_LEN {
            return Err(too_short(Opcode::PmsStatus, bytes.len(), PMS_STATUS_LEN));
        }
        Ok(Self {
            voltage_mv: u16::from_le_bytes([bytes[0], bytes[1]]),
            current_ma: i16::from_le_bytes([bytes[2], bytes[3]]),
            power_mw: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            energy_wh: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            temp_tenths_c: i16::from_le_bytes([bytes[12], bytes[13]]),
            flags: bytes[14],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> SensReport {
        SensReport {
            virt_id_echo: 0xFF,
            present_flags: 0b11,
            health_flags: 0b01,
            temp_centidegrees: 2150,
            humidity_centipercent: 4500,
            pressure_pa: 101_325,
            lux_centilux: 35_000,
            battery_mv: 3700,
            sample_seq: 42,
            tof: TfPairSample {
                distance_a_mm: 1200,
                distance_b_mm: 1210,
                pair_seq: 7,
                flags: 0,
            },
        }
    }

    #[test]
    fn sens_report_round_trip() {
        let report = sample_report();
        let bytes = report.to_bytes();
        assert_eq!(bytes.len(), SENS_REPORT_LEN);
        assert_eq!(SensReport::decode(&bytes).unwrap(), report);
    }

    #[test]
    fn present_flags_bit_accessors() {
        let report = sample_report();
        assert!(report.primary_present());
        assert!(report.secondary_present());
    }

    #[test]
    fn pms_status_round_trip() {
        let status = PmsStatus {
            voltage_mv: 12_000,
            current_ma: -150,
            power_mw: 1800,
            energy_wh: 240,
            temp_tenths_c: 315,
            flags: 0b0010,
        };
        let bytes = status.to_bytes();
        assert_eq!(bytes.len(), PMS_STATUS_LEN);
        assert_eq!(PmsStatus::decode(&bytes).unwrap(), status);
    }
}
