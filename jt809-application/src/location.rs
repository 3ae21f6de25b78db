//! Vehicle location records: status and alarm words, real-time fix

use crate::field::FieldReader;
use bytes::BufMut;
use chrono::NaiveDateTime;
use jt809_core::datatypes::{gnss_date_time, GnssDate, GnssTime};
use jt809_core::Jt809Result;
use std::fmt;

/// Declare a record of named flags packed into a 32-bit word
///
/// Bits not named are written as 0 and ignored when unpacking.
macro_rules! bit_record {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$fmeta:meta])* $field:ident = $bit:expr, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: bool, )*
        }

        impl $name {
            /// Pack the flags into a word
            pub fn to_u32(&self) -> u32 {
                let mut value = 0u32;
                $( if self.$field { value |= 1 << $bit; } )*
                value
            }

            /// Unpack a word, ignoring unnamed bits
            pub fn from_u32(value: u32) -> Self {
                Self {
                    $( $field: value & (1 << $bit) != 0, )*
                }
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self::from_u32(value)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.to_u32()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{{0b{:032b}}}", stringify!($name), self.to_u32())
            }
        }
    };
}

bit_record! {
    /// Vehicle status word (JT/T 808 table 17)
    LocationStatus {
        /// ACC on
        acc = 0,
        /// Position fixed
        location = 1,
        latitude_south = 2,
        longitude_west = 3,
        /// Out of service
        on_operate = 4,
        /// Coordinates scrambled by the map privacy plug-in
        encrypted = 5,
        /// Fuel line cut
        gas = 10,
        /// Circuit cut
        circuit = 11,
        door_locked = 12,
    }
}

bit_record! {
    /// Alarm word (JT/T 808 table 18), 1 means alarm
    LocationAlarm {
        emergency = 0,
        speeding = 1,
        fatigue = 2,
        dangerous_behavior = 3,
        gnss_error = 4,
        gnss_antenna_error = 5,
        gnss_short_circuit = 6,
        power_undervoltage = 7,
        power_down = 8,
        lcd_error = 9,
        tts_error = 10,
        camera_error = 11,
        fatigue_daily = 18,
        stop_timeout = 19,
        range_area = 20,
        range_route = 21,
        drive_time_error = 22,
        route_deviate = 23,
        vss_error = 24,
        gas_quantity_error = 25,
        stolen = 26,
        illegal_start = 27,
        illegal_move = 28,
        collision_rollover = 29,
    }
}

/// Real-time vehicle fix (`UP_EXG_MSG_REAL_LOCATION`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealLocation {
    /// 1 if coordinates went through the map privacy plug-in
    pub encrypt: u8,
    pub date: GnssDate,
    pub time: GnssTime,
    /// Longitude in 1e-6 degrees
    pub lon: u32,
    /// Latitude in 1e-6 degrees
    pub lat: u32,
    /// Terminal speed, km/h
    pub vec1: u16,
    /// Tachograph speed, km/h
    pub vec2: u16,
    /// Odometer, km
    pub vec3: u32,
    /// Heading 0..359, north is 0, clockwise
    pub direction: u16,
    /// Metres
    pub altitude: u16,
    pub state: LocationStatus,
    pub alarm: LocationAlarm,
}

impl RealLocation {
    /// Encoded length in bytes
    pub const LENGTH: usize = 36;

    /// Fix stamped with the current local time and zeroed readings
    pub fn now() -> Self {
        Self::at(&chrono::Local::now().naive_local())
    }

    /// Fix stamped with `at` and zeroed readings
    pub fn at(at: &NaiveDateTime) -> Self {
        let (date, time) = gnss_date_time(at);
        Self {
            encrypt: 0,
            date,
            time,
            lon: 0,
            lat: 0,
            vec1: 0,
            vec2: 0,
            vec3: 0,
            direction: 0,
            altitude: 0,
            state: LocationStatus::default(),
            alarm: LocationAlarm::default(),
        }
    }

    pub fn encode<B: BufMut>(&self, out: &mut B) {
        out.put_u8(self.encrypt);
        out.put_slice(&self.date.encode());
        out.put_slice(&self.time.encode());
        out.put_u32(self.lon);
        out.put_u32(self.lat);
        out.put_u16(self.vec1);
        out.put_u16(self.vec2);
        out.put_u32(self.vec3);
        out.put_u16(self.direction);
        out.put_u16(self.altitude);
        out.put_u32(self.state.to_u32());
        out.put_u32(self.alarm.to_u32());
    }

    pub fn decode(data: &[u8]) -> Jt809Result<Self> {
        let mut r = FieldReader::new(data, "RealLocation");
        let location = Self {
            encrypt: r.u8("encrypt")?,
            date: GnssDate::decode(r.bytes(GnssDate::LENGTH, "date")?)?,
            time: GnssTime::decode(r.bytes(GnssTime::LENGTH, "time")?)?,
            lon: r.u32("lon")?,
            lat: r.u32("lat")?,
            vec1: r.u16("vec1")?,
            vec2: r.u16("vec2")?,
            vec3: r.u32("vec3")?,
            direction: r.u16("direction")?,
            altitude: r.u16("altitude")?,
            state: LocationStatus::from_u32(r.u32("state")?),
            alarm: LocationAlarm::from_u32(r.u32("alarm")?),
        };
        r.finish();
        Ok(location)
    }
}

impl fmt::Display for RealLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RealLocation{{{} {}, lon: {}, lat: {}, speed: {}/{}, mileage: {}, direction: {}, altitude: {}, {}, {}}}",
            self.date,
            self.time,
            self.lon,
            self.lat,
            self.vec1,
            self.vec2,
            self.vec3,
            self.direction,
            self.altitude,
            self.state,
            self.alarm
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_status_and_alarm_words() {
        let alarm = LocationAlarm {
            emergency: true,
            speeding: true,
            collision_rollover: true,
            ..Default::default()
        };
        let status = LocationStatus {
            acc: true,
            location: true,
            door_locked: true,
            ..Default::default()
        };
        assert_eq!(alarm.to_u32(), 0x2000_0003);
        assert_eq!(status.to_u32(), 0x0000_1003);
        assert_eq!(LocationAlarm::from_u32(0x2000_0003), alarm);
        assert_eq!(LocationStatus::from_u32(0x0000_1003), status);
    }

    #[test]
    fn test_reserved_bits_ignored() {
        let status = LocationStatus::from_u32(0xFFFF_FFFF);
        assert!(status.acc && status.door_locked && status.gas);
        assert_eq!(status.to_u32(), 0x0000_1C3F);

        let alarm = LocationAlarm::from_u32(0xFFFF_FFFF);
        assert_eq!(alarm.to_u32(), 0x3FFC_0FFF);
    }

    #[test]
    fn test_real_location_layout() {
        let at = NaiveDate::from_ymd_opt(2021, 12, 20)
            .unwrap()
            .and_hms_opt(12, 49, 9)
            .unwrap();
        let mut location = RealLocation::at(&at);
        location.lon = 123;
        location.lat = 123;
        location.vec1 = 123;
        location.vec2 = 123;
        location.vec3 = 123;
        location.direction = 123;
        location.altitude = 123;
        location.state.acc = true;
        location.state.location = true;

        let mut out = Vec::new();
        location.encode(&mut out);
        assert_eq!(out.len(), RealLocation::LENGTH);
        assert_eq!(
            out,
            vec![
                0x00, 0x14, 0x0C, 0x07, 0xE5, 0x0C, 0x31, 0x09, 0x00, 0x00, 0x00, 0x7B, 0x00,
                0x00, 0x00, 0x7B, 0x00, 0x7B, 0x00, 0x7B, 0x00, 0x00, 0x00, 0x7B, 0x00, 0x7B,
                0x00, 0x7B, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00
            ]
        );
        assert_eq!(RealLocation::decode(&out).unwrap(), location);
    }

    #[test]
    fn test_real_location_too_short() {
        assert!(RealLocation::decode(&[0u8; 35]).is_err());
    }
}
