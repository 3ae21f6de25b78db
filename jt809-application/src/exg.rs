//! Vehicle dynamic-information exchange (`UP_EXG_MSG`) and its sub-packets

use crate::field::FieldReader;
use crate::location::RealLocation;
use crate::message_type::exg;
use bytes::BufMut;
use jt809_core::datatypes::{decode_fixed_string, fixed_length_string, PlateColor, VEHICLE_NO_LENGTH};
use jt809_core::{Jt809Error, Jt809Result};
use std::fmt;

/// Sub-packet carried inside a composite packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubPacket {
    RealLocation(RealLocation),
}

impl SubPacket {
    /// Sub-type code written to the parent's `data_type`
    pub fn data_type(&self) -> u16 {
        match self {
            SubPacket::RealLocation(_) => exg::UP_EXG_MSG_REAL_LOCATION,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SubPacket::RealLocation(_) => "UP_EXG_MSG_REAL_LOCATION",
        }
    }

    pub fn encode<B: BufMut>(&self, out: &mut B) {
        match self {
            SubPacket::RealLocation(location) => location.encode(out),
        }
    }

    /// Decode a sub-packet of type `data_type`
    ///
    /// # Errors
    /// `Jt809Error::UnsupportedSubPacket` for an unknown type code.
    pub fn decode(data_type: u16, data: &[u8]) -> Jt809Result<Self> {
        match data_type {
            exg::UP_EXG_MSG_REAL_LOCATION => Ok(SubPacket::RealLocation(RealLocation::decode(data)?)),
            other => Err(Jt809Error::UnsupportedSubPacket(other)),
        }
    }
}

impl fmt::Display for SubPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubPacket::RealLocation(location) => write!(f, "{}", location),
        }
    }
}

/// `UP_EXG_MSG` body
///
/// `data_type` and `data_length` are not stored; they are derived from the
/// sub-packet when encoding and checked when decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpExgMsg {
    /// Plate number as sent on the wire, zero padded
    pub vehicle_no: [u8; VEHICLE_NO_LENGTH],
    pub vehicle_color: PlateColor,
    pub sub_packet: SubPacket,
}

impl UpExgMsg {
    /// Build a message for `plate`, GBK encoded
    pub fn new(plate: &str, vehicle_color: PlateColor, sub_packet: SubPacket) -> Jt809Result<Self> {
        let field = fixed_length_string(plate, VEHICLE_NO_LENGTH, true)?;
        let mut vehicle_no = [0u8; VEHICLE_NO_LENGTH];
        vehicle_no.copy_from_slice(&field);
        Ok(Self {
            vehicle_no,
            vehicle_color,
            sub_packet,
        })
    }

    /// Plate number decoded as GBK
    pub fn plate(&self) -> Jt809Result<String> {
        decode_fixed_string(&self.vehicle_no, true)
    }

    pub fn encode<B: BufMut>(&self, out: &mut B) -> Jt809Result<()> {
        let mut sub = Vec::with_capacity(RealLocation::LENGTH);
        self.sub_packet.encode(&mut sub);
        let data_length = u32::try_from(sub.len()).map_err(|_| {
            Jt809Error::InvalidData(format!("sub packet too large: {} bytes", sub.len()))
        })?;

        out.put_slice(&self.vehicle_no);
        out.put_u8(self.vehicle_color.value());
        out.put_u16(self.sub_packet.data_type());
        out.put_u32(data_length);
        out.put_slice(&sub);
        Ok(())
    }

    /// # Errors
    /// - `Jt809Error::UnsupportedSubPacket` for an unknown `data_type`
    /// - `Jt809Error::InvalidData` if `data_length` disagrees with the
    ///   bytes that follow it, or the plate colour code is unknown
    pub fn decode(data: &[u8]) -> Jt809Result<Self> {
        let mut r = FieldReader::new(data, "UpExgMsg");
        let vehicle_no = r.array::<VEHICLE_NO_LENGTH>("vehicle_no")?;
        let color = r.u8("vehicle_color")?;
        let data_type = r.u16("data_type")?;
        let data_length = r.u32("data_length")? as usize;

        let rest = r.rest();
        let sub_packet = SubPacket::decode(data_type, rest)?;
        if data_length != rest.len() {
            return Err(Jt809Error::InvalidData(format!(
                "UpExgMsg: data_length {} but {} bytes follow",
                data_length,
                rest.len()
            )));
        }
        let vehicle_color = PlateColor::from_u8(color).ok_or_else(|| {
            Jt809Error::InvalidData(format!("UpExgMsg: unknown plate colour {}", color))
        })?;

        Ok(Self {
            vehicle_no,
            vehicle_color,
            sub_packet,
        })
    }
}

impl fmt::Display for UpExgMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plate = self
            .plate()
            .unwrap_or_else(|_| String::from_utf8_lossy(&self.vehicle_no).into_owned());
        write!(
            f,
            "UpExgMsg{{vehicle_no: {}, vehicle_color: {}, data_type: 0x{:04X}, sub_packet: {}}}",
            plate,
            self.vehicle_color,
            self.sub_packet.data_type(),
            self.sub_packet
        )
    }
}
