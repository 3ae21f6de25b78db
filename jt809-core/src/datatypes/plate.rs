//! Vehicle plate helpers: plate colour codes and fixed-width text fields

use crate::error::{Jt809Error, Jt809Result};
use encoding_rs::GBK;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the vehicle plate field in exchange messages
pub const VEHICLE_NO_LENGTH: usize = 21;

/// Plate colour, JT/T 415-2006 section 5.4.12
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PlateColor {
    Blue = 1,
    Yellow = 2,
    Black = 3,
    White = 4,
    Other = 9,
}

impl PlateColor {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(PlateColor::Blue),
            2 => Some(PlateColor::Yellow),
            3 => Some(PlateColor::Black),
            4 => Some(PlateColor::White),
            9 => Some(PlateColor::Other),
            _ => None,
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }
}

impl From<PlateColor> for u8 {
    fn from(color: PlateColor) -> Self {
        color as u8
    }
}

impl fmt::Display for PlateColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlateColor::Blue => "blue",
            PlateColor::Yellow => "yellow",
            PlateColor::Black => "black",
            PlateColor::White => "white",
            PlateColor::Other => "other",
        };
        f.write_str(name)
    }
}

/// Encode `s` into a zero-padded field of exactly `width` bytes
///
/// With `gbk` set the text is GBK encoded first, which is what plate numbers
/// such as `"测A12345"` need on the wire. Plain ASCII is copied as-is.
///
/// # Errors
///
/// Returns `Jt809Error::Encoding` if the text has no GBK mapping and
/// `Jt809Error::InvalidData` if the encoded text does not fit.
pub fn fixed_length_string(s: &str, width: usize, gbk: bool) -> Jt809Result<Vec<u8>> {
    let encoded: Vec<u8> = if gbk {
        let (bytes, _, had_errors) = GBK.encode(s);
        if had_errors {
            return Err(Jt809Error::Encoding(format!(
                "text {:?} has no GBK representation",
                s
            )));
        }
        bytes.into_owned()
    } else {
        s.as_bytes().to_vec()
    };

    if encoded.len() > width {
        return Err(Jt809Error::InvalidData(format!(
            "text {:?} needs {} bytes, field is {}",
            s,
            encoded.len(),
            width
        )));
    }

    let mut field = vec![0u8; width];
    field[..encoded.len()].copy_from_slice(&encoded);
    Ok(field)
}

/// Decode a zero-padded field back into text
pub fn decode_fixed_string(field: &[u8], gbk: bool) -> Jt809Result<String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let content = &field[..end];
    if gbk {
        let (text, had_errors) = GBK.decode_without_bom_handling(content);
        if had_errors {
            return Err(Jt809Error::Encoding("field is not valid GBK".to_string()));
        }
        Ok(text.into_owned())
    } else {
        String::from_utf8(content.to_vec())
            .map_err(|e| Jt809Error::Encoding(format!("field is not valid UTF-8: {}", e)))
    }
}
