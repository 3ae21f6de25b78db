//! Data types used in the JT/T 809 protocol

pub mod gnss_date;
pub mod plate;

pub use gnss_date::{gnss_date_time, GnssDate, GnssTime};
pub use plate::{decode_fixed_string, fixed_length_string, PlateColor, VEHICLE_NO_LENGTH};
