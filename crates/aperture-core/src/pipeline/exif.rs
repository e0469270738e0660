//! EXIF extraction from source image bytes.
//!
//! Intentionally lenient: most uploads carry no EXIF at all, and a
//! malformed EXIF block should never fail the metadata stage. Extraction
//! returns partial data when only some fields are present.

use exif::{In, Reader, Tag, Value};
use std::io::Cursor;

use crate::types::ExifData;

/// Extract the EXIF subset from image bytes.
///
/// Returns `None` when the image has no EXIF data or none of the fields
/// this pipeline records.
pub fn extract(bytes: &[u8]) -> Option<ExifData> {
    let mut cursor = Cursor::new(bytes);
    let exif = Reader::new().read_from_container(&mut cursor).ok()?;

    let data = ExifData {
        captured_at: get_datetime(&exif),
        camera_make: get_string(&exif, Tag::Make),
        camera_model: get_string(&exif, Tag::Model),
        gps_latitude: get_gps_coord(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef),
        gps_longitude: get_gps_coord(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef),
        orientation: get_u32(&exif, Tag::Orientation),
    };

    if data.is_empty() {
        None
    } else {
        Some(data)
    }
}

/// Get a string field from EXIF data.
fn get_string(exif: &exif::Exif, tag: Tag) -> Option<String> {
    exif.get_field(tag, In::PRIMARY).map(|f| {
        let s = f.display_value().to_string();
        s.trim_matches('"').to_string()
    })
}

/// Get a u32 field from EXIF data.
fn get_u32(exif: &exif::Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)
        .and_then(|f| match &f.value {
            Value::Short(v) => v.first().map(|&x| x as u32),
            Value::Long(v) => v.first().copied(),
            _ => None,
        })
}

/// Get the capture datetime, preferring DateTimeOriginal over DateTime.
fn get_datetime(exif: &exif::Exif) -> Option<String> {
    exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY))
        .map(|f| {
            let s = f.display_value().to_string();
            s.trim_matches('"').to_string()
        })
}

/// Get a GPS coordinate, converting degrees/minutes/seconds to decimal.
fn get_gps_coord(exif: &exif::Exif, coord_tag: Tag, ref_tag: Tag) -> Option<f64> {
    let coord = exif.get_field(coord_tag, In::PRIMARY)?;
    let reference = exif.get_field(ref_tag, In::PRIMARY)?;

    let degrees = parse_gps_rationals(&coord.value)?;
    let ref_str = reference.display_value().to_string();

    // Sign from the hemisphere reference (N/S for lat, E/W for lon)
    let sign = if ref_str.contains('S') || ref_str.contains('W') {
        -1.0
    } else {
        1.0
    };

    Some(sign * degrees)
}

/// Parse GPS rationals (degrees, minutes, seconds) to decimal degrees.
fn parse_gps_rationals(value: &Value) -> Option<f64> {
    match value {
        Value::Rational(rationals) if rationals.len() >= 3 => {
            let degrees = rationals[0].to_f64();
            let minutes = rationals[1].to_f64();
            let seconds = rationals[2].to_f64();
            Some(degrees + minutes / 60.0 + seconds / 3600.0)
        }
        _ => None,
    }
}
