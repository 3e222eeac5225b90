//! EXIF capture time and GPS extraction for images

use super::{Coordinates, MediaMetadata, MetadataResolver};
use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, trace};

/// EXIF tags to try for the capture time, in priority order
const DATE_TAGS: &[Tag] = &[
    Tag::DateTimeOriginal,  // When the original image was taken
    Tag::DateTimeDigitized, // When the image was digitized
];

/// Metadata resolver backed by kamadak-exif
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifResolver;

impl MetadataResolver for ExifResolver {
    fn extract(&self, path: &Path) -> MediaMetadata {
        match read_exif(path) {
            Ok(exif) => {
                let metadata = MediaMetadata {
                    captured_at: capture_time(&exif),
                    coordinates: coordinates(&exif),
                };
                trace!(?path, ?metadata, "Read EXIF metadata");
                metadata
            }
            Err(e) => {
                debug!(?path, error = %e, "No usable EXIF data");
                MediaMetadata::default()
            }
        }
    }
}

fn read_exif(path: &Path) -> Result<Exif> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| Error::ExifRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn capture_time(exif: &Exif) -> Option<NaiveDateTime> {
    DATE_TAGS.iter().find_map(|tag| {
        exif.get_field(*tag, In::PRIMARY)
            .and_then(|field| parse_exif_datetime(&field.display_value().to_string()))
    })
}

fn coordinates(exif: &Exif) -> Option<Coordinates> {
    let latitude = signed_degrees(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef)?;
    let longitude = signed_degrees(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef)?;
    Some(Coordinates::new(latitude, longitude))
}

/// Combine a degrees/minutes/seconds field with its N/S/E/W reference
fn signed_degrees(exif: &Exif, value_tag: Tag, ref_tag: Tag) -> Option<f64> {
    let dms = match exif.get_field(value_tag, In::PRIMARY)?.value {
        Value::Rational(ref parts) if parts.len() >= 3 => [
            parts[0].to_f64(),
            parts[1].to_f64(),
            parts[2].to_f64(),
        ],
        _ => return None,
    };
    let reference = match exif.get_field(ref_tag, In::PRIMARY)?.value {
        Value::Ascii(ref strings) => strings.first()?.first().map(|b| *b as char)?,
        _ => return None,
    };
    dms_to_decimal(dms, reference)
}

/// Convert degrees, minutes and seconds to decimal degrees, rounded to 6 places
fn dms_to_decimal(dms: [f64; 3], reference: char) -> Option<f64> {
    let [degrees, minutes, seconds] = dms;
    let mut decimal = degrees + minutes / 60.0 + seconds / 3600.0;
    if !decimal.is_finite() {
        return None;
    }

    if matches!(reference.to_ascii_uppercase(), 'S' | 'W') {
        decimal = -decimal;
    }

    Some((decimal * 1_000_000.0).round() / 1_000_000.0)
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    // kamadak-exif displays DateTime fields as "2024-01-15 14:30:00"
    let s = s.trim().trim_matches('"');

    let formats = [
        "%Y:%m:%d %H:%M:%S",
        "%Y:%m:%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
    ];

    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use exif::experimental::Writer;
    use exif::{Field, Rational};
    use std::fs;
    use std::io::Cursor;

    fn field(tag: Tag, value: Value) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value,
        }
    }

    fn ascii(s: &str) -> Value {
        Value::Ascii(vec![s.as_bytes().to_vec()])
    }

    fn dms(degrees: u32, minutes: u32, centiseconds: u32) -> Value {
        Value::Rational(vec![
            Rational::from((degrees, 1)),
            Rational::from((minutes, 1)),
            Rational::from((centiseconds, 100)),
        ])
    }

    /// Encode `fields` as a minimal little-endian TIFF
    fn write_tiff(path: &Path, fields: &[Field]) {
        let mut writer = Writer::new();
        for f in fields {
            writer.push_field(f);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, true).unwrap();
        fs::write(path, buf.into_inner()).unwrap();
    }

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime("2019:07:04 09:15:30").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2019, 7, 4));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (9, 15, 30));

        let dt = parse_exif_datetime("\"2019:07:04 09:15:30\"").unwrap();
        assert_eq!(dt.year(), 2019);

        let dt = parse_exif_datetime("2019-07-04 09:15:30").unwrap();
        assert_eq!(dt.day(), 4);

        assert!(parse_exif_datetime("0000:00:00 00:00:00").is_none());
        assert!(parse_exif_datetime("not a date").is_none());
    }

    #[test]
    fn test_dms_to_decimal() {
        // 40° 26' 46.302" N
        assert_eq!(dms_to_decimal([40.0, 26.0, 46.302], 'N'), Some(40.446195));
        // 79° 58' 56.484" W
        assert_eq!(dms_to_decimal([79.0, 58.0, 56.484], 'W'), Some(-79.982357));
        assert_eq!(dms_to_decimal([33.0, 52.0, 0.0], 's'), Some(-33.866667));
        assert_eq!(dms_to_decimal([f64::NAN, 0.0, 0.0], 'N'), None);
    }

    #[test]
    fn test_unreadable_file_yields_empty_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(ExifResolver.extract(&path).is_empty());
        assert!(ExifResolver.extract(&dir.path().join("missing.jpg")).is_empty());
    }

    #[test]
    fn test_extract_from_tiff_southern_western() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.tif");
        write_tiff(
            &path,
            &[
                field(Tag::DateTimeOriginal, ascii("2019:07:04 09:15:30")),
                field(Tag::DateTimeDigitized, ascii("2020:01:01 00:00:00")),
                // 33° 52' 4.56" S, 151° 12' 36.00" W
                field(Tag::GPSLatitudeRef, ascii("S")),
                field(Tag::GPSLatitude, dms(33, 52, 456)),
                field(Tag::GPSLongitudeRef, ascii("W")),
                field(Tag::GPSLongitude, dms(151, 12, 3600)),
            ],
        );

        let metadata = ExifResolver.extract(&path);
        let taken = metadata.captured_at.unwrap();
        assert_eq!((taken.year(), taken.month(), taken.day()), (2019, 7, 4));
        assert_eq!((taken.hour(), taken.minute(), taken.second()), (9, 15, 30));
        assert_eq!(
            metadata.coordinates,
            Some(Coordinates::new(-33.867933, -151.21))
        );
    }

    #[test]
    fn test_extract_digitized_time_without_gps_reference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.tif");
        write_tiff(
            &path,
            &[
                field(Tag::DateTimeDigitized, ascii("2001:02:03 04:05:06")),
                // latitude without its N/S reference is unusable
                field(Tag::GPSLatitude, dms(10, 0, 0)),
                field(Tag::GPSLongitudeRef, ascii("E")),
                field(Tag::GPSLongitude, dms(20, 0, 0)),
            ],
        );

        let metadata = ExifResolver.extract(&path);
        let taken = metadata.captured_at.unwrap();
        assert_eq!((taken.year(), taken.month(), taken.day()), (2001, 2, 3));
        assert_eq!(metadata.coordinates, None);
    }

    #[test]
    fn test_extract_northern_eastern() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paris.tif");
        write_tiff(
            &path,
            &[
                field(Tag::GPSLatitudeRef, ascii("N")),
                field(Tag::GPSLatitude, dms(48, 51, 0)),
                field(Tag::GPSLongitudeRef, ascii("E")),
                field(Tag::GPSLongitude, dms(2, 21, 0)),
            ],
        );

        let metadata = ExifResolver.extract(&path);
        assert_eq!(metadata.captured_at, None);
        assert_eq!(
            metadata.coordinates,
            Some(Coordinates::new(48.85, 2.35))
        );
    }
}
