//! Reader for the geonames postal code export
//! (<https://download.geonames.org/export/zip/>).
//!
//! Files are tab separated, without header, one postal code per line:
//! country code, postal code, place name, three admin name/code pairs,
//! latitude, longitude and accuracy.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use zip::ZipArchive;

use crate::data::import::error::ImportError;
use crate::data::models::PostalCodeRecord;

const DOWNLOAD_BASE_URL: &str = "https://download.geonames.org/export/zip";
const USER_AGENT: &str = concat!("geo-postcode-fixtures/", env!("CARGO_PKG_VERSION"));

const COUNTRY_COLUMN: usize = 0;
const POSTAL_CODE_COLUMN: usize = 1;
const LAT_COLUMN: usize = 9;
const LNG_COLUMN: usize = 10;

lazy_static! {
    static ref DATA_FILE_RE: Regex = Regex::new(r"(?i)^(?:[a-z]{2}(?:_full)?|allcountries)\.txt$")
        .expect("Could not create regex");
    static ref ARCHIVE_NAME_RE: Regex = Regex::new(r"(?i)^(?:[a-z]{2}|allcountries)$")
        .expect("Could not create regex");
}

/// Parses postal codes, skipping lines that carry no coordinates.
pub fn read_postal_codes<R: Read>(reader: R) -> Result<Vec<PostalCodeRecord>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let (lat, lng) = match (record.get(LAT_COLUMN), record.get(LNG_COLUMN)) {
            (Some(lat), Some(lng)) if !lat.is_empty() && !lng.is_empty() => (lat, lng),
            _ => {
                debug!("Skipping line {}: no coordinates", line);
                continue;
            },
        };
        let (country, postal_code) = match (record.get(COUNTRY_COLUMN), record.get(POSTAL_CODE_COLUMN)) {
            (Some(country), Some(postal_code)) if !country.is_empty() && !postal_code.is_empty() =>
                (country, postal_code),
            _ => {
                debug!("Skipping line {}: no postal code", line);
                continue;
            },
        };

        records.push(PostalCodeRecord {
            country: country.to_owned(),
            postal_code: postal_code.to_owned(),
            lat: parse_coordinate(lat, 90.0, line)?,
            lng: parse_coordinate(lng, 180.0, line)?
        });
    }
    Ok(records)
}

fn parse_coordinate(value: &str, bound: f64, line: u64) -> Result<f64, ImportError> {
    let coordinate = value
        .parse::<f64>()
        .map_err(|err| ImportError::InvalidData(
            format!("line {}: invalid coordinate '{}': {}", line, value, err)
        ))?;

    if !coordinate.is_finite() || coordinate.abs() > bound {
        return Err(ImportError::InvalidData(
            format!("line {}: coordinate {} out of range", line, value)
        ));
    }
    Ok(coordinate)
}

/// Whether an archive entry holds postal codes (`PR.txt`, `GB_full.txt`,
/// `allCountries.txt`), as opposed to the bundled `readme.txt`.
pub fn is_data_file(entry_name: &str) -> bool {
    Path::new(entry_name)
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| DATA_FILE_RE.is_match(name))
        .unwrap_or(false)
}

pub fn read_postal_codes_from_zip<R: Read + Seek>(
    reader: R
) -> Result<Vec<PostalCodeRecord>, ImportError> {
    let mut zip = ZipArchive::new(reader)?;

    for i in 0..zip.len() {
        let file = zip.by_index(i)?;
        debug!("File: {}", file.name());
        if is_data_file(file.name()) {
            info!("Found postal code file {}", file.name());
            return read_postal_codes(file);
        }
    }
    Err(ImportError::NoDataFileInArchive)
}

/// Reads a plain geonames file, or the postal code file inside a `.zip`.
pub fn read_postal_codes_from_path(path: &Path) -> Result<Vec<PostalCodeRecord>, ImportError> {
    let file = File::open(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => ImportError::FileNotFound(path.to_path_buf()),
        _ => ImportError::Io(err),
    })?;
    info!("Reading postal codes from {}", path.display());

    if is_zip(path) {
        read_postal_codes_from_zip(BufReader::new(file))
    } else {
        read_postal_codes(BufReader::new(file))
    }
}

pub fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// Downloads the archive of one country (or `allCountries`) into `dir` and
/// returns the path of the written file.
pub fn download_country_archive(country: &str, dir: &Path) -> Result<PathBuf, ImportError> {
    if !ARCHIVE_NAME_RE.is_match(country) {
        return Err(ImportError::InvalidData(format!("'{}' is not a geonames archive name", country)));
    }
    let archive_name = if country.eq_ignore_ascii_case("allcountries") {
        "allCountries".to_string()
    } else {
        country.to_ascii_uppercase()
    };
    let url = format!("{}/{}.zip", DOWNLOAD_BASE_URL, archive_name);
    info!("Downloading {} from {}", archive_name, url);

    let response = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()?
        .get(&url)
        .send()?
        .error_for_status()?;

    let progress_bar = match response.content_length() {
        Some(length) => ProgressBar::new(length),
        None => ProgressBar::new_spinner(),
    };

    std::fs::create_dir_all(dir)?;
    let target = dir.join(format!("{}.zip", archive_name));
    let mut file = File::create(&target)?;
    let mut reader = progress_bar.wrap_read(response);
    let size = std::io::copy(&mut reader, &mut file)?;
    progress_bar.finish();

    info!("Downloaded zip, size: {} KB", size / 1_000);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use std::path::Path;

    use zip::write::FileOptions;
    use zip::ZipWriter;

    use crate::data::geonames::{
        is_data_file, read_postal_codes, read_postal_codes_from_path, read_postal_codes_from_zip,
    };
    use crate::data::import::error::ImportError;

    const LINES: &str = "PR\t00601\tAdjuntas\tPuerto Rico\tPR\tAdjuntas Municipio\t001\t\t\t18.1788\t-66.7516\t1\n\
        PR\t00602\tAguada\tPuerto Rico\tPR\tAguada Municipio\t003\t\t\t18.3784\t-67.1864\t1\n";

    fn zip_archive(entries: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        let mut cursor = writer.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn test_read_postal_codes() {
        let records = read_postal_codes(LINES.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].country, "PR");
        assert_eq!(records[0].postal_code, "00601");
        assert_eq!(records[0].lat, 18.1788);
        assert_eq!(records[0].lng, -66.7516);
        assert_eq!(records[1].postal_code, "00602");
    }

    #[test]
    fn test_read_postal_codes_skips_lines_without_coordinates() {
        let data = "DE\t14473\tPotsdam\tBrandenburg\tBB\n\
            \n\
            DE\t14467\tPotsdam\tBrandenburg\tBB\t\t\t\t\t\t\t\n\
            DE\t14469\tPotsdam\tBrandenburg\tBB\t\t00\tPotsdam\t12054\t 52.4235 \t13.0379\t4\n";

        let records = read_postal_codes(data.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].postal_code, "14469");
        assert_eq!(records[0].lat, 52.4235);
    }

    #[test]
    fn test_read_postal_codes_keeps_quotes_in_names() {
        let data = "US\t99501\t\"Anchorage\tAlaska\tAK\t\t\t\t\t61.2181\t-149.9003\t4\n";

        let records = read_postal_codes(data.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].lng, -149.9003);
    }

    #[test]
    fn test_read_postal_codes_invalid_coordinate() {
        let data = "PR\t00601\tAdjuntas\t\t\t\t\t\t\tnorth\t-66.7516\t1\n";
        assert!(matches!(read_postal_codes(data.as_bytes()), Err(ImportError::InvalidData(_))));

        let data = "PR\t00601\tAdjuntas\t\t\t\t\t\t\t98.5\t-66.7516\t1\n";
        assert!(matches!(read_postal_codes(data.as_bytes()), Err(ImportError::InvalidData(_))));
    }

    #[test]
    fn test_is_data_file() {
        assert!(is_data_file("PR.txt"));
        assert!(is_data_file("gb_full.txt"));
        assert!(is_data_file("allCountries.txt"));
        assert!(is_data_file("export/DE.txt"));
        assert!(!is_data_file("readme.txt"));
        assert!(!is_data_file("PR.csv"));
    }

    #[test]
    fn test_read_postal_codes_from_zip() {
        let archive = zip_archive(&[("readme.txt", "not postal codes\n"), ("PR.txt", LINES)]);

        let records = read_postal_codes_from_zip(archive).unwrap();

        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_read_postal_codes_from_zip_without_data_file() {
        let archive = zip_archive(&[("readme.txt", "not postal codes\n")]);

        let result = read_postal_codes_from_zip(archive);

        assert!(matches!(result, Err(ImportError::NoDataFileInArchive)));
    }

    #[test]
    fn test_read_postal_codes_from_path() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/geonames/PR.txt");

        let records = read_postal_codes_from_path(&path).unwrap();

        assert_eq!(records.len(), 177);
        assert!(records.iter().all(|r| r.country == "PR"));
    }

    #[test]
    fn test_read_postal_codes_from_zip_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PR.zip");
        std::fs::write(&path, zip_archive(&[("PR.txt", LINES)]).into_inner()).unwrap();

        let records = read_postal_codes_from_path(&path).unwrap();

        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_read_postal_codes_from_missing_path() {
        let result = read_postal_codes_from_path(Path::new("does/not/exist.txt"));

        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }
}
