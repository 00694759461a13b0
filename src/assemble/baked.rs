//! # Baked OEM Constants
//!
//! Static data recovered from original discs: the OEM control-file header,
//! the locale/translation dictionary behind `INIT.SDL`, and the per-file
//! marker bytes of `MTOC.SDL`. Everything here is immutable compile-time
//! data; the build tool that derives these blobs runs offline and its output
//! is checked in as these tables.

use crate::config::FILE_PREFIX_SIZE;

/// 512-byte control header carried by every non-INIT file in OEM mode.
/// Original discs start control files with "SDAL" and zero fill.
pub fn oem_control_header() -> [u8; FILE_PREFIX_SIZE] {
    let mut header = [0u8; FILE_PREFIX_SIZE];
    header[..4].copy_from_slice(b"SDAL");
    header
}

/// Marker byte per file class, as found in OEM `MTOC.SDL` records.
pub fn marker_for_file(name: &str) -> u8 {
    let upper = name.to_ascii_uppercase();
    if upper.ends_with("0.SDL") || upper.ends_with("1.SDL") {
        return MARKER_MAP;
    }
    match upper.split('.').next().unwrap_or("") {
        "REGIONS" | "REGION" => MARKER_REGION,
        "POINAMES" | "POIGEOM" | "POI" => MARKER_POI,
        s if s.starts_with("DENS") => MARKER_DENS,
        "KDTREE" | "CARTOTOP" => MARKER_INDEX,
        _ => MARKER_OTHER,
    }
}

pub const MARKER_MAP: u8 = 0x01;
pub const MARKER_REGION: u8 = 0x02;
pub const MARKER_INDEX: u8 = 0x02;
pub const MARKER_POI: u8 = 0x08;
pub const MARKER_DENS: u8 = 0x0D;
pub const MARKER_OTHER: u8 = 0x00;

/// Continent prefix to two-letter disc code.
pub const CONTINENT_CODES: &[(&str, &str)] = &[
    ("EUROPE", "EU"),
    ("NORTH-AMERICA", "NA"),
    ("SOUTH-AMERICA", "SA"),
    ("ASIA", "AS"),
    ("AFRICA", "AF"),
    ("AUSTRALIA", "AU"),
];

pub fn disc_code(first_slug: &str) -> String {
    let continent = first_slug
        .split('/')
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    for &(name, code) in CONTINENT_CODES {
        if continent == name {
            return code.to_string();
        }
    }
    let mut code: String = continent.chars().take(2).collect();
    if code.len() < 2 {
        code = "XX".to_string();
    }
    code
}

/// Translation rows of the baked locale dictionary: native name first, then
/// one translation per language in [`LOCALE_LANGS`] order.
pub const LOCALE_LANGS: &[&str] = &["UKE", "DAN", "DUT", "GER", "FRE"];

pub const COUNTRY_TRANSLATIONS: &[(&str, [&str; 5])] = &[
    ("CYPRUS", ["CYPRUS", "CYPERN", "CYPRUS", "ZYPERN", "CHYPRE"]),
    ("DANMARK", ["DENMARK", "DANMARK", "DENEMARKEN", "DAENEMARK", "DANEMARK"]),
    (
        "DEUTSCHLAND",
        ["GERMANY", "TYSKLAND", "DUITSLAND", "DEUTSCHLAND", "ALLEMAGNE"],
    ),
    ("ESPANA", ["SPAIN", "SPANIEN", "SPANJE", "SPANIEN", "ESPAGNE"]),
    ("FRANCE", ["FRANCE", "FRANKRIG", "FRANKRIJK", "FRANKREICH", "FRANCE"]),
    ("ITALIA", ["ITALY", "ITALIEN", "ITALIE", "ITALIEN", "ITALIE"]),
    ("MALTA", ["MALTA", "MALTA", "MALTA", "MALTA", "MALTE"]),
    (
        "NEDERLAND",
        ["NETHERLANDS", "HOLLAND", "NEDERLAND", "NIEDERLANDE", "PAYS-BAS"],
    ),
    ("NORGE", ["NORWAY", "NORGE", "NOORWEGEN", "NORWEGEN", "NORVEGE"]),
    (
        "OESTERREICH",
        ["AUSTRIA", "OESTRIG", "OOSTENRIJK", "OESTERREICH", "AUTRICHE"],
    ),
    ("PORTUGAL", ["PORTUGAL", "PORTUGAL", "PORTUGAL", "PORTUGAL", "PORTUGAL"]),
    ("SCHWEIZ", ["SWITZERLAND", "SCHWEIZ", "ZWITSERLAND", "SCHWEIZ", "SUISSE"]),
    ("SVERIGE", ["SWEDEN", "SVERIGE", "ZWEDEN", "SCHWEDEN", "SUEDE"]),
    (
        "UNITED KINGDOM",
        ["UNITED KINGDOM", "STORBRITANNIEN", "VERENIGD KONINKRIJK", "GROSSBRITANNIEN", "ROYAUME-UNI"],
    ),
];

const LOCALE_CELL: usize = 32;
const LOCALE_LANG_CELL: usize = 8;

/// Encodes the locale parcel payload: counts, language codes, then one
/// fixed 32-byte ASCII cell per (country, language).
pub fn encode_locale_table(supp_langs: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(COUNTRY_TRANSLATIONS.len() as u32).to_le_bytes());
    buf.extend_from_slice(&((supp_langs.len() + 1) as u32).to_le_bytes());

    push_cell(&mut buf, "NATIVE", LOCALE_LANG_CELL);
    for lang in supp_langs {
        push_cell(&mut buf, lang, LOCALE_LANG_CELL);
    }

    for &(native, ref translations) in COUNTRY_TRANSLATIONS {
        push_cell(&mut buf, native, LOCALE_CELL);
        for lang in supp_langs {
            push_cell(&mut buf, lookup_translation(translations, lang, native), LOCALE_CELL);
        }
    }
    buf
}

fn lookup_translation<'a>(
    translations: &'a [&'a str; 5],
    lang: &str,
    native: &'a str,
) -> &'a str {
    match LOCALE_LANGS.iter().position(|&l| l == lang) {
        Some(i) => translations[i],
        // Unknown languages fall back to the UKE column, then the native name.
        None => {
            if translations[0].is_empty() {
                native
            } else {
                translations[0]
            }
        }
    }
}

fn push_cell(buf: &mut Vec<u8>, text: &str, width: usize) {
    let bytes = text.as_bytes();
    let n = bytes.len().min(width);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + (width - n), 0);
}

/// Translation row for a region name, used by the OEM table files.
pub fn region_row(slug: &str, supp_langs: &[String]) -> Vec<String> {
    let native = slug
        .split('/')
        .next_back()
        .unwrap_or(slug)
        .replace(['-', '_'], " ")
        .to_ascii_uppercase();
    let mut row = vec![native.clone()];
    let translations = COUNTRY_TRANSLATIONS
        .iter()
        .find(|&&(name, _)| name == native)
        .map(|&(_, ref t)| t);
    for lang in supp_langs {
        let value = match translations {
            Some(t) => lookup_translation(t, lang, &native).to_string(),
            None => native.clone(),
        };
        row.push(value);
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oem_header_is_512_bytes_of_sdal_and_zeros() {
        let hdr = oem_control_header();
        assert_eq!(&hdr[..4], b"SDAL");
        assert!(hdr[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn disc_code_maps_known_continents() {
        assert_eq!(disc_code("europe/cyprus"), "EU");
        assert_eq!(disc_code("north-america/us"), "NA");
        assert_eq!(disc_code("atlantis/xy"), "AT");
        assert_eq!(disc_code(""), "XX");
    }

    #[test]
    fn map_files_get_the_map_marker() {
        assert_eq!(marker_for_file("CY1.SDL"), MARKER_MAP);
        assert_eq!(marker_for_file("DENSEU0.SDL"), MARKER_MAP);
        assert_eq!(marker_for_file("POINAMES.SDL"), MARKER_POI);
        assert_eq!(marker_for_file("INIT.SDL"), MARKER_OTHER);
    }

    #[test]
    fn locale_table_shape_matches_counts() {
        let langs = vec!["DAN".to_string(), "DUT".to_string()];
        let table = encode_locale_table(&langs);

        let countries = u32::from_le_bytes(table[0..4].try_into().unwrap()) as usize;
        let lang_count = u32::from_le_bytes(table[4..8].try_into().unwrap()) as usize;
        assert_eq!(countries, COUNTRY_TRANSLATIONS.len());
        assert_eq!(lang_count, 3);

        let expected = 8 + lang_count * LOCALE_LANG_CELL + countries * LOCALE_CELL * lang_count;
        assert_eq!(table.len(), expected);
    }

    #[test]
    fn region_row_translates_known_countries() {
        let langs = vec!["DAN".to_string()];
        let row = region_row("europe/danmark", &langs);
        assert_eq!(row, vec!["DANMARK".to_string(), "DANMARK".to_string()]);

        let row = region_row("europe/deutschland", &langs);
        assert_eq!(row[1], "TYSKLAND");
    }
}
