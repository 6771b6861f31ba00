//! ISO-19115 description XML (descxml) parsing (§4.3): fixed-path
//! extraction of title/abstract/licences/bbox/temporal coverage, a
//! conditional substitution for file formats, and linked extraction of
//! publication/creation dates from a `CI_DateTypeCode` sibling.

use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescXmlMeta {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub licences: Vec<String>,
    pub bbox: Option<(f64, f64, f64, f64)>,
    pub temporal_coverage: Option<(String, String)>,
    pub file_formats: Vec<String>,
    pub creation_date: Option<String>,
    pub publication_date: Option<String>,
}

/// The fixed-value check the source project substitutes against: when the
/// resource format name matches this exactly, `.nc` is recorded as the file
/// format instead of the literal name text (§4.3 "conditional extraction").
const NETCDF_FORMAT_MARKER: &str = "Data are in NetCDF format";

/// Parses a descxml document. Parse errors degrade to an empty mapping
/// (§4.3) rather than propagating.
pub fn parse_descxml(xml: &str) -> DescXmlMeta {
    parse_descxml_inner(xml).unwrap_or_default()
}

fn parse_descxml_inner(xml: &str) -> Result<DescXmlMeta, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut meta = DescXmlMeta::default();

    let mut bbox_minx = None;
    let mut bbox_miny = None;
    let mut bbox_maxx = None;
    let mut bbox_maxy = None;

    // Scratch state for the current gmd:CI_Date block, reset whenever one
    // is entered, so repeated date blocks (creation, publication, ...) do
    // not bleed into each other.
    let mut in_ci_date = false;
    let mut ci_date_value: Option<String> = None;
    let mut ci_date_type: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let local = local_name(&e);
                if local == "CI_Date" {
                    in_ci_date = true;
                    ci_date_value = None;
                    ci_date_type = None;
                }
                path.push(local);
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                if text.is_empty() {
                    continue;
                }
                match path_suffix(&path) {
                    ["identificationInfo", "MD_DataIdentification", "abstract", "CharacterString"] => {
                        meta.abstract_text = Some(text);
                    }
                    ["identificationInfo", "MD_DataIdentification", "citation", "CI_Citation", "title", "CharacterString"] => {
                        meta.title = Some(text);
                    }
                    ["identificationInfo", "MD_DataIdentification", "resourceConstraints", "MD_Constraints", "useLimitation", "CharacterString"] => {
                        meta.licences.push(text);
                    }
                    ["identificationInfo", "MD_DataIdentification", "extent", "EX_Extent", "geographicElement", "EX_GeographicBoundingBox", "westBoundLongitude", "Decimal"] => {
                        bbox_minx = text.parse::<f64>().ok();
                    }
                    ["identificationInfo", "MD_DataIdentification", "extent", "EX_Extent", "geographicElement", "EX_GeographicBoundingBox", "eastBoundLongitude", "Decimal"] => {
                        bbox_maxx = text.parse::<f64>().ok();
                    }
                    ["identificationInfo", "MD_DataIdentification", "extent", "EX_Extent", "geographicElement", "EX_GeographicBoundingBox", "southBoundLatitude", "Decimal"] => {
                        bbox_miny = text.parse::<f64>().ok();
                    }
                    ["identificationInfo", "MD_DataIdentification", "extent", "EX_Extent", "geographicElement", "EX_GeographicBoundingBox", "northBoundLatitude", "Decimal"] => {
                        bbox_maxy = text.parse::<f64>().ok();
                    }
                    ["identificationInfo", "MD_DataIdentification", "extent", "EX_Extent", "temporalElement", "EX_TemporalExtent", "extent", "TimePeriod", "beginPosition"] => {
                        let end = meta.temporal_coverage.take().map(|(_, e)| e).unwrap_or_default();
                        meta.temporal_coverage = Some((text, end));
                    }
                    ["identificationInfo", "MD_DataIdentification", "extent", "EX_Extent", "temporalElement", "EX_TemporalExtent", "extent", "TimePeriod", "endPosition"] => {
                        let start = meta.temporal_coverage.take().map(|(s, _)| s).unwrap_or_default();
                        meta.temporal_coverage = Some((start, text));
                    }
                    ["identificationInfo", "MD_DataIdentification", "resourceFormat", "MD_Format", "name", "CharacterString"] => {
                        if text == NETCDF_FORMAT_MARKER {
                            meta.file_formats.push(".nc".to_string());
                        }
                    }
                    _ => {}
                }
                if in_ci_date {
                    match path_suffix(&path) {
                        ["dateType", "CI_DateTypeCode"] => ci_date_type = Some(text),
                        ["date", "DateTime"] => ci_date_value = Some(text),
                        _ => {}
                    }
                }
            }
            Event::End(e) => {
                let local = local_name_end(&e);
                path.pop();
                if local == "CI_Date" {
                    if let (Some(kind), Some(value)) = (ci_date_type.take(), ci_date_value.take()) {
                        match kind.as_str() {
                            "creation" => meta.creation_date = Some(value),
                            "publication" => meta.publication_date = Some(value),
                            _ => {}
                        }
                    }
                    in_ci_date = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let (Some(minx), Some(miny), Some(maxx), Some(maxy)) = (bbox_minx, bbox_miny, bbox_maxx, bbox_maxy) {
        meta.bbox = Some((minx, miny, maxx, maxy));
    }

    Ok(meta)
}

/// Returns the last `N` path segments as a fixed-size slice for pattern
/// matching, or an empty slice if the path is shorter.
fn path_suffix<const N: usize>(path: &[String]) -> [&str; N] {
    let mut out = [""; N];
    if path.len() < N {
        return out;
    }
    for (i, seg) in path[path.len() - N..].iter().enumerate() {
        out[i] = seg.as_str();
    }
    out
}

fn local_name(e: &quick_xml::events::BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn local_name_end(e: &quick_xml::events::BytesEnd) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}
