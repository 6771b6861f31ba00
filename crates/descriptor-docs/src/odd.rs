//! OpenSearch description document (ODD) parsing (§4.3): extracts the
//! enumerated option-sets of the eleven recognised facet parameters.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;

/// The facet parameter names this store recognises in an ODD.
pub const FACET_NAMES: &[&str] = &[
    "ecv",
    "frequency",
    "institute",
    "processingLevel",
    "productString",
    "productVersion",
    "dataType",
    "sensor",
    "platform",
    "fileFormat",
    "drsId",
];

/// A facet's value: a scalar when the ODD advertised exactly one option,
/// a list when it advertised more than one. The two forms never coexist
/// for the same facet in a single harmonised map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetValue {
    Single(String),
    Multi(Vec<String>),
}

impl FacetValue {
    pub fn as_list(&self) -> Vec<String> {
        match self {
            FacetValue::Single(s) => vec![s.clone()],
            FacetValue::Multi(v) => v.clone(),
        }
    }

    /// Merges two occurrences of the same facet the way a catalog build
    /// harmonises a scalar field discovered later against a list already
    /// built from an earlier document: singular is appended to the list
    /// and the scalar form is discarded.
    pub fn merge(self, other: FacetValue) -> FacetValue {
        match (self, other) {
            (FacetValue::Multi(mut a), FacetValue::Multi(b)) => {
                for v in b {
                    if !a.contains(&v) {
                        a.push(v);
                    }
                }
                FacetValue::Multi(a)
            }
            (FacetValue::Multi(mut a), FacetValue::Single(b)) | (FacetValue::Single(b), FacetValue::Multi(mut a)) => {
                if !a.contains(&b) {
                    a.push(b);
                }
                FacetValue::Multi(a)
            }
            (FacetValue::Single(a), FacetValue::Single(b)) if a == b => FacetValue::Single(a),
            (FacetValue::Single(a), FacetValue::Single(b)) => FacetValue::Multi(vec![a, b]),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OddFacets {
    pub fields: BTreeMap<String, FacetValue>,
}

impl OddFacets {
    pub fn merge_from(&mut self, other: OddFacets) {
        for (name, value) in other.fields {
            match self.fields.remove(&name) {
                Some(existing) => {
                    self.fields.insert(name, existing.merge(value));
                }
                None => {
                    self.fields.insert(name, value);
                }
            }
        }
    }
}

/// Parses an ODD XML document, extracting the option-sets for every
/// recognised parameter name. Parse errors degrade to an empty map (§4.3).
pub fn parse_odd(xml: &str) -> OddFacets {
    match parse_odd_inner(xml) {
        Ok(facets) => facets,
        Err(_) => OddFacets::default(),
    }
}

fn parse_odd_inner(xml: &str) -> Result<OddFacets, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut fields = BTreeMap::new();
    let mut current_param: Option<String> = None;
    let mut current_options: Vec<String> = Vec::new();

    let mut finish_parameter = |name: String, options: &[String], fields: &mut BTreeMap<String, FacetValue>| {
        let value = match options.len() {
            0 => None,
            1 => Some(FacetValue::Single(options[0].clone())),
            _ => Some(FacetValue::Multi(options.to_vec())),
        };
        if let Some(value) = value {
            fields.insert(name, value);
        }
    };

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let local = local_name(&e);
                if local == "Parameter" {
                    current_param = attr(&e, "name").filter(|n| FACET_NAMES.contains(&n.as_str()));
                    current_options.clear();
                } else if local == "Option" && current_param.is_some() {
                    if let Some(value) = attr(&e, "value") {
                        current_options.push(value);
                    }
                }
            }
            Event::Empty(e) => {
                let local = local_name(&e);
                if local == "Option" && current_param.is_some() {
                    if let Some(value) = attr(&e, "value") {
                        current_options.push(value);
                    }
                }
            }
            Event::End(e) => {
                if local_name_end(&e) == "Parameter" {
                    if let Some(name) = current_param.take() {
                        finish_parameter(name, &current_options, &mut fields);
                        current_options.clear();
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(OddFacets { fields })
}

fn local_name(e: &quick_xml::events::BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn local_name_end(e: &quick_xml::events::BytesEnd) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attr(e: &quick_xml::events::BytesStart, name: &str) -> Option<String> {
    e.attributes().filter_map(|a| a.ok()).find_map(|a| {
        if a.key.local_name().as_ref() == name.as_bytes() {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}
