//! DAS (Dataset Attribute Structure) parsing: the attribute half of an
//! OPeNDAP dataset's typed schema (§4.4).

use std::collections::BTreeMap;

/// Per-variable attribute tables plus the dataset-wide `NC_GLOBAL` block,
/// keyed by attribute name with `_FillValue`/`_ChunkSizes` already renamed
/// to `fill_value`/`chunk_sizes` (§4.4).
#[derive(Debug, Clone, Default)]
pub struct Das {
    pub global: BTreeMap<String, String>,
    pub variables: BTreeMap<String, BTreeMap<String, String>>,
}

/// Parses a DAS document. Degrades to an empty table on any malformed
/// input rather than failing the whole dataset open — DAS attributes are
/// supplementary to the DDS-derived shape information.
pub fn parse_das(text: &str) -> Das {
    parse_das_inner(text).unwrap_or_default()
}

fn parse_das_inner(text: &str) -> Option<Das> {
    let tokens = tokenize(text);
    let mut pos = 0usize;
    expect(&tokens, &mut pos, "Attributes")?;
    expect(&tokens, &mut pos, "{")?;

    let mut das = Das::default();
    while peek(&tokens, pos) != Some("}") {
        let block_name = next(&tokens, &mut pos)?.to_string();
        let attrs = parse_attribute_block(&tokens, &mut pos)?;
        if block_name == "NC_GLOBAL" {
            das.global = attrs;
        } else {
            das.variables.insert(block_name, attrs);
        }
    }
    Some(das)
}

fn parse_attribute_block(tokens: &[String], pos: &mut usize) -> Option<BTreeMap<String, String>> {
    expect(tokens, pos, "{")?;
    let mut attrs = BTreeMap::new();
    while peek(tokens, *pos) != Some("}") {
        let _type_token = next(tokens, pos)?;
        let name = next(tokens, pos)?.to_string();
        let mut value_parts = Vec::new();
        loop {
            let tok = next(tokens, pos)?;
            if tok == ";" {
                break;
            }
            value_parts.push(tok.to_string());
        }
        let value = value_parts.join(" ");
        let value = value.trim_matches('"').to_string();
        attrs.insert(rename(&name), value);
    }
    expect(tokens, pos, "}")?;
    Some(attrs)
}

/// `_FillValue` and `_ChunkSizes` are renamed on the way in so every
/// downstream consumer reads the same field name regardless of source
/// attribute convention (§4.4).
fn rename(name: &str) -> String {
    match name {
        "_FillValue" => "fill_value".to_string(),
        "_ChunkSizes" => "chunk_sizes".to_string(),
        other => other.to_string(),
    }
}

/// Tokenizes DAS text, treating a quoted span (which may contain spaces) as
/// a single token so multi-word attribute values survive intact.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current = String::new();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                let mut quoted = String::from("\"");
                for c2 in chars.by_ref() {
                    quoted.push(c2);
                    if c2 == '"' {
                        break;
                    }
                }
                tokens.push(quoted);
            }
            '{' | '}' | ';' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(c.to_string());
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn peek<'a>(tokens: &'a [String], pos: usize) -> Option<&'a str> {
    tokens.get(pos).map(|s| s.as_str())
}

fn next<'a>(tokens: &'a [String], pos: &mut usize) -> Option<&'a str> {
    let tok = tokens.get(*pos)?;
    *pos += 1;
    Some(tok.as_str())
}

fn expect<'a>(tokens: &'a [String], pos: &mut usize, expected: &str) -> Option<&'a str> {
    let tok = next(tokens, pos)?;
    if tok == expected {
        Some(tok)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sample_das_and_renames_fill_value() {
        let das = parse_das(test_fixtures::SAMPLE_DAS);
        let sst = das.variables.get("analysed_sst").unwrap();
        assert_eq!(sst.get("fill_value").map(String::as_str), Some("-32768.0"));
        assert_eq!(
            sst.get("long_name").map(String::as_str),
            Some("analysed sea surface temperature")
        );
        let time = das.variables.get("time").unwrap();
        assert_eq!(
            time.get("units").map(String::as_str),
            Some("seconds since 1981-01-01 00:00:00")
        );
    }

    #[test]
    fn renames_chunk_sizes() {
        let text = r#"Attributes {
    analysed_sst {
        Int32 _ChunkSizes 1, 1024, 2048;
    }
}
"#;
        let das = parse_das(text);
        let sst = das.variables.get("analysed_sst").unwrap();
        assert_eq!(sst.get("chunk_sizes").map(String::as_str), Some("1, 1024, 2048"));
    }

    #[test]
    fn nc_global_block_is_hoisted_to_dataset_level() {
        let text = r#"Attributes {
    NC_GLOBAL {
        String Conventions "CF-1.7";
    }
    lat {
        String units "degrees_north";
    }
}
"#;
        let das = parse_das(text);
        assert_eq!(das.global.get("Conventions").map(String::as_str), Some("CF-1.7"));
        assert!(!das.variables.contains_key("NC_GLOBAL"));
    }

    #[test]
    fn malformed_text_degrades_to_empty_tables() {
        let das = parse_das("not a das at all");
        assert!(das.global.is_empty());
        assert!(das.variables.is_empty());
    }
}
