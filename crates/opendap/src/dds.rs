//! DDS (Dataset Descriptor Structure) parsing: the declaration half of an
//! OPeNDAP dataset's typed schema (§4.4).

use std::fmt;

use esa_common::error::EsaCciError;

/// The DAP2 scalar types this client recognises. `Str` covers both `String`
/// and `Url` tokens, neither of which this store ever fetches as chunk data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DapDtype {
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
    Str,
}

impl DapDtype {
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "Byte" => DapDtype::Byte,
            "Int16" => DapDtype::Int16,
            "UInt16" => DapDtype::UInt16,
            "Int32" => DapDtype::Int32,
            "UInt32" => DapDtype::UInt32,
            "Float32" => DapDtype::Float32,
            "Float64" => DapDtype::Float64,
            "String" | "Url" => DapDtype::Str,
            _ => return None,
        })
    }

    /// The Zarr v2 dtype string this type maps to (§6), for the numeric
    /// subset the store actually exposes as chunk data.
    pub fn zarr_dtype(&self) -> Option<&'static str> {
        match self {
            DapDtype::Byte => Some("|u1"),
            DapDtype::UInt16 => Some("<u2"),
            DapDtype::UInt32 => Some("<u4"),
            DapDtype::Float32 => Some("<f4"),
            DapDtype::Float64 => Some("<f8"),
            DapDtype::Int16 | DapDtype::Int32 | DapDtype::Str => None,
        }
    }
}

impl fmt::Display for DapDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DapDtype::Byte => "Byte",
            DapDtype::Int16 => "Int16",
            DapDtype::UInt16 => "UInt16",
            DapDtype::Int32 => "Int32",
            DapDtype::UInt32 => "UInt32",
            DapDtype::Float32 => "Float32",
            DapDtype::Float64 => "Float64",
            DapDtype::Str => "String",
        };
        f.write_str(s)
    }
}

/// A declared variable's shape: ordered `(dimension name, length)` pairs, as
/// they appeared in the DDS bracket chain. An anonymous dimension (no `name =`
/// inside the brackets) is given a synthetic `dim_<i>` name.
#[derive(Debug, Clone)]
pub struct DdsVariable {
    pub name: String,
    pub dtype: DapDtype,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
}

impl DdsVariable {
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }
}

#[derive(Debug, Clone)]
pub struct Dds {
    pub dataset_name: String,
    pub variables: Vec<DdsVariable>,
}

impl Dds {
    pub fn variable(&self, name: &str) -> Option<&DdsVariable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Parses a DDS document. An empty or unparseable document is the one
/// failure mode this client surfaces as `MetadataUnavailable` (§4.4).
pub fn parse_dds(text: &str) -> Result<Dds, EsaCciError> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Err(EsaCciError::metadata_unavailable("<unknown>", "empty DDS"));
    }
    let mut pos = 0usize;
    parse_dataset(&tokens, &mut pos)
        .ok_or_else(|| EsaCciError::metadata_unavailable("<unknown>", "unparseable DDS"))
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current = String::new();
    while let Some(c) = chars.next() {
        match c {
            '{' | '}' | '[' | ']' | ';' | ':' | ',' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(c.to_string());
            }
            '=' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push("=".to_string());
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

fn parse_dataset(tokens: &[String], pos: &mut usize) -> Option<Dds> {
    expect(tokens, pos, "Dataset")?;
    expect(tokens, pos, "{")?;
    let mut variables = Vec::new();
    while peek(tokens, *pos) != Some("}") {
        variables.push(parse_declaration(tokens, pos)?);
    }
    expect(tokens, pos, "}")?;
    let dataset_name = next(tokens, pos)?.trim_end_matches(';').to_string();
    Some(Dds {
        dataset_name,
        variables,
    })
}

fn parse_declaration(tokens: &[String], pos: &mut usize) -> Option<DdsVariable> {
    match peek(tokens, *pos) {
        Some("Grid") => parse_grid(tokens, pos),
        Some("Sequence") => parse_sequence(tokens, pos),
        Some("Structure") => parse_structure(tokens, pos),
        _ => parse_base(tokens, pos),
    }
}

/// A Grid's `ARRAY:` entry is the one variable this client retains; the
/// `MAPS:` entries are coordinate variables declared independently
/// elsewhere in the DDS (§4.4 "for GridType retain only the primary data
/// variable").
fn parse_grid(tokens: &[String], pos: &mut usize) -> Option<DdsVariable> {
    expect(tokens, pos, "Grid")?;
    expect(tokens, pos, "{")?;
    expect(tokens, pos, "ARRAY")?;
    expect(tokens, pos, ":")?;
    let primary = parse_base(tokens, pos)?;
    expect(tokens, pos, "MAPS")?;
    expect(tokens, pos, ":")?;
    while peek(tokens, *pos) != Some("}") {
        parse_declaration(tokens, pos)?;
    }
    expect(tokens, pos, "}")?;
    let grid_name = next(tokens, pos)?.trim_end_matches(';').to_string();
    Some(DdsVariable {
        name: grid_name,
        ..primary
    })
}

/// Sequences carry row-oriented tabular fields this store never exposes as
/// chunk data; its fields are consumed and discarded, leaving a zero-sized
/// placeholder so the enclosing declaration list stays aligned.
fn parse_sequence(tokens: &[String], pos: &mut usize) -> Option<DdsVariable> {
    expect(tokens, pos, "Sequence")?;
    expect(tokens, pos, "{")?;
    while peek(tokens, *pos) != Some("}") {
        parse_declaration(tokens, pos)?;
    }
    expect(tokens, pos, "}")?;
    let name = next(tokens, pos)?.trim_end_matches(';').to_string();
    Some(DdsVariable {
        name,
        dtype: DapDtype::Str,
        dimensions: Vec::new(),
        shape: Vec::new(),
    })
}

fn parse_structure(tokens: &[String], pos: &mut usize) -> Option<DdsVariable> {
    expect(tokens, pos, "Structure")?;
    expect(tokens, pos, "{")?;
    while peek(tokens, *pos) != Some("}") {
        parse_declaration(tokens, pos)?;
    }
    expect(tokens, pos, "}")?;
    let name = next(tokens, pos)?.trim_end_matches(';').to_string();
    Some(DdsVariable {
        name,
        dtype: DapDtype::Str,
        dimensions: Vec::new(),
        shape: Vec::new(),
    })
}

fn parse_base(tokens: &[String], pos: &mut usize) -> Option<DdsVariable> {
    let dtype_token = next(tokens, pos)?;
    let dtype = DapDtype::from_token(dtype_token)?;
    let mut name = next(tokens, pos)?.to_string();

    let mut dimensions = Vec::new();
    let mut shape = Vec::new();
    let mut anon = 0usize;
    while peek(tokens, *pos) == Some("[") {
        expect(tokens, pos, "[")?;
        let first = next(tokens, pos)?.to_string();
        let (dim_name, len_token) = if peek(tokens, *pos) == Some("=") {
            expect(tokens, pos, "=")?;
            let len = next(tokens, pos)?.to_string();
            (first, len)
        } else {
            let synth = format!("dim_{anon}");
            anon += 1;
            (synth, first)
        };
        expect(tokens, pos, "]")?;
        let len: usize = len_token.parse().ok()?;
        dimensions.push(dim_name);
        shape.push(len);
    }

    // A trailing `;` may have been fused onto the name when there were no
    // dimension brackets (e.g. a scalar declaration `Float64 lon;`).
    if dimensions.is_empty() && name.ends_with(';') {
        name.truncate(name.len() - 1);
    } else {
        expect(tokens, pos, ";")?;
    }

    Some(DdsVariable {
        name,
        dtype,
        dimensions,
        shape,
    })
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
