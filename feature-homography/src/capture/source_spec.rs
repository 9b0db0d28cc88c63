use std::{path::PathBuf, str::FromStr};

use anyhow::{anyhow, bail, Context};

const SYNTH: &str = "synth";

#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Device(i32),
    Path(String),
    Synthetic,
}

/// Parsed form of `<source>[:key=value]*`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub kind: SourceKind,
    pub size: Option<(i32, i32)>,
    // Stddev of the added noise as a fraction of 255
    pub noise: f64,
    pub background: Option<PathBuf>,
    pub foreground: Option<PathBuf>,
}

impl SourceSpec {
    fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            size: None,
            noise: 0.0,
            background: None,
            foreground: None,
        }
    }

    /// Moving textured "book" used when the requested source cannot be opened.
    pub fn book() -> Self {
        Self {
            size: Some((640, 480)),
            noise: 0.1,
            ..Self::new(SourceKind::Synthetic)
        }
    }
}

impl FromStr for SourceSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chunks: Vec<&str> = s.split(':').collect();
        let mut params = Vec::new();
        while chunks.len() > 1 && chunks.last().is_some_and(|c| is_param(c)) {
            params.extend(chunks.pop());
        }
        params.reverse();

        let source = chunks.join(":");
        if source.is_empty() {
            bail!("Empty video source");
        }
        let kind = if source == SYNTH {
            SourceKind::Synthetic
        } else if let Ok(index) = source.parse::<i32>() {
            SourceKind::Device(index)
        } else {
            SourceKind::Path(source)
        };

        let mut spec = SourceSpec::new(kind);
        for param in params {
            let (key, value) = param
                .split_once('=')
                .ok_or_else(|| anyhow!("Malformed source parameter {param}"))?;
            match key {
                "size" => spec.size = Some(parse_size(value)?),
                "noise" => {
                    spec.noise = value
                        .parse()
                        .with_context(|| format!("Invalid noise level {value}"))?
                }
                "bg" => spec.background = Some(PathBuf::from(value)),
                "fg" => spec.foreground = Some(PathBuf::from(value)),
                _ => bail!("Unknown source parameter {key}"),
            }
        }

        Ok(spec)
    }
}

fn is_param(chunk: &str) -> bool {
    chunk
        .split_once('=')
        .is_some_and(|(key, _)| !key.is_empty() && key.chars().all(|c| c.is_ascii_alphabetic()))
}

fn parse_size(value: &str) -> anyhow::Result<(i32, i32)> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| anyhow!("Size must look like WIDTHxHEIGHT, got {value}"))?;
    let w: i32 = w.parse().with_context(|| format!("Invalid width in {value}"))?;
    let h: i32 = h.parse().with_context(|| format!("Invalid height in {value}"))?;
    if w <= 0 || h <= 0 {
        bail!("Size must be positive, got {value}");
    }

    Ok((w, h))
}
