//! Presets: a horizontal code table plus the frequent-sequence and template
//! tables. Encoder and decoder must agree on the preset; the stream does not
//! identify it.

use crate::error::{CodecError, Result};
use crate::tables::{HorizontalCodes, Set};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

pub const MAX_FREQ_SEQS: usize = 6;
pub const MAX_TEMPLATES: usize = 5;
pub const DEFAULT_MAGIC_BITS: u8 = 1;

const H_DEFAULT: HorizontalCodes = HorizontalCodes::new([0x00, 0x40, 0x80, 0xC0, 0xE0], [2, 2, 2, 3, 3]);
const H_ALPHA_ONLY: HorizontalCodes = HorizontalCodes::new([0; 5], [0; 5]);
const H_ALPHA_NUM_ONLY: HorizontalCodes = HorizontalCodes::new([0x00, 0x00, 0x80, 0x00, 0x00], [1, 0, 1, 0, 0]);
const H_ALPHA_NUM_SYM_ONLY: HorizontalCodes = HorizontalCodes::new([0x00, 0x80, 0xC0, 0x00, 0x00], [1, 2, 2, 0, 0]);
const H_FAVOR_ALPHA: HorizontalCodes = HorizontalCodes::new([0x00, 0x80, 0xA0, 0xC0, 0xE0], [1, 3, 3, 3, 3]);
const H_FAVOR_DICT: HorizontalCodes = HorizontalCodes::new([0x00, 0x40, 0xC0, 0x80, 0xE0], [2, 2, 3, 2, 3]);
const H_FAVOR_SYM: HorizontalCodes = HorizontalCodes::new([0x80, 0x00, 0xA0, 0xC0, 0xE0], [3, 1, 3, 3, 3]);
const H_FAVOR_UMLAUT: HorizontalCodes = HorizontalCodes::new([0x80, 0xA0, 0xC0, 0xE0, 0x00], [3, 3, 3, 3, 1]);
const H_NO_DICT: HorizontalCodes = HorizontalCodes::new([0x00, 0x40, 0x80, 0x00, 0xC0], [2, 2, 2, 0, 2]);
const H_NO_UNI: HorizontalCodes = HorizontalCodes::new([0x00, 0x40, 0x80, 0xC0, 0x00], [2, 2, 2, 2, 0]);

const FREQ_DEFAULT: [&str; 6] = ["\": \"", "\": ", "</", "=\"", "\":\"", "://"];
const FREQ_TEXT: [&str; 6] = [" the ", " and ", "tion", " with", "ing", "ment"];
const FREQ_URL: [&str; 6] = ["https://", "www.", ".com", "http://", ".org", ".net"];
const FREQ_JSON: [&str; 6] = ["\": \"", "\": ", "\",", "}}}", "\":\"", "}}"];
const FREQ_HTML: [&str; 6] = ["</", "=\"", "div", "href", "class", "<p>"];
const FREQ_XML: [&str; 6] = ["</", "=\"", "\">", "<?xml version=\"1.0\"", "xmlns:", "://"];

/// ISO datetime, ISO date, US phone number, time of day.
const TEMPLATES: [&str; 4] = ["tfff-of-tfTtf:rf:rf.fffZ", "tfff-of-tf", "(fff) fff-ffff", "tf:rf:rf"];

/// Built-in presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetKind {
    Default,
    AlphaOnly,
    AlphaNumOnly,
    AlphaNumSymOnly,
    AlphaNumSymOnlyText,
    FavorAlpha,
    FavorDict,
    FavorSym,
    FavorUmlaut,
    NoDict,
    NoUni,
    NoUniFavorText,
    Url,
    Json,
    JsonNoUni,
    Xml,
    Html,
}

static BUILTIN: LazyLock<Vec<Preset>> = LazyLock::new(|| {
    PresetKind::ALL
        .iter()
        .map(|&kind| {
            let (hcodes, freq) = kind.tables();
            Preset {
                name: kind.name().to_string(),
                hcodes,
                freq_seqs: freq.iter().map(|s| s.as_bytes().to_vec()).collect(),
                templates: TEMPLATES.iter().map(|s| s.as_bytes().to_vec()).collect(),
                magic_bits: DEFAULT_MAGIC_BITS,
            }
        })
        .collect()
});

impl PresetKind {
    pub const ALL: [PresetKind; 17] = [
        Self::Default,
        Self::AlphaOnly,
        Self::AlphaNumOnly,
        Self::AlphaNumSymOnly,
        Self::AlphaNumSymOnlyText,
        Self::FavorAlpha,
        Self::FavorDict,
        Self::FavorSym,
        Self::FavorUmlaut,
        Self::NoDict,
        Self::NoUni,
        Self::NoUniFavorText,
        Self::Url,
        Self::Json,
        Self::JsonNoUni,
        Self::Xml,
        Self::Html,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::AlphaOnly => "alpha_only",
            Self::AlphaNumOnly => "alpha_num_only",
            Self::AlphaNumSymOnly => "alpha_num_sym_only",
            Self::AlphaNumSymOnlyText => "alpha_num_sym_only_text",
            Self::FavorAlpha => "favor_alpha",
            Self::FavorDict => "favor_dict",
            Self::FavorSym => "favor_sym",
            Self::FavorUmlaut => "favor_umlaut",
            Self::NoDict => "no_dict",
            Self::NoUni => "no_uni",
            Self::NoUniFavorText => "no_uni_favor_text",
            Self::Url => "url",
            Self::Json => "json",
            Self::JsonNoUni => "json_no_uni",
            Self::Xml => "xml",
            Self::Html => "html",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    fn tables(self) -> (HorizontalCodes, &'static [&'static str; 6]) {
        match self {
            Self::Default => (H_DEFAULT, &FREQ_DEFAULT),
            Self::AlphaOnly => (H_ALPHA_ONLY, &FREQ_TEXT),
            Self::AlphaNumOnly => (H_ALPHA_NUM_ONLY, &FREQ_TEXT),
            Self::AlphaNumSymOnly => (H_ALPHA_NUM_SYM_ONLY, &FREQ_DEFAULT),
            Self::AlphaNumSymOnlyText => (H_ALPHA_NUM_SYM_ONLY, &FREQ_TEXT),
            Self::FavorAlpha => (H_FAVOR_ALPHA, &FREQ_TEXT),
            Self::FavorDict => (H_FAVOR_DICT, &FREQ_DEFAULT),
            Self::FavorSym => (H_FAVOR_SYM, &FREQ_DEFAULT),
            Self::FavorUmlaut => (H_FAVOR_UMLAUT, &FREQ_DEFAULT),
            Self::NoDict => (H_NO_DICT, &FREQ_DEFAULT),
            Self::NoUni => (H_NO_UNI, &FREQ_DEFAULT),
            Self::NoUniFavorText => (H_NO_UNI, &FREQ_TEXT),
            Self::Url => (H_DEFAULT, &FREQ_URL),
            Self::Json => (H_DEFAULT, &FREQ_JSON),
            Self::JsonNoUni => (H_NO_UNI, &FREQ_JSON),
            Self::Xml => (H_DEFAULT, &FREQ_XML),
            Self::Html => (H_DEFAULT, &FREQ_HTML),
        }
    }

    /// The shared, lazily built preset for this kind.
    pub fn preset(self) -> &'static Preset {
        &BUILTIN[self as usize]
    }
}

/// An immutable, validated preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    name: String,
    hcodes: HorizontalCodes,
    freq_seqs: Vec<Vec<u8>>,
    templates: Vec<Vec<u8>>,
    magic_bits: u8,
}

impl Preset {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn horizontal(&self) -> &HorizontalCodes {
        &self.hcodes
    }

    pub fn freq_seqs(&self) -> &[Vec<u8>] {
        &self.freq_seqs
    }

    pub fn templates(&self) -> &[Vec<u8>] {
        &self.templates
    }

    pub fn magic_bits(&self) -> u8 {
        self.magic_bits
    }

    pub fn is_enabled(&self, set: Set) -> bool {
        self.hcodes.is_enabled(set)
    }

    /// Whether non-ASCII text can be coded at all.
    pub fn supports_unicode(&self) -> bool {
        self.is_enabled(Set::Delta)
    }

    /// Same tables with a different magic prefix length.
    pub fn with_magic_bits(&self, magic_bits: u8) -> Result<Preset> {
        PresetConfig { magic_bits, ..self.to_config() }.build()
    }

    pub fn to_config(&self) -> PresetConfig {
        PresetConfig {
            name: self.name.clone(),
            horizontal: self.hcodes,
            freq_seqs: self.freq_seqs.iter().map(|s| String::from_utf8_lossy(s).into_owned()).collect(),
            templates: self.templates.iter().map(|s| String::from_utf8_lossy(s).into_owned()).collect(),
            magic_bits: self.magic_bits,
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        PresetKind::Default.preset().clone()
    }
}

/// Serializable preset description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    pub name: String,
    pub horizontal: HorizontalCodes,
    pub freq_seqs: Vec<String>,
    pub templates: Vec<String>,
    pub magic_bits: u8,
}

impl Default for PresetConfig {
    fn default() -> Self {
        PresetKind::Default.preset().to_config()
    }
}

impl PresetConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON preset file and builds it.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Preset> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading preset {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("parsing preset {}", path.display()))?;
        Ok(config.build()?)
    }

    /// Validates the description and builds the preset.
    pub fn build(self) -> Result<Preset> {
        self.horizontal.validate().map_err(CodecError::InvalidPreset)?;
        if self.freq_seqs.len() > MAX_FREQ_SEQS {
            return Err(CodecError::InvalidPreset(format!(
                "{} frequent sequences, at most {MAX_FREQ_SEQS} allowed",
                self.freq_seqs.len()
            )));
        }
        if self.templates.len() > MAX_TEMPLATES {
            return Err(CodecError::InvalidPreset(format!(
                "{} templates, at most {MAX_TEMPLATES} allowed",
                self.templates.len()
            )));
        }
        if self.freq_seqs.iter().chain(&self.templates).any(String::is_empty) {
            return Err(CodecError::InvalidPreset("empty frequent sequence or template".into()));
        }
        if self.magic_bits > 8 {
            return Err(CodecError::InvalidPreset(format!("{} magic bits, at most 8", self.magic_bits)));
        }
        Ok(Preset {
            name: self.name,
            hcodes: self.horizontal,
            freq_seqs: self.freq_seqs.into_iter().map(String::into_bytes).collect(),
            templates: self.templates.into_iter().map(String::into_bytes).collect(),
            magic_bits: self.magic_bits,
        })
    }
}
