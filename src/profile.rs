//! Typed demuxer and decoder option profiles.
//!
//! FFmpeg configures formats and codecs through string-keyed options.
//! Instead of forwarding arbitrary keys and discovering typos when FFmpeg
//! rejects them, a profile is validated against a declared [`OptionSchema`]
//! when it is built: unknown keys and malformed values are errors up front.
//!
//! [`FormatProfile`] carries demuxer options and is applied with
//! [`InputFile::set_profile`](crate::InputFile::set_profile).
//! [`CodecProfile`] carries decoder options and is applied with
//! [`FfmpegContainer::open_decoder`](crate::FfmpegContainer::open_decoder).
//!
//! # Example
//!
//! ```
//! use avdemux::{FormatProfile, OptionValue};
//!
//! let profile = FormatProfile::new()
//!     .with("probesize", "5000000")?
//!     .with("fflags", "+genpts+igndts")?;
//! assert_eq!(profile.get("probesize"), Some(&OptionValue::Int(5_000_000)));
//! assert!(FormatProfile::new().with("probe_size", "1").is_err());
//! # Ok::<(), avdemux::DemuxError>(())
//! ```

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    time::Duration,
};

use ffmpeg_next::{Dictionary, Rational};

use crate::error::DemuxError;

/// The value type an option accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionKind {
    /// `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`.
    Bool,
    /// Integer within an inclusive range.
    Int {
        /// Smallest accepted value.
        min: i64,
        /// Largest accepted value.
        max: i64,
    },
    /// Finite floating-point number.
    Double,
    /// `num/den` or `num:den` with a non-zero denominator.
    Rational,
    /// Flag set such as `+genpts-igndts`, restricted to the listed names.
    Flags(&'static [&'static str]),
    /// One of the listed names.
    Choice(&'static [&'static str]),
    /// Free text.
    Text,
}

/// Declaration of one option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionSpec {
    /// Option key as FFmpeg knows it.
    pub name: &'static str,
    /// Accepted value type.
    pub kind: OptionKind,
    /// One-line description.
    pub description: &'static str,
}

/// A named set of option declarations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionSchema {
    /// Schema name used in diagnostics.
    pub name: &'static str,
    /// Declared options.
    pub options: &'static [OptionSpec],
}

/// How a [`FlagChange`] combines with the flags already set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagAction {
    /// Bare `name`: the flag set becomes exactly this flag.
    Replace,
    /// `+name`.
    Enable,
    /// `-name`.
    Disable,
}

/// One change inside a flag set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagChange {
    /// Flag name.
    pub name: String,
    pub action: FlagAction,
}

/// A parsed, validated option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// Boolean option.
    Bool(bool),
    /// Integer option.
    Int(i64),
    /// Floating-point option.
    Double(f64),
    /// Rational option.
    Rational(Rational),
    /// Flag changes, applied in order.
    Flags(Vec<FlagChange>),
    /// Choice or free-text option.
    Text(String),
}

impl Display for OptionValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OptionValue::Bool(value) => write!(f, "{}", u8::from(*value)),
            OptionValue::Int(value) => write!(f, "{value}"),
            OptionValue::Double(value) => write!(f, "{value}"),
            OptionValue::Rational(value) => {
                write!(f, "{}/{}", value.numerator(), value.denominator())
            }
            OptionValue::Flags(changes) => {
                for change in changes {
                    match change.action {
                        FlagAction::Replace => {}
                        FlagAction::Enable => f.write_str("+")?,
                        FlagAction::Disable => f.write_str("-")?,
                    }
                    f.write_str(&change.name)?;
                }
                Ok(())
            }
            OptionValue::Text(value) => f.write_str(value),
        }
    }
}

const FORMAT_FLAGS: &[&str] = &[
    "flush_packets",
    "ignidx",
    "genpts",
    "nofillin",
    "noparse",
    "igndts",
    "discardcorrupt",
    "sortdts",
    "fastseek",
    "nobuffer",
    "bitexact",
    "autobsf",
];

const CODEC_FLAGS: &[&str] = &[
    "unaligned",
    "output_corrupt",
    "drop_changed",
    "copy_opaque",
    "frame_duration",
    "gray",
    "low_delay",
    "bitexact",
];

const CODEC_FLAGS2: &[&str] = &[
    "fast",
    "ignorecrop",
    "chunks",
    "showall",
    "export_mvs",
    "skip_manual",
    "ass_ro_flush_mode",
];

const ERROR_DETECTION: &[&str] = &[
    "crccheck",
    "bitstream",
    "buffer",
    "explode",
    "ignore_err",
    "careful",
    "compliant",
    "aggressive",
];

const DISCARD: &[&str] = &["none", "default", "noref", "bidir", "nokey", "nointra", "all"];

const STRICTNESS: &[&str] = &["very", "strict", "normal", "unofficial", "experimental"];

/// Demuxer options accepted by [`FormatProfile`].
pub const FORMAT_SCHEMA: OptionSchema = OptionSchema {
    name: "format",
    options: &[
        OptionSpec {
            name: "probesize",
            kind: OptionKind::Int { min: 32, max: i64::MAX },
            description: "bytes read to detect stream information",
        },
        OptionSpec {
            name: "analyzeduration",
            kind: OptionKind::Int { min: 0, max: i64::MAX },
            description: "microseconds analysed to detect stream information",
        },
        OptionSpec {
            name: "fpsprobesize",
            kind: OptionKind::Int { min: -1, max: i32::MAX as i64 },
            description: "frames used to probe the frame rate",
        },
        OptionSpec {
            name: "formatprobesize",
            kind: OptionKind::Int { min: 0, max: i32::MAX as i64 },
            description: "bytes probed to detect the container format",
        },
        OptionSpec {
            name: "skip_initial_bytes",
            kind: OptionKind::Int { min: 0, max: i64::MAX },
            description: "bytes skipped before probing",
        },
        OptionSpec {
            name: "max_ts_probe",
            kind: OptionKind::Int { min: 0, max: i32::MAX as i64 },
            description: "packets read while waiting for the first timestamp",
        },
        OptionSpec {
            name: "fflags",
            kind: OptionKind::Flags(FORMAT_FLAGS),
            description: "generic format flags",
        },
        OptionSpec {
            name: "seek2any",
            kind: OptionKind::Bool,
            description: "allow seeking to non-keyframes at demuxer level",
        },
        OptionSpec {
            name: "scan_all_pmts",
            kind: OptionKind::Bool,
            description: "scan and combine all PMTs (MPEG-TS)",
        },
        OptionSpec {
            name: "format_whitelist",
            kind: OptionKind::Text,
            description: "comma-separated list of allowed demuxers",
        },
    ],
};

/// Decoder options accepted by [`CodecProfile`].
pub const CODEC_SCHEMA: OptionSchema = OptionSchema {
    name: "codec",
    options: &[
        OptionSpec {
            name: "threads",
            kind: OptionKind::Int { min: 0, max: i32::MAX as i64 },
            description: "decoding threads, 0 for automatic",
        },
        OptionSpec {
            name: "flags",
            kind: OptionKind::Flags(CODEC_FLAGS),
            description: "generic codec flags",
        },
        OptionSpec {
            name: "flags2",
            kind: OptionKind::Flags(CODEC_FLAGS2),
            description: "additional codec flags",
        },
        OptionSpec {
            name: "err_detect",
            kind: OptionKind::Flags(ERROR_DETECTION),
            description: "error detection flags",
        },
        OptionSpec {
            name: "skip_frame",
            kind: OptionKind::Choice(DISCARD),
            description: "frames the decoder skips",
        },
        OptionSpec {
            name: "skip_loop_filter",
            kind: OptionKind::Choice(DISCARD),
            description: "frames decoded without loop filtering",
        },
        OptionSpec {
            name: "lowres",
            kind: OptionKind::Int { min: 0, max: i32::MAX as i64 },
            description: "decode at 1 / 2^lowres resolution",
        },
        OptionSpec {
            name: "strict",
            kind: OptionKind::Choice(STRICTNESS),
            description: "standard compliance level",
        },
        OptionSpec {
            name: "time_base",
            kind: OptionKind::Rational,
            description: "codec time base",
        },
        OptionSpec {
            name: "drc_scale",
            kind: OptionKind::Double,
            description: "dynamic range compression scale (audio)",
        },
    ],
};

impl OptionSchema {
    /// Look up the declaration of `key`.
    pub fn spec(&self, key: &str) -> Option<&'static OptionSpec> {
        self.options.iter().find(|spec| spec.name == key)
    }

    /// Validate `raw` for `key` and return the typed value.
    pub fn parse(&self, key: &str, raw: &str) -> Result<OptionValue, DemuxError> {
        let spec = self.spec(key).ok_or_else(|| DemuxError::UnknownOption {
            key: format!("{}.{key}", self.name),
        })?;
        let invalid = |reason: String| DemuxError::InvalidOptionValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason,
        };
        let trimmed = raw.trim();

        match spec.kind {
            OptionKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(OptionValue::Bool(true)),
                "0" | "false" | "no" | "off" => Ok(OptionValue::Bool(false)),
                _ => Err(invalid("expected a boolean".to_string())),
            },
            OptionKind::Int { min, max } => {
                let value: i64 = trimmed
                    .parse()
                    .map_err(|_| invalid("expected an integer".to_string()))?;
                if value < min || value > max {
                    return Err(invalid(format!("must be within {min}..={max}")));
                }
                Ok(OptionValue::Int(value))
            }
            OptionKind::Double => match trimmed.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(OptionValue::Double(value)),
                _ => Err(invalid("expected a finite number".to_string())),
            },
            OptionKind::Rational => {
                let (numerator, denominator) = trimmed
                    .split_once(['/', ':'])
                    .ok_or_else(|| invalid("expected num/den".to_string()))?;
                let numerator: i32 = numerator
                    .trim()
                    .parse()
                    .map_err(|_| invalid("invalid numerator".to_string()))?;
                let denominator: i32 = denominator
                    .trim()
                    .parse()
                    .map_err(|_| invalid("invalid denominator".to_string()))?;
                if denominator == 0 {
                    return Err(invalid("denominator must not be zero".to_string()));
                }
                Ok(OptionValue::Rational(Rational::new(numerator, denominator)))
            }
            OptionKind::Flags(allowed) => {
                let changes = parse_flags(trimmed).map_err(invalid)?;
                if let Some(unknown) = changes
                    .iter()
                    .find(|change| !allowed.contains(&change.name.as_str()))
                {
                    return Err(invalid(format!("unknown flag {}", unknown.name)));
                }
                Ok(OptionValue::Flags(changes))
            }
            OptionKind::Choice(allowed) => {
                if allowed.contains(&trimmed) {
                    Ok(OptionValue::Text(trimmed.to_string()))
                } else {
                    Err(invalid(format!("expected one of {}", allowed.join(", "))))
                }
            }
            OptionKind::Text => Ok(OptionValue::Text(raw.to_string())),
        }
    }
}

/// Split `+a-b+c` into flag changes. A leading name without a sign
/// replaces the whole set, as in `a+b`.
fn parse_flags(raw: &str) -> Result<Vec<FlagChange>, String> {
    let mut changes = Vec::new();
    let mut action = FlagAction::Replace;
    let mut name = String::new();

    for character in raw.chars() {
        match character {
            '+' | '-' => {
                if !name.is_empty() {
                    changes.push(FlagChange {
                        name: std::mem::take(&mut name),
                        action,
                    });
                }
                action = if character == '+' {
                    FlagAction::Enable
                } else {
                    FlagAction::Disable
                };
            }
            _ => name.push(character),
        }
    }
    if !name.is_empty() {
        changes.push(FlagChange { name, action });
    }

    if changes.is_empty() {
        return Err("expected at least one flag".to_string());
    }
    Ok(changes)
}

/// Validated options shared by both profile kinds.
#[derive(Debug, Clone, PartialEq)]
struct ValidatedOptions {
    schema: &'static OptionSchema,
    values: BTreeMap<&'static str, OptionValue>,
}

impl ValidatedOptions {
    fn new(schema: &'static OptionSchema) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
        }
    }

    fn set(&mut self, key: &str, raw: &str) -> Result<(), DemuxError> {
        let value = self.schema.parse(key, raw)?;
        if let Some(spec) = self.schema.spec(key) {
            self.values.insert(spec.name, value);
        }
        Ok(())
    }

    fn to_dictionary(&self) -> Dictionary<'static> {
        let mut dictionary = Dictionary::new();
        for (key, value) in &self.values {
            dictionary.set(key, &value.to_string());
        }
        dictionary
    }
}

macro_rules! profile_type {
    ($(#[$meta:meta])* $name:ident, $schema:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            options: ValidatedOptions,
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $name {
            /// The schema every key of this profile is checked against.
            pub const SCHEMA: &'static OptionSchema = &$schema;

            /// An empty profile.
            pub fn new() -> Self {
                Self {
                    options: ValidatedOptions::new(Self::SCHEMA),
                }
            }

            /// Build a profile from string pairs, rejecting the first
            /// unknown key or malformed value.
            pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, DemuxError>
            where
                I: IntoIterator<Item = (&'a str, &'a str)>,
            {
                let mut profile = Self::new();
                for (key, value) in pairs {
                    profile.set(key, value)?;
                }
                Ok(profile)
            }

            /// Set `key` to `value` after validation.
            pub fn set(&mut self, key: &str, value: &str) -> Result<(), DemuxError> {
                self.options.set(key, value)
            }

            /// Builder form of [`set`](Self::set).
            pub fn with(mut self, key: &str, value: &str) -> Result<Self, DemuxError> {
                self.set(key, value)?;
                Ok(self)
            }

            /// The validated value of `key`.
            pub fn get(&self, key: &str) -> Option<&OptionValue> {
                self.options.values.get(key)
            }

            /// Iterate over `(key, value)` pairs in key order.
            pub fn iter(&self) -> impl Iterator<Item = (&'static str, &OptionValue)> {
                self.options.values.iter().map(|(key, value)| (*key, value))
            }

            /// `true` when no option is set.
            pub fn is_empty(&self) -> bool {
                self.options.values.is_empty()
            }

            /// Render as an FFmpeg options dictionary.
            pub fn to_dictionary(&self) -> Dictionary<'static> {
                self.options.to_dictionary()
            }
        }
    };
}

profile_type!(
    /// Demuxer options, validated against [`FORMAT_SCHEMA`].
    FormatProfile,
    FORMAT_SCHEMA
);

profile_type!(
    /// Decoder options, validated against [`CODEC_SCHEMA`].
    CodecProfile,
    CODEC_SCHEMA
);

impl FormatProfile {
    /// Limit the bytes read while probing stream information.
    #[must_use]
    pub fn with_probe_size(mut self, bytes: u64) -> Self {
        self.options.values.insert(
            "probesize",
            OptionValue::Int(i64::try_from(bytes.max(32)).unwrap_or(i64::MAX)),
        );
        self
    }

    /// Limit the media duration analysed while probing stream information.
    #[must_use]
    pub fn with_analyze_duration(mut self, duration: Duration) -> Self {
        self.options.values.insert(
            "analyzeduration",
            OptionValue::Int(i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)),
        );
        self
    }
}

impl CodecProfile {
    /// Set the decoder thread count (0 lets FFmpeg decide).
    #[must_use]
    pub fn with_threads(mut self, threads: u32) -> Self {
        self.options
            .values
            .insert("threads", OptionValue::Int(i64::from(threads.min(i32::MAX as u32))));
        self
    }
}
