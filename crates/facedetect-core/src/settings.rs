//! User settings and their resolution over the default set.
//!
//! Raw settings arrive as a loosely typed map (usually from TOML). Resolution
//! lower-cases keys, trims and lower-cases text values, and merges each
//! recognized option into a typed [`Settings`] value. A falsy override never
//! replaces a default: `draw = false` leaves `draw` at `true`. This mirrors the
//! historical behaviour of the settings dictionary and is reported with a
//! warning because it prevents disabling a default-true option through the
//! map. Use the typed setters (e.g. [`Settings::with_draw`]) for that.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const KEY_MODE: &str = "mode";
pub const KEY_METHOD: &str = "method";
pub const KEY_CUSTOM: &str = "custom";
pub const KEY_DRAW: &str = "draw";
pub const KEY_PRINT: &str = "print";
pub const KEY_FACE_EXTRACTION: &str = "face-extraction";
pub const KEY_FACE_FEATURES: &str = "face-features";
pub const KEY_KNOWN_FACES: &str = "known-faces";

pub const METHOD_DETECT: &str = "detect";
pub const METHOD_RECOGNIZE: &str = "recognize";

/// A loosely typed option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<SettingValue>),
    Map(BTreeMap<String, SettingValue>),
}

impl SettingValue {
    /// Truthiness: non-empty text or collection, non-zero number, `true`.
    pub fn truthy(&self) -> bool {
        match self {
            SettingValue::Bool(b) => *b,
            SettingValue::Integer(i) => *i != 0,
            SettingValue::Float(f) => *f != 0.0,
            SettingValue::Text(s) => !s.is_empty(),
            SettingValue::List(l) => !l.is_empty(),
            SettingValue::Map(m) => !m.is_empty(),
        }
    }

    /// Trim and lower-case a text value; other values are returned as-is.
    pub fn normalized(self) -> Self {
        match self {
            SettingValue::Text(s) => SettingValue::Text(s.trim().to_lowercase()),
            other => other,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        SettingValue::Bool(b)
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        SettingValue::Text(s.to_string())
    }
}

impl From<Vec<&str>> for SettingValue {
    fn from(items: Vec<&str>) -> Self {
        SettingValue::List(items.into_iter().map(SettingValue::from).collect())
    }
}

/// User-supplied settings before resolution.
pub type RawSettings = BTreeMap<String, SettingValue>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Image,
    #[default]
    Video,
}

/// Resolved settings. Every recognized option always has a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub mode: Mode,
    /// Post-detection action name, lower-cased.
    pub method: String,
    /// Resolve `method` against user extensions instead of the built-ins.
    pub custom: bool,
    pub draw: bool,
    pub print: bool,
    /// Image mode only.
    pub face_extraction: bool,
    /// Requested landmark features (`face` selects all).
    pub face_features: Vec<String>,
    /// Identity label -> reference image path.
    pub known_faces: BTreeMap<String, PathBuf>,
    /// Labels of `known-faces` entries without a usable path. The key itself
    /// is recorded when the option is not a table at all.
    pub malformed_known_faces: Vec<String>,
    /// Unrecognized options, kept but never read by the pipeline.
    pub extra: BTreeMap<String, SettingValue>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Video,
            method: METHOD_DETECT.to_string(),
            custom: false,
            draw: true,
            print: false,
            face_extraction: false,
            face_features: Vec::new(),
            known_faces: BTreeMap::new(),
            malformed_known_faces: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Merge `user` over the defaults. Never fails.
    pub fn resolve(user: &RawSettings) -> Self {
        let mut settings = Settings::default();

        for (key, value) in user {
            let key = key.to_lowercase();
            let value = value.clone().normalized();

            match key.as_str() {
                KEY_MODE => {
                    merge_field(&mut settings.mode, &key, &value, |v| {
                        v.as_text().map(|s| if s == "image" { Mode::Image } else { Mode::Video })
                    });
                }
                KEY_METHOD => {
                    merge_field(&mut settings.method, &key, &value, |v| {
                        v.as_text().map(str::to_string)
                    });
                }
                KEY_CUSTOM => {
                    merge_field(&mut settings.custom, &key, &value, |v| Some(v.truthy()));
                }
                KEY_DRAW => {
                    merge_field(&mut settings.draw, &key, &value, |v| Some(v.truthy()));
                }
                KEY_PRINT => {
                    merge_field(&mut settings.print, &key, &value, |v| Some(v.truthy()));
                }
                KEY_FACE_EXTRACTION => {
                    merge_field(&mut settings.face_extraction, &key, &value, |v| Some(v.truthy()));
                }
                KEY_FACE_FEATURES => {
                    merge_field(&mut settings.face_features, &key, &value, feature_names);
                }
                KEY_KNOWN_FACES => match known_face_paths(&value) {
                    Some((faces, malformed)) => {
                        merge_field(&mut settings.known_faces, &key, &value, |_| Some(faces));
                        settings.malformed_known_faces.extend(malformed);
                    }
                    None if value.truthy() => {
                        tracing::warn!(key = %key, value = ?value, "known faces must be a table of label = path");
                        settings.malformed_known_faces.push(key);
                    }
                    None => {}
                },
                _ => {
                    settings.extra.insert(key, value);
                }
            }
        }

        tracing::debug!(?settings, "settings resolved");
        settings
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.trim().to_lowercase();
        self
    }

    pub fn with_custom(mut self, custom: bool) -> Self {
        self.custom = custom;
        self
    }

    pub fn with_draw(mut self, draw: bool) -> Self {
        self.draw = draw;
        self
    }

    pub fn with_print(mut self, print: bool) -> Self {
        self.print = print;
        self
    }

    pub fn with_face_extraction(mut self, face_extraction: bool) -> Self {
        self.face_extraction = face_extraction;
        self
    }

    pub fn with_face_features<S: AsRef<str>>(mut self, features: &[S]) -> Self {
        self.face_features = features
            .iter()
            .map(|f| f.as_ref().trim().to_lowercase())
            .collect();
        self
    }

    /// Fail on the first `known-faces` entry that could not be resolved.
    pub fn check_known_faces(&self) -> Result<(), ConfigurationError> {
        match self.malformed_known_faces.first() {
            Some(label) => Err(ConfigurationError::MalformedKnownFace {
                label: label.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn with_known_face(mut self, label: &str, path: impl Into<PathBuf>) -> Self {
        self.known_faces.insert(label.to_string(), path.into());
        self
    }
}

/// What [`merge_field`] did with an override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    Applied,
    /// Falsy and different from the kept default.
    Ignored,
    /// Falsy but equal to the kept default.
    Redundant,
    WrongType,
}

/// Overwrite `slot` with the converted `value` only if `value` is truthy.
pub fn merge_field<T: PartialEq>(
    slot: &mut T,
    key: &str,
    value: &SettingValue,
    convert: impl FnOnce(&SettingValue) -> Option<T>,
) -> Merge {
    let converted = convert(value);
    if !value.truthy() {
        if converted.as_ref() == Some(&*slot) {
            return Merge::Redundant;
        }
        tracing::warn!(key, value = ?value, "falsy override ignored; default kept");
        return Merge::Ignored;
    }
    match converted {
        Some(converted) => {
            *slot = converted;
            Merge::Applied
        }
        None => {
            tracing::warn!(key, value = ?value, "override has unexpected type; default kept");
            Merge::WrongType
        }
    }
}

fn feature_names(value: &SettingValue) -> Option<Vec<String>> {
    match value {
        SettingValue::Text(s) => Some(vec![s.clone()]),
        SettingValue::List(items) => Some(
            items
                .iter()
                .filter_map(SettingValue::as_text)
                .map(|s| s.trim().to_lowercase())
                .collect(),
        ),
        _ => None,
    }
}

/// Split a `known-faces` table into usable paths and malformed labels.
fn known_face_paths(value: &SettingValue) -> Option<(BTreeMap<String, PathBuf>, Vec<String>)> {
    let SettingValue::Map(entries) = value else {
        return None;
    };
    let mut faces = BTreeMap::new();
    let mut malformed = Vec::new();
    for (label, path) in entries {
        match path.as_text().map(str::trim) {
            Some(p) if !p.is_empty() && !label.trim().is_empty() => {
                faces.insert(label.clone(), PathBuf::from(p));
            }
            _ => {
                tracing::warn!(label, path = ?path, "known face entry has no usable path");
                malformed.push(label.clone());
            }
        }
    }
    Some((faces, malformed))
}
