use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// RGB triple with channels in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgb {
    #[serde(default, deserialize_with = "lenient_channel")]
    pub r: f32,
    #[serde(default, deserialize_with = "lenient_channel")]
    pub g: f32,
    #[serde(default, deserialize_with = "lenient_channel")]
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Copy with every channel clamped into [0, 1]; NaN becomes 0.
    pub fn clamped(&self) -> Rgb {
        fn clamp(c: f32) -> f32 {
            if c.is_nan() {
                0.0
            } else {
                c.clamp(0.0, 1.0)
            }
        }
        Rgb::new(clamp(self.r), clamp(self.g), clamp(self.b))
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Clamped channels scaled to 0..=255
    pub fn to_rgb8(&self) -> [u8; 3] {
        let c = self.clamped();
        [
            (c.r * 255.0).round() as u8,
            (c.g * 255.0).round() as u8,
            (c.b * 255.0).round() as u8,
        ]
    }

    /// Perceived luminance (0.299 R + 0.587 G + 0.114 B) of the clamped color
    pub fn luminance(&self) -> f32 {
        let c = self.clamped();
        0.299 * c.r + 0.587 * c.g + 0.114 * c.b
    }
}

/// Treatment applied to a sample
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Treatment {
    #[serde(default, deserialize_with = "lenient_text")]
    pub drug: String,
    /// Free text, unit bearing (e.g. "10 µM")
    #[serde(default, deserialize_with = "lenient_text")]
    pub dose: String,
    /// Treatment duration, free text
    #[serde(default, deserialize_with = "lenient_text")]
    pub time: String,
    /// Chemical structure string
    #[serde(
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub smiles: Option<String>,
    /// External compound database identifier
    #[serde(
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub pubchem: Option<String>,
}

impl Treatment {
    pub fn pubchem_url(&self) -> Option<String> {
        self.pubchem
            .as_ref()
            .filter(|id| !id.is_empty())
            .map(|id| format!("https://pubchem.ncbi.nlm.nih.gov/compound/{}", id))
    }
}

/// Free-form metadata value. Any JSON value is accepted; nested arrays and
/// objects are kept as-is and displayed as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Number(f64),
    Text(String),
    Flag(bool),
    Empty,
    Structured(serde_json::Value),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Number(n) => write!(f, "{}", n),
            MetadataValue::Text(s) => f.write_str(s),
            MetadataValue::Flag(b) => write!(f, "{}", b),
            MetadataValue::Empty => Ok(()),
            MetadataValue::Structured(v) => write!(f, "{}", v),
        }
    }
}

/// Media references attached to a sample, never opened by the viewer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Media<'a> {
    Images(&'a [String]),
    Videos(&'a [String]),
    None,
}

/// Known phenotype classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phenotype {
    Normal,
    Fragmented,
    Swollen,
    Perinuclear,
    Hyperfused,
    Control,
    Other,
}

impl Phenotype {
    /// Case-insensitive classification of a raw label
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "normal" => Phenotype::Normal,
            "fragmented" => Phenotype::Fragmented,
            "swollen" => Phenotype::Swollen,
            "perinuclear" => Phenotype::Perinuclear,
            "hyperfused" => Phenotype::Hyperfused,
            "control" => Phenotype::Control,
            _ => Phenotype::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phenotype::Normal => "Normal",
            Phenotype::Fragmented => "Fragmented",
            Phenotype::Swollen => "Swollen",
            Phenotype::Perinuclear => "Perinuclear",
            Phenotype::Hyperfused => "Hyperfused",
            Phenotype::Control => "Control",
            Phenotype::Other => "Other",
        }
    }
}

/// One observed biological unit at one point of the embedding space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Timepoint, present only in the 4D dataset
    #[serde(
        default,
        deserialize_with = "lenient_timepoint",
        skip_serializing_if = "Option::is_none"
    )]
    pub t: Option<u32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phenotype: String,
    /// Treatment-based color
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub color: Rgb,
    /// Phenotype-based color
    #[serde(default, alias = "colorPhenotypic", deserialize_with = "lenient_or_default")]
    pub color_phenotypic: Rgb,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub treatment: Treatment,
    #[serde(
        default,
        deserialize_with = "lenient_or_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub images: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_or_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub videos: Vec<String>,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl Sample {
    /// Sample at a position with every other field defaulted
    pub fn at(id: impl Into<String>, x: f32, y: f32, z: f32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            z,
            t: None,
            phenotype: String::new(),
            color: Rgb::default(),
            color_phenotypic: Rgb::default(),
            treatment: Treatment::default(),
            images: Vec::new(),
            videos: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn position(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Timepoint with the 2D default applied
    pub fn timepoint(&self) -> u32 {
        self.t.unwrap_or(0)
    }

    pub fn phenotype_class(&self) -> Phenotype {
        Phenotype::from_label(&self.phenotype)
    }

    /// Videos take precedence over images when both are populated
    pub fn media(&self) -> Media<'_> {
        if !self.videos.is_empty() {
            Media::Videos(&self.videos)
        } else if !self.images.is_empty() {
            Media::Images(&self.images)
        } else {
            Media::None
        }
    }
}

fn lenient_channel<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Channel {
        Value(f32),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Channel::deserialize(deserializer)? {
        Channel::Value(v) if v.is_finite() => v,
        _ => 0.0,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::Text(s) => s,
            StringOrNumber::Integer(i) => i.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        }
    }
}

/// Either a well-formed value or anything else, which falls back to the default
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Value(T),
    Other(serde::de::IgnoredAny),
}

impl<T: Default> Lenient<T> {
    fn or_default(self) -> T {
        match self {
            Lenient::Value(v) => v,
            Lenient::Other(_) => T::default(),
        }
    }
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Lenient::<T>::deserialize(deserializer)?.or_default())
}

/// Text field: numbers are written out, anything else becomes empty
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Lenient::<StringOrNumber>::deserialize(deserializer)? {
        Lenient::Value(v) => v.into(),
        Lenient::Other(_) => String::new(),
    })
}

/// Non-negative integral timepoint; `1.0` reads as 1, anything else as absent
fn lenient_timepoint<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Lenient::<f64>::deserialize(deserializer)? {
        Lenient::Value(t) if t.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&t) => {
            Some(t as u32)
        }
        _ => None,
    })
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Lenient::<StringOrNumber>::deserialize(deserializer)? {
        Lenient::Value(v) => Some(v.into()),
        Lenient::Other(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_malformed_channels_default_to_zero() {
        let sample: Sample = serde_json::from_str(
            r#"{"id": 7, "x": 1, "y": 2, "z": 3,
                "color": {"r": 0.5, "g": null},
                "color_phenotypic": {"r": "bad", "b": 0.25}}"#,
        )
        .unwrap();

        assert_eq!(sample.id, "7");
        assert_eq!(sample.color, Rgb::new(0.5, 0.0, 0.0));
        assert_eq!(sample.color_phenotypic, Rgb::new(0.0, 0.0, 0.25));
    }

    #[test]
    fn camel_case_phenotypic_color_is_accepted() {
        let sample: Sample = serde_json::from_str(
            r#"{"id": "a", "x": 0, "y": 0, "z": 0, "colorPhenotypic": {"r": 1, "g": 1, "b": 0}}"#,
        )
        .unwrap();
        assert_eq!(sample.color_phenotypic, Rgb::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn clamping_keeps_channels_in_unit_range() {
        let c = Rgb::new(-0.5, 1.7, f32::NAN).clamped();
        assert_eq!(c, Rgb::new(0.0, 1.0, 0.0));
        assert_eq!(Rgb::new(1.0, 0.5, 0.0).to_rgb8(), [255, 128, 0]);
    }

    #[test]
    fn videos_win_over_images() {
        let mut sample = Sample::at("s", 0.0, 0.0, 0.0);
        assert_eq!(sample.media(), Media::None);
        sample.images = vec!["a.png".into()];
        assert!(matches!(sample.media(), Media::Images(_)));
        sample.videos = vec!["a.mp4".into()];
        assert!(matches!(sample.media(), Media::Videos(v) if v.len() == 1));
    }

    #[test]
    fn metadata_values_display_like_plain_text() {
        assert_eq!(MetadataValue::Number(5.0).to_string(), "5");
        assert_eq!(MetadataValue::Number(1.5).to_string(), "1.5");
        assert_eq!(MetadataValue::Text("HeLa".into()).to_string(), "HeLa");
        assert_eq!(MetadataValue::Flag(true).to_string(), "true");
        assert_eq!(MetadataValue::Empty.to_string(), "");
    }

    #[test]
    fn metadata_accepts_any_json_value() {
        let sample: Sample = serde_json::from_str(
            r#"{"id": "m", "x": 0, "y": 0, "z": 0, "metadata": {
                "plate": 3, "line": "HeLa", "fixed": false, "note": null, "wells": [1, 2]
            }}"#,
        )
        .unwrap();
        let m = &sample.metadata;
        assert_eq!(m["plate"], MetadataValue::Number(3.0));
        assert_eq!(m["line"], MetadataValue::Text("HeLa".into()));
        assert_eq!(m["fixed"], MetadataValue::Flag(false));
        assert_eq!(m["note"], MetadataValue::Empty);
        assert_eq!(m["wells"].to_string(), "[1,2]");
    }

    #[test]
    fn mistyped_fields_fall_back_to_defaults() {
        let sample: Sample = serde_json::from_str(
            r#"{"id": "d", "x": 1, "y": 2, "z": 3, "t": 2.0,
                "phenotype": null,
                "color": "red",
                "color_phenotypic": null,
                "treatment": {"drug": null, "dose": 10, "time": 2.5, "smiles": false},
                "images": null, "videos": "clip.mp4", "metadata": "none"}"#,
        )
        .unwrap();
        assert_eq!(sample.t, Some(2));
        assert_eq!(sample.phenotype, "");
        assert_eq!(sample.color, Rgb::default());
        assert_eq!(sample.color_phenotypic, Rgb::default());
        assert_eq!(sample.treatment.drug, "");
        assert_eq!(sample.treatment.dose, "10");
        assert_eq!(sample.treatment.time, "2.5");
        assert_eq!(sample.treatment.smiles, None);
        assert!(sample.images.is_empty() && sample.videos.is_empty());
        assert!(sample.metadata.is_empty());
    }

    #[test]
    fn fractional_or_negative_timepoints_are_absent() {
        for t in ["1.5", "-1", "\"3\"", "null"] {
            let json = format!(r#"{{"id": "t", "x": 0, "y": 0, "z": 0, "t": {}}}"#, t);
            let sample: Sample = serde_json::from_str(&json).unwrap();
            assert_eq!(sample.t, None, "t = {}", t);
        }
    }

    #[test]
    fn pubchem_identifier_accepts_numbers() {
        let t: Treatment =
            serde_json::from_str(r#"{"drug": "CCCP", "dose": "10 uM", "time": "2h", "pubchem": 2603}"#)
                .unwrap();
        assert_eq!(
            t.pubchem_url().as_deref(),
            Some("https://pubchem.ncbi.nlm.nih.gov/compound/2603")
        );
    }

    #[test]
    fn phenotype_labels_classify_case_insensitively() {
        assert_eq!(Phenotype::from_label("fragmented"), Phenotype::Fragmented);
        assert_eq!(Phenotype::from_label("control"), Phenotype::Control);
        assert_eq!(Phenotype::from_label("blebbed"), Phenotype::Other);
    }
}
