//! Encoder parameter sets and the provider → record-schema remapping.
//!
//! The provider names its channels generically (`c0_*` for the timestamp,
//! `c1` for the metric). [`FieldEncoders`] is the same set keyed by the
//! service's record attributes. The conversion between the two is a plain
//! `From` impl, so a missing or extra channel is a parse error on
//! [`ProviderEncoders`], never a half-applied rename.

use serde::{Deserialize, Deserializer, Serialize};

pub const TIMESTAMP_FIELD: &str = "timestamp";
pub const VALUE_FIELD: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncoderKind {
    DateEncoder,
    RandomDistributedScalarEncoder,
}

/// `[w, radius]` of a periodic date sub-encoder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicWidth(pub usize, pub f64);

impl PeriodicWidth {
    pub fn width(&self) -> usize {
        self.0
    }

    pub fn radius(&self) -> f64 {
        self.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateEncoderParams {
    pub fieldname: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EncoderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<PeriodicWidth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<PeriodicWidth>,
    /// Width of the weekend/weekday category encoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekend: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarEncoderParams {
    pub fieldname: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EncoderKind,
    pub resolution: f64,
    pub seed: u64,
    pub n: usize,
    pub w: usize,
}

impl DateEncoderParams {
    fn bind(&mut self, field: &str) {
        self.fieldname = field.to_string();
        self.name = field.to_string();
    }
}

impl ScalarEncoderParams {
    fn bind(&mut self, field: &str) {
        self.fieldname = field.to_string();
        self.name = field.to_string();
    }
}

/// Encoder set as emitted by the configuration provider.
///
/// All four keys must be present. `c0_dayOfWeek` and `c0_weekend` may be
/// `null` (sub-encoder disabled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderEncoders {
    #[serde(rename = "c0_dayOfWeek", deserialize_with = "present")]
    pub day_of_week: Option<DateEncoderParams>,
    #[serde(rename = "c0_timeOfDay")]
    pub time_of_day: DateEncoderParams,
    #[serde(rename = "c0_weekend", deserialize_with = "present")]
    pub weekend: Option<DateEncoderParams>,
    #[serde(rename = "c1")]
    pub metric: ScalarEncoderParams,
}

/// Encoder set bound to the record schema (`timestamp`, `value`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldEncoders {
    #[serde(rename = "timestamp_dayOfWeek", deserialize_with = "present")]
    pub timestamp_day_of_week: Option<DateEncoderParams>,
    #[serde(rename = "timestamp_timeOfDay")]
    pub timestamp_time_of_day: DateEncoderParams,
    #[serde(rename = "timestamp_weekend", deserialize_with = "present")]
    pub timestamp_weekend: Option<DateEncoderParams>,
    pub value: ScalarEncoderParams,
}

/// Borrowed view of one configured encoder
#[derive(Debug, Clone, Copy)]
pub enum EncoderEntry<'a> {
    Date(&'a DateEncoderParams),
    Scalar(&'a ScalarEncoderParams),
}

impl From<ProviderEncoders> for FieldEncoders {
    fn from(src: ProviderEncoders) -> Self {
        let mut time_of_day = src.time_of_day;
        time_of_day.bind(TIMESTAMP_FIELD);
        let mut value = src.metric;
        value.bind(VALUE_FIELD);
        Self {
            timestamp_day_of_week: src.day_of_week,
            timestamp_time_of_day: time_of_day,
            timestamp_weekend: src.weekend,
            value,
        }
    }
}

impl FieldEncoders {
    /// Enabled encoders keyed by entry name, in name order.
    pub fn entries(&self) -> Vec<(&'static str, EncoderEntry<'_>)> {
        let mut out = Vec::with_capacity(4);
        if let Some(p) = &self.timestamp_day_of_week {
            out.push(("timestamp_dayOfWeek", EncoderEntry::Date(p)));
        }
        out.push((
            "timestamp_timeOfDay",
            EncoderEntry::Date(&self.timestamp_time_of_day),
        ));
        if let Some(p) = &self.timestamp_weekend {
            out.push(("timestamp_weekend", EncoderEntry::Date(p)));
        }
        out.push(("value", EncoderEntry::Scalar(&self.value)));
        out
    }
}

/// Key must be present; `null` maps to `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}
