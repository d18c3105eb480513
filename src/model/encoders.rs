//! Record → sparse bit representation.

use crate::error::{DetectorError, Result};
use crate::params::{DateEncoderParams, EncoderEntry, EncoderKind, FieldEncoders, ScalarEncoderParams};
use crate::record::{Record, RecordField};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Buckets addressable by the random distributed scalar encoder
const MAX_BUCKETS: usize = 1000;

/// Periodic scalar encoder: a contiguous run of `w` bits wrapping around `n`.
#[derive(Debug, Clone)]
pub struct PeriodicEncoder {
    w: usize,
    n: usize,
    period: f64,
}

impl PeriodicEncoder {
    pub fn new(w: usize, radius: f64, period: f64) -> Result<Self> {
        if w == 0 || !(radius.is_finite() && radius > 0.0) {
            return Err(DetectorError::configuration(format!(
                "periodic encoder needs w > 0 and positive radius, got w={} radius={}",
                w, radius
            )));
        }
        let n = (w as f64 * period / radius).ceil() as usize;
        if n <= w {
            return Err(DetectorError::configuration(format!(
                "periodic encoder radius {} too wide for period {}",
                radius, period
            )));
        }
        Ok(Self { w, n, period })
    }

    pub fn width(&self) -> usize {
        self.n
    }

    fn encode(&self, x: f64, offset: usize, out: &mut Vec<usize>) {
        let phase = x.rem_euclid(self.period) / self.period;
        let center = ((phase * self.n as f64) as usize).min(self.n - 1);
        let half = self.w / 2;
        for k in 0..self.w {
            out.push(offset + (center + self.n - half + k) % self.n);
        }
    }
}

/// Time of day, day of week and weekend flag of a timestamp.
#[derive(Debug, Clone)]
pub struct DateEncoder {
    time_of_day: Option<PeriodicEncoder>,
    day_of_week: Option<PeriodicEncoder>,
    weekend: Option<usize>,
}

impl DateEncoder {
    pub fn new(params: &DateEncoderParams) -> Result<Self> {
        if params.kind != EncoderKind::DateEncoder {
            return Err(DetectorError::configuration(format!(
                "encoder '{}' bound to a timestamp must be a DateEncoder",
                params.name
            )));
        }
        let time_of_day = params
            .time_of_day
            .map(|p| PeriodicEncoder::new(p.width(), p.radius(), 24.0))
            .transpose()?;
        let day_of_week = params
            .day_of_week
            .map(|p| PeriodicEncoder::new(p.width(), p.radius(), 7.0))
            .transpose()?;
        if params.weekend == Some(0) {
            return Err(DetectorError::configuration("weekend width must be positive"));
        }
        if time_of_day.is_none() && day_of_week.is_none() && params.weekend.is_none() {
            return Err(DetectorError::configuration(format!(
                "date encoder '{}' has no sub-encoder enabled",
                params.name
            )));
        }
        Ok(Self {
            time_of_day,
            day_of_week,
            weekend: params.weekend,
        })
    }

    pub fn width(&self) -> usize {
        self.time_of_day.as_ref().map_or(0, PeriodicEncoder::width)
            + self.day_of_week.as_ref().map_or(0, PeriodicEncoder::width)
            + self.weekend.map_or(0, |w| 2 * w)
    }

    fn encode(&self, ts: &DateTime<Utc>, mut offset: usize, out: &mut Vec<usize>) {
        let hours = ts.hour() as f64
            + ts.minute() as f64 / 60.0
            + (ts.second() as f64 + ts.nanosecond() as f64 / 1e9) / 3600.0;
        if let Some(enc) = &self.time_of_day {
            enc.encode(hours, offset, out);
            offset += enc.width();
        }
        if let Some(enc) = &self.day_of_week {
            let day = ts.weekday().num_days_from_monday() as f64 + hours / 24.0;
            enc.encode(day, offset, out);
            offset += enc.width();
        }
        if let Some(w) = self.weekend {
            let weekend = match ts.weekday() {
                Weekday::Sat | Weekday::Sun => true,
                Weekday::Fri => hours > 18.0,
                _ => false,
            };
            let start = offset + if weekend { w } else { 0 };
            out.extend(start..start + w);
        }
    }
}

/// Scalar encoder whose buckets map to pseudo-random bits. Adjacent buckets
/// share `w - 1` bits; the first value seen anchors the middle bucket.
#[derive(Debug, Clone)]
pub struct RandomDistributedScalarEncoder {
    resolution: f64,
    w: usize,
    n: usize,
    offset: Option<f64>,
    /// Bit for each bucket position; bucket `i` is `bits[i..i + w]`.
    bits: Vec<usize>,
}

impl RandomDistributedScalarEncoder {
    pub fn new(params: &ScalarEncoderParams) -> Result<Self> {
        if params.kind != EncoderKind::RandomDistributedScalarEncoder {
            return Err(DetectorError::configuration(format!(
                "encoder '{}' bound to a value must be a RandomDistributedScalarEncoder",
                params.name
            )));
        }
        if !(params.resolution.is_finite() && params.resolution > 0.0) {
            return Err(DetectorError::configuration(format!(
                "resolution must be positive, got {}",
                params.resolution
            )));
        }
        if params.w == 0 || params.n <= params.w {
            return Err(DetectorError::configuration(format!(
                "scalar encoder needs 0 < w < n, got w={} n={}",
                params.w, params.n
            )));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let positions = MAX_BUCKETS + params.w - 1;
        let mut bits: Vec<usize> = Vec::with_capacity(positions);
        for p in 0..positions {
            let window = &bits[p.saturating_sub(params.w - 1)..p];
            let bit = loop {
                let candidate = rng.gen_range(0..params.n);
                if !window.contains(&candidate) {
                    break candidate;
                }
            };
            bits.push(bit);
        }

        Ok(Self {
            resolution: params.resolution,
            w: params.w,
            n: params.n,
            offset: None,
            bits,
        })
    }

    pub fn width(&self) -> usize {
        self.n
    }

    pub fn bucket_index(&mut self, x: f64) -> usize {
        let offset = *self.offset.get_or_insert(x);
        let idx = (MAX_BUCKETS / 2) as f64 + ((x - offset) / self.resolution).round();
        idx.clamp(0.0, (MAX_BUCKETS - 1) as f64) as usize
    }

    fn encode(&mut self, x: f64, offset: usize, out: &mut Vec<usize>) {
        let idx = self.bucket_index(x);
        out.extend(self.bits[idx..idx + self.w].iter().map(|b| offset + b));
    }
}

#[derive(Debug, Clone)]
enum FieldEncoder {
    Date(DateEncoder),
    Scalar(RandomDistributedScalarEncoder),
}

/// All configured encoders, concatenated in entry-name order.
#[derive(Debug, Clone)]
pub struct MultiEncoder {
    encoders: Vec<(String, RecordField, FieldEncoder)>,
}

impl MultiEncoder {
    pub fn new(config: &FieldEncoders) -> Result<Self> {
        let mut encoders = Vec::new();
        for (entry, params) in config.entries() {
            let (fieldname, encoder) = match params {
                EncoderEntry::Date(p) => (&p.fieldname, FieldEncoder::Date(DateEncoder::new(p)?)),
                EncoderEntry::Scalar(p) => (
                    &p.fieldname,
                    FieldEncoder::Scalar(RandomDistributedScalarEncoder::new(p)?),
                ),
            };
            let field = RecordField::from_name(fieldname).ok_or_else(|| {
                DetectorError::configuration(format!(
                    "encoder '{}' reads unknown record field '{}'",
                    entry, fieldname
                ))
            })?;
            let compatible = matches!(
                (&encoder, field),
                (FieldEncoder::Date(_), RecordField::Timestamp)
                    | (FieldEncoder::Scalar(_), RecordField::Value)
            );
            if !compatible {
                return Err(DetectorError::configuration(format!(
                    "encoder '{}' cannot read field '{}'",
                    entry, fieldname
                )));
            }
            encoders.push((entry.to_string(), field, encoder));
        }
        Ok(Self { encoders })
    }

    pub fn width(&self) -> usize {
        self.encoders
            .iter()
            .map(|(_, _, e)| match e {
                FieldEncoder::Date(d) => d.width(),
                FieldEncoder::Scalar(s) => s.width(),
            })
            .sum()
    }

    pub fn has_field(&self, field: RecordField) -> bool {
        self.encoders.iter().any(|(_, f, _)| *f == field)
    }

    /// Sorted active bit indices for the record.
    pub fn encode(&mut self, record: &Record) -> Vec<usize> {
        let mut out = Vec::new();
        let mut offset = 0;
        for (_, _, encoder) in self.encoders.iter_mut() {
            match encoder {
                FieldEncoder::Date(d) => {
                    d.encode(&record.timestamp, offset, &mut out);
                    offset += d.width();
                }
                FieldEncoder::Scalar(s) => {
                    s.encode(record.value, offset, &mut out);
                    offset += s.width();
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PeriodicWidth;
    use chrono::TimeZone;

    fn rdse(resolution: f64) -> RandomDistributedScalarEncoder {
        RandomDistributedScalarEncoder::new(&ScalarEncoderParams {
            fieldname: "value".into(),
            name: "value".into(),
            kind: EncoderKind::RandomDistributedScalarEncoder,
            resolution,
            seed: 42,
            n: 400,
            w: 21,
        })
        .unwrap()
    }

    fn overlap(a: &[usize], b: &[usize]) -> usize {
        a.iter().filter(|x| b.contains(x)).count()
    }

    #[test]
    fn rdse_buckets_have_w_distinct_bits() {
        let mut enc = rdse(1.0);
        for x in [0.0, 3.0, -250.0, 1e9] {
            let mut out = Vec::new();
            enc.encode(x, 0, &mut out);
            let mut uniq = out.clone();
            uniq.sort_unstable();
            uniq.dedup();
            assert_eq!(uniq.len(), 21);
            assert!(out.iter().all(|b| *b < 400));
        }
    }

    #[test]
    fn rdse_adjacent_buckets_overlap() {
        let mut enc = rdse(1.0);
        let mut a = Vec::new();
        let mut b = Vec::new();
        enc.encode(10.0, 0, &mut a);
        enc.encode(11.0, 0, &mut b);
        assert!(overlap(&a, &b) >= 20);
        let mut far = Vec::new();
        enc.encode(500.0, 0, &mut far);
        assert!(overlap(&a, &far) < 20);
    }

    #[test]
    fn rdse_first_value_anchors_middle_and_clamps() {
        let mut enc = rdse(0.5);
        assert_eq!(enc.bucket_index(7.0), 500);
        assert_eq!(enc.bucket_index(8.0), 502);
        assert_eq!(enc.bucket_index(1e12), 999);
        assert_eq!(enc.bucket_index(-1e12), 0);
        assert_eq!(enc.bucket_index(f64::MAX), 999);
        assert_eq!(enc.bucket_index(-f64::MAX), 0);
    }

    #[test]
    fn rdse_layout_is_seeded() {
        let a = rdse(1.0);
        let b = rdse(1.0);
        assert_eq!(a.bits, b.bits);
    }

    #[test]
    fn periodic_width_follows_radius() {
        let enc = PeriodicEncoder::new(21, 9.49, 24.0).unwrap();
        assert_eq!(enc.width(), 54);
        assert!(PeriodicEncoder::new(21, 48.0, 24.0).is_err());
    }

    #[test]
    fn periodic_wraps_around_midnight() {
        let enc = PeriodicEncoder::new(5, 2.0, 24.0).unwrap();
        let mut out = Vec::new();
        enc.encode(0.0, 0, &mut out);
        assert_eq!(out, vec![58, 59, 0, 1, 2]);
    }

    #[test]
    fn weekend_flag_uses_friday_evening() {
        let params = DateEncoderParams {
            fieldname: "timestamp".into(),
            name: "timestamp".into(),
            kind: EncoderKind::DateEncoder,
            time_of_day: None,
            day_of_week: None,
            weekend: Some(3),
        };
        let enc = DateEncoder::new(&params).unwrap();
        let encode = |ts: DateTime<Utc>| {
            let mut out = Vec::new();
            enc.encode(&ts, 0, &mut out);
            out
        };
        // 2024-01-05 is a Friday
        assert_eq!(encode(Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap()), vec![0, 1, 2]);
        assert_eq!(encode(Utc.with_ymd_and_hms(2024, 1, 5, 20, 0, 0).unwrap()), vec![3, 4, 5]);
        assert_eq!(encode(Utc.with_ymd_and_hms(2024, 1, 7, 9, 0, 0).unwrap()), vec![3, 4, 5]);
    }

    #[test]
    fn date_encoder_requires_a_sub_encoder() {
        let params = DateEncoderParams {
            fieldname: "timestamp".into(),
            name: "timestamp".into(),
            kind: EncoderKind::DateEncoder,
            time_of_day: None,
            day_of_week: None,
            weekend: None,
        };
        assert!(DateEncoder::new(&params).is_err());
    }

    #[test]
    fn multi_encoder_rejects_unbound_field() {
        let mut config = FieldEncoders {
            timestamp_day_of_week: None,
            timestamp_time_of_day: DateEncoderParams {
                fieldname: "timestamp".into(),
                name: "timestamp".into(),
                kind: EncoderKind::DateEncoder,
                time_of_day: Some(PeriodicWidth(21, 9.49)),
                day_of_week: None,
                weekend: None,
            },
            timestamp_weekend: None,
            value: ScalarEncoderParams {
                fieldname: "c1".into(),
                name: "c1".into(),
                kind: EncoderKind::RandomDistributedScalarEncoder,
                resolution: 1.0,
                seed: 42,
                n: 400,
                w: 21,
            },
        };
        let err = MultiEncoder::new(&config).unwrap_err();
        assert!(err.to_string().contains("unknown record field 'c1'"));

        config.value.fieldname = "value".into();
        let mut enc = MultiEncoder::new(&config).unwrap();
        assert_eq!(enc.width(), 54 + 400);
        let record = Record::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), 1.0);
        let bits = enc.encode(&record);
        assert_eq!(bits.len(), 42);
        assert!(bits.windows(2).all(|w| w[0] < w[1]));
    }
}
