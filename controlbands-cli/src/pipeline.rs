// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Record pipeline: group, enrich, attach `band_data`

use crate::fields::FieldPath;
use anyhow::{Context, Result};
use controlbands_core::{BandConfig, BandEngine, BandValue};
use serde_json::Value;
use std::collections::HashMap;

/// Output field carrying the band data
pub const BAND_DATA_FIELD: &str = "band_data";

/// Group used when no group-by path is configured
pub const DEFAULT_GROUP: &str = "null";

pub struct BandPipeline {
    engine: BandEngine<String>,
    group_by: Option<FieldPath>,
    value_field: FieldPath,
}

impl BandPipeline {
    pub fn new(engine: BandEngine<String>, config: &BandConfig) -> Result<Self> {
        let group_by = config
            .group_by
            .as_deref()
            .map(FieldPath::parse)
            .transpose()
            .context("Invalid group_by field path")?;
        let value_field =
            FieldPath::parse(&config.value_field).context("Invalid value_field path")?;

        Ok(Self {
            engine,
            group_by,
            value_field,
        })
    }

    pub fn engine(&self) -> &BandEngine<String> {
        &self.engine
    }

    /// Group key of a record: the resolved value as compact JSON text.
    ///
    /// `4` and `"4"` are different groups. Missing keys share the `null`
    /// group with explicit nulls.
    pub fn group_key(&self, record: &Value) -> String {
        let Some(path) = &self.group_by else {
            return DEFAULT_GROUP.to_string();
        };

        match path.resolve(record) {
            Some(value) => value.to_string(),
            None => DEFAULT_GROUP.to_string(),
        }
    }

    /// Enrich one batch observed at `now`.
    ///
    /// Output is grouped in first-seen group order, input order within a
    /// group. Records without a usable value are dropped.
    pub fn process_batch(&self, records: Vec<Value>, now: f64) -> Result<Vec<Value>> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<Value>> = HashMap::new();

        for record in records {
            let key = self.group_key(&record);
            groups
                .entry(key)
                .or_insert_with_key(|key| {
                    order.push(key.clone());
                    Vec::new()
                })
                .push(record);
        }

        let mut output = Vec::new();
        for key in order {
            let Some(batch) = groups.remove(&key) else {
                continue;
            };

            let enriched = self.engine.process_records(&key, now, batch, |record| {
                self.value_field.resolve(record).to_band_value()
            });
            tracing::debug!(group = %key, enriched = enriched.len(), "Processed group batch");

            for (mut record, band) in enriched {
                if let Value::Object(map) = &mut record {
                    let band_data =
                        serde_json::to_value(band).context("Failed to encode band data")?;
                    map.insert(BAND_DATA_FIELD.to_string(), band_data);
                }
                output.push(record);
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use controlbands_core::{MemoryErrorSink, ValueError};
    use serde_json::json;
    use std::sync::Arc;

    const NOW: f64 = 1_700_000_000.0;

    fn pipeline(group_by: Option<&str>) -> BandPipeline {
        let config = BandConfig {
            group_by: group_by.map(str::to_string),
            ..BandConfig::default()
        };
        let engine = BandEngine::from_config(&config).unwrap();
        BandPipeline::new(engine, &config).unwrap()
    }

    #[test]
    fn test_single_group_without_group_by() {
        let pipeline = pipeline(None);
        let records = vec![json!({"value": 1}), json!({"value": 3})];

        let out = pipeline.process_batch(records, NOW).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["band_data"]["mean"], json!(0.0));
        assert_eq!(out[1]["band_data"]["mean"], json!(1.0));
        assert_eq!(out[1]["band_data"]["deviation"], json!(0.0));
        assert_eq!(out[1]["value"], json!(3));

        assert!(pipeline.engine().registry().contains(&DEFAULT_GROUP.to_string()));
    }

    #[test]
    fn test_groups_are_independent() {
        let pipeline = pipeline(Some("sensor.id"));
        let records = vec![
            json!({"sensor": {"id": "a"}, "value": 10}),
            json!({"sensor": {"id": "b"}, "value": 100}),
            json!({"sensor": {"id": "a"}, "value": 12}),
            json!({"value": 7}),
        ];

        let out = pipeline.process_batch(records, NOW).unwrap();
        let values: Vec<&Value> = out.iter().map(|r| &r["value"]).collect();
        assert_eq!(values, vec![&json!(10), &json!(12), &json!(100), &json!(7)]);

        // Second "a" sees only the first "a"
        assert_eq!(out[1]["band_data"]["mean"], json!(10.0));
        assert_eq!(out[2]["band_data"]["mean"], json!(0.0));

        let registry = pipeline.engine().registry();
        assert_eq!(registry.len(), 3);
        assert!(registry.contains(&"null".to_string()));
    }

    #[test]
    fn test_group_keys_keep_json_type() {
        let pipeline = pipeline(Some("line"));
        assert_eq!(pipeline.group_key(&json!({"line": 4})), "4");
        assert_eq!(pipeline.group_key(&json!({"line": "4"})), "\"4\"");
        assert_eq!(pipeline.group_key(&json!({"line": true})), "true");
        assert_eq!(pipeline.group_key(&json!({"line": null})), "null");
        assert_eq!(pipeline.group_key(&json!({})), "null");
    }

    #[test]
    fn test_number_and_string_keys_do_not_share_state() {
        let pipeline = pipeline(Some("line"));
        let records = vec![
            json!({"line": 4, "value": 10}),
            json!({"line": "4", "value": 20}),
        ];

        let out = pipeline.process_batch(records, NOW).unwrap();
        assert_eq!(out[1]["band_data"]["mean"], json!(0.0));
        assert_eq!(pipeline.engine().registry().len(), 2);
    }

    #[test]
    fn test_bad_values_are_dropped_and_reported() {
        let config = BandConfig::default();
        let sink = Arc::new(MemoryErrorSink::new());
        let engine = BandEngine::builder()
            .retention_secs(config.band_interval.total_seconds())
            .error_sink(sink.clone())
            .build()
            .unwrap();
        let pipeline = BandPipeline::new(engine, &config).unwrap();

        let records = vec![
            json!({"value": 5}),
            json!({"value": "not a number"}),
            json!({"other": 1}),
            json!({"value": "7.5"}),
        ];
        let out = pipeline.process_batch(records, NOW).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[1]["band_data"]["value"], json!(7.5));

        let rejected = sink.drain();
        assert_eq!(rejected.len(), 2);
        assert!(matches!(rejected[0].error, ValueError::NotNumeric(_)));
        assert_eq!(rejected[1].error, ValueError::Missing);
    }

    #[test]
    fn test_invalid_paths_are_rejected() {
        let config = BandConfig {
            group_by: Some("a..b".to_string()),
            ..BandConfig::default()
        };
        let engine = BandEngine::from_config(&config).unwrap();
        assert!(BandPipeline::new(engine, &config).is_err());
    }
}
