use std::collections::BTreeMap;

use serde_json::{Map, Value, json};
use tracing::warn;

use crate::error::SubmitError;

/// Caller-supplied advanced settings, keyed like the defaults table.
pub type Overrides = BTreeMap<String, Value>;

const TRAIN_PREFIX: &str = "train_";
const SAVE_PREFIX: &str = "save_";

/// The advanced training settings a submission may override.
///
/// Keys prefixed `train_` end up (prefix stripped) in
/// `config.process[0].train`, keys prefixed `save_` in `config.process[0].save`.
#[derive(Debug, Clone)]
pub struct AdvancedSettings {
    defaults: BTreeMap<&'static str, Value>,
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        let defaults = BTreeMap::from([
            ("save_dtype", json!("float16")),
            ("save_save_every", json!(1000)),
            ("save_max_step_saves_to_keep", json!(4)),
            ("train_dtype", json!("bf16")),
            ("train_batch_size", json!(1)),
            ("train_ema_config_ema_decay", json!("0.99")),
            ("train_ema_config_use_ema", json!(true)),
            ("train_gradient_accumulation_steps", json!(1)),
            ("train_gradient_checkpointing", json!(true)),
            ("train_lr", json!(0.0004)),
            ("train_noise_scheduler", json!("flowmatch")),
            ("train_optimizer", json!("adamw8bit")),
            ("train_skip_first_sample", json!(true)),
            ("train_steps", json!(2000)),
            ("train_train_text_encoder", json!(false)),
            ("train_train_unet", json!(true)),
        ]);
        Self { defaults }
    }
}

impl AdvancedSettings {
    pub fn is_known(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.defaults.keys().copied()
    }

    /// Parse a raw form value into the type of the setting's default.
    ///
    /// Unknown keys are passed through as strings; [`AdvancedSettings::apply`]
    /// drops them later.
    pub fn coerce(&self, key: &str, raw: &str) -> Result<Value, SubmitError> {
        let invalid = |expected: &'static str| SubmitError::InvalidOverride {
            key: key.to_string(),
            value: raw.to_string(),
            expected,
        };
        let raw_trimmed = raw.trim();

        match self.defaults.get(key) {
            Some(Value::Bool(_)) => match raw_trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err(invalid("a boolean")),
            },
            Some(Value::Number(n)) if n.is_f64() => raw_trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| invalid("a number")),
            Some(Value::Number(_)) => raw_trimmed
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| invalid("an integer")),
            _ => Ok(Value::String(raw.to_string())),
        }
    }

    /// Defaults overlaid with `overrides`, split into `(train, save)` buckets.
    pub fn buckets(&self, overrides: &Overrides) -> (Map<String, Value>, Map<String, Value>) {
        for key in overrides.keys().filter(|k| !self.is_known(k)) {
            warn!(key = %key, "ignoring unknown advanced setting");
        }

        let mut train = Map::new();
        let mut save = Map::new();
        for (key, default) in &self.defaults {
            let value = overrides.get(*key).unwrap_or(default).clone();
            if let Some(field) = key.strip_prefix(TRAIN_PREFIX) {
                train.insert(field.to_string(), value);
            } else if let Some(field) = key.strip_prefix(SAVE_PREFIX) {
                save.insert(field.to_string(), value);
            }
        }
        (train, save)
    }

    /// Stamp `job_name` into the document and merge the settings into its
    /// first process entry.
    pub fn apply(
        &self,
        doc: &mut Value,
        job_name: &str,
        overrides: &Overrides,
    ) -> Result<(), SubmitError> {
        let config = doc
            .get_mut("config")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| SubmitError::InvalidConfig("missing `config` section".into()))?;
        config.insert("name".to_string(), Value::String(job_name.to_string()));

        let process = config
            .get_mut("process")
            .and_then(Value::as_array_mut)
            .and_then(|entries| entries.first_mut())
            .and_then(Value::as_object_mut)
            .ok_or_else(|| SubmitError::InvalidConfig("missing `config.process[0]`".into()))?;

        let (train, save) = self.buckets(overrides);
        merge_into(process, "train", train)?;
        merge_into(process, "save", save)?;
        Ok(())
    }
}

fn merge_into(
    process: &mut Map<String, Value>,
    section: &str,
    values: Map<String, Value>,
) -> Result<(), SubmitError> {
    let target = process
        .entry(section.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| {
            SubmitError::InvalidConfig(format!("`config.process[0].{section}` is not a mapping"))
        })?;
    target.extend(values);
    Ok(())
}
