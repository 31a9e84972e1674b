// Copyright 2020-2022 Amazon Web Services, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
//
// This module contains code adapted from AWS CloudFormation Guard
// https://github.com/aws-cloudformation/cloudformation-guard
// See readme.md for attribution details

//! Template loading.
//!
//! Templates are read into a [`serde_json::Value`] no matter the source format, with
//! YAML short-form intrinsic tags rewritten to their long form. Nothing here
//! evaluates an intrinsic; `!Sub "x"` simply becomes `{"Fn::Sub": "x"}`.

mod mappings;

use crate::errors::{Error, Result};
use serde_json::{Map, Value};
use serde_yml::Value as YamlValue;
use std::path::Path;

/// Read and parse a template file. `.json` files are parsed as JSON, everything
/// else as YAML.
pub(crate) fn load_template(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::TemplateRead {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("loaded template {} ({} bytes)", path.display(), text.len());

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let template = if is_json {
        serde_json::from_str(&text).map_err(|e| parse_error(path, e.to_string()))?
    } else {
        parse_yaml_to_json(&text).map_err(|message| parse_error(path, message))?
    };

    if !template.is_object() {
        return Err(parse_error(path, "template must be a mapping".to_string()));
    }
    Ok(template)
}

fn parse_error(path: &Path, message: String) -> Error {
    Error::TemplateParse {
        path: path.to_path_buf(),
        message,
    }
}

/// Parse CloudFormation YAML and convert to serde_json::Value
pub(crate) fn parse_yaml_to_json(yaml_str: &str) -> std::result::Result<Value, String> {
    let yaml: YamlValue = serde_yml::from_str(yaml_str).map_err(|e| e.to_string())?;
    yaml_to_json(yaml)
}

fn yaml_to_json(value: YamlValue) -> std::result::Result<Value, String> {
    match value {
        YamlValue::Null => Ok(Value::Null),
        YamlValue::Bool(b) => Ok(Value::Bool(b)),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(u.into()))
            } else {
                Ok(n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null))
            }
        }
        YamlValue::String(s) => Ok(Value::String(s)),
        YamlValue::Sequence(seq) => seq
            .into_iter()
            .map(yaml_to_json)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array),
        YamlValue::Mapping(mapping) => {
            let mut obj = Map::new();
            for (key, value) in mapping {
                obj.insert(mapping_key(&key)?, yaml_to_json(value)?);
            }
            Ok(Value::Object(obj))
        }
        YamlValue::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let tag = tag.trim_start_matches('!');
            let long = mappings::short_form_to_long(tag)
                .ok_or_else(|| format!("unknown intrinsic function tag !{}", tag))?;
            let inner = yaml_to_json(tagged.value)?;

            // `!GetAtt Resource.Attribute` is the dotted shorthand for the list form
            let inner = match (long, inner) {
                ("Fn::GetAtt", Value::String(dotted)) => match dotted.split_once('.') {
                    Some((resource, attribute)) => Value::Array(vec![
                        Value::String(resource.to_string()),
                        Value::String(attribute.to_string()),
                    ]),
                    None => Value::String(dotted),
                },
                (_, inner) => inner,
            };

            let mut obj = Map::new();
            obj.insert(long.to_string(), inner);
            Ok(Value::Object(obj))
        }
    }
}

fn mapping_key(key: &YamlValue) -> std::result::Result<String, String> {
    match key {
        YamlValue::String(s) => Ok(s.clone()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        other => Err(format!("unsupported mapping key: {:?}", other)),
    }
}
