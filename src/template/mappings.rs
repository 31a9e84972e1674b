// Copyright 2020-2022 Amazon Web Services, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0
//
// CloudFormation intrinsic function tag mappings from AWS CloudFormation Guard
//
// Short-form YAML tags (`!Sub`, `!GetAtt`, ...) and the long-form keys they
// stand for in a CloudFormation template.

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    pub(crate) static ref SHORT_FORM_TO_LONG_MAPPING: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("Ref", "Ref");
        m.insert("Condition", "Condition");
        m.insert("GetAtt", "Fn::GetAtt");
        m.insert("Base64", "Fn::Base64");
        m.insert("Cidr", "Fn::Cidr");
        m.insert("Sub", "Fn::Sub");
        m.insert("GetAZs", "Fn::GetAZs");
        m.insert("ImportValue", "Fn::ImportValue");
        m.insert("Select", "Fn::Select");
        m.insert("Split", "Fn::Split");
        m.insert("Join", "Fn::Join");
        m.insert("FindInMap", "Fn::FindInMap");
        m.insert("Length", "Fn::Length");
        m.insert("ToJsonString", "Fn::ToJsonString");
        m.insert("Transform", "Fn::Transform");
        m.insert("And", "Fn::And");
        m.insert("Equals", "Fn::Equals");
        m.insert("If", "Fn::If");
        m.insert("Not", "Fn::Not");
        m.insert("Or", "Fn::Or");
        m
    };
}

/// Long-form key for a short-form tag, without the leading `!`.
pub(crate) fn short_form_to_long(tag: &str) -> Option<&'static str> {
    SHORT_FORM_TO_LONG_MAPPING.get(tag).copied()
}
