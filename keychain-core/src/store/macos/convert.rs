//! Conversions between [`Value`] and CoreFoundation objects.

// CFAbsoluteTime is an f64 of seconds; chrono works in integer units.
#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use chrono::{DateTime, Utc};
use core_foundation::array::CFArray;
use core_foundation::base::{CFType, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::data::CFData;
use core_foundation::date::CFDate;
use core_foundation::dictionary::CFDictionary;
use core_foundation::number::CFNumber;
use core_foundation::string::CFString;
use core_foundation_sys::base::{CFGetTypeID, CFTypeRef};

use crate::value::{Dictionary, RawRef, Value};

/// Seconds between the Unix epoch and the CoreFoundation reference date
/// (2001-01-01T00:00:00Z).
const REFERENCE_DATE_OFFSET: f64 = 978_307_200.0;

/// Builds a `CFDictionary` with string keys.
pub fn dictionary_to_cf(dictionary: &Dictionary) -> CFDictionary<CFString, CFType> {
    let pairs: Vec<(CFString, CFType)> = dictionary
        .iter()
        .map(|(key, value)| (CFString::new(key), to_cf(value)))
        .collect();
    CFDictionary::from_CFType_pairs(&pairs)
}

fn to_cf(value: &Value) -> CFType {
    match value {
        Value::String(text) => CFString::new(text).into_CFType(),
        Value::Data(data) => CFData::from_buffer(data).into_CFType(),
        Value::Date(date) => CFDate::new(to_absolute_time(*date)).into_CFType(),
        Value::Bool(flag) => CFBoolean::from(*flag).into_CFType(),
        Value::Number(number) => CFNumber::from(*number).into_CFType(),
        // SAFETY: the caller keeps the referenced object alive for the call;
        // the get rule retains it for as long as the CFType lives.
        Value::Ref(raw) => unsafe { CFType::wrap_under_get_rule(raw.as_ptr()) },
        Value::Array(items) => {
            let items: Vec<CFType> = items.iter().map(to_cf).collect();
            CFArray::from_CFTypes(&items).into_CFType()
        }
        Value::Dictionary(dictionary) => dictionary_to_cf(dictionary).into_CFType(),
    }
}

/// Decodes a CoreFoundation object. Objects of other types (items,
/// keychains) become [`Value::Ref`] without being retained.
///
/// # Safety
///
/// `object` must be null or a valid CoreFoundation object that stays alive
/// while the returned value is in use.
pub unsafe fn from_cf(object: CFTypeRef) -> Option<Value> {
    let raw = RawRef::from_ptr(object)?;
    let type_id = unsafe { CFGetTypeID(object) };

    let value = if type_id == CFString::type_id() {
        Value::String(unsafe { CFString::wrap_under_get_rule(object.cast()) }.to_string())
    } else if type_id == CFData::type_id() {
        Value::Data(unsafe { CFData::wrap_under_get_rule(object.cast()) }.bytes().to_vec())
    } else if type_id == CFDate::type_id() {
        let date = unsafe { CFDate::wrap_under_get_rule(object.cast()) };
        Value::Date(from_absolute_time(date.abs_time())?)
    } else if type_id == CFBoolean::type_id() {
        Value::Bool(unsafe { CFBoolean::wrap_under_get_rule(object.cast()) }.into())
    } else if type_id == CFNumber::type_id() {
        Value::Number(unsafe { CFNumber::wrap_under_get_rule(object.cast()) }.to_i64()?)
    } else if type_id == CFArray::<CFType>::type_id() {
        let array = unsafe { CFArray::<CFType>::wrap_under_get_rule(object.cast()) };
        Value::Array(
            array
                .get_all_values()
                .into_iter()
                .filter_map(|item| unsafe { from_cf(item) })
                .collect(),
        )
    } else if type_id == CFDictionary::<CFType, CFType>::type_id() {
        let dictionary =
            unsafe { CFDictionary::<CFType, CFType>::wrap_under_get_rule(object.cast()) };
        let (keys, values) = dictionary.get_keys_and_values();
        let mut decoded = Dictionary::new();
        for (key, value) in keys.into_iter().zip(values) {
            if let (Some(Value::String(key)), Some(value)) =
                unsafe { (from_cf(key), from_cf(value)) }
            {
                decoded.insert(key, value);
            }
        }
        Value::Dictionary(decoded)
    } else {
        Value::Ref(raw)
    };
    Some(value)
}

fn to_absolute_time(date: DateTime<Utc>) -> f64 {
    date.timestamp_micros() as f64 / 1_000_000.0 - REFERENCE_DATE_OFFSET
}

fn from_absolute_time(time: f64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(((time + REFERENCE_DATE_OFFSET) * 1_000_000.0).round() as i64)
}
