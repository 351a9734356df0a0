use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata field name to value, as reported by the stripper.
pub type MetadataMap = BTreeMap<String, Value>;

/// Fields whose value changed or disappeared during a strip.
pub type RemovedMetadata = BTreeMap<String, MetadataChange>;

/// Before/after view of a single metadata field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataChange {
    /// Value before stripping.
    pub before: Value,
    /// Value after stripping; `None` when the field is gone.
    pub after: Option<Value>,
}

/// Metadata observed on either side of a strip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StripOutcome {
    /// Metadata before the strip.
    pub before: MetadataMap,
    /// Metadata after the strip.
    pub after: MetadataMap,
}

impl StripOutcome {
    /// Fields removed or altered by the strip.
    #[must_use]
    pub fn removed(&self) -> RemovedMetadata {
        removed_metadata(&self.before, &self.after)
    }
}

/// Keys of `before` whose value differs in `after`, including keys absent afterwards.
#[must_use]
pub fn removed_metadata(before: &MetadataMap, after: &MetadataMap) -> RemovedMetadata {
    before
        .iter()
        .filter(|(key, value)| after.get(*key) != Some(*value))
        .map(|(key, value)| {
            (
                key.clone(),
                MetadataChange {
                    before: value.clone(),
                    after: after.get(key).cloned(),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: &Value) -> MetadataMap {
        value
            .as_object()
            .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    #[test]
    fn removed_includes_changed_and_missing_keys_only() {
        let before = map(&json!({
            "EXIF:Make": "Canon",
            "EXIF:Model": "EOS",
            "File:FileType": "JPEG",
            "XMP:Rating": 5
        }));
        let after = map(&json!({
            "File:FileType": "JPEG",
            "XMP:Rating": 0,
            "File:New": "added"
        }));

        let removed = removed_metadata(&before, &after);
        assert_eq!(
            removed.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["EXIF:Make", "EXIF:Model", "XMP:Rating"]
        );
        assert_eq!(removed["EXIF:Make"].after, None);
        assert_eq!(removed["XMP:Rating"].after, Some(json!(0)));
    }

    #[test]
    fn removed_serializes_with_null_after() -> Result<(), serde_json::Error> {
        let outcome = StripOutcome {
            before: map(&json!({"EXIF:Make": "Canon"})),
            after: MetadataMap::new(),
        };
        assert_eq!(
            serde_json::to_value(outcome.removed())?,
            json!({"EXIF:Make": {"before": "Canon", "after": null}})
        );
        Ok(())
    }

    #[test]
    fn identical_maps_remove_nothing() {
        let before = map(&json!({"a": 1}));
        assert!(removed_metadata(&before, &before).is_empty());
    }
}
