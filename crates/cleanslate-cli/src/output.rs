//! Output renderers and formatting helpers for CLI commands.

use std::fmt::Write as _;

use cleanslate_core::{MetadataMap, ProcessingResult, RemovedMetadata};
use cleanslate_pipeline::BackupReceipt;
use serde_json::Value;

pub(crate) fn render_preview(result: &ProcessingResult, show_all: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Metadata preview for {}", result.source_path.display());
    let _ = writeln!(out, "  Size: {}", format_bytes(result.file_size));
    if show_all {
        write_map(&mut out, "Metadata", &result.metadata_before);
    } else {
        let _ = writeln!(
            out,
            "  {} metadata field(s) present",
            result.metadata_before.len()
        );
        for key in result.metadata_before.keys() {
            let _ = writeln!(out, "    {key}");
        }
    }
    out
}

pub(crate) fn render_sanitized(result: &ProcessingResult, show_all: bool) -> String {
    let mut out = String::from("✓ Sanitized successfully\n");
    let path = result.final_path.as_deref().unwrap_or(&result.source_path);
    let _ = writeln!(out, "  File: {}", path.display());
    let _ = writeln!(out, "  Size: {}", format_bytes(result.file_size));
    if let Some(remote) = &result.remote_ref {
        let _ = writeln!(out, "  Original backed up to: {remote}");
    }
    if let Some(link) = &result.share_link {
        let _ = writeln!(out, "  Link: {link}");
    }
    if result.deduplicated {
        out.push_str("  (result shared with a concurrent run)\n");
    }
    if show_all {
        write_map(&mut out, "Metadata before", &result.metadata_before);
        write_map(
            &mut out,
            "Metadata after",
            result.metadata_after.as_ref().unwrap_or(&MetadataMap::new()),
        );
    } else {
        write_removed(&mut out, &result.removed_metadata);
    }
    out
}

pub(crate) fn render_failure(result: &ProcessingResult) -> String {
    let mut out = String::from("✗ Sanitization failed\n");
    if let Some(failure) = &result.failure {
        let _ = writeln!(out, "  Stage: {}", failure.stage.as_str());
        let _ = writeln!(out, "  Reason: {}", failure.message);
        if !failure.completed_stages.is_empty() {
            let stages: Vec<&str> = failure
                .completed_stages
                .iter()
                .map(|stage| stage.as_str())
                .collect();
            let _ = writeln!(out, "  Completed: {}", stages.join(", "));
        }
        if let Some(remote) = &failure.remote_ref {
            let _ = writeln!(out, "  Original backed up to: {remote}");
        }
    }
    if let Some(link) = &result.share_link {
        let _ = writeln!(out, "  Link: {link}");
    }
    out
}

pub(crate) fn render_backup(receipt: &BackupReceipt) -> String {
    let mut out = String::from("Backup successful\n");
    let _ = writeln!(out, "  File: {}", receipt.file_path.display());
    let _ = writeln!(out, "  Remote: {}", receipt.remote_ref);
    if let Some(link) = &receipt.share_link {
        let _ = writeln!(out, "  Link: {link}");
    }
    out
}

fn write_removed(out: &mut String, removed: &RemovedMetadata) {
    if removed.is_empty() {
        out.push_str("  No metadata removed\n");
        return;
    }
    let _ = writeln!(out, "  Removed metadata ({}):", removed.len());
    for (key, change) in removed {
        let after = change
            .after
            .as_ref()
            .map_or_else(|| "(removed)".to_string(), display_value);
        let _ = writeln!(out, "    {key}: {} -> {after}", display_value(&change.before));
    }
}

fn write_map(out: &mut String, title: &str, map: &MetadataMap) {
    let _ = writeln!(out, "  {title} ({}):", map.len());
    for (key, value) in map {
        let _ = writeln!(out, "    {key}: {}", display_value(value));
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn removed_fields_render_before_and_after() {
        let before: MetadataMap = [
            ("EXIF:Make".to_string(), Value::from("Canon")),
            ("File:FileType".to_string(), Value::from("JPEG")),
        ]
        .into_iter()
        .collect();
        let after: MetadataMap = [("File:FileType".to_string(), Value::from("JPEG"))]
            .into_iter()
            .collect();
        let mut out = String::new();
        write_removed(&mut out, &cleanslate_core::removed_metadata(&before, &after));
        assert!(out.contains("Removed metadata (1):"));
        assert!(out.contains("EXIF:Make: Canon -> (removed)"));
    }
}
