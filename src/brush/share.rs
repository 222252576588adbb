//! Brush sharing: `.brush` files and URL-safe link codes.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use serde::Deserialize;
use std::path::Path;

use super::{Brush, BrushCategory, BrushSettings, BrushType};
use crate::core::errors::CoreError;
use crate::core::now_millis;

pub const BRUSH_FILE_EXTENSION: &str = "brush";

/// Loose shape accepted from files; only `name` and `settings` are required
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrushFile {
    name: String,
    settings: BrushSettings,
    #[serde(rename = "type", default)]
    brush_type: BrushType,
}

fn import_error(err: impl std::fmt::Display) -> CoreError {
    CoreError::BrushImport(err.to_string())
}

/// Pretty JSON for a `.brush` file
pub fn export_brush_file(brush: &Brush) -> Result<String, CoreError> {
    Ok(serde_json::to_string_pretty(brush)?)
}

/// `Brush Name` -> `Brush_Name.brush`
pub fn suggested_file_name(brush: &Brush) -> String {
    let stem: Vec<&str> = brush.name.split_whitespace().collect();
    let stem = if stem.is_empty() {
        "brush".to_string()
    } else {
        stem.join("_")
    };
    format!("{}.{}", stem, BRUSH_FILE_EXTENSION)
}

/// Parse a `.brush` file into a new custom brush with a fresh id
pub fn import_brush_file(json: &str) -> Result<Brush, CoreError> {
    let file: BrushFile = serde_json::from_str(json).map_err(import_error)?;
    let brush = Brush {
        id: format!("imported-{}", now_millis()),
        name: file.name.trim().to_string(),
        brush_type: file.brush_type,
        settings: file.settings,
        is_default: false,
        category: BrushCategory::Custom,
    };
    brush.validate().map_err(import_error)?;
    tracing::info!("Imported brush '{}' as {}", brush.name, brush.id);
    Ok(brush)
}

pub fn import_brush_from_path(path: &Path) -> Result<Brush, CoreError> {
    let json = std::fs::read_to_string(path)?;
    import_brush_file(&json)
}

/// Text-safe code for sharing a brush in a link
pub fn encode_brush_link(brush: &Brush) -> Result<String, CoreError> {
    let json = serde_json::to_vec(brush)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode a link code; accepts the URL-safe and the standard alphabet, with
/// a raw or percent-encoded JSON payload
pub fn decode_brush_link(code: &str) -> Result<Brush, CoreError> {
    let code = code.trim();
    let bytes = URL_SAFE_NO_PAD
        .decode(code)
        .or_else(|_| STANDARD.decode(code))
        .map_err(import_error)?;
    let brush: Brush = match serde_json::from_slice(&bytes) {
        Ok(brush) => brush,
        Err(err) => {
            let text = String::from_utf8(bytes).map_err(|_| import_error(&err))?;
            let json = urlencoding::decode(&text).map_err(|_| import_error(&err))?;
            serde_json::from_str(&json).map_err(import_error)?
        }
    };
    brush.validate().map_err(import_error)?;
    Ok(brush)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::brush::{builtin_brushes, find_builtin, library_brushes};

    #[test]
    fn link_round_trip_preserves_settings() {
        for brush in builtin_brushes().into_iter().chain(library_brushes()) {
            let code = encode_brush_link(&brush).unwrap();
            assert!(code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            let decoded = decode_brush_link(&code).unwrap();
            assert_eq!(decoded.settings, brush.settings);
            assert_eq!(decoded, brush);
        }
    }

    #[test]
    fn link_accepts_standard_alphabet() {
        let brush = find_builtin("b-ink").unwrap();
        let code = STANDARD.encode(serde_json::to_vec(&brush).unwrap());
        assert_eq!(decode_brush_link(&code).unwrap(), brush);
    }

    #[test]
    fn link_accepts_percent_encoded_json() {
        let brush = find_builtin("b-cal-thin").unwrap();
        let json = serde_json::to_string(&brush).unwrap();
        let encoded = urlencoding::encode(&json);
        assert!(encoded.starts_with("%7B"));
        let code = STANDARD.encode(encoded.as_bytes());
        assert_eq!(decode_brush_link(&code).unwrap(), brush);

        let garbage = STANDARD.encode(b"%7Bnot%20json");
        assert!(matches!(
            decode_brush_link(&garbage),
            Err(CoreError::BrushImport(_))
        ));
    }

    #[test]
    fn bad_link_is_import_error() {
        assert!(matches!(
            decode_brush_link("%%%"),
            Err(CoreError::BrushImport(_))
        ));
        let not_brush = URL_SAFE_NO_PAD.encode(b"{\"hello\": 1}");
        assert!(matches!(
            decode_brush_link(&not_brush),
            Err(CoreError::BrushImport(_))
        ));
    }

    #[test]
    fn file_round_trip_gets_fresh_id() {
        let brush = find_builtin("b-reed-pen").unwrap();
        let json = export_brush_file(&brush).unwrap();
        assert!(json.contains("\"pressureSensitivity\": true"));

        let imported = import_brush_file(&json).unwrap();
        assert!(imported.id.starts_with("imported-"));
        assert_eq!(imported.name, brush.name);
        assert_eq!(imported.settings, brush.settings);
        assert_eq!(imported.category, BrushCategory::Custom);
    }

    #[test]
    fn file_requires_name_and_settings() {
        assert!(import_brush_file(r#"{"name": "x"}"#).is_err());
        let settings = serde_json::to_string(&BrushSettings::default()).unwrap();
        assert!(import_brush_file(&format!(r#"{{"settings": {}}}"#, settings)).is_err());
        assert!(import_brush_file(&format!(r#"{{"name": "  ", "settings": {}}}"#, settings))
            .is_err());
        let ok = import_brush_file(&format!(r#"{{"name": "Mine", "settings": {}}}"#, settings))
            .unwrap();
        assert_eq!(ok.brush_type, BrushType::Raster);
        assert!(import_brush_file("not json").is_err());
    }

    #[test]
    fn file_name_from_brush_name() {
        let mut brush = find_builtin("b-cal-thin").unwrap();
        assert_eq!(suggested_file_name(&brush), "Calligraphy_Thin.brush");
        brush.name = "   ".to_string();
        assert_eq!(suggested_file_name(&brush), "brush.brush");
    }
}
