//
// include_link/config.rs
//
// Configuration for include link detection
//

use serde::Deserialize;

/// Modifier key that turns hover and click into link navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKey {
    #[default]
    Ctrl,
    Meta,
    Alt,
    Shift,
}

/// Include link configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeLinkConfig {
    /// Project-level switch; disabled means no session listens or renders
    pub enabled: bool,
    /// Directive keyword preceding the include path
    pub keyword: String,
    /// File extensions (without the dot) an include path must end in
    pub extensions: Vec<String>,
    /// Modifier that must be held for hover affordance and navigation
    pub navigation_modifier: ModifierKey,
    /// Whether to run the background scan over open documents at startup
    pub initial_scan: bool,
}

impl Default for IncludeLinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keyword: String::from("INCLUDE"),
            extensions: vec![String::from("html"), String::from("tpl")],
            navigation_modifier: ModifierKey::Ctrl,
            initial_scan: true,
        }
    }
}

impl IncludeLinkConfig {
    /// Check if settings that change which ranges are detected differ between two configs
    pub fn pattern_settings_changed(&self, other: &Self) -> bool {
        self.keyword != other.keyword || self.extensions != other.extensions
    }
}

/// Parse include link configuration from LSP settings.
///
/// Reads the top-level `includeLinks` section. Only fields present in the
/// JSON are applied; absent or malformed fields keep their values from
/// `base`. Returns `None` when the `includeLinks` section is missing.
pub fn parse_include_link_config(
    settings: &serde_json::Value,
    base: &IncludeLinkConfig,
) -> Option<IncludeLinkConfig> {
    let section = settings.get("includeLinks")?;
    let mut config = base.clone();

    if let Some(v) = section.get("enabled").and_then(|v| v.as_bool()) {
        config.enabled = v;
    }
    if let Some(v) = section.get("keyword").and_then(|v| v.as_str()) {
        let keyword = v.trim();
        if keyword.is_empty() || keyword.contains(char::is_whitespace) {
            log::warn!("Ignoring invalid include keyword '{}'", v);
        } else {
            config.keyword = keyword.to_string();
        }
    }
    if let Some(list) = section.get("extensions").and_then(|v| v.as_array()) {
        let extensions: Vec<String> = list
            .iter()
            .filter_map(|v| v.as_str())
            .map(|ext| ext.trim().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();
        if extensions.is_empty() {
            log::warn!("Ignoring empty include extension list");
        } else {
            config.extensions = extensions;
        }
    }
    if let Some(v) = section.get("navigationModifier") {
        match serde_json::from_value::<ModifierKey>(v.clone()) {
            Ok(modifier) => config.navigation_modifier = modifier,
            Err(e) => log::warn!("Ignoring invalid navigationModifier {}: {}", v, e),
        }
    }
    if let Some(v) = section.get("initialScan").and_then(|v| v.as_bool()) {
        config.initial_scan = v;
    }

    Some(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_values() {
        let config = IncludeLinkConfig::default();
        assert!(config.enabled);
        assert_eq!(config.keyword, "INCLUDE");
        assert_eq!(config.extensions, vec!["html", "tpl"]);
        assert_eq!(config.navigation_modifier, ModifierKey::Ctrl);
        assert!(config.initial_scan);
    }

    #[test]
    fn test_missing_section() {
        let settings = json!({ "other": {} });
        assert!(parse_include_link_config(&settings, &IncludeLinkConfig::default()).is_none());
    }

    #[test]
    fn test_parse_all_fields() {
        let settings = json!({
            "includeLinks": {
                "enabled": false,
                "keyword": "IMPORT",
                "extensions": [".inc", "tmpl"],
                "navigationModifier": "meta",
                "initialScan": false
            }
        });
        let config = parse_include_link_config(&settings, &IncludeLinkConfig::default()).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.keyword, "IMPORT");
        assert_eq!(config.extensions, vec!["inc", "tmpl"]);
        assert_eq!(config.navigation_modifier, ModifierKey::Meta);
        assert!(!config.initial_scan);
    }

    #[test]
    fn test_invalid_fields_keep_base() {
        let settings = json!({
            "includeLinks": {
                "keyword": "TWO WORDS",
                "extensions": [],
                "navigationModifier": "hyper"
            }
        });
        let base = IncludeLinkConfig::default();
        let config = parse_include_link_config(&settings, &base).unwrap();
        assert_eq!(config, base);
    }

    #[test]
    fn test_pattern_settings_changed() {
        let config1 = IncludeLinkConfig::default();
        let mut config2 = IncludeLinkConfig::default();
        assert!(!config1.pattern_settings_changed(&config2));

        config2.navigation_modifier = ModifierKey::Alt;
        config2.enabled = false;
        assert!(!config1.pattern_settings_changed(&config2));

        config2.extensions.push(String::from("inc"));
        assert!(config1.pattern_settings_changed(&config2));
    }
}
