//! Configuration for the publish pipeline.
//!
//! Every recognized option is an explicit field with a documented default;
//! unset options take those defaults rather than being silently
//! interpreted. Backend and annotator list overrides are supplied to the
//! publish engine as ordered lists of implementations, since they are trait
//! objects rather than plain data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::FindByName;
use crate::revision::ImageFormat;

/// Watermark overlay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkOptions {
    /// Produce watermarked variants at all. Default: true. When false the
    /// watermark stage is skipped entirely and no watermarked item exists.
    pub enabled: bool,
    /// Composite the scannable identity code into the overlay. Default: true.
    pub show_code: bool,
    /// Free text drawn alongside the code; defaults to the revision identity.
    pub text: Option<String>,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            show_code: true,
            text: None,
        }
    }
}

/// Completion widget shown after a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetStyle {
    /// Full panel: figure name, timestamp, download links.
    #[default]
    Detailed,
    /// Single status line.
    Compact,
    /// No widget output.
    Hidden,
}

/// Options controlling the capture/publish pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Workspace to publish under. Default: none (store decides, e.g. the
    /// caller's primary workspace).
    pub workspace: Option<FindByName>,

    /// Analysis to publish under. Default: none; publishing without an
    /// analysis is an error surfaced at publish time.
    pub analysis: Option<FindByName>,

    /// Publish every captured artifact at the end of a cell execution
    /// without an explicit call. Default: true.
    pub auto_publish: bool,

    /// Watermark settings. Default: enabled, with the identity code.
    pub watermark: WatermarkOptions,

    /// Image formats requested from the backend for each capture.
    /// Default: PNG and SVG.
    pub image_formats: Vec<ImageFormat>,

    /// Metadata merged into every revision before per-call metadata.
    /// Default: empty.
    pub default_metadata: BTreeMap<String, serde_json::Value>,

    /// Serialize the live artifact alongside the image data so it can be
    /// restored and edited later. Default: true.
    pub save_snapshot: bool,

    /// Completion widget style. Default: detailed.
    pub widget: WidgetStyle,

    /// Opaque credentials forwarded to the store client. Default: none.
    pub credentials: Option<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            workspace: None,
            analysis: None,
            auto_publish: true,
            watermark: WatermarkOptions::default(),
            image_formats: vec![ImageFormat::Png, ImageFormat::Svg],
            default_metadata: BTreeMap::new(),
            save_snapshot: true,
            widget: WidgetStyle::default(),
            credentials: None,
        }
    }
}

impl PublishConfig {
    #[must_use]
    pub fn with_analysis(mut self, analysis: FindByName) -> Self {
        self.analysis = Some(analysis);
        self
    }

    #[must_use]
    pub fn with_workspace(mut self, workspace: FindByName) -> Self {
        self.workspace = Some(workspace);
        self
    }

    #[must_use]
    pub fn with_auto_publish(mut self, enable: bool) -> Self {
        self.auto_publish = enable;
        self
    }

    #[must_use]
    pub fn with_watermark(mut self, watermark: WatermarkOptions) -> Self {
        self.watermark = watermark;
        self
    }

    #[must_use]
    pub fn with_image_formats(mut self, formats: Vec<ImageFormat>) -> Self {
        self.image_formats = formats;
        self
    }

    #[must_use]
    pub fn with_default_metadata(
        mut self,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        self.default_metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_save_snapshot(mut self, enable: bool) -> Self {
        self.save_snapshot = enable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_documented_values() {
        let config = PublishConfig::default();
        assert!(config.auto_publish);
        assert!(config.watermark.enabled);
        assert!(config.save_snapshot);
        assert_eq!(
            config.image_formats,
            vec![ImageFormat::Png, ImageFormat::Svg]
        );
        assert_eq!(config.widget, WidgetStyle::Detailed);
        assert!(config.workspace.is_none());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = PublishConfig::default()
            .with_analysis(FindByName::new("Study A").create_if_missing())
            .with_auto_publish(false);
        let json = serde_json::to_string(&config).expect("serialize config");
        let round: PublishConfig = serde_json::from_str(&json).expect("deserialize config");
        assert!(!round.auto_publish);
        assert_eq!(round.analysis.unwrap().name, "Study A");
    }
}
