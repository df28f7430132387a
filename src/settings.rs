use crate::error::ShimError;
use crate::input::keycodes::GuestKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rendering backends this build can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBackend {
    /// CPU compositing into a toolkit image, the default.
    CoreGraphics,
    /// Texture upload through the GPU collaborator.
    Texture,
}

impl RenderBackend {
    pub fn parse(name: &str) -> Result<Self, ShimError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cg" | "coregraphics" | "software" => Ok(Self::CoreGraphics),
            "texture" | "metal" => Ok(Self::Texture),
            _ => Err(ShimError::UnsupportedBackend(name.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// When enabled the logger is initialised at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional file receiving a copy of every log record.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Name of the rendering backend. Validated at startup.
    #[serde(default = "default_render_backend")]
    pub render_backend: String,
    /// Send Option as Meta and Command as Alt to the guest.
    #[serde(default)]
    pub swap_option_command: bool,
    /// Forward the left Command key to the guest while the pointer is captured.
    #[serde(default = "default_left_command_key")]
    pub left_command_key: bool,
    /// Install a global capture hook while the pointer is captured so host
    /// shortcuts reach the guest.
    #[serde(default)]
    pub full_grab: bool,
    /// Scale the guest display to the view instead of resizing the view.
    #[serde(default)]
    pub zoom_to_fit: bool,
    /// Host key code to guest key replacements applied over the default table.
    #[serde(default)]
    pub keymap_overrides: HashMap<u16, GuestKey>,
}

fn default_render_backend() -> String {
    "cg".into()
}

fn default_left_command_key() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            render_backend: default_render_backend(),
            swap_option_command: false,
            left_command_key: default_left_command_key(),
            full_grab: false,
            zoom_to_fit: false,
            keymap_overrides: HashMap::new(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn render_backend(&self) -> Result<RenderBackend, ShimError> {
        RenderBackend::parse(&self.render_backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"full_grab": true}"#).unwrap();
        assert!(settings.full_grab);
        assert!(settings.left_command_key);
        assert_eq!(settings.render_backend, "cg");
        assert!(settings.keymap_overrides.is_empty());
    }

    #[test]
    fn unknown_backend_is_a_configuration_error() {
        let settings = Settings {
            render_backend: "opengl".into(),
            ..Settings::default()
        };
        match settings.render_backend() {
            Err(ShimError::UnsupportedBackend(name)) => assert_eq!(name, "opengl"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn backend_names_are_case_insensitive() {
        assert_eq!(
            RenderBackend::parse(" Metal ").unwrap(),
            RenderBackend::Texture
        );
        assert_eq!(
            RenderBackend::parse("CG").unwrap(),
            RenderBackend::CoreGraphics
        );
    }
}
