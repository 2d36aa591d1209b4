pub mod settings_panel;

pub use settings_panel::{PanelStats, PanelTunables, SettingsPanel};
