use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Auto,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenState {
    ModeSelect,
    Upload,
    ManualEntry,
    EditPreview,
    Result,
    ErrorOverlay,
}

/// A report file picked or dropped by the user. Contents are opaque to the
/// client; the label server decides whether it can parse them.
#[derive(Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ReportFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Human-readable label shown next to the drop zone.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.name, human_readable_bytes(self.bytes.len() as u64))
    }
}

impl fmt::Debug for ReportFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportFile")
            .field("name", &self.name)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadInput {
    pub file: Option<ReportFile>,
    pub imei: String,
    pub mode: Mode,
}

impl UploadInput {
    pub fn new(mode: Mode) -> Self {
        Self {
            file: None,
            imei: String::new(),
            mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    Model,
    Capacity,
    Color,
    BatteryLife,
    Imei,
}

impl DraftField {
    pub const ALL: [DraftField; 5] = [
        DraftField::Model,
        DraftField::Capacity,
        DraftField::Color,
        DraftField::BatteryLife,
        DraftField::Imei,
    ];

    pub fn key(self) -> &'static str {
        match self {
            DraftField::Model => "model",
            DraftField::Capacity => "capacity",
            DraftField::Color => "color",
            DraftField::BatteryLife => "battery_life",
            DraftField::Imei => "imei",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DraftField::Model => "Model",
            DraftField::Capacity => "Capacity",
            DraftField::Color => "Color",
            DraftField::BatteryLife => "Battery",
            DraftField::Imei => "IMEI",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDraft {
    pub model: String,
    pub capacity: String,
    pub color: String,
    pub battery_life: String,
    pub imei: String,
}

impl LabelDraft {
    pub fn get(&self, field: DraftField) -> &str {
        match field {
            DraftField::Model => &self.model,
            DraftField::Capacity => &self.capacity,
            DraftField::Color => &self.color,
            DraftField::BatteryLife => &self.battery_life,
            DraftField::Imei => &self.imei,
        }
    }

    pub fn set(&mut self, field: DraftField, value: impl Into<String>) {
        let slot = match field {
            DraftField::Model => &mut self.model,
            DraftField::Capacity => &mut self.capacity,
            DraftField::Color => &mut self.color,
            DraftField::BatteryLife => &mut self.battery_life,
            DraftField::Imei => &mut self.imei,
        };
        *slot = value.into();
    }

    pub fn preview(&self) -> LabelPreview {
        LabelPreview {
            title: self.model.clone(),
            details: format!("{} · {}", self.capacity, self.color),
            battery: self.battery_life.clone(),
            imei: self.imei.clone(),
        }
    }
}

/// What the live preview card shows for the current draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPreview {
    pub title: String,
    pub details: String,
    pub battery: String,
    pub imei: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelArtifact {
    pub preview_url: String,
    pub download_url: String,
}

impl LabelArtifact {
    pub fn single(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            preview_url: url.clone(),
            download_url: url,
        }
    }
}

pub fn human_readable_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else if value.fract() == 0.0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
