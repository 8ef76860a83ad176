use serde::{Deserialize, Serialize};

/// one `<programme>` out of the upstream xmltv document
///
/// attribute names are kept as field names, children that weren't there stay `None`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgrammeEntry {
    pub channel: String,
    pub start: String,
    pub stop: String,
    pub title: Option<String>,
    pub sub_title: Option<String>,
    pub desc: Option<String>,
}

/// the parsed upstream document, only programmes are kept
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    pub programmes: Vec<ProgrammeEntry>,
}

impl Schedule {
    /// exact, case sensitive channel match in document order
    pub fn for_channel(self, channel: &str) -> Vec<ProgrammeEntry> {
        self.programmes
            .into_iter()
            .filter(|p| p.channel == channel)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpgFormat {
    #[default]
    Xml,
    Json,
}
