use serde::Serialize;

use crate::server::models::ProgrammeEntry;

#[derive(Debug, Serialize)]
pub struct EpgResponse {
    pub channel: String,
    pub programmes: Vec<ProgrammeDto>,
}

/// missing optional fields go out as null, not omitted
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgrammeDto {
    pub start: String,
    pub stop: String,
    pub title: Option<String>,
    pub sub_title: Option<String>,
    pub desc: Option<String>,
}

impl From<ProgrammeEntry> for ProgrammeDto {
    fn from(entry: ProgrammeEntry) -> Self {
        Self {
            start: entry.start,
            stop: entry.stop,
            title: entry.title,
            sub_title: entry.sub_title,
            desc: entry.desc,
        }
    }
}

impl EpgResponse {
    pub fn new(channel: String, programmes: Vec<ProgrammeEntry>) -> Self {
        Self {
            channel,
            programmes: programmes.into_iter().map(ProgrammeDto::from).collect(),
        }
    }
}
