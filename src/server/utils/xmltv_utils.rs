use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use tracing::{debug, error};

use crate::server::{
    error::{AppResult, Error},
    models::{ProgrammeEntry, Schedule},
};

const ROOT_TAG: &[u8] = b"tv";
const PROGRAMME_TAG: &[u8] = b"programme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgrammeField {
    Title,
    SubTitle,
    Desc,
}

impl ProgrammeField {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"title" => Some(Self::Title),
            b"sub-title" => Some(Self::SubTitle),
            b"desc" => Some(Self::Desc),
            _ => None,
        }
    }

    fn slot<'a>(&self, entry: &'a mut ProgrammeEntry) -> &'a mut Option<String> {
        match self {
            Self::Title => &mut entry.title,
            Self::SubTitle => &mut entry.sub_title,
            Self::Desc => &mut entry.desc,
        }
    }
}

fn entry_from_attributes(e: &BytesStart) -> AppResult<ProgrammeEntry> {
    let mut entry = ProgrammeEntry::default();

    for attr in e.attributes().flatten() {
        let value = attr
            .unescape_value()
            .map_err(|err| Error::UpstreamFormat(format!("bad programme attribute: {}", err)))?
            .into_owned();

        match attr.key.as_ref() {
            b"channel" => entry.channel = value,
            b"start" => entry.start = value,
            b"stop" => entry.stop = value,
            _ => {}
        }
    }

    Ok(entry)
}

pub struct XmltvUtil;

impl XmltvUtil {
    /// pulls every top level `<programme>` out of an xmltv document
    ///
    /// the root has to be `<tv>`, anything else (including an empty body) is an upstream format
    /// error. the first `title`/`sub-title`/`desc` child wins, later ones (other languages) are
    /// ignored
    pub fn parse(xml: &str) -> AppResult<Schedule> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut programmes = Vec::new();
        let mut depth = 0usize;
        let mut saw_root = false;
        let mut current: Option<ProgrammeEntry> = None;
        // the field being filled plus whether it was empty when we entered it
        let mut field: Option<(ProgrammeField, bool)> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = e.name();
                    if depth == 0 {
                        Self::check_root(name.as_ref(), &mut saw_root)?;
                    } else if depth == 1 && name.as_ref() == PROGRAMME_TAG {
                        current = Some(entry_from_attributes(&e)?);
                    } else if depth == 2 {
                        if let Some(entry) = current.as_mut() {
                            field = ProgrammeField::from_tag(name.as_ref())
                                .map(|f| (f, f.slot(entry).is_none()));
                        }
                    }
                    depth += 1;
                }
                Ok(Event::Empty(e)) => {
                    let name = e.name();
                    if depth == 0 {
                        Self::check_root(name.as_ref(), &mut saw_root)?;
                    } else if depth == 1 && name.as_ref() == PROGRAMME_TAG {
                        programmes.push(entry_from_attributes(&e)?);
                    } else if depth == 2 {
                        if let (Some(entry), Some(f)) =
                            (current.as_mut(), ProgrammeField::from_tag(name.as_ref()))
                        {
                            f.slot(entry).get_or_insert_with(String::new);
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    if let (Some(entry), Some((f, fresh))) = (current.as_mut(), field) {
                        let text = e.unescape().map_err(|err| {
                            Error::UpstreamFormat(format!("bad programme text: {}", err))
                        })?;
                        if fresh {
                            f.slot(entry).get_or_insert_with(String::new).push_str(&text);
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let (Some(entry), Some((f, fresh))) = (current.as_mut(), field) {
                        if fresh {
                            let text = String::from_utf8_lossy(&e);
                            f.slot(entry).get_or_insert_with(String::new).push_str(&text);
                        }
                    }
                }
                Ok(Event::End(_)) => {
                    depth = depth.saturating_sub(1);
                    if depth == 2 {
                        // an element like <title></title> still counts as present
                        if let (Some(entry), Some((f, true))) = (current.as_mut(), field) {
                            f.slot(entry).get_or_insert_with(String::new);
                        }
                        field = None;
                    } else if depth == 1 {
                        if let Some(entry) = current.take() {
                            programmes.push(entry);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    error!(
                        "EPG xml parse error at position {}: {}",
                        reader.buffer_position(),
                        e
                    );
                    return Err(Error::UpstreamFormat(format!("invalid EPG xml: {}", e)));
                }
                _ => {}
            }
        }

        if !saw_root {
            return Err(Error::UpstreamFormat(
                "EPG document has no <tv> root".to_string(),
            ));
        }

        debug!("Parsed {} programmes from EPG document", programmes.len());
        Ok(Schedule { programmes })
    }

    fn check_root(name: &[u8], saw_root: &mut bool) -> AppResult<()> {
        if name != ROOT_TAG || *saw_root {
            return Err(Error::UpstreamFormat(format!(
                "unexpected EPG root element <{}>",
                String::from_utf8_lossy(name)
            )));
        }
        *saw_root = true;
        Ok(())
    }

    /// `<tv>` with one `<programme start stop channel>` per entry, children only when present
    pub fn write(programmes: &[ProgrammeEntry]) -> AppResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        Self::emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        Self::emit(&mut writer, Event::Start(BytesStart::new("tv")))?;

        for programme in programmes {
            let mut element = BytesStart::new("programme");
            element.push_attribute(("start", programme.start.as_str()));
            element.push_attribute(("stop", programme.stop.as_str()));
            element.push_attribute(("channel", programme.channel.as_str()));
            Self::emit(&mut writer, Event::Start(element))?;

            let children = [
                ("title", &programme.title),
                ("sub-title", &programme.sub_title),
                ("desc", &programme.desc),
            ];
            for (tag, value) in children {
                if let Some(value) = value {
                    Self::emit(&mut writer, Event::Start(BytesStart::new(tag)))?;
                    Self::emit(&mut writer, Event::Text(BytesText::new(value)))?;
                    Self::emit(&mut writer, Event::End(BytesEnd::new(tag)))?;
                }
            }

            Self::emit(&mut writer, Event::End(BytesEnd::new("programme")))?;
        }

        Self::emit(&mut writer, Event::End(BytesEnd::new("tv")))?;

        String::from_utf8(writer.into_inner()).map_err(|e| {
            Error::InternalServerErrorWithContext(format!("EPG xml output not utf-8: {}", e))
        })
    }

    fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> AppResult<()> {
        writer.write_event(event).map_err(|e| {
            error!("Failed to write EPG xml: {}", e);
            Error::InternalServerErrorWithContext(format!("failed to write EPG xml: {}", e))
        })
    }
}
