//! Metadata normalizer
//!
//! Parses one of several legacy XML dialects into the canonical
//! [`ItemRecord`]. Foreign dialects are first brought to the native shape by
//! the configured [`DialectTransform`]. A missing source or state field is a
//! [`ConvertError::MalformedMetadata`], which aborts that single item and
//! nothing else.

pub mod authors;
pub mod dates;
pub mod dialect;
pub mod disciplines;

pub use dialect::{Dialect, DialectTransform, NativeOnly};

use crate::domain::{
    normalize_rights, AuthorRecord, IssueRef, ItemRecord, ItemStatus, SuppFile,
};
use crate::error::{ConvertError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Normalizes raw metadata documents into canonical item records.
pub struct Normalizer {
    transform: Arc<dyn DialectTransform>,
}

impl Normalizer {
    pub fn new(transform: Arc<dyn DialectTransform>) -> Self {
        Self { transform }
    }

    /// Normalize one item's metadata.
    ///
    /// `primary_on_disk` reports whether a primary document was discovered in
    /// the source tree; it feeds the content-suppression decision.
    pub fn normalize(
        &self,
        id: &str,
        dialect: Dialect,
        xml: &str,
        primary_on_disk: bool,
    ) -> Result<ItemRecord> {
        let native = self.transform.to_native(dialect, xml)?;
        let raw = parse_native(id, &native)?;
        build_record(id, raw, primary_on_disk)
    }
}

/// Intermediate shape pulled straight out of the XML
#[derive(Debug, Default)]
struct RawRecord {
    source: Option<String>,
    state: Option<String>,
    title: Option<String>,
    genre: Option<String>,
    published: Option<String>,
    added: Option<String>,
    updated: Option<String>,
    rights: Option<String>,
    abstract_text: Option<String>,
    keywords: Vec<String>,
    authors: Vec<AuthorRecord>,
    discipline_codes: Vec<String>,
    primary_file: Option<(String, Option<String>)>,
    supp_files: Vec<SuppFile>,
    external_link: Option<String>,
    units: Vec<String>,
    context: Option<HashMap<String, String>>,
}

fn attr_map(e: &BytesStart<'_>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().unwrap_or_default().into_owned();
        map.insert(key, value);
    }
    map
}

fn parse_native(id: &str, xml: &str) -> Result<RawRecord> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut raw = RawRecord::default();
    let mut path: Vec<String> = Vec::new();
    let mut current_author: Option<Map<String, JsonValue>> = None;
    let mut author_flat_text: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                handle_open(&mut raw, &path, &name, &attr_map(&e), &mut current_author);
                if name == "author" {
                    author_flat_text = None;
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                handle_open(&mut raw, &path, &name, &attr_map(&e), &mut current_author);
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().unwrap_or_default().into_owned();
                if text.is_empty() {
                    continue;
                }
                handle_text(
                    &mut raw,
                    &path,
                    &text,
                    &mut current_author,
                    &mut author_flat_text,
                );
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "author" {
                    finish_author(&mut raw, current_author.take(), author_flat_text.take());
                }
                path.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ConvertError::MalformedMetadata {
                    item: id.to_string(),
                    reason: format!("XML parse error: {}", e),
                })
            }
        }
    }

    Ok(raw)
}

fn handle_open(
    raw: &mut RawRecord,
    path: &[String],
    name: &str,
    attrs: &HashMap<String, String>,
    current_author: &mut Option<Map<String, JsonValue>>,
) {
    let parent = path.last().map(String::as_str);
    match (parent, name) {
        (None, "record") => {
            raw.source = attrs.get("source").cloned();
            raw.state = attrs.get("state").cloned();
        }
        (Some("record"), "dates") => {
            raw.published = attrs.get("published").cloned();
            raw.added = attrs.get("added").cloned();
            raw.updated = attrs.get("updated").cloned();
        }
        (Some("authors"), "author") => {
            *current_author = Some(Map::new());
        }
        (Some("disciplines"), "discipline") => {
            if let Some(code) = attrs.get("code") {
                raw.discipline_codes.push(code.clone());
            }
        }
        (Some("content"), "file") => {
            if let Some(p) = attrs.get("path") {
                raw.primary_file = Some((p.clone(), attrs.get("mime").cloned()));
            }
        }
        (Some("supplemental"), "file") => {
            if let Some(p) = attrs.get("path") {
                raw.supp_files.push(SuppFile {
                    file: p.clone(),
                    mime_type: attrs.get("mime").cloned(),
                    size: attrs.get("size").and_then(|s| s.parse().ok()),
                });
            }
        }
        (Some("units"), "unit") => {
            if let Some(u) = attrs.get("id") {
                raw.units.push(u.clone());
            }
        }
        (Some("record"), "context") => {
            raw.context = Some(attrs.clone());
        }
        _ => {}
    }
}

fn handle_text(
    raw: &mut RawRecord,
    path: &[String],
    text: &str,
    current_author: &mut Option<Map<String, JsonValue>>,
    author_flat_text: &mut Option<String>,
) {
    let tail: Vec<&str> = path.iter().rev().take(2).map(String::as_str).collect();
    match tail.as_slice() {
        ["title", "record"] => raw.title = Some(text.to_string()),
        ["genre", "record"] => raw.genre = Some(text.to_string()),
        ["rights", "record"] => raw.rights = Some(text.to_string()),
        ["abstract", "record"] => raw.abstract_text = Some(text.to_string()),
        ["externalLink", "record"] => raw.external_link = Some(text.to_string()),
        ["keyword", "keywords"] => raw.keywords.push(text.to_string()),
        // Structured author sub-fields (fname/lname/email/institution)
        [field, "author"] => {
            if let Some(author) = current_author {
                author.insert((*field).to_string(), json!(text));
            }
        }
        // Flat fallback: <author>Some Name</author> with no sub-elements
        ["author", "authors"] => *author_flat_text = Some(text.to_string()),
        _ => {}
    }
}

fn finish_author(
    raw: &mut RawRecord,
    structured: Option<Map<String, JsonValue>>,
    flat: Option<String>,
) {
    let ordering = raw.authors.len() as i32;
    let attrs = match structured {
        Some(map) if !map.is_empty() => JsonValue::Object(map),
        _ => match flat {
            Some(name) => json!({ "name": name }),
            None => return,
        },
    };
    raw.authors.push(AuthorRecord { ordering, attrs });
}

fn build_record(id: &str, raw: RawRecord, primary_on_disk: bool) -> Result<ItemRecord> {
    let source = raw.source.ok_or_else(|| ConvertError::MalformedMetadata {
        item: id.to_string(),
        reason: "missing source attribute".to_string(),
    })?;
    let state = raw.state.ok_or_else(|| ConvertError::MalformedMetadata {
        item: id.to_string(),
        reason: "missing state attribute".to_string(),
    })?;
    let status =
        ItemStatus::parse(&state).ok_or_else(|| ConvertError::MalformedMetadata {
            item: id.to_string(),
            reason: format!("unrecognized state '{}'", state),
        })?;

    let disciplines: Vec<String> = raw
        .discipline_codes
        .iter()
        .filter_map(|c| disciplines::map_discipline(c))
        .map(str::to_string)
        .collect();

    let rights = raw.rights.as_deref().and_then(normalize_rights);

    // Content suppression: withdrawn, or nothing servable anywhere
    let suppressed = status == ItemStatus::Withdrawn
        || (raw.primary_file.is_none()
            && raw.supp_files.is_empty()
            && raw.external_link.is_none()
            && !primary_on_disk);

    let content_type = if suppressed {
        None
    } else {
        raw.primary_file.as_ref().and_then(|(_, mime)| mime.clone())
    };

    let mut attrs = Map::new();
    if let Some(a) = &raw.abstract_text {
        attrs.insert("abstract".to_string(), json!(a));
    }
    if !raw.keywords.is_empty() {
        attrs.insert("keywords".to_string(), json!(raw.keywords));
    }
    if let Some(link) = &raw.external_link {
        attrs.insert("external_link".to_string(), json!(link));
    }
    if !suppressed {
        if let Some((path, _)) = &raw.primary_file {
            attrs.insert("content_file".to_string(), json!(path));
        }
    }

    let issue = raw.context.as_ref().and_then(|ctx| {
        let unit_id = ctx.get("unit")?.clone();
        let volume = ctx.get("volume")?.clone();
        let issue_no = ctx.get("issue")?.clone();
        let section = ctx
            .get("section")
            .cloned()
            .unwrap_or_else(|| "Articles".to_string());
        let mut issue_attrs = Map::new();
        if let Some(r) = ctx.get("rights").map(String::as_str).and_then(normalize_rights) {
            issue_attrs.insert("rights".to_string(), json!(r));
        }
        Some(IssueRef {
            unit_id,
            volume,
            issue: issue_no,
            section,
            attrs: JsonValue::Object(issue_attrs),
        })
    });

    if raw.units.is_empty() {
        warn!(item = id, "Item declares no unit memberships");
    }

    Ok(ItemRecord {
        id: id.to_string(),
        source,
        status,
        title: raw.title,
        content_type,
        genre: raw.genre.unwrap_or_else(|| "article".to_string()),
        published: raw.published.as_deref().and_then(dates::parse_date),
        added: raw.added.as_deref().and_then(dates::parse_date),
        updated: raw.updated.as_deref().and_then(dates::parse_date),
        rights,
        attrs: JsonValue::Object(attrs),
        authors: raw.authors,
        disciplines,
        supp_files: if suppressed { Vec::new() } else { raw.supp_files },
        units: raw.units,
        issue,
        suppressed,
        text: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(Arc::new(NativeOnly))
    }

    const FULL_RECORD: &str = r#"
        <record source="subi" state="published">
            <title>Digest-Driven Synchronization</title>
            <genre>article</genre>
            <dates published="2021-02-30" added="20210115" updated="2021-01-16"/>
            <rights>cc1</rights>
            <abstract>How to avoid reindexing the world.</abstract>
            <keywords><keyword>indexing</keyword><keyword>digests</keyword></keywords>
            <authors>
                <author><fname>Ada</fname><lname>Lovelace</lname></author>
                <author>The Conversion Working Group</author>
            </authors>
            <disciplines><discipline code="220"/><discipline code="9999"/></disciplines>
            <content>
                <file path="content/qt1234.pdf" mime="application/pdf"/>
                <supplemental>
                    <file path="supp/data.csv" mime="text/csv" size="2048"/>
                </supplemental>
            </content>
            <units><unit id="uclalaw"/><unit id="uclalaw_stlr"/></units>
            <context unit="uclalaw_stlr" volume="3" issue="2" section="Articles" rights="cc2"/>
        </record>"#;

    #[test]
    fn parses_full_native_record() {
        let rec = normalizer()
            .normalize("qt1234", Dialect::Native, FULL_RECORD, true)
            .unwrap();
        assert_eq!(rec.title.as_deref(), Some("Digest-Driven Synchronization"));
        assert_eq!(rec.status, ItemStatus::Published);
        assert_eq!(rec.rights.as_deref(), Some("CC BY"));
        assert_eq!(rec.content_type.as_deref(), Some("application/pdf"));
        // Feb 30 clamps to Feb 28
        assert_eq!(
            rec.published,
            chrono::NaiveDate::from_ymd_opt(2021, 2, 28)
        );
        // 9999 is unknown and dropped; 220 survives
        assert_eq!(rec.disciplines, vec!["Computer Sciences"]);
        assert_eq!(rec.authors.len(), 2);
        assert_eq!(
            rec.authors[0].display_name().as_deref(),
            Some("Lovelace, Ada")
        );
        assert_eq!(
            rec.authors[1].display_name().as_deref(),
            Some("The Conversion Working Group")
        );
        assert_eq!(rec.units, vec!["uclalaw", "uclalaw_stlr"]);
        let issue = rec.issue.unwrap();
        assert_eq!(issue.volume, "3");
        assert_eq!(issue.section, "Articles");
        assert_eq!(
            issue.attrs.get("rights").and_then(|v| v.as_str()),
            Some("CC BY-SA")
        );
        assert!(!rec.suppressed);
        assert_eq!(rec.supp_files.len(), 1);
    }

    #[test]
    fn missing_source_is_malformed() {
        let xml = r#"<record state="published"><title>No Source</title></record>"#;
        let err = normalizer()
            .normalize("qt0001", Dialect::Native, xml, false)
            .unwrap_err();
        assert!(err.is_item_local());
    }

    #[test]
    fn withdrawn_item_is_suppressed() {
        let xml = r#"
            <record source="subi" state="withdrawn">
                <title>Gone</title>
                <content><file path="content/x.pdf" mime="application/pdf"/></content>
                <units><unit id="ucb"/></units>
            </record>"#;
        let rec = normalizer()
            .normalize("qt0002", Dialect::Native, xml, true)
            .unwrap();
        assert!(rec.suppressed);
        assert_eq!(rec.content_type, None);
        assert!(rec.supp_files.is_empty());
    }

    #[test]
    fn contentless_item_is_suppressed() {
        let xml = r#"
            <record source="subi" state="published">
                <title>Metadata Only</title>
                <units><unit id="ucb"/></units>
            </record>"#;
        let rec = normalizer()
            .normalize("qt0003", Dialect::Native, xml, false)
            .unwrap();
        assert!(rec.suppressed);
    }

    #[test]
    fn external_link_prevents_suppression() {
        let xml = r#"
            <record source="oa_harvester" state="published">
                <title>Hosted Elsewhere</title>
                <externalLink>https://example.org/paper</externalLink>
                <units><unit id="ucb"/></units>
            </record>"#;
        let rec = normalizer()
            .normalize("qt0004", Dialect::Native, xml, false)
            .unwrap();
        assert!(!rec.suppressed);
    }

    #[test]
    fn foreign_dialect_without_transform_is_config_error() {
        let err = normalizer()
            .normalize("qt0005", Dialect::Etd, "<etd/>", false)
            .unwrap_err();
        assert!(matches!(err, ConvertError::Configuration(_)));
    }
}
