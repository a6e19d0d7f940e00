//! Projection of source records into [`SearchDocument`]s.
//!
//! Both the bulk index rebuild and the incremental updater go through
//! [`project`], so a document produced either way is identical.
//!
//! # Field mapping
//!
//! | Source | `title` | `content` | `tags` |
//! |--------|---------|-----------|--------|
//! | Note | `title` | `content_html`, markup stripped | `tags` |
//! | Task | `title` | `status` | `tags` |
//! | Event | `title` | `description` | none |
//!
//! Missing fields become an empty string or an empty list; projection
//! never fails.

use crate::models::{Event, Note, SearchDocument, SourceRecord, SourceType, Task};

/// Project a single source record.
pub fn project(record: &SourceRecord) -> SearchDocument {
    match record {
        SourceRecord::Note(note) => project_note(note),
        SourceRecord::Task(task) => project_task(task),
        SourceRecord::Event(event) => project_event(event),
    }
}

/// Project full collections, notes first, then tasks, then events.
pub fn project_all(notes: &[Note], tasks: &[Task], events: &[Event]) -> Vec<SearchDocument> {
    let mut docs = Vec::with_capacity(notes.len() + tasks.len() + events.len());
    docs.extend(notes.iter().map(project_note));
    docs.extend(tasks.iter().map(project_task));
    docs.extend(events.iter().map(project_event));
    docs
}

pub fn project_note(note: &Note) -> SearchDocument {
    SearchDocument {
        id: SearchDocument::compose_id(SourceType::Note, note.id),
        source_type: SourceType::Note,
        title: note.title.clone().unwrap_or_default(),
        content: strip_html(note.content_html.as_deref().unwrap_or_default()),
        tags: note.tags.clone().unwrap_or_default(),
    }
}

pub fn project_task(task: &Task) -> SearchDocument {
    SearchDocument {
        id: SearchDocument::compose_id(SourceType::Task, task.id),
        source_type: SourceType::Task,
        title: task.title.clone().unwrap_or_default(),
        content: task.status.clone().unwrap_or_default(),
        tags: task.tags.clone().unwrap_or_default(),
    }
}

pub fn project_event(event: &Event) -> SearchDocument {
    SearchDocument {
        id: SearchDocument::compose_id(SourceType::Event, event.id),
        source_type: SourceType::Event,
        title: event.title.clone().unwrap_or_default(),
        content: event.description.clone().unwrap_or_default(),
        tags: Vec::new(),
    }
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section", "table", "td",
    "th", "tr", "ul",
];

/// Reduce an HTML fragment to its plain text.
///
/// Tags and comments are removed, `<script>` and `<style>` bodies are
/// dropped, character entities are decoded, block-level tags separate
/// words, and whitespace runs collapse to a single space.
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        decode_entities(&rest[..lt], &mut text);
        let tail = &rest[lt..];

        if let Some(comment) = tail.strip_prefix("<!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }

        // A '<' that cannot open a tag is literal text ("a < b").
        let opens_tag = tail[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!');
        if !opens_tag {
            text.push('<');
            rest = &tail[1..];
            continue;
        }

        let Some(gt) = tail.find('>') else {
            // Unterminated tag runs to the end of input.
            rest = "";
            break;
        };
        let raw_tag = &tail[1..gt];
        let name = tag_name(raw_tag);
        rest = &tail[gt + 1..];

        if BLOCK_TAGS.contains(&name.as_str()) {
            text.push(' ');
        }

        if !raw_tag.starts_with('/') && (name == "script" || name == "style") {
            let closing = format!("</{}", name);
            let lowered = rest.to_ascii_lowercase();
            let body_end = lowered
                .find(&closing)
                .and_then(|start| lowered[start..].find('>').map(|end| start + end + 1));
            rest = body_end.map_or("", |end| &rest[end..]);
        }
    }
    decode_entities(rest, &mut text);

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tag_name(raw_tag: &str) -> String {
    raw_tag
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn decode_entities(fragment: &str, out: &mut String) {
    let mut rest = fragment;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|semi| *semi <= 10)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let numeric = entity.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_simple_paragraph() {
        assert_eq!(strip_html("<p>milk, eggs</p>"), "milk, eggs");
    }

    #[test]
    fn test_block_tags_separate_words() {
        assert_eq!(strip_html("<p>one</p><p>two</p>line<br>break"), "one two line break");
        assert_eq!(strip_html("<b>bold</b>face"), "boldface");
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(
            strip_html("Fish &amp; chips &lt;3 &#39;yum&#x27; &copy;"),
            "Fish & chips <3 'yum' &copy;"
        );
    }

    #[test]
    fn test_script_style_and_comments_dropped() {
        let html = "<style>p { color: red }</style>Hello<!-- hidden --> <SCRIPT>alert(1)</SCRIPT>world";
        assert_eq!(strip_html(html), "Hello world");
    }

    #[test]
    fn test_literal_less_than_kept() {
        assert_eq!(strip_html("a < b and <i>c</i>"), "a < b and c");
    }

    #[test]
    fn test_unterminated_tag_is_dropped() {
        assert_eq!(strip_html("text <span class=\"x"), "text");
    }

    #[test]
    fn test_multibyte_text_survives() {
        assert_eq!(strip_html("<p>café — naïve</p>"), "café — naïve");
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let doc = project(&SourceRecord::Note(Note {
            id: 4,
            ..Default::default()
        }));
        assert_eq!(doc.id, "note-4");
        assert_eq!(doc.title, "");
        assert_eq!(doc.content, "");
        assert!(doc.tags.is_empty());
    }

    #[test]
    fn test_field_mapping_per_type() {
        let task = project(&SourceRecord::Task(Task {
            id: 1,
            title: Some("Pay rent".into()),
            status: Some("pending".into()),
            tags: Some(vec!["finance".into()]),
        }));
        assert_eq!(task.content, "pending");
        assert_eq!(task.tags, vec!["finance".to_string()]);

        let event = project(&SourceRecord::Event(Event {
            id: 2,
            title: Some("Team sync".into()),
            description: Some("weekly standup".into()),
            starts_at: None,
        }));
        assert_eq!(event.id, "event-2");
        assert_eq!(event.source_type, SourceType::Event);
        assert_eq!(event.content, "weekly standup");
        assert!(event.tags.is_empty());
    }

    #[test]
    fn test_project_all_orders_by_collection() {
        let docs = project_all(
            &[Note { id: 1, ..Default::default() }],
            &[Task { id: 1, ..Default::default() }],
            &[Event { id: 1, ..Default::default() }],
        );
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["note-1", "task-1", "event-1"]);
    }
}
