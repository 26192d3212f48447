//! Format-specific text extractors.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::DocumentError;

/// Extracts the text of every page, one page per line group.
pub(crate) fn pdf(path: &Path) -> Result<String, DocumentError> {
    let doc = lopdf::Document::load(path)?;
    let pages = doc
        .get_pages()
        .keys()
        .map(|number| doc.extract_text(&[*number]))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(pages.join("\n"))
}

/// Extracts the paragraphs of `word/document.xml`, one per line.
pub(crate) fn docx(path: &Path) -> Result<String, DocumentError> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut xml)?;
    docx_paragraphs(&xml).map(|paragraphs| paragraphs.join("\n"))
}

/// Collects top-level paragraphs. Paragraphs nested inside another one (text
/// boxes) are folded into their parent on lines of their own, and the
/// `mc:Fallback` copy of alternate content is skipped.
fn docx_paragraphs(xml: &str) -> Result<Vec<String>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    let mut fallback_depth = 0usize;

    loop {
        let event = reader.read_event()?;
        if fallback_depth > 0 {
            match &event {
                Event::Start(e) if e.name().as_ref() == b"mc:Fallback" => fallback_depth += 1,
                Event::End(e) if e.name().as_ref() == b"mc:Fallback" => fallback_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => open.push(String::new()),
                b"w:t" => in_text = true,
                b"mc:Fallback" => fallback_depth = 1,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" if open.is_empty() => paragraphs.push(String::new()),
                b"w:tab" => push_to(&mut open, "\t"),
                b"w:br" | b"w:cr" => push_to(&mut open, "\n"),
                _ => {}
            },
            Event::Text(t) if in_text => push_to(&mut open, &t.unescape()?),
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let Some(finished) = open.pop() else {
                        continue;
                    };
                    match open.last_mut() {
                        Some(parent) => {
                            if !parent.is_empty() && !parent.ends_with('\n') {
                                parent.push('\n');
                            }
                            parent.push_str(&finished);
                            parent.push('\n');
                        }
                        None => paragraphs.push(finished.trim_end_matches('\n').to_string()),
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn push_to(open: &mut [String], text: &str) {
    if let Some(p) = open.last_mut() {
        p.push_str(text);
    }
}

/// Reads a text file as UTF-8, falling back to GBK. `\r\n` and lone `\r`
/// line endings become `\n`.
pub(crate) fn text(path: &Path) -> Result<String, DocumentError> {
    decode_text(std::fs::read(path)?).map(|text| normalize_newlines(&text))
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn decode_text(bytes: Vec<u8>) -> Result<String, DocumentError> {
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            let bytes = err.into_bytes();
            encoding_rs::GBK
                .decode_without_bom_handling_and_without_replacement(&bytes)
                .map(Cow::into_owned)
                .ok_or(DocumentError::Undecodable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gbk_fallback_decodes_chinese() {
        // "中文" in GBK
        let decoded = decode_text(vec![0xD6, 0xD0, 0xCE, 0xC4]).unwrap();
        assert_eq!(decoded, "中文");
    }

    #[test]
    fn windows_line_endings_are_normalized() {
        assert_eq!(normalize_newlines("one\r\ntwo\rthree\n"), "one\ntwo\nthree\n");
    }

    #[test]
    fn utf8_is_preferred() {
        assert_eq!(decode_text("héllo".as_bytes().to_vec()).unwrap(), "héllo");
    }

    #[test]
    fn docx_runs_tabs_and_breaks() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve"> world &amp; co</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t>line</w:t><w:br/><w:t>break</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

        let paragraphs = docx_paragraphs(xml).unwrap();

        assert_eq!(paragraphs, vec!["Hello\t world & co", "", "line\nbreak"]);
    }

    #[test]
    fn docx_text_box_keeps_surrounding_text() {
        let xml = r#"<w:document xmlns:w="w" xmlns:mc="mc"><w:body>
<w:p><w:r><w:t>Before</w:t></w:r><w:r><mc:AlternateContent>
  <mc:Choice Requires="wps"><w:drawing><w:txbxContent><w:p><w:r><w:t>Box</w:t></w:r></w:p></w:txbxContent></w:drawing></mc:Choice>
  <mc:Fallback><w:pict><w:txbxContent><w:p><w:r><w:t>Box</w:t></w:r></w:p></w:txbxContent></w:pict></mc:Fallback>
</mc:AlternateContent></w:r><w:r><w:t>After</w:t></w:r></w:p>
<w:p><w:r><w:t>Next</w:t></w:r></w:p>
</w:body></w:document>"#;

        let paragraphs = docx_paragraphs(xml).unwrap();

        assert_eq!(paragraphs, vec!["Before\nBox\nAfter", "Next"]);
    }
}
