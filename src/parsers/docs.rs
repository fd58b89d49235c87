use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref DOC_BLOCK: Regex = Regex::new(
        r"/\*[ \t]*\r?\n[ \t]*\*[ \t]*([A-Za-z_]\w*)[ \t]*\r?\n((?:[ \t]*\*(?:[^/\n][^\n]*)?\r?\n)*?)[ \t]*\*/"
    )
    .unwrap();
    static ref LINE_PREFIX: Regex = Regex::new(r"^[ \t]*\*[ \t]?").unwrap();
}

/// Collects the SDK's block comments that open with the name of the
/// declaration they document.
pub fn parse(source: &str) -> HashMap<String, String> {
    let mut docs = HashMap::new();
    for captures in DOC_BLOCK.captures_iter(source) {
        let name = match captures.get(1) {
            Some(name) => name.as_str(),
            None => continue,
        };
        let body = captures.get(2).map_or("", |body| body.as_str());
        let lines: Vec<String> = body
            .lines()
            .map(|line| LINE_PREFIX.replace(line, "").trim_end().to_string())
            .collect();
        let text = lines.join("\n").trim().to_string();
        if !text.is_empty() {
            docs.insert(name.to_string(), text);
        }
    }
    docs
}

#[cfg(test)]
mod tests {
    use crate::parsers::docs::parse;

    #[test]
    fn test_should_extract_named_doc_block() {
        let source = r#"
/***************************************************************************
 * CAMERA CONTROL
 ***************************************************************************/

/*
 * XPLMCameraControlDuration
 *
 * This enumeration states how long you want to retain control of the camera.
 * You can retain it indefinitely or until the user selects a new view.
 *
 */
enum {
    xplm_ControlCameraUntilViewChanges       = 1,
};
"#;
        let docs = parse(source);
        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs.get("XPLMCameraControlDuration").unwrap(),
            "This enumeration states how long you want to retain control of the camera.\n\
             You can retain it indefinitely or until the user selects a new view."
        );
    }

    #[test]
    fn test_should_ignore_blocks_without_text() {
        let source = "/*\n * XPLMDefs\n *\n */\n";
        assert!(parse(source).is_empty());
    }
}
