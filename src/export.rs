//! Export boundary — a pure data-to-document transform.
//!
//! The core's obligation ends at supplying every brief's five fields in a
//! fixed order with visible separation between briefs; downstream renderers
//! (PDF and friends) consume the document opaquely.

use std::io;
use std::path::Path;

use crate::brief::IdeaBrief;

/// Render an ordered sequence of briefs as a markdown document.
pub fn render_markdown(briefs: &[IdeaBrief]) -> String {
    let mut doc = String::from("# Idea Briefs\n");

    for (idx, brief) in briefs.iter().enumerate() {
        if idx > 0 {
            doc.push_str("\n---\n");
        }
        doc.push_str(&format!("\n## {}\n\n", brief.title));
        doc.push_str(&format!("{}\n\n", brief.description));
        doc.push_str(&format!("**Justification:** {}\n\n", brief.justification));
        doc.push_str(&format!("**Methodology:** {}\n\n", brief.methodology));
        doc.push_str(&format!(
            "**Datasets/Sources:** {}\n",
            brief.datasets_sources
        ));
    }

    doc
}

/// Write the rendered document to a file.
pub fn write_markdown(path: impl AsRef<Path>, briefs: &[IdeaBrief]) -> io::Result<()> {
    std::fs::write(path, render_markdown(briefs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brief(title: &str) -> IdeaBrief {
        IdeaBrief {
            title: title.to_string(),
            description: format!("{title} description"),
            justification: format!("{title} justification"),
            methodology: format!("{title} methodology"),
            datasets_sources: format!("{title} sources"),
        }
    }

    #[test]
    fn renders_all_five_fields_in_order() {
        let doc = render_markdown(&[brief("Alpha")]);
        let desc = doc.find("Alpha description").unwrap();
        let just = doc.find("**Justification:** Alpha justification").unwrap();
        let meth = doc.find("**Methodology:** Alpha methodology").unwrap();
        let data = doc.find("**Datasets/Sources:** Alpha sources").unwrap();
        let title = doc.find("## Alpha").unwrap();
        assert!(title < desc && desc < just && just < meth && meth < data);
    }

    #[test]
    fn separates_briefs_visibly() {
        let doc = render_markdown(&[brief("One"), brief("Two")]);
        let sep = doc.find("\n---\n").unwrap();
        assert!(doc.find("## One").unwrap() < sep);
        assert!(sep < doc.find("## Two").unwrap());
    }

    #[test]
    fn preserves_input_order() {
        let doc = render_markdown(&[brief("B"), brief("A")]);
        assert!(doc.find("## B").unwrap() < doc.find("## A").unwrap());
    }

    #[test]
    fn writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("briefs.md");
        write_markdown(&path, &[brief("Alpha")]).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("## Alpha"));
    }
}
