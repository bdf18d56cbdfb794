//! CSS and HTML capability records.
//!
//! Markup and stylesheets only support the comment policy: they have no
//! functions, imports worth summarizing, literals or public API.

use super::placeholder::PlaceholderSpec;
use super::query::{NodePattern, QueryTable};
use super::{always_external, never_doc, BodyStyle, LanguageSpec};

const COMMENTS: &[NodePattern] = &[NodePattern::new("comment", &["comment"])];

pub static CSS_SPEC: LanguageSpec = LanguageSpec {
    placeholder: PlaceholderSpec::CSS,
    queries: QueryTable {
        comments: COMMENTS,
        ..QueryTable::EMPTY
    },
    comment_kinds: &["comment"],
    body_kinds: &[],
    body_style: BodyStyle::Braces,
    is_doc_comment: never_doc,
    import_locality: always_external,
    scope: None,
};

pub static HTML_SPEC: LanguageSpec = LanguageSpec {
    placeholder: PlaceholderSpec::HTML,
    queries: QueryTable {
        comments: COMMENTS,
        ..QueryTable::EMPTY
    },
    comment_kinds: &["comment"],
    body_kinds: &[],
    body_style: BodyStyle::Braces,
    is_doc_comment: never_doc,
    import_locality: always_external,
    scope: None,
};

#[cfg(test)]
mod tests {
    use crate::condense::policy::ReductionPolicyConfig;
    use crate::condense::reducers::run_passes;
    use crate::condense::tokens::HeuristicCounter;
    use crate::condense::{policy::CommentMode, tree::parse, LanguageId};

    fn strip(src: &str, lang: LanguageId) -> String {
        let tree = parse(src, lang).unwrap();
        let mut config = ReductionPolicyConfig::default();
        config.comments.mode = CommentMode::StripAll;
        run_passes(&tree, src, &config, &HeuristicCounter).unwrap().text
    }

    #[test]
    fn test_html_comments_use_markup_syntax() {
        let src = "<div>\n  <!-- layout -->\n  <p>hi</p>\n</div>\n";
        assert_eq!(
            strip(src, LanguageId::Html),
            "<div>\n  <!-- … comment omitted (1 line) -->\n  <p>hi</p>\n</div>\n"
        );
    }

    #[test]
    fn test_css_comments_use_block_syntax() {
        let src = "/* theme */\na { color: red; }\n";
        assert_eq!(strip(src, LanguageId::Css), "/* … comment omitted (1 line) */\na { color: red; }\n");
    }
}
