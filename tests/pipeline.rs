use pretty_assertions::assert_eq;
use scraper::{Html, Selector};
use texmark::protect::contains_token;
use texmark::{render_markdown, LatexTransformer};

fn texts(html: &str, selector: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let selector = Selector::parse(selector).unwrap();
    fragment
        .select(&selector)
        .map(|element| element.text().collect::<String>())
        .collect()
}

fn transform(source: &str) -> String {
    LatexTransformer::default().transform(source)
}

#[test]
fn code_round_trips_unchanged() {
    let block = "print('$x$ % 100 \\section{a} \\\\ <b>')\n";
    let inline = "a $b$ \\% c";
    let source = format!("Before\n```python\n{block}```\nand `{inline}` after % trailing comment");

    let html = transform(&source);

    assert_eq!(texts(&html, "pre code"), vec![block.to_owned()]);
    assert_eq!(texts(&html, "p code"), vec![inline.to_owned()]);
    assert!(!html.contains("trailing comment"));
}

#[test]
fn percent_inside_math_is_not_a_comment() {
    let html = transform("Ratio $a % b$ holds % real comment\n\\[ 50 % 2 \\]");

    assert_eq!(
        texts(&html, ".mjx-formula"),
        vec!["$a % b$".to_owned(), "\\[ 50 % 2 \\]".to_owned()]
    );
    assert!(!html.contains("real comment"));
}

#[test]
fn commented_out_display_math_is_dropped() {
    let html = transform("Text\n% old: $$a+b$$\nMore");
    assert!(!html.contains("a+b") && !html.contains("mjx-formula"));
    assert!(html.contains("Text") && html.contains("More"));

    let html = transform("% \\begin{equation}x\\end{equation}\nok");
    assert!(!html.contains("mjx-formula") && !html.contains("equation"));
    assert!(html.contains("ok"));

    let html = transform("% cost $$\nReal $$E=mc^2$$ here");
    assert_eq!(texts(&html, ".mjx-formula"), vec!["$$E=mc^2$$"]);
    assert!(html.contains("Real") && html.contains("here"));
    assert!(!html.contains("cost"));
}

#[test]
fn line_break_spacing_stays_out_of_math() {
    let html = transform("first\\\\[2pt]\nsecond \\[ x \\]");
    assert_eq!(texts(&html, ".mjx-formula"), vec!["\\[ x \\]"]);
    assert!(html.contains("[2pt]"));
}

#[test]
fn header_of_a_document_lists_plain_math() {
    let header = LatexTransformer::default()
        .header("\\title{On $x$}\nBody")
        .unwrap();
    assert_eq!(header.title, "On $x$");

    let html = transform("\\title{On $x$}\n\\maketitle\nBody $y$");
    assert_eq!(texts(&html, ".doc-title"), vec!["On $x$"]);
    assert_eq!(texts(&html, ".mjx-formula"), vec!["$y$"]);
    assert!(!contains_token(&html));
}

#[test]
fn every_token_is_restored_exactly_once() {
    let source = "\\title{T}\n\\maketitle\n\\section{S}\nInline $a$ and \\(d\\)\n$$b$$\n\\begin{itemize}\n\\item $c$\n\\end{itemize}\n\\begin{cases}x\\end{cases}";
    let transformer = LatexTransformer::default();
    let protected = transformer.render_protected(source);

    let tokens: Vec<String> = protected
        .tables
        .math
        .iter()
        .map(|(token, _)| token.to_owned())
        .chain(protected.tables.header.iter().map(|(token, _)| token.to_owned()))
        .collect();
    assert_eq!(tokens.len(), 6);
    for token in &tokens {
        assert_eq!(protected.html.matches(token.as_str()).count(), 1, "{token:?}");
    }

    let html = transformer.restore(protected);
    assert!(!contains_token(&html));
    assert_eq!(html.matches("mjx-formula").count(), 5);
    assert_eq!(html.matches("doc-header").count(), 1);
}

#[test]
fn enumerate_counts_per_environment() {
    let html = transform(
        "\\begin{enumerate}\n\\item one\n\\item two\n\\item three\n\\end{enumerate}\n\\begin{itemize}\n\\item x\n\\item y\n\\end{itemize}\n\\begin{enumerate}\n\\item again\n\\end{enumerate}",
    );

    assert_eq!(texts(&html, "ol > li"), vec!["one", "two", "three", "again"]);
    assert_eq!(texts(&html, "ul > li"), vec!["x", "y"]);

    let fragment = Html::parse_fragment(&html);
    let lists: Vec<_> = fragment.select(&Selector::parse("ol").unwrap()).collect();
    assert_eq!(lists.len(), 2);
    assert!(lists.iter().all(|list| list.value().attr("start").is_none()));
}

#[test]
fn header_takes_the_place_of_maketitle() {
    let html = transform("Intro line\n\\title{Report}\\author{Ann}\\maketitle\nBody text");

    let intro = html.find("Intro line").unwrap();
    let header = html.find("doc-header").unwrap();
    let body = html.find("Body text").unwrap();
    assert!(intro < header && header < body);
    assert_eq!(texts(&html, ".doc-title"), vec!["Report"]);
    assert_eq!(texts(&html, ".doc-author"), vec!["Author: Ann"]);
    assert!(!html.contains("<p><div"));
}

#[test]
fn header_without_maketitle_is_prepended() {
    let html = transform("Body text\n\\title{Report}");
    assert!(html.starts_with("<div class=\"doc-header\">"));
    assert!(html.find("doc-header").unwrap() < html.find("Body text").unwrap());
}

#[test]
fn display_and_inline_math_use_different_containers() {
    let html = transform("$$x^2$$\n\nand $x^2$ inline");

    assert_eq!(texts(&html, "div.mjx-process"), vec!["$$x^2$$"]);
    assert_eq!(texts(&html, "p > span.mjx-process"), vec!["$x^2$"]);
    assert!(!html.contains("<p><div"));
}

#[test]
fn whitespace_only_display_delimiters_stay_text() {
    let html = transform("a $$ $$ b");
    assert!(!html.contains("mjx-formula"));
    assert!(html.contains("$$ $$"));
}

#[test]
fn malformed_input_still_renders() {
    let source = "\\begin{align} x = 1\n$ stray\n\\end{itemize}\\begin{enumerate}\n\\item{ \\[ open";

    let html = transform(source);
    assert!(!html.is_empty());
    assert!(!contains_token(&html));

    let html = render_markdown("$$ unclosed \\begin{equation}\n$ stray");
    assert!(!html.is_empty());
}

#[test]
fn markdown_pipeline_typesets_with_katex() {
    let html = render_markdown("Inline \\(x^2\\) and\n\n\\[\n\\int_0^1 f\n\\]\n\n```latex\n\\(kept\\)\n```");

    assert!(html.contains("katex"));
    assert!(html.contains("katex-display"));
    assert_eq!(texts(&html, "pre code"), vec!["\\(kept\\)\n"]);
}
