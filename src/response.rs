//! Rendering of list and single-record responses, with interactive paging

use crate::error::{CliError, Result};
use crate::format::ResourceKind;
use crate::output::{render_detail, render_table, to_json, OutputFormat};
use crate::workspace::WorkspaceMap;
use serde_json::Value;
use std::future::Future;
use std::io::{self, BufRead, IsTerminal, Write};

/// Decides whether to go on when a question needs a yes/no answer
pub trait Prompt: Send + Sync {
    fn confirm(&self, question: &str, default: bool) -> bool;
}

/// Asks on the terminal; answers "no" when stdin is not interactive
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&self, question: &str, default: bool) -> bool {
        if !io::stdin().is_terminal() {
            return false;
        }
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        eprint!("{} {} ", question, hint);
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        match answer.trim().to_lowercase().as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        }
    }
}

#[cfg(test)]
pub struct AlwaysYes;

#[cfg(test)]
impl Prompt for AlwaysYes {
    fn confirm(&self, _question: &str, _default: bool) -> bool {
        true
    }
}

#[cfg(test)]
pub struct AlwaysNo;

#[cfg(test)]
impl Prompt for AlwaysNo {
    fn confirm(&self, _question: &str, _default: bool) -> bool {
        false
    }
}

/// Output format and page size for a list command
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    pub format: OutputFormat,
    pub take: usize,
}

impl ListOptions {
    pub fn new(format: OutputFormat, take: usize) -> Result<Self> {
        if take == 0 {
            return Err(CliError::invalid("--take must be at least 1"));
        }
        Ok(Self { format, take })
    }
}

/// Where the next page starts
#[derive(Debug, Clone, PartialEq)]
pub enum Cursor {
    Token(String),
    Skip(usize),
}

impl Cursor {
    pub fn skip(cursor: &Option<Cursor>) -> usize {
        match cursor {
            Some(Cursor::Skip(n)) => *n,
            _ => 0,
        }
    }

    pub fn token(cursor: &Option<Cursor>) -> Option<String> {
        match cursor {
            Some(Cursor::Token(t)) => Some(t.clone()),
            _ => None,
        }
    }
}

/// One page of a server-paged list
#[derive(Debug, Default)]
pub struct Page {
    pub items: Vec<Value>,
    pub next: Option<Cursor>,
    pub total: Option<usize>,
}

impl Page {
    /// Page from a continuation-token endpoint
    pub fn from_token(items: Vec<Value>, token: Option<String>, total: Option<usize>) -> Self {
        Self {
            items,
            next: token.map(Cursor::Token),
            total,
        }
    }

    /// Page from a skip/take endpoint
    ///
    /// With a reported total, more remain while `skip + len < total`; without
    /// one, a full page implies there may be more.
    pub fn from_skip(items: Vec<Value>, skip: usize, take: usize, total: Option<usize>) -> Self {
        let fetched = skip + items.len();
        let more = match total {
            Some(total) => fetched < total,
            None => !items.is_empty() && items.len() >= take,
        };
        Self {
            next: more.then_some(Cursor::Skip(fetched)),
            items,
            total,
        }
    }
}

fn write_page<W: Write>(
    out: &mut W,
    kind: ResourceKind,
    items: &[Value],
    workspaces: &WorkspaceMap,
) -> Result<()> {
    let rows: Vec<Vec<String>> = items.iter().map(|item| kind.row(item, workspaces)).collect();
    writeln!(out, "{}", render_table(kind.headers(), &rows))?;
    Ok(())
}

fn write_none_found<W: Write>(out: &mut W, kind: ResourceKind) -> Result<()> {
    writeln!(out, "No {} found.", kind.plural())?;
    Ok(())
}

/// Render a list that is already fully in memory
///
/// Table output is sliced into pages of `take`, asking before each further
/// page. JSON output prints everything and never asks.
pub fn render_list<W: Write>(
    out: &mut W,
    kind: ResourceKind,
    items: &[Value],
    opts: &ListOptions,
    workspaces: &WorkspaceMap,
    prompt: &dyn Prompt,
) -> Result<()> {
    if opts.format == OutputFormat::Json {
        writeln!(out, "{}", to_json(&items)?)?;
        return Ok(());
    }
    if items.is_empty() {
        return write_none_found(out, kind);
    }

    let total = items.len();
    let mut shown = 0;
    for page in items.chunks(opts.take) {
        write_page(out, kind, page, workspaces)?;
        shown += page.len();
        writeln!(out, "Showing {} of {} {}.", shown, total, kind.plural())?;
        if shown >= total {
            break;
        }
        let next = opts.take.min(total - shown);
        if !prompt.confirm(&format!("Show next {} {}?", next, kind.plural()), true) {
            break;
        }
    }
    Ok(())
}

/// Render a list the server hands out page by page
///
/// `fetch(cursor, take)` loads one page. Table output shows a page at a time
/// and asks before loading the next; JSON output follows every cursor and
/// prints the combined list once.
pub async fn render_paged<W, F, Fut>(
    out: &mut W,
    kind: ResourceKind,
    opts: &ListOptions,
    workspaces: &WorkspaceMap,
    prompt: &dyn Prompt,
    mut fetch: F,
) -> Result<()>
where
    W: Write,
    F: FnMut(Option<Cursor>, usize) -> Fut,
    Fut: Future<Output = Result<Page>>,
{
    let mut cursor: Option<Cursor> = None;

    if opts.format == OutputFormat::Json {
        let mut all = Vec::new();
        loop {
            let sent = cursor.take();
            let page = fetch(sent.clone(), opts.take).await?;
            let fetched = page.items.len();
            all.extend(page.items);
            match page.next {
                Some(next) if next_is_new(&sent, &next) && fetched > 0 => cursor = Some(next),
                _ => break,
            }
        }
        writeln!(out, "{}", to_json(&all)?)?;
        return Ok(());
    }

    let mut shown = 0;
    loop {
        let sent = cursor.take();
        let page = fetch(sent.clone(), opts.take).await?;
        if page.items.is_empty() {
            if shown == 0 {
                write_none_found(out, kind)?;
            }
            break;
        }

        write_page(out, kind, &page.items, workspaces)?;
        shown += page.items.len();
        match page.total {
            Some(total) => writeln!(out, "Showing {} of {} {}.", shown, total, kind.plural())?,
            None => writeln!(out, "Showing {} {}.", shown, kind.plural())?,
        }

        let more = page.next.as_ref().is_some_and(|next| next_is_new(&sent, next))
            && page.total.map_or(true, |total| total > shown);
        if !more {
            break;
        }
        if !prompt.confirm(&format!("Show next {} {}?", opts.take, kind.plural()), true) {
            break;
        }
        cursor = page.next;
    }
    Ok(())
}

/// A server that hands back the cursor it was just given has nothing more to page
fn next_is_new(sent: &Option<Cursor>, next: &Cursor) -> bool {
    if sent.as_ref() == Some(next) {
        tracing::warn!("server repeated the page cursor {:?}; stopping", next);
        return false;
    }
    true
}

/// Render one record, as a field/value table or as JSON
pub fn render_record<W: Write>(
    out: &mut W,
    kind: ResourceKind,
    record: &Value,
    format: OutputFormat,
    workspaces: &WorkspaceMap,
) -> Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", to_json(record)?)?,
        OutputFormat::Table => {
            let row = kind.row(record, workspaces);
            writeln!(out, "{}", render_detail(kind.headers(), &row))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts questions and answers yes
    struct Counting(AtomicUsize);

    impl Prompt for Counting {
        fn confirm(&self, _question: &str, _default: bool) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    struct Forbidden;

    impl Prompt for Forbidden {
        fn confirm(&self, question: &str, _default: bool) -> bool {
            panic!("unexpected prompt: {}", question);
        }
    }

    fn comments(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({"id": format!("C{}", i), "message": format!("msg {}", i)}))
            .collect()
    }

    fn render(items: &[Value], format: OutputFormat, take: usize, prompt: &dyn Prompt) -> String {
        let mut out = Vec::new();
        let opts = ListOptions::new(format, take).unwrap();
        render_list(&mut out, ResourceKind::Comment, items, &opts, &WorkspaceMap::default(), prompt)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_take_zero_rejected() {
        let err = ListOptions::new(OutputFormat::Table, 0).unwrap_err();
        assert_eq!(err.exit_code().code(), 2);
    }

    #[test]
    fn test_table_pages_until_declined() {
        let text = render(&comments(5), OutputFormat::Table, 2, &AlwaysNo);
        assert!(text.contains("C0"));
        assert!(text.contains("C1"));
        assert!(!text.contains("C2"));
        assert!(text.contains("Showing 2 of 5 comments."));
    }

    #[test]
    fn test_table_pages_until_exhausted() {
        let prompt = Counting(AtomicUsize::new(0));
        let text = render(&comments(5), OutputFormat::Table, 2, &prompt);
        assert!(text.contains("C4"));
        assert!(text.contains("Showing 5 of 5 comments."));
        assert_eq!(prompt.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_json_never_prompts() {
        let text = render(&comments(60), OutputFormat::Json, 5, &Forbidden);
        let parsed: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 60);
    }

    #[test]
    fn test_empty_list_messages() {
        assert_eq!(render(&[], OutputFormat::Table, 5, &Forbidden).trim(), "No comments found.");
        assert_eq!(render(&[], OutputFormat::Json, 5, &Forbidden).trim(), "[]");
    }

    #[test]
    fn test_record_id_in_both_formats() {
        let record = json!({"id": "asset-77", "name": "Scope", "modelName": "PXIe-5160"});
        for format in [OutputFormat::Table, OutputFormat::Json] {
            let mut out = Vec::new();
            render_record(&mut out, ResourceKind::Asset, &record, format, &WorkspaceMap::default())
                .unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(text.contains("asset-77"), "{}", text);
        }
        let mut out = Vec::new();
        render_record(&mut out, ResourceKind::Asset, &record, OutputFormat::Json, &WorkspaceMap::default())
            .unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["id"], "asset-77");
    }

    #[test]
    fn test_page_from_skip() {
        let page = Page::from_skip(comments(2), 0, 2, Some(5));
        assert_eq!(page.next, Some(Cursor::Skip(2)));

        let last = Page::from_skip(comments(1), 4, 2, Some(5));
        assert_eq!(last.next, None);

        let unknown_total = Page::from_skip(comments(2), 0, 2, None);
        assert_eq!(unknown_total.next, Some(Cursor::Skip(2)));

        let short = Page::from_skip(comments(1), 0, 2, None);
        assert_eq!(short.next, None);
    }

    fn token_pages() -> Vec<Page> {
        vec![
            Page::from_token(comments(2), Some("t1".into()), Some(3)),
            Page::from_token(vec![json!({"id": "C9"})], None, Some(3)),
        ]
    }

    #[tokio::test]
    async fn test_paged_json_follows_all_cursors() {
        let mut pages = token_pages().into_iter();
        let mut seen = Vec::new();
        let mut out = Vec::new();
        let opts = ListOptions::new(OutputFormat::Json, 2).unwrap();
        render_paged(
            &mut out,
            ResourceKind::Comment,
            &opts,
            &WorkspaceMap::default(),
            &Forbidden,
            |cursor, _take| {
                seen.push(Cursor::token(&cursor));
                let page = pages.next().unwrap_or_default();
                async move { Ok(page) }
            },
        )
        .await
        .unwrap();

        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(seen, vec![None, Some("t1".to_string())]);
    }

    #[tokio::test]
    async fn test_paged_table_stops_when_declined() {
        let mut pages = token_pages().into_iter();
        let mut calls = 0;
        let mut out = Vec::new();
        let opts = ListOptions::new(OutputFormat::Table, 2).unwrap();
        render_paged(
            &mut out,
            ResourceKind::Comment,
            &opts,
            &WorkspaceMap::default(),
            &AlwaysNo,
            |_cursor, _take| {
                calls += 1;
                let page = pages.next().unwrap_or_default();
                async move { Ok(page) }
            },
        )
        .await
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(calls, 1);
        assert!(text.contains("Showing 2 of 3 comments."));
        assert!(!text.contains("C9"));
    }

    #[tokio::test]
    async fn test_paged_json_stops_on_repeated_token() {
        let mut calls = 0;
        let mut out = Vec::new();
        let opts = ListOptions::new(OutputFormat::Json, 1).unwrap();
        render_paged(
            &mut out,
            ResourceKind::Comment,
            &opts,
            &WorkspaceMap::default(),
            &Forbidden,
            |_cursor, _take| {
                calls += 1;
                let page = Page::from_token(vec![json!({"id": "C1"})], Some("same".into()), None);
                async move { Ok(page) }
            },
        )
        .await
        .unwrap();

        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(calls, 2);
        assert_eq!(parsed.len(), 2);
    }

    #[tokio::test]
    async fn test_paged_table_empty() {
        let mut out = Vec::new();
        let opts = ListOptions::new(OutputFormat::Table, 2).unwrap();
        render_paged(
            &mut out,
            ResourceKind::Asset,
            &opts,
            &WorkspaceMap::default(),
            &Forbidden,
            |_cursor, _take| async { Ok(Page::default()) },
        )
        .await
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "No assets found.");
    }
}
