use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use scraper::Html;
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref FENCE_RE: Regex = Regex::new(r"(?s)```.*?```").expect("valid regex");
    static ref PRE_RE: Regex = Regex::new(r"(?is)<pre\b.*?</pre\s*>").expect("valid regex");
    static ref PRE_OPEN_RE: Regex = Regex::new(r"(?i)<pre\b").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Normalize a rendered documentation page into searchable tokens.
///
/// Code regions (fenced blocks and `<pre>` elements) are removed first, then
/// remaining markup is stripped and entities decoded, then the text goes
/// through the word pipeline: lowercase, stopword removal, edge punctuation
/// trim, stemming. Duplicates are retained so occurrence counts survive into
/// the index. Malformed markup degrades to over- or under-stripping, never a
/// panic.
pub fn normalize(raw: &str) -> Vec<String> {
    let text = strip_markup(&strip_code_blocks(raw));
    tokenize_words(&text)
}

/// Normalize free query text with the same word pipeline as [`normalize`],
/// minus the markup stripping, plus first-occurrence deduplication.
pub fn normalize_query(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize_words(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Remove fenced code blocks and `<pre>` regions. An unterminated opener
/// strips to end-of-text.
fn strip_code_blocks(text: &str) -> String {
    let defenced = FENCE_RE.replace_all(text, " ");
    let stripped = PRE_RE.replace_all(defenced.as_ref(), " ");
    let fence_open = stripped.find("```");
    let pre_open = PRE_OPEN_RE.find(stripped.as_ref()).map(|m| m.start());
    let cut = match (fence_open, pre_open) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    match cut {
        Some(i) => stripped[..i].to_string(),
        None => stripped.into_owned(),
    }
}

/// Strip tags and decode entities, keeping only text content. Script and
/// style bodies are not searchable text.
fn strip_markup(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut out = String::new();
    for node in doc.tree.root().descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let skip = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map_or(false, |e| matches!(e.name(), "script" | "style" | "noscript" | "pre"))
        });
        if !skip {
            out.push_str(text);
            out.push(' ');
        }
    }
    out
}

fn tokenize_words(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str();
        if is_stopword(token) { continue; }
        let trimmed = token.trim_matches(|c: char| !c.is_alphanumeric());
        if trimmed.is_empty() { continue; }
        tokens.push(STEMMER.stem(trimmed).to_string());
    }
    tokens
}
