//! Documentation extraction from Doxygen XML records.
//!
//! Each XML file is one compilation unit's worth of `<memberdef>` records.
//! Extraction is lexical: the handful of elements we need are pulled out
//! with anchored patterns, tags are stripped, entities decoded. Full XML
//! parsing buys nothing here — the generator's output shape is stable.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::arity::count_args;
use crate::scan;

static RE_MEMBERDEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<memberdef[^>]*kind="function"[^>]*>(.*?)</memberdef>"#).unwrap()
});
static RE_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<definition>(.*?)</definition>").unwrap());
static RE_ARGSSTRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<argsstring>(.*?)</argsstring>").unwrap());
static RE_BRIEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<briefdescription>(.*?)</briefdescription>").unwrap());
static RE_DETAILED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<detaileddescription>(.*?)</detaileddescription>").unwrap());
static RE_FIRST_PARA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<para[^>]*>(.*?)</para>").unwrap());
/// Supplementary sections excluded from the descriptive text: parameter
/// tables and "see also"/"return"-style sections.
static RE_EXCLUDED_SECTIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<parameterlist.*?</parameterlist>|<simplesect.*?</simplesect>").unwrap()
});
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static RE_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x?[0-9a-fA-F]+|[a-z]+);").unwrap());

/// Mapping from qualified method name to arity to descriptive text.
///
/// Built once per run, immutable afterwards. `BTreeMap` keys make every
/// iteration-dependent decision (the lowest-arity fallback in particular)
/// deterministic.
#[derive(Debug, Default)]
pub struct DocIndex {
    entries: BTreeMap<String, BTreeMap<usize, String>>,
}

impl DocIndex {
    /// Register text for `(name, arity)`. First occurrence wins; returns
    /// false if the slot was already taken.
    pub fn insert_first(&mut self, name: &str, arity: usize, text: String) -> bool {
        let by_arity = self.entries.entry(name.to_string()).or_default();
        if by_arity.contains_key(&arity) {
            return false;
        }
        by_arity.insert(arity, text);
        true
    }

    /// Look up text for a call site: exact arity, then arity 0, then the
    /// lowest registered arity as a deterministic last resort.
    pub fn lookup(&self, name: &str, arity: usize) -> Option<&str> {
        let by_arity = self.entries.get(name)?;
        by_arity
            .get(&arity)
            .or_else(|| by_arity.get(&0))
            .or_else(|| by_arity.values().next())
            .map(String::as_str)
    }

    /// Total number of registered `(name, arity)` entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses Doxygen XML records for one target class into a [`DocIndex`].
pub struct DocExtractor {
    class: String,
    qualified: Regex,
}

impl DocExtractor {
    pub fn new(class: &str) -> Self {
        let qualified = Regex::new(&format!(r"\b{}::(\w+)", regex::escape(class))).unwrap();
        Self {
            class: class.to_string(),
            qualified,
        }
    }

    /// Read every `*.xml` record under `dir` (except the generator's
    /// `index.xml`) in sorted order and aggregate a [`DocIndex`].
    ///
    /// Best-effort: an unreadable or malformed record is logged and skipped;
    /// it never aborts the run.
    pub fn extract_dir(&self, dir: &Path) -> DocIndex {
        let pattern = dir.join("*.xml");
        let mut files: Vec<_> = glob::glob(&pattern.to_string_lossy())
            .into_iter()
            .flatten()
            .filter_map(|r| r.ok())
            .filter(|p| p.file_name().and_then(|n| n.to_str()) != Some("index.xml"))
            .collect();
        // Sorted order so duplicate (name, arity) records resolve the same
        // way regardless of file-system iteration order.
        files.sort();

        let mut index = DocIndex::default();
        for file in files {
            match std::fs::read_to_string(&file) {
                Ok(xml) => self.extract_record(&xml, &mut index),
                Err(e) => warn!("skipping unreadable record {}: {e}", file.display()),
            }
        }
        index
    }

    /// Pull every documented function of the target class out of one XML
    /// record and register it in `index` (first occurrence wins).
    pub fn extract_record(&self, xml: &str, index: &mut DocIndex) {
        for member in RE_MEMBERDEF.captures_iter(xml) {
            let block = &member[1];

            let Some(definition) = RE_DEFINITION.captures(block) else {
                continue;
            };
            // definition reads like "std::string Core::getVersionInfo"
            let Some(name) = self.qualified.captures(&definition[1]) else {
                continue; // not a method of the target class
            };
            let qualified = format!("{}::{}", self.class, &name[1]);

            let argsstring = RE_ARGSSTRING
                .captures(block)
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            let arity = self.record_arity(&qualified, &argsstring);

            let text = extract_text(block);
            if text.is_empty() {
                continue;
            }
            if !index.insert_first(&qualified, arity, text) {
                debug!("duplicate record for {qualified}/{arity} ignored");
            }
        }
    }

    /// Parameter count from an `<argsstring>` like
    /// `(const char *label, double ms) const`.
    fn record_arity(&self, qualified: &str, argsstring: &str) -> usize {
        let Some(open) = argsstring.find('(') else {
            return 0;
        };
        match scan::matching_delimiter(argsstring, open) {
            Ok(close) => count_args(&argsstring[open + 1..close]),
            Err(e) => {
                warn!("malformed argsstring for {qualified} ({e}); assuming no parameters");
                0
            }
        }
    }
}

/// Descriptive text for one record: the brief description plus the first
/// detailed paragraph (supplementary sections excluded), blank-line joined.
fn extract_text(block: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(brief) = RE_BRIEF.captures(block) {
        let text = plain_text(&brief[1]);
        if !text.is_empty() {
            parts.push(text);
        }
    }

    if let Some(detailed) = RE_DETAILED.captures(block) {
        // drop excluded subtrees first — they carry nested <para> elements
        // that would otherwise truncate the first-paragraph match
        let cleaned = RE_EXCLUDED_SECTIONS.replace_all(&detailed[1], " ");
        if let Some(para) = RE_FIRST_PARA.captures(&cleaned) {
            let text = plain_text(&para[1]);
            // single-word fragments are cross-reference debris, not prose
            if text.split_whitespace().count() > 3 {
                parts.push(text);
            }
        }
    }

    parts.join("\n\n")
}

/// Strip markup and decode entities, normalizing interior whitespace.
fn plain_text(fragment: &str) -> String {
    let no_tags = RE_TAG.replace_all(fragment, " ");
    let decoded = decode_entities(&no_tags);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    RE_ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            match &caps[1] {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                num => {
                    let parsed = if let Some(hex) = num.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = num.strip_prefix('#') {
                        dec.parse().ok()
                    } else {
                        None // unknown named entity, keep as written
                    };
                    match parsed.and_then(char::from_u32) {
                        Some(c) => c.to_string(),
                        None => caps[0].to_string(),
                    }
                }
            }
        })
        .into_owned()
}
