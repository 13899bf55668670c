//! Input-file parser toolkit — reusable primitives checkers use to extract
//! data from report and log files.
//!
//! Covers the recurring parsing shapes of design-review reports:
//!
//! - first-hit pattern matching with file-path extraction
//! - all-hits keyword scans with context lines
//! - numeric metric extraction
//! - file-reference extraction (`.lef`, `.rpt`, …)
//! - section-based parsing (content between markers)
//! - command-block extraction with `-flag value` parameters
//! - pattern counting, simple list extraction, multi-stage chain walking
//!
//! All readers tolerate non-UTF-8 bytes via lossy decoding, so a stray byte
//! in a vendor report never aborts a scan.

use std::collections::BTreeMap;
use std::path::Path;

use memchr::memmem;
use regex::{Regex, RegexBuilder};

/// Errors from the parser toolkit.
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    /// Failed to read an input file.
    #[error("Failed to read '{0}': {1}")]
    Read(String, #[source] std::io::Error),

    /// A caller-supplied regex failed to compile.
    #[error("Invalid pattern '{0}': {1}")]
    Pattern(String, #[source] regex::Error),
}

/// Location metadata for a single matched line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineHit {
    /// 1-based line number of the match.
    pub line_number: u32,
    /// Path of the scanned file (display form).
    pub file_path: String,
    /// Trimmed content of the matching line.
    pub line_content: String,
    /// File path extracted from the line, when requested and found.
    pub extracted_path: Option<String>,
}

/// Result of [`parse_log_with_patterns`].
#[derive(Debug, Clone, Default)]
pub struct PatternScan {
    /// First hit per pattern name.
    pub found: BTreeMap<String, LineHit>,
    /// Required names with no hit, in request order.
    pub missing: Vec<String>,
}

/// One keyword hit with optional surrounding context.
#[derive(Debug, Clone)]
pub struct KeywordHit {
    /// 1-based line number of the match.
    pub line_number: u32,
    /// Trimmed content of the matching line.
    pub line_content: String,
    /// Up to `context_lines` lines preceding the match.
    pub context_before: Vec<String>,
    /// Up to `context_lines` lines following the match.
    pub context_after: Vec<String>,
}

/// Result of [`parse_log_with_keywords`].
#[derive(Debug, Clone, Default)]
pub struct KeywordScan {
    /// All hits per keyword.
    pub matches: BTreeMap<String, Vec<KeywordHit>>,
    /// Total hit count across keywords.
    pub total_matches: usize,
}

/// An extracted metric value: numeric when it parses, textual otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// The captured text parsed as a number.
    Number(f64),
    /// The captured text verbatim.
    Text(String),
}

/// One extracted metric with its source line.
#[derive(Debug, Clone)]
pub struct MetricHit {
    /// Coerced value of the first capture group.
    pub value: MetricValue,
    /// 1-based line number of the match.
    pub line_number: u32,
    /// Trimmed content of the matching line.
    pub line_content: String,
}

/// Result of [`extract_metrics_from_log`].
#[derive(Debug, Clone, Default)]
pub struct MetricScan {
    /// First hit per metric name.
    pub metrics: BTreeMap<String, MetricHit>,
    /// Metric names with no hit.
    pub missing: Vec<String>,
}

/// Result of [`extract_file_references`].
#[derive(Debug, Clone, Default)]
pub struct FileRefScan {
    /// Unique references in first-seen order.
    pub files: Vec<String>,
    /// Per-reference location metadata.
    pub metadata: BTreeMap<String, LineHit>,
}

/// Result of [`parse_section`].
#[derive(Debug, Clone, Default)]
pub struct SectionScan {
    /// Whether the start marker was seen at all.
    pub found: bool,
    /// Unique extracted tokens in first-seen order.
    pub items: Vec<String>,
    /// Per-token location metadata.
    pub metadata: BTreeMap<String, LineHit>,
    /// 1-based line of the start marker.
    pub section_start: Option<u32>,
    /// 1-based line of the end marker (or the last line scanned).
    pub section_end: u32,
    /// Captured section text, start line included, end marker excluded.
    pub content: String,
}

/// One extracted command block.
#[derive(Debug, Clone)]
pub struct CommandBlock {
    /// Raw block text, trimmed.
    pub content: String,
    /// 1-based line of the opening command token (0 when unresolvable).
    pub line_start: u32,
    /// Requested `-flag value` parameters present in the block.
    pub params: BTreeMap<String, String>,
}

/// One stage of a [`extract_chain`] walk.
#[derive(Debug, Clone)]
pub struct ChainStage {
    /// Command whose blocks are searched at this stage.
    pub in_command: String,
    /// Parameter that must equal the current chain value.
    pub match_param: String,
    /// Parameter whose value becomes the next chain value.
    pub extract_param: String,
}

/// Result of [`count_pattern`].
#[derive(Debug, Clone, Default)]
pub struct PatternCount {
    /// Number of lines matching the pattern.
    pub count: usize,
    /// Matching lines, when requested.
    pub matches: Vec<LineHit>,
}

/// Extensions recognized when sniffing bare file tokens out of log lines.
const KNOWN_REPORT_EXTENSIONS: &str = "rpt|log|tarpt|gz|yaml|json|txt|csv";

/// Read a file as lines, replacing invalid UTF-8 sequences.
///
/// # Errors
///
/// Returns [`ParserError::Read`] when the file cannot be read.
pub fn read_lossy_lines(path: &Path) -> Result<Vec<String>, ParserError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ParserError::Read(path.display().to_string(), e))?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_owned)
        .collect())
}

/// Compile a caller-supplied pattern with the requested case sensitivity.
fn compile(pattern: &str, case_sensitive: bool) -> Result<Regex, ParserError> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| ParserError::Pattern(pattern.to_owned(), e))
}

/// First-hit scan of a log file for named regex patterns.
///
/// `required` defaults to every pattern name; names absent from the file are
/// reported in `missing`. With `extract_paths`, each hit also attempts to
/// pull a file path out of the matching line (see
/// [`extract_file_path_from_line`]).
///
/// # Errors
///
/// Returns an error when the file cannot be read or a pattern is invalid.
pub fn parse_log_with_patterns(
    file: &Path,
    patterns: &[(&str, &str)],
    required: Option<&[&str]>,
    extract_paths: bool,
    case_sensitive: bool,
) -> Result<PatternScan, ParserError> {
    let lines = read_lossy_lines(file)?;

    let compiled: Vec<(&str, Regex)> = patterns
        .iter()
        .map(|(name, pattern)| compile(pattern, case_sensitive).map(|re| (*name, re)))
        .collect::<Result<_, _>>()?;

    let mut found: BTreeMap<String, LineHit> = BTreeMap::new();

    for (idx, line) in lines.iter().enumerate() {
        for (name, re) in &compiled {
            if found.contains_key(*name) {
                continue;
            }
            if re.is_match(line) {
                let extracted_path = if extract_paths {
                    extract_file_path_from_line(line)
                } else {
                    None
                };
                found.insert(
                    (*name).to_owned(),
                    LineHit {
                        line_number: (idx + 1) as u32,
                        file_path: file.display().to_string(),
                        line_content: line.trim().to_owned(),
                        extracted_path,
                    },
                );
            }
        }
    }

    let required: Vec<&str> = match required {
        Some(names) => names.to_vec(),
        None => patterns.iter().map(|(name, _)| *name).collect(),
    };
    let missing = required
        .iter()
        .filter(|name| !found.contains_key(**name))
        .map(|name| (*name).to_owned())
        .collect();

    Ok(PatternScan { found, missing })
}

/// Extract a file path from a log line.
///
/// Heuristics, in order: the token after `>`; the token after `:` when it
/// looks like a path; a quoted token with an extension; a bare token with a
/// known report extension.
#[must_use]
pub fn extract_file_path_from_line(line: &str) -> Option<String> {
    let line = line.trim();

    // After '>' (redirection-style report writes).
    if let Some(pos) = line.rfind('>') {
        let path = line[pos + 1..].trim().trim_matches(['"', '\'']);
        if !path.is_empty() {
            return Some(path.to_owned());
        }
    }

    // After the first ':' when the remainder looks like a path.
    if let Some(pos) = line.find(':') {
        let rest = line[pos + 1..].trim();
        if rest.contains('/') || rest.contains('\\') {
            let token = rest.split_whitespace().next().unwrap_or(rest);
            let token = token.trim_matches(['"', '\'']);
            if looks_like_file_path(token) {
                return Some(token.to_owned());
            }
        }
    }

    // Quoted token with an extension.
    let quoted = Regex::new(r#"["']([^"']+\.[A-Za-z]+)["']"#).expect("static regex");
    if let Some(cap) = quoted.captures(line) {
        return Some(cap[1].to_owned());
    }

    // Bare token with a known report extension.
    let bare = RegexBuilder::new(&format!(r"(\S+\.(?:{KNOWN_REPORT_EXTENSIONS}))"))
        .case_insensitive(true)
        .build()
        .expect("static regex");
    bare.captures(line).map(|cap| cap[1].to_owned())
}

/// Whether a token plausibly names a file.
fn looks_like_file_path(text: &str) -> bool {
    if !text.contains('/') && !text.contains('\\') {
        return false;
    }
    let lower = text.to_lowercase();
    if KNOWN_REPORT_EXTENSIONS
        .split('|')
        .any(|ext| lower.ends_with(&format!(".{ext}")))
    {
        return true;
    }
    text.replace('\\', "/").split('/').count() > 1
}

/// All-hits keyword scan with optional context lines.
///
/// Keywords are matched as substrings; the case-insensitive path lowercases
/// both sides and searches with `memchr`.
///
/// # Errors
///
/// Returns an error when the file cannot be read.
pub fn parse_log_with_keywords(
    file: &Path,
    keywords: &[&str],
    context_lines: usize,
    case_sensitive: bool,
) -> Result<KeywordScan, ParserError> {
    let lines = read_lossy_lines(file)?;

    let mut matches: BTreeMap<String, Vec<KeywordHit>> = keywords
        .iter()
        .map(|kw| ((*kw).to_owned(), Vec::new()))
        .collect();
    let mut total_matches = 0;

    for (idx, line) in lines.iter().enumerate() {
        let haystack = if case_sensitive {
            line.clone()
        } else {
            line.to_lowercase()
        };

        for keyword in keywords {
            let needle = if case_sensitive {
                (*keyword).to_owned()
            } else {
                keyword.to_lowercase()
            };
            if memmem::find(haystack.as_bytes(), needle.as_bytes()).is_none() {
                continue;
            }

            let (context_before, context_after) = if context_lines > 0 {
                let start = idx.saturating_sub(context_lines);
                let end = (idx + 1 + context_lines).min(lines.len());
                (lines[start..idx].to_vec(), lines[idx + 1..end].to_vec())
            } else {
                (Vec::new(), Vec::new())
            };

            matches
                .get_mut(*keyword)
                .expect("keyword pre-registered")
                .push(KeywordHit {
                    line_number: (idx + 1) as u32,
                    line_content: line.trim().to_owned(),
                    context_before,
                    context_after,
                });
            total_matches += 1;
        }
    }

    Ok(KeywordScan {
        matches,
        total_matches,
    })
}

/// First-hit extraction of named numeric metrics.
///
/// Each pattern must carry one capture group; the captured text is coerced
/// to `f64` when it parses.
///
/// # Errors
///
/// Returns an error when the file cannot be read or a pattern is invalid.
pub fn extract_metrics_from_log(
    file: &Path,
    metric_patterns: &[(&str, &str)],
) -> Result<MetricScan, ParserError> {
    let lines = read_lossy_lines(file)?;

    let compiled: Vec<(&str, Regex)> = metric_patterns
        .iter()
        .map(|(name, pattern)| compile(pattern, false).map(|re| (*name, re)))
        .collect::<Result<_, _>>()?;

    let mut metrics: BTreeMap<String, MetricHit> = BTreeMap::new();

    for (idx, line) in lines.iter().enumerate() {
        for (name, re) in &compiled {
            if metrics.contains_key(*name) {
                continue;
            }
            if let Some(cap) = re.captures(line) {
                let raw = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
                let value = raw
                    .parse::<f64>()
                    .map(MetricValue::Number)
                    .unwrap_or_else(|_| MetricValue::Text(raw.to_owned()));
                metrics.insert(
                    (*name).to_owned(),
                    MetricHit {
                        value,
                        line_number: (idx + 1) as u32,
                        line_content: line.trim().to_owned(),
                    },
                );
            }
        }
    }

    let missing = metric_patterns
        .iter()
        .filter(|(name, _)| !metrics.contains_key(*name))
        .map(|(name, _)| (*name).to_owned())
        .collect();

    Ok(MetricScan { metrics, missing })
}

/// Extract unique file references (by extension list or custom pattern) in
/// first-seen order.
///
/// # Errors
///
/// Returns an error when the file cannot be read or the pattern is invalid.
pub fn extract_file_references(
    file: &Path,
    extensions: Option<&[&str]>,
    custom_pattern: Option<&str>,
) -> Result<FileRefScan, ParserError> {
    let lines = read_lossy_lines(file)?;

    let pattern = if let Some(custom) = custom_pattern {
        custom.to_owned()
    } else if let Some(exts) = extensions {
        let ext_list = exts
            .iter()
            .map(|ext| regex::escape(ext.trim_start_matches('.')))
            .collect::<Vec<_>>()
            .join("|");
        format!(r"([A-Za-z0-9._/\\-]+\.(?:{ext_list}))")
    } else {
        r"([A-Za-z0-9._/\\-]+\.[a-z]{2,5})".to_owned()
    };
    let re = compile(&pattern, false)?;

    let mut scan = FileRefScan::default();

    for (idx, line) in lines.iter().enumerate() {
        for cap in re.captures_iter(line) {
            let Some(m) = cap.get(1).or_else(|| cap.get(0)) else {
                continue;
            };
            let reference = m
                .as_str()
                .trim_matches(['[', ']', '(', ')', '{', '}', '"', ',', ';'])
                .to_owned();
            if reference.is_empty() || scan.metadata.contains_key(&reference) {
                continue;
            }
            scan.files.push(reference.clone());
            scan.metadata.insert(
                reference,
                LineHit {
                    line_number: (idx + 1) as u32,
                    file_path: file.display().to_string(),
                    line_content: line.trim().to_owned(),
                    extracted_path: None,
                },
            );
        }
    }

    Ok(scan)
}

/// Capture content between markers, optionally extracting one unique token
/// per `item_pattern` match.
///
/// The start line is included in the captured content; the end-marker line
/// terminates the section and is excluded from item extraction.
///
/// # Errors
///
/// Returns an error when the file cannot be read or a pattern is invalid.
pub fn parse_section(
    file: &Path,
    start_marker: &str,
    end_marker: Option<&str>,
    item_pattern: Option<&str>,
    stop_on_empty_line: bool,
    case_sensitive: bool,
) -> Result<SectionScan, ParserError> {
    let lines = read_lossy_lines(file)?;

    let start_re = compile(start_marker, case_sensitive)?;
    let end_re = end_marker
        .map(|m| compile(m, case_sensitive))
        .transpose()?;
    let item_re = item_pattern
        .map(|p| compile(p, case_sensitive))
        .transpose()?;

    let mut scan = SectionScan::default();
    let mut in_section = false;
    let mut section_lines: Vec<&str> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let line_number = (idx + 1) as u32;

        if !in_section {
            if start_re.is_match(line) {
                in_section = true;
                scan.found = true;
                scan.section_start = Some(line_number);
                section_lines.push(line);
            }
            continue;
        }

        if let Some(end_re) = &end_re {
            if end_re.is_match(line) {
                scan.section_end = line_number;
                break;
            }
        }

        if stop_on_empty_line && line.trim().is_empty() {
            scan.section_end = line_number;
            break;
        }

        section_lines.push(line);

        if let Some(item_re) = &item_re {
            for cap in item_re.captures_iter(line) {
                let token = cap
                    .get(1)
                    .or_else(|| cap.get(0))
                    .map(|m| m.as_str().to_owned())
                    .unwrap_or_default();
                if token.is_empty() || scan.metadata.contains_key(&token) {
                    continue;
                }
                scan.items.push(token.clone());
                scan.metadata.insert(
                    token,
                    LineHit {
                        line_number,
                        file_path: file.display().to_string(),
                        line_content: line.trim().to_owned(),
                        extracted_path: None,
                    },
                );
            }
        }
    }

    if scan.section_end == 0 {
        scan.section_end = lines.len() as u32;
    }
    scan.content = section_lines.join("\n");

    Ok(scan)
}

/// Slice command blocks from a log: each block runs from the command token
/// to the next `block_delimiter` (default `@`), with requested `-flag value`
/// parameters extracted per block.
///
/// # Errors
///
/// Returns an error when the file cannot be read.
pub fn extract_command_blocks(
    file: &Path,
    command: &str,
    block_delimiter: char,
    extract_params: &[&str],
) -> Result<Vec<CommandBlock>, ParserError> {
    let lines = read_lossy_lines(file)?;
    let content = lines.join("\n");

    let block_pattern = format!(
        r"{}[^{}]*",
        regex::escape(command),
        regex::escape(&block_delimiter.to_string())
    );
    let block_re = compile(&block_pattern, false)?;

    let mut blocks = Vec::new();
    for m in block_re.find_iter(&content) {
        let block_content = m.as_str().trim().to_owned();

        let mut params = BTreeMap::new();
        for param in extract_params {
            let param_pattern = format!(r"{}\s+(\S+)", regex::escape(param));
            let param_re = compile(&param_pattern, true)?;
            if let Some(cap) = param_re.captures(&block_content) {
                params.insert((*param).to_owned(), cap[1].to_owned());
            }
        }

        let snippet: String = block_content.chars().take(50).collect();
        let first_line = snippet.lines().next().unwrap_or(&snippet).to_owned();
        let line_start = lines
            .iter()
            .position(|l| l.contains(&first_line))
            .map_or(0, |i| (i + 1) as u32);

        blocks.push(CommandBlock {
            content: block_content,
            line_start,
            params,
        });
    }

    Ok(blocks)
}

/// Count lines matching a pattern, optionally returning the matching lines.
///
/// # Errors
///
/// Returns an error when the file cannot be read or the pattern is invalid.
pub fn count_pattern(
    file: &Path,
    pattern: &str,
    case_sensitive: bool,
    return_matches: bool,
) -> Result<PatternCount, ParserError> {
    let lines = read_lossy_lines(file)?;
    let re = compile(pattern, case_sensitive)?;

    let mut result = PatternCount::default();
    for (idx, line) in lines.iter().enumerate() {
        if re.is_match(line) {
            result.count += 1;
            if return_matches {
                result.matches.push(LineHit {
                    line_number: (idx + 1) as u32,
                    file_path: file.display().to_string(),
                    line_content: line.trim().to_owned(),
                    extracted_path: None,
                });
            }
        }
    }

    Ok(result)
}

/// Extract one unique trimmed item per line, skipping blanks, lines matching
/// `skip_patterns`, and (when given) lines not matching `line_filter`.
///
/// # Errors
///
/// Returns an error when the file cannot be read or a pattern is invalid.
pub fn extract_simple_list(
    file: &Path,
    skip_patterns: &[&str],
    line_filter: Option<&str>,
) -> Result<FileRefScan, ParserError> {
    let lines = read_lossy_lines(file)?;

    let skip_res: Vec<Regex> = skip_patterns
        .iter()
        .map(|p| compile(p, false))
        .collect::<Result<_, _>>()?;
    let filter_re = line_filter.map(|p| compile(p, false)).transpose()?;

    let mut scan = FileRefScan::default();

    for (idx, line) in lines.iter().enumerate() {
        let item = line.trim();
        if item.is_empty() {
            continue;
        }
        if skip_res.iter().any(|re| re.is_match(item)) {
            continue;
        }
        if let Some(filter) = &filter_re {
            if !filter.is_match(item) {
                continue;
            }
        }
        if scan.metadata.contains_key(item) {
            continue;
        }
        scan.files.push(item.to_owned());
        scan.metadata.insert(
            item.to_owned(),
            LineHit {
                line_number: (idx + 1) as u32,
                file_path: file.display().to_string(),
                line_content: item.to_owned(),
                extracted_path: None,
            },
        );
    }

    Ok(scan)
}

/// Walk a chain of command-block stages, threading each initial value
/// through `match_param` → `extract_param` lookups.
///
/// Returns the initial values that advanced at least one stage, mapped to
/// their final resolved value (a simple fold over the stage list).
///
/// # Errors
///
/// Returns an error when a log file cannot be read.
pub fn extract_chain(
    log_files: &[&Path],
    stages: &[ChainStage],
    initial_values: &[&str],
) -> Result<BTreeMap<String, String>, ParserError> {
    let mut results = BTreeMap::new();

    for initial in initial_values {
        let mut current = (*initial).to_owned();

        'stages: for stage in stages {
            for file in log_files {
                let blocks = extract_command_blocks(
                    file,
                    &stage.in_command,
                    '@',
                    &[stage.match_param.as_str(), stage.extract_param.as_str()],
                )?;
                for block in &blocks {
                    if block.params.get(&stage.match_param) == Some(&current) {
                        if let Some(next) = block.params.get(&stage.extract_param) {
                            current = next.clone();
                            continue 'stages;
                        }
                    }
                }
            }
            // Chain broken: no block matched this stage.
            break;
        }

        if current != *initial {
            results.insert((*initial).to_owned(), current);
        }
    }

    Ok(results)
}

/// Canonicalize command whitespace: strip space inside braces and collapse
/// runs of whitespace.
#[must_use]
pub fn normalize_command(cmd: &str) -> String {
    let open = Regex::new(r"\{\s+").expect("static regex");
    let close = Regex::new(r"\s+\}").expect("static regex");
    let spaces = Regex::new(r"\s+").expect("static regex");

    let normalized = open.replace_all(cmd, "{");
    let normalized = close.replace_all(&normalized, "}");
    spaces.replace_all(&normalized, " ").trim().to_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
