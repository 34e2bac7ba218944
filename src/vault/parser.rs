use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use regex::Regex;
use yaml_rust::{Yaml, YamlLoader};

use crate::logger::Logger;

/// Parses Obsidian-flavored markdown: front-matter, wiki-links, tags, and
/// the cleaning pass applied before chunking.
pub struct MarkdownParser {
    logger: Logger,
    wikilink_regex: Regex,
    alias_link_regex: Regex,
    tag_regex: Regex,
    comment_regex: Regex,
    newline_regex: Regex,
}

impl MarkdownParser {
    pub fn new() -> Result<Self> {
        let wikilink_regex = Regex::new(r"\[\[([^\]]+)\]\]")?;
        let alias_link_regex = Regex::new(r"\[\[([^\]|]+)\|([^\]]+)\]\]")?;
        let tag_regex = Regex::new(r"#(\w+)")?;
        let comment_regex = Regex::new(r"(?s)%%.*?%%")?;
        let newline_regex = Regex::new(r"\n{3,}")?;

        Ok(Self {
            logger: Logger::new("MarkdownParser"),
            wikilink_regex,
            alias_link_regex,
            tag_regex,
            comment_regex,
            newline_regex,
        })
    }

    /// Splits a leading `---` front-matter block from the body.
    ///
    /// A missing closing delimiter means the file has no front-matter and
    /// the whole content is treated as body.
    pub fn split_front_matter(
        &self,
        content: &str,
    ) -> (HashMap<String, serde_json::Value>, String) {
        if !content.starts_with("---") {
            return (HashMap::new(), content.to_string());
        }

        let mut lines = content.lines();
        lines.next(); // opening "---"

        let mut yaml_content = String::new();
        let mut found_end = false;
        let mut line_count = 1;

        for line in lines {
            line_count += 1;
            if line.trim() == "---" {
                found_end = true;
                break;
            }
            yaml_content.push_str(line);
            yaml_content.push('\n');
        }

        if !found_end {
            return (HashMap::new(), content.to_string());
        }

        let body = content
            .lines()
            .skip(line_count)
            .collect::<Vec<_>>()
            .join("\n");

        match self.parse_yaml_mapping(&yaml_content) {
            Ok(fields) => (fields, body),
            Err(e) => {
                self.logger.warn(&format!("Ignoring unparseable front-matter: {}", e));
                (HashMap::new(), body)
            }
        }
    }

    fn parse_yaml_mapping(&self, yaml_content: &str) -> Result<HashMap<String, serde_json::Value>> {
        let docs = YamlLoader::load_from_str(yaml_content)?;
        let yaml = docs.first().cloned().unwrap_or(Yaml::Null);

        let mut fields = HashMap::new();
        if let Yaml::Hash(hash) = yaml {
            for (key, value) in hash {
                if let Yaml::String(key_str) = key {
                    fields.insert(key_str, yaml_to_json(&value));
                }
            }
        }
        Ok(fields)
    }

    /// Extracts `[[target]]` / `[[target|alias]]` link targets, alias
    /// stripped, deduplicated.
    pub fn extract_links(&self, text: &str) -> BTreeSet<String> {
        self.wikilink_regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1))
            .map(|m| {
                m.as_str()
                    .split('|')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    /// Extracts `#tag` tokens (alphanumeric/underscore runs), deduplicated.
    ///
    /// Also matches inside URLs and code blocks; not filtered.
    pub fn extract_tags(&self, text: &str) -> BTreeSet<String> {
        self.tag_regex
            .captures_iter(text)
            .filter_map(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Cleans markdown for indexing: drops `%%...%%` comment blocks, unwraps
    /// wiki-link syntax to its visible text, collapses 3+ newlines to 2,
    /// trims. Passes repeat until the text stops changing, so nested link
    /// syntax unwraps fully and cleaning a cleaned text is a no-op.
    pub fn clean(&self, text: &str) -> String {
        let mut text = text.to_string();
        loop {
            let pass = self.clean_pass(&text);
            if pass == text {
                return pass;
            }
            text = pass;
        }
    }

    // Every rewrite strictly shortens the text, so the fixpoint loop in
    // `clean` terminates.
    fn clean_pass(&self, text: &str) -> String {
        let text = self.comment_regex.replace_all(text, "");
        let text = self.alias_link_regex.replace_all(&text, "$2");
        let text = self.wikilink_regex.replace_all(&text, "$1");
        let text = self.newline_regex.replace_all(&text, "\n\n");
        text.trim().to_string()
    }
}

fn yaml_to_json(yaml: &Yaml) -> serde_json::Value {
    match yaml {
        Yaml::String(s) => serde_json::Value::String(s.clone()),
        Yaml::Integer(i) => serde_json::Value::Number((*i).into()),
        Yaml::Real(r) => r
            .parse::<f64>()
            .ok()
            .and_then(|f| serde_json::Number::from_f64(f))
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(r.clone())),
        Yaml::Boolean(b) => serde_json::Value::Bool(*b),
        Yaml::Array(arr) => serde_json::Value::Array(arr.iter().map(yaml_to_json).collect()),
        Yaml::Hash(hash) => {
            let mut obj = serde_json::Map::new();
            for (key, value) in hash {
                if let Yaml::String(key_str) = key {
                    obj.insert(key_str.clone(), yaml_to_json(value));
                }
            }
            serde_json::Value::Object(obj)
        }
        Yaml::Null => serde_json::Value::Null,
        other => serde_json::Value::String(format!("{:?}", other)),
    }
}
