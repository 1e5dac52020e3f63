use crate::context::AppContext;
use crate::format::{self, Formattable};
use libskiff::Reference;
use serde::Serialize;

/// How a reference resolves after defaults and rewrites
#[derive(Debug, Serialize, PartialEq)]
pub struct ParsedReference {
    pub reference: String,
    pub registry: String,
    pub repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub insecure: bool,
    pub manifest_url: String,
}

impl From<&Reference> for ParsedReference {
    fn from(reference: &Reference) -> Self {
        Self {
            reference: reference.to_string(),
            registry: reference.registry().host().to_string(),
            repository: reference.repository().qualified_name(),
            tag: reference.tag().map(str::to_string),
            digest: reference.digest().map(str::to_string),
            insecure: reference.registry().insecure(),
            manifest_url: reference.manifest_url(),
        }
    }
}

impl Formattable for ParsedReference {
    fn format_pretty(&self) -> String {
        let mut output = format!(
            "Reference:  {}\nRegistry:   {}\nRepository: {}\n",
            self.reference, self.registry, self.repository
        );
        if let Some(tag) = &self.tag {
            output.push_str(&format!("Tag:        {}\n", tag));
        }
        if let Some(digest) = &self.digest {
            output.push_str(&format!("Digest:     {}\n", digest));
        }
        output.push_str(&format!(
            "Scheme:     {}\nURL:        {}\n",
            if self.insecure { "http" } else { "https" },
            self.manifest_url
        ));
        output
    }
}

/// Parse a reference with the configured defaults
pub fn parse_reference(ctx: &AppContext, reference: &str) -> Result<ParsedReference, String> {
    let options = ctx.config.parse_options();
    Reference::parse(reference, &options)
        .map(|r| ParsedReference::from(&r))
        .map_err(|e| format!("Invalid image reference '{}': {}", reference, e))
}

/// Handle the parse command
pub fn handle_parse(ctx: &AppContext, reference: &str) {
    match parse_reference(ctx, reference) {
        Ok(parsed) => format::print_output(&parsed, ctx.format),
        Err(e) => {
            format::error(&e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
