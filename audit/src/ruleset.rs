//! Ruleset document model.
//!
//! A ruleset is an XML document selecting which checks the engine applies:
//!
//! ```xml
//! <ruleset name="team-defaults">
//!     <rule key="line-length" severity="warning">
//!         <message>Line exceeds the configured limit</message>
//!     </rule>
//!     <rule key="missing-brace"/>
//! </ruleset>
//! ```
//!
//! Parsing is strict: an unexpected root element, a rule without a `key`,
//! or an unknown severity all reject the document. The invoker reports
//! rejection as a configuration error, never as an engine failure.

use gutter_types::AuditSeverity;

#[derive(Debug, thiserror::Error)]
pub enum RulesetParseError {
    #[error("invalid ruleset XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("expected <ruleset> root element, found <{found}>")]
    UnexpectedRoot { found: String },
    #[error("<rule> element is missing the required `key` attribute")]
    MissingRuleKey,
    #[error("unknown severity `{value}` on rule `{rule}`")]
    UnknownSeverity { value: String, rule: String },
}

/// One selected check, with optional per-rule overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    key: String,
    severity: Option<AuditSeverity>,
    message: Option<String>,
}

impl Rule {
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Severity override for this rule, if the ruleset sets one.
    #[must_use]
    pub fn severity(&self) -> Option<AuditSeverity> {
        self.severity
    }

    /// Message template override for this rule, if the ruleset sets one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// A parsed ruleset: the engine runs exactly the rules listed here, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ruleset {
    name: String,
    rules: Vec<Rule>,
}

impl Ruleset {
    /// Parse a ruleset from raw XML text.
    pub fn parse(content: &str) -> Result<Self, RulesetParseError> {
        let doc = roxmltree::Document::parse(content)?;
        let root = doc.root_element();
        if root.tag_name().name() != "ruleset" {
            return Err(RulesetParseError::UnexpectedRoot {
                found: root.tag_name().name().to_string(),
            });
        }

        let name = root.attribute("name").unwrap_or("unnamed").to_string();
        let mut rules = Vec::new();
        for node in root
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "rule")
        {
            let key = node
                .attribute("key")
                .ok_or(RulesetParseError::MissingRuleKey)?
                .to_string();

            let severity = match node.attribute("severity") {
                None => None,
                Some("error") => Some(AuditSeverity::Error),
                Some("warning") => Some(AuditSeverity::Warning),
                Some("info") => Some(AuditSeverity::Info),
                Some(other) => {
                    return Err(RulesetParseError::UnknownSeverity {
                        value: other.to_string(),
                        rule: key,
                    });
                }
            };

            let message = node
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == "message")
                .and_then(|n| n.text())
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty());

            rules.push(Rule {
                key,
                severity,
                message,
            });
        }

        Ok(Self { name, rules })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Look up a rule by key.
    #[must_use]
    pub fn rule(&self, key: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.key == key)
    }
}
