//! Kerberos principal names
//!
//! Parses the `primary[/instance...][@REALM]` text form, honouring the
//! backslash escapes `\/`, `\@` and `\\`. A name that does not parse is a
//! precondition failure: it means the run was configured with an identity
//! or service that can never be authenticated.

use std::fmt;

use crate::error::{BenchError, Result};

/// A parsed principal name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    components: Vec<String>,
    realm: Option<String>,
}

impl Principal {
    /// Parse a principal from its text form
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(invalid(text, "empty name"));
        }

        let mut components = Vec::new();
        let mut current = String::new();
        let mut in_realm = false;
        let mut chars = text.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => return Err(invalid(text, "trailing escape")),
                },
                '/' if !in_realm => {
                    if current.is_empty() {
                        return Err(invalid(text, "empty component"));
                    }
                    components.push(std::mem::take(&mut current));
                }
                '@' if !in_realm => {
                    if current.is_empty() {
                        return Err(invalid(text, "empty component"));
                    }
                    components.push(std::mem::take(&mut current));
                    in_realm = true;
                }
                '@' => return Err(invalid(text, "unescaped '@' in realm")),
                _ => current.push(c),
            }
        }

        let realm = if in_realm {
            if current.is_empty() {
                return Err(invalid(text, "empty realm"));
            }
            Some(current)
        } else {
            if current.is_empty() {
                return Err(invalid(text, "empty component"));
            }
            components.push(current);
            None
        };

        Ok(Self { components, realm })
    }

    /// Name components (primary first)
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Realm, if one was given
    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }
}

fn invalid(text: &str, reason: &str) -> BenchError {
    BenchError::Precondition(format!("cannot parse principal '{}': {}", text, reason))
}

fn write_escaped(f: &mut fmt::Formatter<'_>, part: &str) -> fmt::Result {
    for c in part.chars() {
        if matches!(c, '/' | '@' | '\\') {
            write!(f, "\\")?;
        }
        write!(f, "{}", c)?;
    }
    Ok(())
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write_escaped(f, component)?;
        }
        if let Some(realm) = &self.realm {
            write!(f, "@")?;
            write_escaped(f, realm)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Principal {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
