//! Validation of command-line options that the parser cannot express on its own.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Illegal usage: '{option}' is mutually exclusive with '{other}'")]
    MutuallyExclusive { option: String, other: String },

    #[error("Missing option '{option}' (or one of {alternatives})")]
    MissingRequired { option: String, alternatives: String },
}

/// An option that is required unless one of `not_required_if` is supplied,
/// and that may never be combined with any of them.
#[derive(Debug, Clone)]
pub struct ExclusiveOption {
    pub name: &'static str,
    pub not_required_if: &'static [&'static str],
}

impl ExclusiveOption {
    pub fn check(&self, supplied: &[&str]) -> Result<(), UsageError> {
        let current = supplied.contains(&self.name);

        if let Some(other) = self
            .not_required_if
            .iter()
            .find(|other| supplied.contains(*other))
        {
            return if current {
                Err(UsageError::MutuallyExclusive {
                    option: self.name.to_string(),
                    other: other.to_string(),
                })
            } else {
                Ok(())
            };
        }

        if current {
            Ok(())
        } else {
            Err(UsageError::MissingRequired {
                option: self.name.to_string(),
                alternatives: self.alternatives(),
            })
        }
    }

    /// Text appended to the option's help, e.g. `Mutually exclusive with [anonymous]`.
    pub fn help_suffix(&self) -> String {
        format!("Mutually exclusive with {}", self.alternatives())
    }

    fn alternatives(&self) -> String {
        format!("[{}]", self.not_required_if.join(", "))
    }
}

pub const TOKEN_OPTION: ExclusiveOption = ExclusiveOption {
    name: "token",
    not_required_if: &["anonymous"],
};

/// Authentication choices after parsing, before validation.
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    /// Token given on the command line.
    pub token: Option<String>,
    /// Token from the environment, used only when nothing was given explicitly.
    pub env_token: Option<String>,
    pub anonymous: bool,
}

impl AuthOptions {
    /// Resolves to the token to authenticate with, or `None` for anonymous access.
    pub fn validate(self) -> Result<Option<String>, UsageError> {
        let token = if self.anonymous {
            self.token
        } else {
            self.token.or(self.env_token)
        };

        let mut supplied = Vec::new();
        if token.is_some() {
            supplied.push("token");
        }
        if self.anonymous {
            supplied.push("anonymous");
        }

        TOKEN_OPTION.check(&supplied)?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_rule() {
        assert_eq!(TOKEN_OPTION.check(&["token"]), Ok(()));
        assert_eq!(TOKEN_OPTION.check(&["anonymous"]), Ok(()));
        assert_eq!(
            TOKEN_OPTION.check(&["token", "anonymous"]),
            Err(UsageError::MutuallyExclusive {
                option: "token".to_string(),
                other: "anonymous".to_string()
            })
        );
        assert!(matches!(
            TOKEN_OPTION.check(&[]),
            Err(UsageError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_help_suffix() {
        let rule = ExclusiveOption {
            name: "repo",
            not_required_if: &["org", "user"],
        };
        assert_eq!(rule.help_suffix(), "Mutually exclusive with [org, user]");
    }

    #[test]
    fn test_env_token_fills_in() {
        let opts = AuthOptions {
            env_token: Some("from-env".to_string()),
            ..Default::default()
        };
        assert_eq!(opts.validate(), Ok(Some("from-env".to_string())));
    }

    #[test]
    fn test_anonymous_ignores_env_token() {
        let opts = AuthOptions {
            env_token: Some("from-env".to_string()),
            anonymous: true,
            ..Default::default()
        };
        assert_eq!(opts.validate(), Ok(None));
    }

    #[test]
    fn test_explicit_token_with_anonymous_is_rejected() {
        let opts = AuthOptions {
            token: Some("t".to_string()),
            anonymous: true,
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(UsageError::MutuallyExclusive { .. })
        ));
    }

    #[test]
    fn test_nothing_supplied() {
        assert!(matches!(
            AuthOptions::default().validate(),
            Err(UsageError::MissingRequired { .. })
        ));
    }
}
