//! Mode extraction configuration

use anyhow::Context;

/// CLI-facing arguments; unset fields fall back to environment variables.
#[derive(Debug, Default)]
pub struct ModeArgs {
    pub organization: Option<String>,
    pub user_token: Option<String>,
    pub password_token: Option<String>,
}

/// Validated configuration. All three fields are required; missing any is a
/// fatal configuration error surfaced before any network call.
#[derive(Debug, Clone)]
pub struct ModeConfig {
    pub organization: String,
    pub user_token: String,
    pub password_token: String,
}

impl TryFrom<ModeArgs> for ModeConfig {
    type Error = anyhow::Error;

    fn try_from(args: ModeArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            organization: require(args.organization, "MODE_ORGANIZATION", "organization")?,
            user_token: require(args.user_token, "MODE_USER_TOKEN", "user token")?,
            password_token: require(args.password_token, "MODE_PASSWORD_TOKEN", "password token")?,
        })
    }
}

fn require(value: Option<String>, env_var: &str, what: &str) -> anyhow::Result<String> {
    let value = match value {
        Some(v) => v,
        None => std::env::var(env_var)
            .with_context(|| format!("Mode {what} required (flag or {env_var} env var)"))?,
    };
    anyhow::ensure!(!value.is_empty(), "Mode {what} must not be empty");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_args() -> ModeArgs {
        ModeArgs {
            organization: Some("acme".to_string()),
            user_token: Some("user".to_string()),
            password_token: Some("pass".to_string()),
        }
    }

    #[test]
    fn explicit_args_build_config() {
        let config = ModeConfig::try_from(full_args()).unwrap();
        assert_eq!(config.organization, "acme");
        assert_eq!(config.user_token, "user");
        assert_eq!(config.password_token, "pass");
    }

    #[test]
    fn missing_organization_is_fatal() {
        std::env::remove_var("MODE_ORGANIZATION");
        let args = ModeArgs {
            organization: None,
            ..full_args()
        };
        let err = ModeConfig::try_from(args).unwrap_err();
        assert!(format!("{err}").contains("organization required"));
    }

    #[test]
    fn empty_token_is_fatal() {
        let args = ModeArgs {
            user_token: Some(String::new()),
            ..full_args()
        };
        let err = ModeConfig::try_from(args).unwrap_err();
        assert!(format!("{err}").contains("must not be empty"));
    }
}
