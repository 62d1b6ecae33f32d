use crate::error::{WorkflowError, WorkflowResult};

pub const MIN_TEAM_SIZE: u32 = 2;
pub const MAX_TEAM_SIZE: u32 = 10;

/// Trims `value` and fails with `message` if nothing is left.
pub fn required(value: &str, message: &'static str) -> WorkflowResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(WorkflowError::validation(message))
    } else {
        Ok(value.to_owned())
    }
}

/// Counts characters, not bytes.
pub fn max_chars(value: &str, limit: usize, message: &'static str) -> WorkflowResult<()> {
    if value.chars().count() > limit {
        Err(WorkflowError::validation(message))
    } else {
        Ok(())
    }
}

pub fn email(value: &str) -> WorkflowResult<String> {
    let value = required(value, "Please provide an email")?.to_lowercase();
    let valid = !value.contains(char::is_whitespace)
        && value.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        });
    if valid {
        Ok(value)
    } else {
        Err(WorkflowError::validation("Please provide a valid email"))
    }
}

pub fn password(value: &str) -> WorkflowResult<()> {
    if value.is_empty() {
        Err(WorkflowError::validation("Please provide a password"))
    } else if value.chars().count() < 6 {
        Err(WorkflowError::validation(
            "Password must be at least 6 characters",
        ))
    } else {
        Ok(())
    }
}

pub fn team_size(value: u32) -> WorkflowResult<()> {
    if value < MIN_TEAM_SIZE {
        Err(WorkflowError::validation("Team must have at least 2 members"))
    } else if value > MAX_TEAM_SIZE {
        Err(WorkflowError::validation(
            "Team cannot have more than 10 members",
        ))
    } else {
        Ok(())
    }
}

/// Trims every entry and drops the empty ones.
#[must_use]
pub fn list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Splits a comma separated query parameter.
#[must_use]
pub fn comma_separated(value: &str) -> Vec<String> {
    list(value.split(',').map(str::to_owned).collect())
}
