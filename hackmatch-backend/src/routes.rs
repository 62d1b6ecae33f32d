pub mod auth;
pub mod hackathons;
pub mod health;
pub mod teams;
pub mod users;

use core::str::FromStr;

use axum::Router;

use crate::error::AppError;
use crate::AppState;

pub fn api() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .nest("/auth", auth::routes())
        .nest("/users", users::routes())
        .nest("/teams", teams::routes())
        .nest("/hackathons", hackathons::routes())
}

/// Ids that do not even parse cannot name an existing document.
fn parse_id<T: FromStr>(raw: &str, not_found: &'static str) -> Result<T, AppError> {
    raw.parse().map_err(|_| AppError::MalformedId(not_found))
}

/// An optional comma separated list, as used by the search filters.
fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(hackmatch_workflow::validate::comma_separated)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use hackmatch_workflow::ids::TeamId;

    use super::*;

    #[test]
    fn garbage_ids_are_not_found() {
        let error = parse_id::<TeamId>("not-a-uuid", "Team not found").unwrap_err();
        assert!(matches!(error, AppError::MalformedId("Team not found")));

        let id = TeamId::random();
        assert_eq!(parse_id::<TeamId>(&id.to_string(), "Team not found").unwrap(), id);
    }

    #[test]
    fn lists_are_trimmed() {
        assert_eq!(split_list(Some(" rust, ,go")), vec!["rust", "go"]);
        assert!(split_list(None).is_empty());
    }
}
