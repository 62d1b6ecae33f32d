use chrono::{DateTime, Utc};

use crate::model::{HackathonStatus, TeamStatus};

#[must_use]
pub fn hackathon_status(
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> HackathonStatus {
    if now > end {
        HackathonStatus::Completed
    } else if now >= start {
        HackathonStatus::Active
    } else {
        HackathonStatus::Upcoming
    }
}

/// `Closed` sticks until the leader reopens the team, everything else follows
/// the member count.
#[must_use]
pub const fn team_status(current: TeamStatus, members: usize, capacity: usize) -> TeamStatus {
    match current {
        TeamStatus::Closed => TeamStatus::Closed,
        TeamStatus::Open | TeamStatus::Full => {
            if members >= capacity {
                TeamStatus::Full
            } else {
                TeamStatus::Open
            }
        }
    }
}
