use crate::config::AllowedBranches;
use crate::gate::event::{PullRequestAction, PullRequestEvent};

/// Decides whether the pull request event should mark its head commit as untested.
pub fn should_trigger_pending(event: &PullRequestEvent, allowed: &AllowedBranches) -> bool {
    let relevant_action = matches!(
        event.action,
        PullRequestAction::Opened | PullRequestAction::Reopened | PullRequestAction::Synchronize
    );
    relevant_action && allowed.allows(&event.base_branch)
}
