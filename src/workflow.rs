//! Legal status transitions for a bonafide request, and which role may
//! invoke each one. Persistence applies a plan with a conditional update so
//! a stale reviewer gets a conflict instead of silently overwriting.

use uuid::Uuid;

use crate::models::requests::RequestStatus;
use crate::models::users::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Forward,
    Return,
    Approve,
}

impl std::fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReviewAction::Forward => "forward",
            ReviewAction::Return => "return",
            ReviewAction::Approve => "approve",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("a {actor} may not {action} a request in state `{from}`")]
    IllegalTransition {
        from: RequestStatus,
        actor: Role,
        action: ReviewAction,
    },
    #[error("returning a request requires a non-empty reason")]
    MissingReturnReason,
    #[error("forwarding to the principal requires a certificate template")]
    MissingTemplate,
}

/// The fully-validated outcome of a review action: the target status plus
/// the columns the transition writes alongside it.
#[derive(Debug, PartialEq, Eq)]
pub struct TransitionPlan {
    pub to: RequestStatus,
    pub return_reason: Option<String>,
    pub template_id: Option<Uuid>,
}

/// Decide whether `actor` may apply `action` to a request currently in
/// `current`, and what the resulting row update looks like. Any pair
/// outside the transition table fails without a plan, so no mutation can
/// ever be attempted for it.
pub fn plan_transition(
    current: RequestStatus,
    actor: Role,
    action: ReviewAction,
    return_reason: Option<&str>,
    template_id: Option<Uuid>,
) -> Result<TransitionPlan, TransitionError> {
    use RequestStatus::*;
    use ReviewAction::*;
    use Role::*;

    let illegal = || TransitionError::IllegalTransition {
        from: current,
        actor,
        action,
    };

    match (current, actor, action) {
        (PendingTutorApproval, Tutor, Forward) => Ok(TransitionPlan {
            to: PendingHodApproval,
            return_reason: None,
            template_id: None,
        }),
        (PendingTutorApproval, Tutor, Return) => Ok(TransitionPlan {
            to: ReturnedByTutor,
            return_reason: Some(required_reason(return_reason)?),
            template_id: None,
        }),
        (PendingHodApproval, Hod, Forward) => Ok(TransitionPlan {
            to: PendingPrincipalApproval,
            return_reason: None,
            template_id: Some(template_id.ok_or(TransitionError::MissingTemplate)?),
        }),
        (PendingHodApproval, Hod, Return) => Ok(TransitionPlan {
            to: ReturnedByHod,
            return_reason: Some(required_reason(return_reason)?),
            template_id: None,
        }),
        (PendingPrincipalApproval, Principal, Approve) => Ok(TransitionPlan {
            to: Approved,
            return_reason: None,
            template_id: None,
        }),
        (PendingPrincipalApproval, Principal, Return) => Ok(TransitionPlan {
            to: ReturnedByPrincipal,
            return_reason: Some(required_reason(return_reason)?),
            template_id: None,
        }),
        _ => Err(illegal()),
    }
}

fn required_reason(reason: Option<&str>) -> Result<String, TransitionError> {
    match reason {
        Some(r) if !r.trim().is_empty() => Ok(r.to_string()),
        _ => Err(TransitionError::MissingReturnReason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::{assert_err, assert_ok};

    #[test]
    fn tutor_forwards_to_hod() {
        let plan = plan_transition(
            RequestStatus::PendingTutorApproval,
            Role::Tutor,
            ReviewAction::Forward,
            None,
            None,
        )
        .unwrap();
        assert_eq!(plan.to, RequestStatus::PendingHodApproval);
        assert_eq!(plan.return_reason, None);
    }

    #[test]
    fn hod_forward_requires_a_template() {
        let err = plan_transition(
            RequestStatus::PendingHodApproval,
            Role::Hod,
            ReviewAction::Forward,
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::MissingTemplate);

        let template = Uuid::new_v4();
        let plan = plan_transition(
            RequestStatus::PendingHodApproval,
            Role::Hod,
            ReviewAction::Forward,
            None,
            Some(template),
        )
        .unwrap();
        assert_eq!(plan.to, RequestStatus::PendingPrincipalApproval);
        assert_eq!(plan.template_id, Some(template));
    }

    #[test]
    fn principal_approves_terminal() {
        let plan = plan_transition(
            RequestStatus::PendingPrincipalApproval,
            Role::Principal,
            ReviewAction::Approve,
            None,
            None,
        )
        .unwrap();
        assert_eq!(plan.to, RequestStatus::Approved);
        assert!(plan.to.is_terminal());
    }

    #[test]
    fn every_return_requires_a_reason() {
        for (from, actor) in [
            (RequestStatus::PendingTutorApproval, Role::Tutor),
            (RequestStatus::PendingHodApproval, Role::Hod),
            (RequestStatus::PendingPrincipalApproval, Role::Principal),
        ] {
            assert_err!(plan_transition(from, actor, ReviewAction::Return, None, None));
            assert_err!(plan_transition(
                from,
                actor,
                ReviewAction::Return,
                Some("   "),
                None
            ));
            assert_ok!(plan_transition(
                from,
                actor,
                ReviewAction::Return,
                Some("incomplete details"),
                None
            ));
        }
    }

    #[test]
    fn return_sets_the_role_specific_state() {
        let plan = plan_transition(
            RequestStatus::PendingHodApproval,
            Role::Hod,
            ReviewAction::Return,
            Some("wrong batch"),
            None,
        )
        .unwrap();
        assert_eq!(plan.to, RequestStatus::ReturnedByHod);
        assert_eq!(plan.return_reason.as_deref(), Some("wrong batch"));
    }

    #[test]
    fn role_and_stage_must_match() {
        // A tutor acting on an HOD-stage request.
        assert_err!(plan_transition(
            RequestStatus::PendingHodApproval,
            Role::Tutor,
            ReviewAction::Forward,
            None,
            None,
        ));
        // A principal trying to forward rather than approve.
        assert_err!(plan_transition(
            RequestStatus::PendingPrincipalApproval,
            Role::Principal,
            ReviewAction::Forward,
            None,
            None,
        ));
        // Nobody mutates a terminal request.
        for actor in [Role::Tutor, Role::Hod, Role::Principal, Role::Admin] {
            for action in [ReviewAction::Forward, ReviewAction::Return, ReviewAction::Approve] {
                assert_err!(plan_transition(
                    RequestStatus::Approved,
                    actor,
                    action,
                    Some("reason"),
                    Some(Uuid::new_v4()),
                ));
            }
        }
    }

    #[test]
    fn students_and_admins_hold_no_review_stage() {
        for status in [
            RequestStatus::PendingTutorApproval,
            RequestStatus::PendingHodApproval,
            RequestStatus::PendingPrincipalApproval,
        ] {
            assert_err!(plan_transition(
                status,
                Role::Student,
                ReviewAction::Forward,
                None,
                None
            ));
            assert_err!(plan_transition(
                status,
                Role::Admin,
                ReviewAction::Approve,
                None,
                None
            ));
        }
    }
}
