use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::users::Role;

/// Where a bonafide request sits in the approval chain. Stored in the
/// `requests.status` column as the display string.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    #[serde(rename = "Pending Tutor Approval")]
    PendingTutorApproval,
    #[serde(rename = "Pending HOD Approval")]
    PendingHodApproval,
    #[serde(rename = "Pending Principal Approval")]
    PendingPrincipalApproval,
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Returned by Tutor")]
    ReturnedByTutor,
    #[serde(rename = "Returned by HOD")]
    ReturnedByHod,
    #[serde(rename = "Returned by Principal")]
    ReturnedByPrincipal,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::PendingTutorApproval => "Pending Tutor Approval",
            RequestStatus::PendingHodApproval => "Pending HOD Approval",
            RequestStatus::PendingPrincipalApproval => "Pending Principal Approval",
            RequestStatus::Approved => "Approved",
            RequestStatus::ReturnedByTutor => "Returned by Tutor",
            RequestStatus::ReturnedByHod => "Returned by HOD",
            RequestStatus::ReturnedByPrincipal => "Returned by Principal",
        }
    }

    /// Which status a reviewer role works through. Students and admins do
    /// not hold a review stage.
    pub fn pending_for(role: Role) -> Option<RequestStatus> {
        match role {
            Role::Tutor => Some(RequestStatus::PendingTutorApproval),
            Role::Hod => Some(RequestStatus::PendingHodApproval),
            Role::Principal => Some(RequestStatus::PendingPrincipalApproval),
            Role::Student | Role::Admin => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            RequestStatus::PendingTutorApproval
                | RequestStatus::PendingHodApproval
                | RequestStatus::PendingPrincipalApproval
        )
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending Tutor Approval" => Ok(RequestStatus::PendingTutorApproval),
            "Pending HOD Approval" => Ok(RequestStatus::PendingHodApproval),
            "Pending Principal Approval" => Ok(RequestStatus::PendingPrincipalApproval),
            "Approved" => Ok(RequestStatus::Approved),
            "Returned by Tutor" => Ok(RequestStatus::ReturnedByTutor),
            "Returned by HOD" => Ok(RequestStatus::ReturnedByHod),
            "Returned by Principal" => Ok(RequestStatus::ReturnedByPrincipal),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the `requests` table. Mutated only through status-transition
/// operations after creation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BonafideRequest {
    pub id: Uuid,
    pub student_id: Uuid,
    pub request_type: String,
    pub sub_type: Option<String>,
    pub reason: String,
    pub date: NaiveDate,
    pub status: String,
    pub return_reason: Option<String>,
    pub template_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequestRequest {
    #[validate(length(min = 1, message = "Request type is required"))]
    pub request_type: String,
    pub sub_type: Option<String>,
    #[validate(length(min = 1, message = "Reason is required"))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ForwardRequest {
    /// Required when the HOD forwards: which certificate definition the
    /// principal will render.
    pub template_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    /// Append the e-signature block to HTML certificates. Defaults to true.
    pub with_signature: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_display() {
        let all = [
            RequestStatus::PendingTutorApproval,
            RequestStatus::PendingHodApproval,
            RequestStatus::PendingPrincipalApproval,
            RequestStatus::Approved,
            RequestStatus::ReturnedByTutor,
            RequestStatus::ReturnedByHod,
            RequestStatus::ReturnedByPrincipal,
        ];
        for status in all {
            assert_eq!(RequestStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn only_pending_states_are_live() {
        assert!(!RequestStatus::PendingHodApproval.is_terminal());
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::ReturnedByTutor.is_terminal());
    }

    #[test]
    fn each_reviewer_role_has_one_stage() {
        use crate::models::users::Role;
        assert_eq!(
            RequestStatus::pending_for(Role::Tutor),
            Some(RequestStatus::PendingTutorApproval)
        );
        assert_eq!(RequestStatus::pending_for(Role::Student), None);
        assert_eq!(RequestStatus::pending_for(Role::Admin), None);
    }
}
