//! Band membership rules
//!
//! A user moves from unaffiliated, through pending requests or invites, to
//! being a member of exactly one band. The functions here decide whether a
//! transition is allowed given facts loaded inside the caller's transaction;
//! they never touch the database themselves.

use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MembershipError {
    #[error("You can not send a request to your own band")]
    OwnBand,

    #[error("You have already sent a request to this band")]
    DuplicateRequest,

    #[error("You are already in this band")]
    AlreadyInThisBand,

    #[error("You do not own a band")]
    NoOwnedBand,

    #[error("You have already invited this user into your band")]
    DuplicateInvite,

    #[error("This user is already in your band")]
    InviteeAlreadyInBand,

    #[error("Your band is full")]
    BandFull,

    #[error("You are forbidden to join more than one band")]
    AlreadyHasBand,

    #[error("This user already belongs to a band")]
    CandidateHasBand,

    #[error("Number of participants can not exceed quantity")]
    QuantityBelowParticipants,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,
}

impl From<MembershipError> for ApiError {
    fn from(err: MembershipError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Facts needed to decide on a new join request
#[derive(Debug, Clone, Copy)]
pub struct JoinRequestCheck {
    pub requester: Uuid,
    pub band_owner: Uuid,
    pub requester_in_band: bool,
    pub duplicate_exists: bool,
}

/// A user may ask to join a band they neither own nor belong to, once
pub fn validate_join_request(check: &JoinRequestCheck) -> Result<(), MembershipError> {
    if check.requester == check.band_owner {
        return Err(MembershipError::OwnBand);
    }
    if check.duplicate_exists {
        return Err(MembershipError::DuplicateRequest);
    }
    if check.requester_in_band {
        return Err(MembershipError::AlreadyInThisBand);
    }
    Ok(())
}

/// Facts needed to decide on a new invite
#[derive(Debug, Clone, Copy)]
pub struct InviteCheck {
    pub owns_band: bool,
    pub invitee_in_band: bool,
    pub duplicate_exists: bool,
}

/// An owner may invite a user who is not yet in their band, once.
/// The owner is a member of their own band, so self-invites fail here too.
pub fn validate_invite(check: &InviteCheck) -> Result<(), MembershipError> {
    if !check.owns_band {
        return Err(MembershipError::NoOwnedBand);
    }
    if check.duplicate_exists {
        return Err(MembershipError::DuplicateInvite);
    }
    if check.invitee_in_band {
        return Err(MembershipError::InviteeAlreadyInBand);
    }
    Ok(())
}

/// Who is joining when a request or invite is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    /// The caller accepted an invite for themself
    Invitee,
    /// The band owner accepted someone else's request
    Requester,
}

/// Facts needed to accept a pending request or invite
#[derive(Debug, Clone, Copy)]
pub struct AcceptanceCheck {
    pub joiner: Joiner,
    pub joiner_has_band: bool,
    pub participants: i64,
    pub quantity: i16,
}

/// Returns the band's `is_full` flag after the joiner is added
pub fn validate_acceptance(check: &AcceptanceCheck) -> Result<bool, MembershipError> {
    if check.joiner_has_band {
        return Err(match check.joiner {
            Joiner::Invitee => MembershipError::AlreadyHasBand,
            Joiner::Requester => MembershipError::CandidateHasBand,
        });
    }
    ensure_capacity(check.participants, check.quantity)?;
    Ok(is_full(check.participants + 1, check.quantity))
}

/// A band with `participants` members can take one more
pub fn ensure_capacity(participants: i64, quantity: i16) -> Result<(), MembershipError> {
    if participants >= i64::from(quantity) {
        return Err(MembershipError::BandFull);
    }
    Ok(())
}

pub fn is_full(participants: i64, quantity: i16) -> bool {
    participants >= i64::from(quantity)
}

/// Quantity given when a band is created with its author as sole member
pub fn initial_is_full(quantity: i16) -> Result<bool, MembershipError> {
    if quantity < 1 {
        return Err(MembershipError::InvalidQuantity);
    }
    Ok(is_full(1, quantity))
}

/// New `is_full` for a quantity change, rejecting quantities below the
/// current participant count
pub fn resize(participants: i64, quantity: i16) -> Result<bool, MembershipError> {
    if quantity < 1 {
        return Err(MembershipError::InvalidQuantity);
    }
    match participants.cmp(&i64::from(quantity)) {
        std::cmp::Ordering::Equal => Ok(true),
        std::cmp::Ordering::Less => Ok(false),
        std::cmp::Ordering::Greater => Err(MembershipError::QuantityBelowParticipants),
    }
}

/// Creating a band enrols its author, which only an unaffiliated user may do
pub fn ensure_unaffiliated(has_band: bool) -> Result<(), MembershipError> {
    if has_band {
        return Err(MembershipError::AlreadyHasBand);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(requester: Uuid, band_owner: Uuid) -> JoinRequestCheck {
        JoinRequestCheck {
            requester,
            band_owner,
            requester_in_band: false,
            duplicate_exists: false,
        }
    }

    #[test]
    fn test_join_request_accepted_for_outsider() {
        assert_eq!(
            validate_join_request(&join(Uuid::new_v4(), Uuid::new_v4())),
            Ok(())
        );
    }

    #[test]
    fn test_join_request_to_own_band_rejected() {
        let owner = Uuid::new_v4();
        assert_eq!(
            validate_join_request(&join(owner, owner)),
            Err(MembershipError::OwnBand)
        );
    }

    #[test]
    fn test_duplicate_join_request_rejected() {
        let check = JoinRequestCheck {
            duplicate_exists: true,
            ..join(Uuid::new_v4(), Uuid::new_v4())
        };
        assert_eq!(
            validate_join_request(&check),
            Err(MembershipError::DuplicateRequest)
        );
    }

    #[test]
    fn test_member_can_not_request_again() {
        let check = JoinRequestCheck {
            requester_in_band: true,
            ..join(Uuid::new_v4(), Uuid::new_v4())
        };
        assert_eq!(
            validate_join_request(&check),
            Err(MembershipError::AlreadyInThisBand)
        );
    }

    #[test]
    fn test_invite_rules() {
        let ok = InviteCheck {
            owns_band: true,
            invitee_in_band: false,
            duplicate_exists: false,
        };
        assert_eq!(validate_invite(&ok), Ok(()));

        assert_eq!(
            validate_invite(&InviteCheck {
                owns_band: false,
                ..ok
            }),
            Err(MembershipError::NoOwnedBand)
        );
        assert_eq!(
            validate_invite(&InviteCheck {
                duplicate_exists: true,
                ..ok
            }),
            Err(MembershipError::DuplicateInvite)
        );
        assert_eq!(
            validate_invite(&InviteCheck {
                invitee_in_band: true,
                ..ok
            }),
            Err(MembershipError::InviteeAlreadyInBand)
        );
    }

    #[test]
    fn test_acceptance_requires_spare_capacity() {
        let check = AcceptanceCheck {
            joiner: Joiner::Requester,
            joiner_has_band: false,
            participants: 3,
            quantity: 3,
        };
        assert_eq!(validate_acceptance(&check), Err(MembershipError::BandFull));
    }

    #[test]
    fn test_acceptance_filling_last_seat_marks_band_full() {
        let check = AcceptanceCheck {
            joiner: Joiner::Invitee,
            joiner_has_band: false,
            participants: 2,
            quantity: 3,
        };
        assert_eq!(validate_acceptance(&check), Ok(true));

        let roomy = AcceptanceCheck {
            participants: 1,
            ..check
        };
        assert_eq!(validate_acceptance(&roomy), Ok(false));
    }

    #[test]
    fn test_acceptance_rejects_users_already_in_a_band() {
        let invitee = AcceptanceCheck {
            joiner: Joiner::Invitee,
            joiner_has_band: true,
            participants: 1,
            quantity: 5,
        };
        assert_eq!(
            validate_acceptance(&invitee),
            Err(MembershipError::AlreadyHasBand)
        );

        let requester = AcceptanceCheck {
            joiner: Joiner::Requester,
            ..invitee
        };
        assert_eq!(
            validate_acceptance(&requester),
            Err(MembershipError::CandidateHasBand)
        );
    }

    #[test]
    fn test_resize_recomputes_is_full() {
        assert_eq!(resize(3, 3), Ok(true));
        assert_eq!(resize(2, 5), Ok(false));
        assert_eq!(resize(4, 3), Err(MembershipError::QuantityBelowParticipants));
        assert_eq!(resize(0, 0), Err(MembershipError::InvalidQuantity));
    }

    #[test]
    fn test_initial_is_full() {
        assert_eq!(initial_is_full(1), Ok(true));
        assert_eq!(initial_is_full(4), Ok(false));
        assert_eq!(initial_is_full(0), Err(MembershipError::InvalidQuantity));
        assert_eq!(initial_is_full(-2), Err(MembershipError::InvalidQuantity));
    }

    #[test]
    fn test_band_creator_must_be_unaffiliated() {
        assert_eq!(ensure_unaffiliated(false), Ok(()));
        assert_eq!(
            ensure_unaffiliated(true),
            Err(MembershipError::AlreadyHasBand)
        );
    }

    #[test]
    fn test_error_messages_are_client_facing() {
        let err: ApiError = MembershipError::BandFull.into();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "Your band is full"));
    }
}
