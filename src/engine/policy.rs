//! Authorization policy.
//!
//! All role checks go through [`permits`], keyed by the caller's role, the
//! action and the caller's relation to the record. Code that has to behave
//! differently per caller branches on a [`BookingScope`] derived from
//! [`permits`], never on the role itself.

use serde::Serialize;

use super::validation::normalize_email;
use super::{EngineError, EngineResult};
use crate::db::Role;

/// The authenticated identity performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub user_id: String,
    /// Identity email, matched against passenger contact emails
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl Caller {
    /// Relation of this caller to a record owned by `owner_email`
    pub fn ownership_of(&self, owner_email: &str) -> Ownership {
        if normalize_email(&self.email) == normalize_email(owner_email) {
            Ownership::Owner
        } else {
            Ownership::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// See every booking, not only one's own
    ListAllBookings,
    ViewBooking,
    CreateBooking,
    EditBooking,
    DeleteBooking,
    ManageFlights,
    ManagePassengers,
    CreateFeedback,
    EditFeedback,
    DeleteFeedback,
    ViewDashboard,
}

impl Action {
    fn describe(&self) -> &'static str {
        match self {
            Action::ListAllBookings => "list all bookings",
            Action::ViewBooking => "view this booking",
            Action::CreateBooking => "create this booking",
            Action::EditBooking => "edit bookings",
            Action::DeleteBooking => "delete this booking",
            Action::ManageFlights => "manage flights",
            Action::ManagePassengers => "manage passengers",
            Action::CreateFeedback => "leave feedback",
            Action::EditFeedback => "edit feedback",
            Action::DeleteFeedback => "delete feedback",
            Action::ViewDashboard => "view the admin dashboard",
        }
    }
}

/// How the caller relates to the record an action targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The record belongs to the caller
    Owner,
    /// The record belongs to someone else
    Other,
    /// The action does not target an owned record
    NotApplicable,
}

/// The single authorization rule table
pub fn permits(role: Role, action: Action, ownership: Ownership) -> bool {
    match (role, action) {
        (Role::Admin, _) => true,
        (Role::Customer, Action::ViewBooking | Action::DeleteBooking) => {
            ownership == Ownership::Owner
        }
        (Role::Customer, Action::CreateBooking | Action::CreateFeedback) => {
            ownership != Ownership::Other
        }
        (Role::Customer, _) => false,
    }
}

/// [`permits`] as a `Result`, for use with `?`
pub fn authorize(caller: &Caller, action: Action, ownership: Ownership) -> EngineResult<()> {
    if permits(caller.role, action, ownership) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %caller.user_id,
            role = %caller.role,
            ?action,
            ?ownership,
            "Authorization denied"
        );
        Err(EngineError::Forbidden(format!(
            "You are not allowed to {}",
            action.describe()
        )))
    }
}

/// Whose bookings a caller may list and book for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingScope {
    All,
    /// Only the passenger with this (normalized) contact email
    Contact(String),
}

impl BookingScope {
    pub fn for_caller(caller: &Caller) -> Self {
        if permits(caller.role, Action::ListAllBookings, Ownership::NotApplicable) {
            BookingScope::All
        } else {
            BookingScope::Contact(normalize_email(&caller.email))
        }
    }

    /// Relation of the caller to a booking for the passenger at `owner_email`
    pub fn ownership_of(&self, owner_email: &str) -> Ownership {
        match self {
            BookingScope::All => Ownership::NotApplicable,
            BookingScope::Contact(email) if *email == normalize_email(owner_email) => {
                Ownership::Owner
            }
            BookingScope::Contact(_) => Ownership::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{admin, customer};

    #[test]
    fn test_admin_is_permitted_everything() {
        for action in [
            Action::ListAllBookings,
            Action::EditBooking,
            Action::DeleteBooking,
            Action::ManageFlights,
            Action::ManagePassengers,
            Action::DeleteFeedback,
            Action::ViewDashboard,
        ] {
            assert!(permits(Role::Admin, action, Ownership::Other));
        }
    }

    #[test]
    fn test_customer_owns_only_their_bookings() {
        assert!(permits(Role::Customer, Action::ViewBooking, Ownership::Owner));
        assert!(!permits(Role::Customer, Action::ViewBooking, Ownership::Other));
        assert!(permits(Role::Customer, Action::DeleteBooking, Ownership::Owner));
        assert!(!permits(Role::Customer, Action::DeleteBooking, Ownership::Other));
        assert!(!permits(Role::Customer, Action::EditBooking, Ownership::Owner));
    }

    #[test]
    fn test_customer_creates_for_self_only() {
        assert!(permits(Role::Customer, Action::CreateBooking, Ownership::Owner));
        assert!(permits(Role::Customer, Action::CreateBooking, Ownership::NotApplicable));
        assert!(!permits(Role::Customer, Action::CreateBooking, Ownership::Other));
    }

    #[test]
    fn test_customer_cannot_delete_own_feedback() {
        assert!(!permits(Role::Customer, Action::DeleteFeedback, Ownership::Owner));
        assert!(!permits(Role::Customer, Action::EditFeedback, Ownership::Owner));
    }

    #[test]
    fn test_booking_scope() {
        assert_eq!(BookingScope::for_caller(&admin()), BookingScope::All);
        assert_eq!(
            BookingScope::for_caller(&customer("Ada@Example.com")),
            BookingScope::Contact("ada@example.com".to_string())
        );
    }

    #[test]
    fn test_scope_ownership() {
        let scope = BookingScope::for_caller(&customer("ada@example.com"));
        assert_eq!(scope.ownership_of("ADA@example.com"), Ownership::Owner);
        assert_eq!(scope.ownership_of("bob@example.com"), Ownership::Other);
        assert_eq!(
            BookingScope::All.ownership_of("bob@example.com"),
            Ownership::NotApplicable
        );
    }

    #[test]
    fn test_authorize_reports_forbidden() {
        let err = authorize(
            &customer("ada@example.com"),
            Action::ManageFlights,
            Ownership::NotApplicable,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(ref m) if m.contains("manage flights")));
    }

    #[test]
    fn test_ownership_is_case_insensitive() {
        let caller = customer("ada@example.com");
        assert_eq!(caller.ownership_of("Ada@Example.com"), Ownership::Owner);
        assert_eq!(caller.ownership_of("bob@example.com"), Ownership::Other);
    }
}
