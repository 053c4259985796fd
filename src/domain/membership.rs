//! Membership Set
//!
//! Shared by Scene, Group and Region: a unique, insertion-ordered list of
//! member ids plus a master who counts as a member without being listed.

use super::DomainError;

/// Store field holding the membership list.
pub const MEMBERS_FIELD: &str = "members";

pub trait Membership {
    fn master(&self) -> &str;

    fn members(&self) -> &[String];

    fn members_mut(&mut self) -> &mut Vec<String>;

    /// True for the master or any listed member.
    fn has_member(&self, id: &str) -> bool {
        (!self.master().is_empty() && self.master() == id)
            || self.members().iter().any(|m| m == id)
    }

    /// Fails with [`DomainError::AlreadyMember`] before any store write.
    fn check_append(&self, id: &str) -> Result<(), DomainError> {
        if id.is_empty() {
            return Err(DomainError::Validation("member id is empty".into()));
        }
        if self.has_member(id) {
            return Err(DomainError::AlreadyMember(id.to_string()));
        }
        Ok(())
    }

    /// Fails with [`DomainError::NotMember`] before any store write.
    fn check_remove(&self, id: &str) -> Result<(), DomainError> {
        if !self.has_member(id) {
            return Err(DomainError::NotMember(id.to_string()));
        }
        Ok(())
    }

    /// Mirror a persisted append: tail insertion.
    fn mirror_append(&mut self, id: &str) {
        self.members_mut().push(id.to_string());
    }

    /// Mirror a persisted removal, keeping the order of the rest.
    fn mirror_remove(&mut self, id: &str) {
        let members = self.members_mut();
        if let Some(index) = members.iter().position(|m| m == id) {
            members.remove(index);
        }
    }
}
