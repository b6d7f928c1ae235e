use super::dto::UserPatch;
use super::error::{ShareItError, ShareItResult};
use super::model::User;
use super::storage::RecordStore;
use super::validator;
use std::sync::Arc;

pub struct UserService {
    users: Arc<dyn RecordStore<User>>,
}

impl UserService {
    pub fn new(users: Arc<dyn RecordStore<User>>) -> Self {
        Self { users }
    }

    pub fn create_user(&self, name: &str, email: &str) -> ShareItResult<User> {
        if name.trim().is_empty() {
            return Err(ShareItError::validation("User name must not be blank"));
        }
        validator::check_email_on_exist_and_valid(0, Some(email), &self.users.scan()?)?;

        let user = self.users.save(User {
            id: 0,
            name: name.to_string(),
            email: email.to_string(),
        })?;
        tracing::info!(user_id = user.id, "user created");
        Ok(user)
    }

    pub fn get_user(&self, id: u64) -> ShareItResult<User> {
        self.users
            .get(id)?
            .ok_or_else(|| ShareItError::not_found(format!("User {id} not found")))
    }

    pub fn get_all_users(&self) -> ShareItResult<Vec<User>> {
        self.users.scan()
    }

    /// Absent or blank fields keep their previous value
    pub fn update_user(&self, id: u64, patch: &UserPatch) -> ShareItResult<User> {
        let old = self.get_user(id)?;
        validator::check_email_on_exist_and_valid(
            id,
            patch.email.as_deref(),
            &self.users.scan()?,
        )?;

        let keep_or = |new: &Option<String>, old: String| match new {
            Some(value) if !value.trim().is_empty() => value.clone(),
            _ => old,
        };
        let updated = User {
            id,
            name: keep_or(&patch.name, old.name),
            email: keep_or(&patch.email, old.email),
        };

        self.users.put(&updated)?;
        tracing::info!(user_id = id, "user updated");
        Ok(updated)
    }

    pub fn delete_user(&self, id: u64) -> ShareItResult<String> {
        let user = self.get_user(id)?;
        self.users.remove(user.id)?;
        tracing::info!(user_id = id, "user deleted");
        Ok(format!("Deleted user with id = {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::MemoryStore;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::<User>::new()))
    }

    #[test]
    fn duplicate_email_on_create_is_a_conflict() {
        let users = service();
        users.create_user("First", "user@user.com").unwrap();

        let err = users.create_user("Second", "user@user.com").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(users.get_all_users().unwrap().len(), 1);
    }

    #[test]
    fn create_rejects_bad_input() {
        let users = service();
        assert_eq!(
            users.create_user(" ", "user@user.com").unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            users.create_user("Name", "user.user.com").unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn partial_update_keeps_missing_and_blank_fields() {
        let users = service();
        let user = users.create_user("Name", "user@user.com").unwrap();

        let renamed = users
            .update_user(
                user.id,
                &UserPatch {
                    name: Some("Renamed".into()),
                    email: None,
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "Renamed");
        assert_eq!(renamed.email, "user@user.com");

        let blank_name = users
            .update_user(
                user.id,
                &UserPatch {
                    name: Some("  ".into()),
                    email: Some("new@user.com".into()),
                },
            )
            .unwrap();
        assert_eq!(blank_name.name, "Renamed");
        assert_eq!(blank_name.email, "new@user.com");
        assert_eq!(users.get_user(user.id).unwrap(), blank_name);
    }

    #[test]
    fn update_to_own_email_is_allowed_but_not_to_anothers() {
        let users = service();
        let first = users.create_user("First", "first@user.com").unwrap();
        users.create_user("Second", "second@user.com").unwrap();

        let same = UserPatch {
            name: None,
            email: Some("first@user.com".into()),
        };
        assert!(users.update_user(first.id, &same).is_ok());

        let taken = UserPatch {
            name: None,
            email: Some("second@user.com".into()),
        };
        assert_eq!(
            users.update_user(first.id, &taken).unwrap_err().kind(),
            ErrorKind::AlreadyExists
        );
    }

    #[test]
    fn delete_then_lookup_is_not_found() {
        let users = service();
        let user = users.create_user("Name", "user@user.com").unwrap();

        assert_eq!(users.delete_user(user.id).unwrap(), "Deleted user with id = 1");
        assert_eq!(users.get_user(user.id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(users.delete_user(user.id).unwrap_err().kind(), ErrorKind::NotFound);
    }
}
