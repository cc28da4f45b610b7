use async_trait::async_trait;
use domain::{Person, PersonId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

// --- Application Errors ---
#[derive(Error, Debug)]
pub enum ApplicationError {
    /// The requested id has no matching record. A normal negative
    /// outcome, mapped to 404 by the API layer and never logged as an
    /// error.
    #[error("Person '{0}' not found")]
    PersonNotFound(PersonId),
    /// A name or id-range query matched nothing. Also a 404 on the API
    /// surface.
    #[error("No matching person records")]
    NoMatches,
    /// The snapshot file could not be written after a mutation (or read
    /// at startup). The in-memory state stays authoritative for the
    /// running process; the caller sees a 500.
    #[error("Persistence failure: {0}")]
    Persistence(String),
}

// --- Repository Interface (Trait) ---

/// Boundary of the record store: the ordered person collection plus its
/// JSON snapshot file.
///
/// Lookups report absence through `Ok(None)` / `Ok(false)` / an empty
/// `Vec`; the `Err` channel is reserved for persistence faults.
#[async_trait]
pub trait PersonRepository: Send + Sync {
    /// Assigns the next id, appends the record and rewrites the
    /// snapshot. Returns the new id only once the snapshot write
    /// succeeded.
    async fn create(&self, request: PersonRequest) -> Result<PersonId, ApplicationError>;
    /// Exact-id lookup. At most one match by the uniqueness invariant.
    async fn get_by_id(&self, id: PersonId) -> Result<Option<Person>, ApplicationError>;
    /// Every record whose first or last name equals `name` exactly
    /// (case-sensitive), in collection order.
    async fn get_by_name(&self, name: &str) -> Result<Vec<Person>, ApplicationError>;
    /// Every record whose id lies in `(skip, skip + take]`. Filters by
    /// id VALUE, not by position: deleted ids leave gaps, so fewer than
    /// `take` records may come back.
    async fn get_by_id_range(
        &self,
        skip: u64,
        take: u64,
    ) -> Result<Vec<Person>, ApplicationError>;
    /// Replaces the stored record with `person` wholesale (no field
    /// merge) and rewrites the snapshot. `Ok(false)` when the id is
    /// absent; nothing is written in that case.
    async fn update(&self, person: Person) -> Result<bool, ApplicationError>;
    /// Removes the record and rewrites the snapshot. `Ok(false)` when
    /// the id is absent.
    async fn delete(&self, id: PersonId) -> Result<bool, ApplicationError>;
}

// --- Request/Response Models (Data Transfer Objects - DTOs) ---

/// Creation payload: a person record minus the store-assigned id.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PersonRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: String,
    pub age: i32,
}

impl PersonRequest {
    /// Materializes the full record once the store has assigned an id.
    pub fn into_person(self, id: PersonId) -> Person {
        Person {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            company: self.company,
            age: self.age,
        }
    }
}

/// Query parameters of the id-range endpoint.
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct IdRangeParams {
    /// Lower id bound (exclusive).
    #[serde(default)]
    pub skip: u64,
    /// Width of the id window above `skip`.
    #[serde(default)]
    pub take: u64,
}

// --- Application Service (Use Cases) ---

/// Thin use-case layer over the repository: tracing plus translation of
/// absent/empty outcomes into the typed errors the API maps to response
/// statuses. No business logic of its own.
pub struct PersonService {
    repository: Arc<dyn PersonRepository>,
}

impl PersonService {
    pub fn new(repository: Arc<dyn PersonRepository>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self, request))]
    pub async fn create_person(
        &self,
        request: PersonRequest,
    ) -> Result<PersonId, ApplicationError> {
        let id = self.repository.create(request).await?;
        info!(%id, "Person record created");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn get_person(&self, id: PersonId) -> Result<Person, ApplicationError> {
        self.repository.get_by_id(id).await?.ok_or_else(|| {
            debug!(%id, "Person not found");
            ApplicationError::PersonNotFound(id)
        })
    }

    #[instrument(skip(self))]
    pub async fn get_persons_by_name(&self, name: &str) -> Result<Vec<Person>, ApplicationError> {
        let matches = self.repository.get_by_name(name).await?;
        if matches.is_empty() {
            debug!(name, "No person records with that name");
            return Err(ApplicationError::NoMatches);
        }
        Ok(matches)
    }

    #[instrument(skip(self))]
    pub async fn get_persons_in_id_range(
        &self,
        params: IdRangeParams,
    ) -> Result<Vec<Person>, ApplicationError> {
        let matches = self
            .repository
            .get_by_id_range(params.skip, params.take)
            .await?;
        if matches.is_empty() {
            debug!(skip = params.skip, take = params.take, "Empty id range");
            return Err(ApplicationError::NoMatches);
        }
        Ok(matches)
    }

    #[instrument(skip(self, person), fields(id = %person.id))]
    pub async fn update_person(&self, person: Person) -> Result<(), ApplicationError> {
        let id = person.id;
        if self.repository.update(person).await? {
            info!(%id, "Person record updated");
            Ok(())
        } else {
            debug!(%id, "Update target not found");
            Err(ApplicationError::PersonNotFound(id))
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_person(&self, id: PersonId) -> Result<(), ApplicationError> {
        if self.repository.delete(id).await? {
            info!(%id, "Person record deleted");
            Ok(())
        } else {
            debug!(%id, "Delete target not found");
            Err(ApplicationError::PersonNotFound(id))
        }
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Repository double backed by a plain Vec. Create/update/delete
    /// mimic the real store's semantics without touching disk.
    #[derive(Default)]
    struct StubRepository {
        persons: Mutex<Vec<Person>>,
    }

    impl StubRepository {
        fn with_persons(persons: Vec<Person>) -> Arc<Self> {
            Arc::new(Self {
                persons: Mutex::new(persons),
            })
        }
    }

    #[async_trait]
    impl PersonRepository for StubRepository {
        async fn create(&self, request: PersonRequest) -> Result<PersonId, ApplicationError> {
            let mut persons = self.persons.lock().unwrap();
            let next = persons.iter().map(|p| p.id.value()).max().unwrap_or(0) + 1;
            let id = PersonId::new(next);
            persons.push(request.into_person(id));
            Ok(id)
        }

        async fn get_by_id(&self, id: PersonId) -> Result<Option<Person>, ApplicationError> {
            Ok(self
                .persons
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.id == id)
                .cloned())
        }

        async fn get_by_name(&self, name: &str) -> Result<Vec<Person>, ApplicationError> {
            Ok(self
                .persons
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.matches_name(name))
                .cloned()
                .collect())
        }

        async fn get_by_id_range(
            &self,
            skip: u64,
            take: u64,
        ) -> Result<Vec<Person>, ApplicationError> {
            let upper = skip.saturating_add(take);
            Ok(self
                .persons
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.id.value() > skip && p.id.value() <= upper)
                .cloned()
                .collect())
        }

        async fn update(&self, person: Person) -> Result<bool, ApplicationError> {
            let mut persons = self.persons.lock().unwrap();
            match persons.iter().position(|p| p.id == person.id) {
                Some(pos) => {
                    persons.remove(pos);
                    persons.push(person);
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn delete(&self, id: PersonId) -> Result<bool, ApplicationError> {
            let mut persons = self.persons.lock().unwrap();
            match persons.iter().position(|p| p.id == id) {
                Some(pos) => {
                    persons.remove(pos);
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn person(id: u64, first: &str, last: &str) -> Person {
        Person {
            id: PersonId::new(id),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            company: "Acme".to_string(),
            age: 30,
        }
    }

    fn request(first: &str, last: &str) -> PersonRequest {
        PersonRequest {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            company: "Acme".to_string(),
            age: 30,
        }
    }

    #[tokio::test]
    async fn get_person_translates_absence_into_not_found() {
        let service = PersonService::new(StubRepository::with_persons(vec![]));
        let err = service.get_person(PersonId::new(9)).await.unwrap_err();
        assert!(matches!(err, ApplicationError::PersonNotFound(id) if id == PersonId::new(9)));
    }

    #[tokio::test]
    async fn get_person_returns_the_matching_record() {
        let repo = StubRepository::with_persons(vec![person(1, "Alice", "Smith")]);
        let service = PersonService::new(repo);
        let found = service.get_person(PersonId::new(1)).await.unwrap();
        assert_eq!(found.first_name, "Alice");
    }

    #[tokio::test]
    async fn name_search_with_no_matches_is_reported_as_such() {
        let repo = StubRepository::with_persons(vec![person(1, "Alice", "Smith")]);
        let service = PersonService::new(repo);
        let err = service.get_persons_by_name("Bob").await.unwrap_err();
        assert!(matches!(err, ApplicationError::NoMatches));
    }

    #[tokio::test]
    async fn name_search_matches_first_and_last_names() {
        let repo = StubRepository::with_persons(vec![
            person(1, "Alice", "Smith"),
            person(2, "Smith", "Jones"),
            person(3, "Bob", "Brown"),
        ]);
        let service = PersonService::new(repo);
        let found = service.get_persons_by_name("Smith").await.unwrap();
        let ids: Vec<u64> = found.iter().map(|p| p.id.value()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn empty_id_range_is_reported_as_no_matches() {
        let repo = StubRepository::with_persons(vec![person(5, "Eve", "White")]);
        let service = PersonService::new(repo);
        let err = service
            .get_persons_in_id_range(IdRangeParams { skip: 10, take: 5 })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NoMatches));
    }

    #[tokio::test]
    async fn update_of_absent_id_is_not_found() {
        let service = PersonService::new(StubRepository::with_persons(vec![]));
        let err = service
            .update_person(person(3, "Carol", "King"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::PersonNotFound(id) if id == PersonId::new(3)));
    }

    #[tokio::test]
    async fn delete_of_absent_id_is_not_found() {
        let service = PersonService::new(StubRepository::with_persons(vec![]));
        let err = service.delete_person(PersonId::new(4)).await.unwrap_err();
        assert!(matches!(err, ApplicationError::PersonNotFound(id) if id == PersonId::new(4)));
    }

    #[tokio::test]
    async fn create_reports_the_assigned_id() {
        let service = PersonService::new(StubRepository::with_persons(vec![]));
        let id = service.create_person(request("Alice", "Smith")).await.unwrap();
        assert_eq!(id, PersonId::new(1));
        let id = service.create_person(request("Bob", "Jones")).await.unwrap();
        assert_eq!(id, PersonId::new(2));
    }
}
