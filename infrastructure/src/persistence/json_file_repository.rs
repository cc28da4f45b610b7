// ./infrastructure/src/persistence/json_file_repository.rs
use application::{ApplicationError, PersonRepository, PersonRequest};
use async_trait::async_trait;
use domain::{Person, PersonId};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

/// File-backed person repository.
///
/// The ordered collection lives in memory for the process lifetime;
/// every successful mutation rewrites the entire JSON snapshot before
/// the operation reports success. One coarse lock guards the whole
/// read-modify-write-flush sequence, so mutations never interleave.
/// Full rewrites scale linearly with the collection size, a known
/// limit of the snapshot format rather than a correctness issue.
pub struct JsonFileRepository {
    persons: RwLock<Vec<Person>>,
    path: PathBuf,
}

impl JsonFileRepository {
    /// Opens the repository at `path` and loads the existing snapshot.
    ///
    /// A missing file starts an empty collection (first run); an
    /// unreadable or corrupt one does too, with the failure logged.
    /// Neither is fatal to startup.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let persons = match load_snapshot(&path) {
            Ok(persons) => {
                debug!(path = %path.display(), count = persons.len(), "Snapshot loaded");
                persons
            }
            Err(e) => {
                error!(path = %path.display(), "Failed to load snapshot, starting with an empty collection: {}", e);
                Vec::new()
            }
        };
        Self {
            persons: RwLock::new(persons),
            path,
        }
    }

    /// Path of the backing snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes the whole collection (pretty-printed, one record per
    /// entry) and writes it atomically: temp file next to the target,
    /// then rename over it. A crash mid-write therefore cannot leave a
    /// truncated snapshot behind.
    async fn flush(&self, persons: &[Person]) -> Result<(), ApplicationError> {
        let bytes = serde_json::to_vec_pretty(persons).map_err(|e| {
            error!(path = %self.path.display(), "Failed to serialize snapshot: {}", e);
            ApplicationError::Persistence(e.to_string())
        })?;

        let ext = self.path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let tmp = self.path.with_extension(format!("{ext}.tmp"));
        let write_result = async {
            tokio::fs::write(&tmp, &bytes).await?;
            tokio::fs::rename(&tmp, &self.path).await
        }
        .await;

        write_result.map_err(|e| {
            error!(path = %self.path.display(), "Failed to write snapshot: {}", e);
            ApplicationError::Persistence(e.to_string())
        })
    }
}

/// Reads and parses the snapshot at `path`. A missing or empty file is
/// a normal first-run state, not an error.
fn load_snapshot(path: &Path) -> Result<Vec<Person>, ApplicationError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ApplicationError::Persistence(e.to_string())),
    };
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&bytes).map_err(|e| ApplicationError::Persistence(e.to_string()))
}

#[async_trait]
impl PersonRepository for JsonFileRepository {
    #[instrument(skip(self, request))]
    async fn create(&self, request: PersonRequest) -> Result<PersonId, ApplicationError> {
        let mut persons = self.persons.write().await;
        // Next id = max existing + 1 (1 for an empty collection). Ids
        // of deleted records are never handed out again.
        let id = PersonId::new(persons.iter().map(|p| p.id.value()).max().unwrap_or(0) + 1);
        persons.push(request.into_person(id));
        // The record stays in memory if the flush fails: memory is the
        // source of truth for this process and disk catches up on the
        // next successful mutation. The caller still sees the failure.
        self.flush(&persons).await?;
        debug!(%id, "Person appended and snapshot rewritten");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: PersonId) -> Result<Option<Person>, ApplicationError> {
        let persons = self.persons.read().await;
        Ok(persons.iter().find(|p| p.id == id).cloned())
    }

    #[instrument(skip(self))]
    async fn get_by_name(&self, name: &str) -> Result<Vec<Person>, ApplicationError> {
        let persons = self.persons.read().await;
        Ok(persons
            .iter()
            .filter(|p| p.matches_name(name))
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn get_by_id_range(
        &self,
        skip: u64,
        take: u64,
    ) -> Result<Vec<Person>, ApplicationError> {
        // Filters by id VALUE, keeping ids in (skip, skip + take]. Ids
        // missing from the window (deleted or never assigned) are
        // simply absent from the result, so fewer than `take` records
        // can come back. Not positional offset/limit pagination.
        let upper = skip.saturating_add(take);
        let persons = self.persons.read().await;
        Ok(persons
            .iter()
            .filter(|p| p.id.value() > skip && p.id.value() <= upper)
            .cloned()
            .collect())
    }

    #[instrument(skip(self, person), fields(id = %person.id))]
    async fn update(&self, person: Person) -> Result<bool, ApplicationError> {
        let mut persons = self.persons.write().await;
        let Some(pos) = persons.iter().position(|p| p.id == person.id) else {
            return Ok(false);
        };
        // Full replacement, never a field merge: the old record is
        // removed and the supplied one appended.
        persons.remove(pos);
        persons.push(person);
        self.flush(&persons).await?;
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: PersonId) -> Result<bool, ApplicationError> {
        let mut persons = self.persons.write().await;
        let Some(pos) = persons.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        persons.remove(pos);
        self.flush(&persons).await?;
        Ok(true)
    }
}
