//! Readers and the books they have rated.
//!
//! Users live in the `users_rating` collection, one document per user:
//!
//! ```json
//! { "_id": "…", "user_id": "…", "username": "ana", "ratings": [{ "book_id": "B01", "rating": 4.5 }] }
//! ```
//!
//! `user_id` and `username` are unique within the collection.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::store::{document, Document, DocumentStore};

/// Logical collection key for user documents.
pub const COLLECTION_KEY: &str = "users_rating";

/// Highest rating a book can receive.
pub const MAX_RATING: f32 = 5.0;

/// One user's rating of one book, between 0 and 5 inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RatingRecord")]
pub struct BookRating {
    book_id: String,
    rating: f32,
}

#[derive(Deserialize)]
struct RatingRecord {
    book_id: String,
    rating: f32,
}

impl TryFrom<RatingRecord> for BookRating {
    type Error = PipelineError;

    fn try_from(record: RatingRecord) -> Result<Self> {
        BookRating::new(record.book_id, record.rating)
    }
}

impl BookRating {
    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] if `rating` is outside `0..=5`
    /// or not a number.
    pub fn new(book_id: impl Into<String>, rating: f32) -> Result<Self> {
        if !(0.0..=MAX_RATING).contains(&rating) {
            return Err(PipelineError::Validation(format!(
                "Rating must be between 0 and {MAX_RATING}, got {rating}"
            )));
        }
        Ok(Self {
            book_id: book_id.into(),
            rating,
        })
    }

    /// Rated book.
    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    /// Rating value.
    pub fn rating(&self) -> f32 {
        self.rating
    }
}

/// A reader with their ratings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable id, a UUID v4.
    pub user_id: String,
    /// Unique display name.
    pub username: String,
    /// Ratings in the order they were added.
    #[serde(default)]
    pub ratings: Vec<BookRating>,
}

impl User {
    /// Look a user up by username.
    pub fn get_by_username<S>(store: &S, username: &str) -> Result<Option<User>>
    where
        S: DocumentStore + ?Sized,
    {
        let filter = document(json!({ "username": username }))?;
        store
            .find_one(COLLECTION_KEY, &filter)?
            .map(from_document)
            .transpose()
    }

    /// Create the unique indexes on `user_id` and `username`. Idempotent.
    pub fn ensure_indexes<S>(store: &S) -> Result<()>
    where
        S: DocumentStore + ?Sized,
    {
        store.create_unique_index(COLLECTION_KEY, "user_id")?;
        store.create_unique_index(COLLECTION_KEY, "username")
    }

    /// Store a new user with a fresh id and no ratings.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] if the username is taken.
    pub fn create<S>(store: &S, username: &str) -> Result<User>
    where
        S: DocumentStore + ?Sized,
    {
        User::ensure_indexes(store)?;
        let user = User {
            user_id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            ratings: Vec::new(),
        };
        store.insert_one(COLLECTION_KEY, document(serde_json::to_value(&user)?)?)?;
        tracing::debug!(user_id = %user.user_id, username, "created user");
        Ok(user)
    }

    /// Look a user up by username, creating them when absent.
    pub fn get_or_create_by_username<S>(store: &S, username: &str) -> Result<User>
    where
        S: DocumentStore + ?Sized,
    {
        if let Some(user) = User::get_by_username(store, username)? {
            return Ok(user);
        }
        match User::create(store, username) {
            // Lost a race with another creator; theirs is the stored user.
            Err(PipelineError::Validation(reason)) => User::get_by_username(store, username)?
                .ok_or(PipelineError::Validation(reason)),
            created => created,
        }
    }

    /// Append ratings to the stored user and to `self`.
    ///
    /// The stored list is extended in place, so ratings added concurrently
    /// through other copies of the same user are all kept. `self` only gains
    /// the ratings passed here.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] if the user is not stored.
    pub fn add_ratings<S, I>(&mut self, store: &S, items: I) -> Result<()>
    where
        S: DocumentStore + ?Sized,
        I: IntoIterator<Item = BookRating>,
    {
        let items: Vec<BookRating> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(());
        }

        let filter = document(json!({ "user_id": self.user_id }))?;
        let values = items
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if store.push_many(COLLECTION_KEY, &filter, "ratings", values)? == 0 {
            return Err(PipelineError::Validation(format!(
                "User {} is not stored",
                self.user_id
            )));
        }

        tracing::debug!(user_id = %self.user_id, added = items.len(), "added ratings");
        self.ratings.extend(items);
        Ok(())
    }
}

fn from_document(doc: Document) -> Result<User> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| {
        PipelineError::Validation(format!("Stored user document is malformed: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(BookRating::new("B01", 0.0).is_ok());
        assert!(BookRating::new("B01", 5.0).is_ok());
        assert!(matches!(
            BookRating::new("B01", 5.5),
            Err(PipelineError::Validation(_))
        ));
        assert!(BookRating::new("B01", -0.1).is_err());
        assert!(BookRating::new("B01", f32::NAN).is_err());
    }

    #[test]
    fn out_of_range_rating_fails_to_deserialize() {
        let parsed: std::result::Result<BookRating, _> =
            serde_json::from_value(json!({"book_id": "B01", "rating": 9.0}));
        assert!(parsed.is_err());
    }

    #[test]
    fn create_then_get() {
        let store = MemoryStore::default();
        let created = User::create(&store, "ana").unwrap();

        assert!(Uuid::parse_str(&created.user_id).is_ok());
        assert!(created.ratings.is_empty());

        let found = User::get_by_username(&store, "ana").unwrap();
        assert_eq!(found, Some(created));
        assert_eq!(User::get_by_username(&store, "bo").unwrap(), None);
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let store = MemoryStore::default();
        let first = User::get_or_create_by_username(&store, "ana").unwrap();
        let second = User::get_or_create_by_username(&store, "ana").unwrap();

        assert_eq!(first.user_id, second.user_id);
        assert_eq!(store.count(COLLECTION_KEY).unwrap(), 1);
    }

    #[test]
    fn add_ratings_appends_in_store_and_memory() {
        let store = MemoryStore::default();
        let mut user = User::create(&store, "ana").unwrap();

        user.add_ratings(&store, vec![BookRating::new("B01", 4.5).unwrap()])
            .unwrap();
        user.add_ratings(
            &store,
            vec![
                BookRating::new("B02", 3.0).unwrap(),
                BookRating::new("B03", 1.0).unwrap(),
            ],
        )
        .unwrap();

        assert_eq!(user.ratings.len(), 3);
        let stored = User::get_by_username(&store, "ana").unwrap().unwrap();
        assert_eq!(stored.ratings, user.ratings);
        assert_eq!(stored.ratings[0].book_id(), "B01");
        assert_eq!(stored.ratings[2].rating(), 1.0);
    }

    #[test]
    fn usernames_are_unique() {
        let store = MemoryStore::default();
        User::create(&store, "ana").unwrap();

        let again = User::create(&store, "ana");
        assert!(matches!(again, Err(PipelineError::Validation(_))));
        assert_eq!(store.count(COLLECTION_KEY).unwrap(), 1);
        assert!(User::create(&store, "bo").is_ok());
    }

    #[test]
    fn concurrent_add_ratings_keep_every_rating() {
        const WRITERS: usize = 8;
        const PER_WRITER: usize = 25;

        let store = MemoryStore::default();
        let user = User::create(&store, "ana").unwrap();

        std::thread::scope(|scope| {
            for writer in 0..WRITERS {
                let mut copy = user.clone();
                let store = &store;
                scope.spawn(move || {
                    for n in 0..PER_WRITER {
                        let rating = BookRating::new(format!("B{writer}-{n}"), 3.0).unwrap();
                        copy.add_ratings(store, [rating]).unwrap();
                    }
                    assert_eq!(copy.ratings.len(), PER_WRITER);
                });
            }
        });

        let stored = User::get_by_username(&store, "ana").unwrap().unwrap();
        assert_eq!(stored.ratings.len(), WRITERS * PER_WRITER);

        let mut books: Vec<&str> = stored.ratings.iter().map(BookRating::book_id).collect();
        books.sort_unstable();
        books.dedup();
        assert_eq!(books.len(), WRITERS * PER_WRITER);
    }

    #[test]
    fn add_ratings_requires_a_stored_user() {
        let store = MemoryStore::default();
        let mut ghost = User {
            user_id: Uuid::new_v4().to_string(),
            username: "ghost".into(),
            ratings: Vec::new(),
        };
        let result = ghost.add_ratings(&store, vec![BookRating::new("B01", 2.0).unwrap()]);
        assert!(matches!(result, Err(PipelineError::Validation(_))));
        assert!(ghost.ratings.is_empty());
    }

    #[test]
    fn works_through_a_trait_object() {
        let store = MemoryStore::default();
        let dyn_store: &dyn DocumentStore = &store;
        let user = User::get_or_create_by_username(dyn_store, "ana").unwrap();
        assert_eq!(user.username, "ana");
    }
}
